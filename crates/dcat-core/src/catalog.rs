//! Catalog envelopes for the supported DCAT-US versions.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::DcatError;
use crate::feed::FeedFormatterStream;
use crate::formatter::{to_tab_json, DatasetFormatter};
use crate::models::DatasetRecord;

/// Separator written between two dataset entries.
pub const DELIMITER: &str = ",\n";

/// Closes the dataset array and the catalog object.
pub const FOOTER: &str = "\n\t]\n}";

/// Target DCAT-US version of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DcatVersion {
    #[default]
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "3.0")]
    V3_0,
}

impl DcatVersion {
    /// Catalog key holding the dataset array.
    pub fn dataset_key(self) -> &'static str {
        match self {
            DcatVersion::V1_1 => "dataset",
            DcatVersion::V3_0 => "dcat:dataset",
        }
    }

    /// Dataset key holding the distribution array.
    pub fn distribution_key(self) -> &'static str {
        match self {
            DcatVersion::V1_1 => "distribution",
            DcatVersion::V3_0 => "dcat:distribution",
        }
    }

    /// The catalog object, without its dataset array.
    pub fn catalog(self) -> Value {
        match self {
            DcatVersion::V1_1 => json!({
                "@context": "https://project-open-data.cio.gov/v1.1/schema/catalog.jsonld",
                "@type": "dcat:Catalog",
                "conformsTo": "https://project-open-data.cio.gov/v1.1/schema",
                "describedBy": "https://project-open-data.cio.gov/v1.1/schema/catalog.json"
            }),
            DcatVersion::V3_0 => json!({
                "@context": {
                    "@version": 1.1,
                    "@protected": true,
                    "adms": "http://www.w3.org/ns/adms#",
                    "cnt": "http://www.w3.org/2011/content#",
                    "dash": "http://datashapes.org/dash#",
                    "dcat": "http://www.w3.org/ns/dcat#",
                    "dcatap": "http://data.europa.eu/r5r/",
                    "dcat-us": "http://data.resources.gov/ontology/dcat-us#",
                    "dcat-us-shp": "http://data.resources.gov/shapes/dcat-us#",
                    "dcterms": "http://purl.org/dc/terms/",
                    "dqv": "http://www.w3.org/ns/dqv#",
                    "foaf": "http://xmlns.com/foaf/0.1/",
                    "gsp": "http://www.opengis.net/ont/geosparql#",
                    "locn": "http://www.w3.org/ns/locn#",
                    "odrs": "http://schema.theodi.org/odrs#",
                    "org": "http://www.w3c.org/ns/org#",
                    "owl": "http://www.w3.org/2002/07/owl#",
                    "prov": "http://www.w3.org/ns/prov#",
                    "rdf": "http://www.w3.org/1999/02/22-rdf-syntax-ns#",
                    "rdfs": "http://www.w3.org/2000/01/rdf-schema#",
                    "schema": "http://schema.org/",
                    "sh": "http://www.w3.org/ns/shacl#",
                    "skos": "http://www.w3.org/2004/02/skos/core#",
                    "sdmx-attribute": "http://purl.org/linked-data/sdmx/2009/attribute#",
                    "spdx": "http://spdx.org/rdf/terms#",
                    "vcard": "http://www.w3.org/2006/vcard/ns#",
                    "xsd": "http://www.w3.org/2001/XMLSchema#",
                    "adms:Identifier": {
                        "@id": "adms:Identifier",
                        "@context": {
                            "schemaAgency": "http://www.w3.org/ns/adms#schemaAgency",
                            "creator": {
                                "@id": "dcterms:creator",
                                "@type": "@id"
                            },
                            "issued": {
                                "@id": "dcterms:issued"
                            },
                            "version": "http://purl.org/dc/terms/version",
                            "notation": "http://www.w3.org/2004/02/skos/core#notation"
                        }
                    }
                },
                "@type": "dcat:Catalog",
                "conformsTo": "https://resource.data.gov/profile/dcat-us#"
            }),
        }
    }

    /// Feed text up to and including the opening of the dataset array.
    ///
    /// Rendered once per process.
    pub fn header(self) -> &'static str {
        static V1_1_HEADER: LazyLock<String> = LazyLock::new(|| render_header(DcatVersion::V1_1));
        static V3_0_HEADER: LazyLock<String> = LazyLock::new(|| render_header(DcatVersion::V3_0));

        match self {
            DcatVersion::V1_1 => V1_1_HEADER.as_str(),
            DcatVersion::V3_0 => V3_0_HEADER.as_str(),
        }
    }

    pub fn footer(self) -> &'static str {
        FOOTER
    }
}

fn render_header(version: DcatVersion) -> String {
    // Serializing a json! literal cannot fail.
    let catalog = to_tab_json(&version.catalog(), 0).unwrap_or_else(|_| "{\n}".to_string());
    let body = catalog.strip_suffix("\n}").unwrap_or(&catalog);
    format!("{},\n\t\"{}\": [\n", body, version.dataset_key())
}

impl fmt::Display for DcatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DcatVersion::V1_1 => write!(f, "1.1"),
            DcatVersion::V3_0 => write!(f, "3.0"),
        }
    }
}

impl FromStr for DcatVersion {
    type Err = DcatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.1" | "1" => Ok(DcatVersion::V1_1),
            "3.0" | "3" => Ok(DcatVersion::V3_0),
            other => Err(DcatError::Config(format!(
                "unsupported DCAT-US version '{}', expected 1.1 or 3.0",
                other
            ))),
        }
    }
}

/// Builds the feed stream for a record source.
///
/// Each record is formatted with `formatter` and the entries are wrapped in
/// the catalog envelope of the formatter's DCAT-US version.
///
/// ```
/// use dcat_core::catalog::dcat_feed_stream;
/// use dcat_core::formatter::{DatasetFormatter, DatasetTemplate};
/// use dcat_core::models::DatasetRecord;
/// use dcat_core::urls::SiteUrls;
/// use futures::{executor::block_on, stream, TryStreamExt};
/// use serde_json::json;
///
/// let formatter = DatasetFormatter::new(
///     SiteUrls::new("https://my-site.hub.arcgis.com").unwrap(),
///     DatasetTemplate::default(),
/// );
/// let records = stream::iter(vec![Ok::<_, std::io::Error>(DatasetRecord::new(json!({ "id": "foo" })))]);
///
/// let chunks: Vec<String> = block_on(dcat_feed_stream(records, formatter).try_collect()).unwrap();
/// let feed: serde_json::Value = serde_json::from_str(&chunks.concat()).unwrap();
/// assert_eq!(feed["dataset"][0]["identifier"], "https://my-site.hub.arcgis.com/maps/foo");
/// ```
pub fn dcat_feed_stream<S, E>(
    records: S,
    formatter: DatasetFormatter,
) -> FeedFormatterStream<S, impl FnMut(DatasetRecord) -> Result<String, DcatError> + Unpin>
where
    S: Stream<Item = Result<DatasetRecord, E>> + Unpin,
    E: fmt::Display,
{
    let version = formatter.version();
    FeedFormatterStream::new(
        records,
        version.header(),
        version.footer(),
        DELIMITER,
        move |record: DatasetRecord| formatter.format(&record),
    )
}
