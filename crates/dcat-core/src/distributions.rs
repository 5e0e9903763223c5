//! Rule-based generation of DCAT distributions.
//!
//! Each dataset gets an ordered list of download links. The order is fixed by
//! [`DISTRIBUTION_RULES`]: every rule whose condition holds for the record
//! contributes one distribution, then operator-supplied links from the ISO
//! metadata tree are appended.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{is_truthy, DatasetRecord, DistributionDescriptor, METADATA_ONLINE_SOURCES_PATH};
use crate::template::is_unresolved;

const WFS_SERVER: &str = "WFSServer";
const WMS_SERVER: &str = "WMSServer";

/// Record fields read while generating distributions.
pub const DISTRIBUTION_FIELDS: &[&str] = &[
    "id",
    "url",
    "access",
    "type",
    "size",
    "layer.geometryType",
    "server.spatialReference",
    "supportedExtensions",
    METADATA_ONLINE_SOURCES_PATH,
];

static REST_SERVICES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rest/services").expect("rest/services pattern is valid"));
static LAYER_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+$").expect("layer index pattern is valid"));

/// The kinds of rule-generated distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    HubLandingPage,
    GeoService,
    ProxiedCsv,
    GeoJson,
    Csv,
    Kml,
    Shapefile,
    Wfs,
    Wms,
}

/// A distribution kind paired with the condition that emits it.
#[derive(Debug, Clone, Copy)]
pub struct DistributionRule {
    pub kind: DistributionKind,
    pub applies: fn(&DatasetRecord) -> bool,
}

/// Rules in output order. A proxied CSV that is also a layer gets two CSV
/// entries.
pub const DISTRIBUTION_RULES: &[DistributionRule] = &[
    DistributionRule { kind: DistributionKind::HubLandingPage, applies: always },
    DistributionRule { kind: DistributionKind::GeoService, applies: always },
    DistributionRule { kind: DistributionKind::ProxiedCsv, applies: DatasetRecord::is_proxied_csv },
    DistributionRule { kind: DistributionKind::GeoJson, applies: DatasetRecord::is_layer },
    DistributionRule { kind: DistributionKind::Csv, applies: DatasetRecord::is_layer },
    DistributionRule { kind: DistributionKind::Kml, applies: is_layer_with_geometry },
    DistributionRule { kind: DistributionKind::Shapefile, applies: is_layer_with_geometry },
    DistributionRule { kind: DistributionKind::Wfs, applies: supports_wfs },
    DistributionRule { kind: DistributionKind::Wms, applies: supports_wms },
];

fn always(_: &DatasetRecord) -> bool {
    true
}

fn is_layer_with_geometry(record: &DatasetRecord) -> bool {
    record.is_layer() && record.has_geometry_type()
}

fn supports_wfs(record: &DatasetRecord) -> bool {
    record.supports_extension(WFS_SERVER)
}

fn supports_wms(record: &DatasetRecord) -> bool {
    record.supports_extension(WMS_SERVER)
}

/// Builds `{base}.{extension}` download links, carrying the record's
/// spatial reference as an `outSR` query when it has a `wkid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLinks {
    base: String,
    query: String,
}

impl DownloadLinks {
    pub fn new(download_link: &str, record: &DatasetRecord) -> Self {
        Self {
            base: download_link.to_string(),
            query: out_sr_query(record),
        }
    }

    /// Returns the download link for a file extension.
    ///
    /// ```
    /// use dcat_core::distributions::DownloadLinks;
    /// use dcat_core::models::DatasetRecord;
    /// use serde_json::json;
    ///
    /// let record = DatasetRecord::new(json!({ "server": { "spatialReference": { "wkid": 3310 } } }));
    /// let links = DownloadLinks::new("https://site/datasets/foo", &record);
    /// assert_eq!(links.link_for("csv"), "https://site/datasets/foo.csv?outSR=%7B%22wkid%22%3A3310%7D");
    /// ```
    pub fn link_for(&self, extension: &str) -> String {
        format!("{}.{}{}", self.base, extension, self.query)
    }
}

fn out_sr_query(record: &DatasetRecord) -> String {
    let Some(spatial_reference) = record
        .get("server.spatialReference")
        .and_then(Value::as_object)
    else {
        return String::new();
    };
    let Some(wkid) = spatial_reference.get("wkid").filter(|v| is_truthy(v)) else {
        return String::new();
    };

    let mut out_sr = Map::new();
    if let Some(latest) = spatial_reference.get("latestWkid").filter(|v| !v.is_null()) {
        out_sr.insert("latestWkid".to_string(), latest.clone());
    }
    out_sr.insert("wkid".to_string(), wkid.clone());

    format!(
        "?outSR={}",
        urlencoding::encode(&Value::Object(out_sr).to_string())
    )
}

/// Rewrites a GeoServices layer URL into its OGC capabilities endpoint.
fn ogc_url(service_url: &str, service: &str) -> String {
    let services = REST_SERVICES.replace(service_url, NoExpand("services"));
    let capabilities = format!(
        "{}Server?request=GetCapabilities&service={}",
        service, service
    );
    LAYER_INDEX
        .replace(&services, NoExpand(&capabilities))
        .into_owned()
}

impl DistributionKind {
    /// Builds the distribution for this kind.
    pub fn descriptor(
        self,
        landing_page: &str,
        service_url: Option<&str>,
        links: &DownloadLinks,
    ) -> DistributionDescriptor {
        match self {
            DistributionKind::HubLandingPage => DistributionDescriptor::new(
                "ArcGIS Hub Dataset",
                "Web Page",
                "text/html",
                Some(landing_page.to_string()),
            ),
            DistributionKind::GeoService => DistributionDescriptor::new(
                "ArcGIS GeoService",
                "ArcGIS GeoServices REST API",
                "application/json",
                service_url.map(str::to_string),
            ),
            DistributionKind::ProxiedCsv | DistributionKind::Csv => {
                DistributionDescriptor::new("CSV", "CSV", "text/csv", Some(links.link_for("csv")))
            }
            DistributionKind::GeoJson => DistributionDescriptor::new(
                "GeoJSON",
                "GeoJSON",
                "application/vnd.geo+json",
                Some(links.link_for("geojson")),
            ),
            DistributionKind::Kml => DistributionDescriptor::new(
                "KML",
                "KML",
                "application/vnd.google-earth.kml+xml",
                Some(links.link_for("kml")),
            ),
            DistributionKind::Shapefile => DistributionDescriptor::new(
                "Shapefile",
                "ZIP",
                "application/zip",
                Some(links.link_for("zip")),
            ),
            DistributionKind::Wfs => DistributionDescriptor::new(
                "OGC WFS",
                "OGC WFS",
                "application/vnd.ogc.wfs_xml",
                service_url.map(|url| ogc_url(url, "WFS")),
            ),
            DistributionKind::Wms => DistributionDescriptor::new(
                "OGC WMS",
                "OGC WMS",
                "application/vnd.ogc.wms_xml",
                service_url.map(|url| ogc_url(url, "WMS")),
            ),
        }
    }
}

/// Generates the rule-based and metadata-derived distributions for a record.
pub fn generate_distributions(
    record: &DatasetRecord,
    landing_page: &str,
    download_link: &str,
) -> Vec<DistributionDescriptor> {
    let links = DownloadLinks::new(download_link, record);
    let service_url = record.url();

    DISTRIBUTION_RULES
        .iter()
        .filter(|rule| (rule.applies)(record))
        .map(|rule| rule.kind.descriptor(landing_page, service_url, &links))
        .chain(metadata_distributions(record))
        .collect()
}

/// Distributions listed by the operator in `distInfo.distTranOps.onLineSrc`.
fn metadata_distributions(record: &DatasetRecord) -> Vec<DistributionDescriptor> {
    match record.get(METADATA_ONLINE_SOURCES_PATH) {
        Some(Value::Array(sources)) => sources
            .iter()
            .map(DistributionDescriptor::from_online_source)
            .collect(),
        Some(_) => {
            debug!(
                id = record.id().unwrap_or_default(),
                "Ignoring onLineSrc metadata that is not an array"
            );
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Entries of a template-supplied distribution array, after interpolation.
///
/// Nested arrays are flattened one level and placeholders that did not
/// resolve are dropped. Anything that is not an array contributes nothing.
pub fn template_distributions(interpolated: Option<&Value>) -> Vec<Value> {
    let Some(Value::Array(entries)) = interpolated else {
        return Vec::new();
    };

    entries
        .iter()
        .flat_map(|entry| match entry {
            Value::Array(nested) => nested.clone(),
            other => vec![other.clone()],
        })
        .filter(|entry| !matches!(entry, Value::String(s) if is_unresolved(s)))
        .collect()
}

/// Template-supplied entries followed by the generated ones.
pub fn assemble_distributions(
    interpolated: Option<&Value>,
    generated: Vec<DistributionDescriptor>,
) -> Result<Vec<Value>, serde_json::Error> {
    let mut distributions = template_distributions(interpolated);
    for descriptor in generated {
        distributions.push(serde_json::to_value(descriptor)?);
    }
    Ok(distributions)
}
