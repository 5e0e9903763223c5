//! Conversion of one dataset record into a DCAT dataset entry.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Map, Serializer, Value};
use tracing::debug;

use crate::catalog::DcatVersion;
use crate::distributions::{assemble_distributions, generate_distributions, DISTRIBUTION_FIELDS};
use crate::error::DcatError;
use crate::models::DatasetRecord;
use crate::template::{interpolate, is_unresolved, list_dependencies, Transforms};
use crate::urls::{ResolvedUrls, SiteUrls};

/// Output paths whose values are computed by the feed, never by templates.
pub const NON_EDITABLE_FIELDS: &[&str] = &[
    "@type",
    "identifier",
    "landingPage",
    "webService",
    "contactPoint.@type",
    "spatial",
];

/// Keys removed from customization templates before they are merged.
const PROTECTED_TEMPLATE_KEYS: &[&str] = &[
    "@type",
    "identifier",
    "landingPage",
    "webService",
    "spatial",
    "distributions",
];

/// Distribution keys of every supported version. Only the active version's
/// key is managed; the others are dropped from the output.
const DISTRIBUTION_KEYS: &[&str] = &["distribution", "dcat:distribution"];

const CONTACT_POINT_TYPE: &str = "vcard:Contact";

/// Keyword given to untagged site pages.
pub const DEFAULT_PAGE_KEYWORD: &str = "ArcGIS Hub page";

const DEFAULT_THEME: &str = "geospatial";

/// Record fields read outside of template placeholders.
const RECORD_FIELDS: &[&str] = &[
    "slug",
    "typeKeywords",
    "tags",
    "license",
    "structuredLicense",
    "licenseInfo",
];

/// The system-owned dataset template.
pub fn base_template() -> Value {
    json!({
        "title": "{{name}}",
        "description": "{{description}}",
        "keyword": "{{tags}}",
        "issued": "{{created:toISO}}",
        "modified": "{{modified:toISO}}",
        "publisher": {
            "name": "{{source}}"
        },
        "contactPoint": {
            "@type": CONTACT_POINT_TYPE,
            "fn": "{{owner}}"
        },
        "accessLevel": "public",
        "spatial": "{{extent}}",
        "license": "{{license}}"
    })
}

/// A dataset template: the base template with customizations merged on top.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetTemplate {
    root: Value,
    theme_override: bool,
}

impl DatasetTemplate {
    /// Merges `customizations` onto the base template.
    ///
    /// Protected keys are stripped from the customizations first, so identity,
    /// landing page, type discriminators and spatial data always come from the
    /// system.
    ///
    /// # Errors
    ///
    /// Returns `DcatError::InvalidTemplate` if `customizations` is neither
    /// `null` nor a JSON object.
    pub fn build(customizations: Option<&Value>) -> Result<Self, DcatError> {
        let mut root = match base_template() {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let customizations = match customizations {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => scrub(map.clone()),
            Some(other) => {
                return Err(DcatError::InvalidTemplate(format!(
                    "customizations must be a JSON object, got {}",
                    json_type(other)
                )))
            }
        };

        let theme_override = customizations.get("theme").is_some_and(is_non_empty);
        for (key, value) in customizations {
            root.insert(key, value);
        }
        pin_contact_point_type(&mut root);

        Ok(Self {
            root: Value::Object(root),
            theme_override,
        })
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// True if the template has an entry for `key`.
    pub fn declares(&self, key: &str) -> bool {
        self.root.get(key).is_some()
    }

    /// Record paths read when formatting with this template: its placeholder
    /// paths first, then the fields the URL, license, keyword and
    /// distribution rules use.
    pub fn dependencies(&self) -> Vec<String> {
        let mut fields = list_dependencies(&self.root);
        for field in RECORD_FIELDS.iter().chain(DISTRIBUTION_FIELDS) {
            if !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }
        fields
    }

    /// True if the customizations supplied a non-empty `theme`.
    pub fn has_theme_override(&self) -> bool {
        self.theme_override
    }
}

impl Default for DatasetTemplate {
    fn default() -> Self {
        Self {
            root: base_template(),
            theme_override: false,
        }
    }
}

fn scrub(mut customizations: Map<String, Value>) -> Map<String, Value> {
    customizations.retain(|key, _| !PROTECTED_TEMPLATE_KEYS.contains(&key.as_str()));
    customizations
}

/// Puts `contactPoint["@type"]` back to the system value, first in the object.
fn pin_contact_point_type(root: &mut Map<String, Value>) {
    let Some(Value::Object(contact)) = root.get_mut("contactPoint") else {
        return;
    };
    let mut pinned = Map::with_capacity(contact.len() + 1);
    pinned.insert("@type".to_string(), json!(CONTACT_POINT_TYPE));
    for (key, value) in std::mem::take(contact) {
        if key != "@type" {
            pinned.insert(key, value);
        }
    }
    *contact = pinned;
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Builds DCAT dataset entries for one site.
///
/// # Examples
///
/// ```
/// use dcat_core::formatter::{DatasetFormatter, DatasetTemplate};
/// use dcat_core::models::DatasetRecord;
/// use dcat_core::urls::SiteUrls;
/// use serde_json::json;
///
/// let site = SiteUrls::new("https://my-site.hub.arcgis.com").unwrap();
/// let formatter = DatasetFormatter::new(site, DatasetTemplate::default());
///
/// let entry = formatter
///     .format_value(&DatasetRecord::new(json!({ "id": "foo", "name": "Trails" })))
///     .unwrap();
/// assert_eq!(entry["title"], "Trails");
/// assert_eq!(entry["landingPage"], "https://my-site.hub.arcgis.com/maps/foo");
/// ```
#[derive(Debug, Clone)]
pub struct DatasetFormatter {
    site: SiteUrls,
    template: DatasetTemplate,
    transforms: Transforms,
    non_editable_fields: Vec<String>,
    version: DcatVersion,
}

impl DatasetFormatter {
    pub fn new(site: SiteUrls, template: DatasetTemplate) -> Self {
        Self {
            site,
            template,
            transforms: Transforms::with_defaults(),
            non_editable_fields: NON_EDITABLE_FIELDS.iter().map(|f| f.to_string()).collect(),
            version: DcatVersion::default(),
        }
    }

    /// Replaces the transform table.
    pub fn with_transforms(mut self, transforms: Transforms) -> Self {
        self.transforms = transforms;
        self
    }

    /// Replaces the list of non-editable output paths.
    pub fn with_non_editable_fields(mut self, fields: Vec<String>) -> Self {
        self.non_editable_fields = fields;
        self
    }

    pub fn with_version(mut self, version: DcatVersion) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> DcatVersion {
        self.version
    }

    pub fn template(&self) -> &DatasetTemplate {
        &self.template
    }

    /// Formats a record as a feed entry: tab-indented JSON nested two levels.
    pub fn format(&self, record: &DatasetRecord) -> Result<String, DcatError> {
        let dataset = self.format_value(record)?;
        to_tab_json(&dataset, 2)
    }

    /// Formats a record as a DCAT dataset JSON object.
    pub fn format_value(&self, record: &DatasetRecord) -> Result<Value, DcatError> {
        let urls = self.site.resolve(record);
        self.format_with_urls(record, &urls)
    }

    /// Formats a record using already-resolved URLs.
    ///
    /// # Errors
    ///
    /// Returns `DcatError::InvalidRecord` if the record is not a JSON object
    /// and `DcatError::TemplateResolution` if the template cannot be filled.
    pub fn format_with_urls(
        &self,
        record: &DatasetRecord,
        urls: &ResolvedUrls,
    ) -> Result<Value, DcatError> {
        if !record.as_value().is_object() {
            return Err(DcatError::InvalidRecord(
                "dataset record must be a JSON object".to_string(),
            ));
        }

        let data = without_none_license(record.as_value());
        let interpolated = interpolate(self.template.as_value(), &data, &self.transforms)
            .map_err(|e| DcatError::TemplateResolution(e.to_string()))?;
        let Value::Object(interpolated) = interpolated else {
            return Err(DcatError::InvalidTemplate(
                "dataset template must be a JSON object".to_string(),
            ));
        };

        let mut dataset = Map::new();
        dataset.insert("@type".to_string(), json!("dcat:Dataset"));
        dataset.insert("identifier".to_string(), json!(urls.identifier));
        dataset.insert("license".to_string(), json!(""));
        dataset.insert("landingPage".to_string(), json!(urls.landing_page));
        for (key, value) in interpolated {
            dataset.insert(key, value);
        }

        self.clear_unresolved_protected_fields(&mut dataset);
        apply_license_fallback(&mut dataset, record);

        if record.is_page() && !record.has_tags() {
            dataset.insert("keyword".to_string(), json!([DEFAULT_PAGE_KEYWORD]));
        }

        let distribution_key = self.version.distribution_key();
        dataset.retain(|key, _| {
            key.as_str() == distribution_key || !DISTRIBUTION_KEYS.contains(&key.as_str())
        });
        let generated = generate_distributions(record, &urls.landing_page, &urls.download_link);
        let distributions = assemble_distributions(dataset.get(distribution_key), generated)?;
        dataset.insert(distribution_key.to_string(), Value::Array(distributions));

        if self.template.declares("spatial") {
            self.apply_spatial(&mut dataset, record);
        }

        debug!(id = record.id().unwrap_or_default(), "Formatted dataset");
        Ok(Value::Object(dataset))
    }

    /// Record paths the template and the distribution rules read.
    pub fn dependencies(&self) -> Vec<String> {
        self.template.dependencies()
    }

    fn clear_unresolved_protected_fields(&self, dataset: &mut Map<String, Value>) {
        for path in &self.non_editable_fields {
            if let Some(value) = lookup_path_mut(dataset, path) {
                if matches!(value, Value::String(s) if is_unresolved(s)) {
                    *value = json!("");
                }
            }
        }
    }

    fn apply_spatial(&self, dataset: &mut Map<String, Value>, record: &DatasetRecord) {
        match dataset.get("spatial").and_then(format_bbox) {
            Some(bbox) => {
                dataset.insert("spatial".to_string(), json!(bbox));
                if !self.template.has_theme_override() {
                    dataset.insert("theme".to_string(), json!([DEFAULT_THEME]));
                }
            }
            None => {
                debug!(
                    id = record.id().unwrap_or_default(),
                    "No resolvable bounding box, omitting spatial"
                );
                dataset.retain(|key, _| key.as_str() != "spatial");
            }
        }
    }
}

/// A record `license` of `"none"` counts as no license at all.
fn without_none_license(data: &Value) -> Cow<'_, Value> {
    match data.get("license") {
        Some(Value::String(license)) if license == "none" => {
            let mut owned = data.clone();
            if let Some(map) = owned.as_object_mut() {
                map.retain(|key, _| key.as_str() != "license");
            }
            Cow::Owned(owned)
        }
        _ => Cow::Borrowed(data),
    }
}

fn apply_license_fallback(dataset: &mut Map<String, Value>, record: &DatasetRecord) {
    let missing = match dataset.get("license") {
        None | Some(Value::Null) => true,
        Some(Value::String(license)) => license.is_empty() || is_unresolved(license),
        Some(_) => false,
    };
    if missing {
        let fallback = record
            .get_str("structuredLicense.url")
            .or_else(|| record.get_str("licenseInfo"))
            .unwrap_or_default();
        dataset.insert("license".to_string(), json!(fallback));
    }
}

/// Formats an envelope (`{ "coordinates": [[x, y], [x, y]] }`) or a bare
/// 2×2 array as `minX,minY,maxX,maxY` with four decimals.
fn format_bbox(value: &Value) -> Option<String> {
    let coordinates = match value {
        Value::Object(envelope) => envelope.get("coordinates")?,
        Value::Array(_) => value,
        _ => return None,
    };

    let corners = coordinates.as_array().filter(|c| c.len() == 2)?;
    let mut ordinates = Vec::with_capacity(4);
    for corner in corners {
        let corner = corner.as_array().filter(|c| c.len() == 2)?;
        for ordinate in corner {
            ordinates.push(format!("{:.4}", ordinate.as_f64()?));
        }
    }
    Some(ordinates.join(","))
}

fn lookup_path_mut<'a>(map: &'a mut Map<String, Value>, path: &str) -> Option<&'a mut Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(map.get_mut(first)?, |node, segment| match node {
        Value::Object(inner) => inner.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    })
}

/// Serializes `value` with tab indentation, indented `depth` extra tabs.
pub fn to_tab_json(value: &Value, depth: usize) -> Result<String, DcatError> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut serializer)?;
    let json = String::from_utf8(buf).map_err(|e| DcatError::Generic(e.to_string()))?;

    if depth == 0 {
        return Ok(json);
    }
    let tabs = "\t".repeat(depth);
    Ok(format!("{}{}", tabs, json.replace('\n', &format!("\n{}", tabs))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SITE_URL: &str = "https://foobar.hub.arcgis.com";
    const SERVICE_URL: &str =
        "https://services1.arcgis.com/jUJYIo9tSA7EHvfZ/arcgis/rest/services/DCAT_Test/FeatureServer/0";

    fn formatter(customizations: Option<Value>) -> DatasetFormatter {
        let template = DatasetTemplate::build(customizations.as_ref()).unwrap();
        DatasetFormatter::new(SiteUrls::new(SITE_URL).unwrap(), template)
    }

    fn format(record: Value, customizations: Option<Value>) -> Value {
        let entry = formatter(customizations)
            .format(&DatasetRecord::new(record))
            .unwrap();
        serde_json::from_str(&entry).unwrap()
    }

    fn calfire_dataset() -> Value {
        json!({
            "owner": "fpgis.CALFIRE",
            "created": 1570747289000_i64,
            "modified": 1570747379000_i64,
            "tags": ["Uno", "Dos", "Tres"],
            "extent": {
                "coordinates": [[-123.8832, 35.0024], [-118.3281, 42.0122]],
                "type": "envelope"
            },
            "name": "DCAT_Test",
            "description": "Some Description",
            "source": "Test Source",
            "id": "00000000000000000000000000000000_0",
            "type": "Feature Layer",
            "url": SERVICE_URL,
            "layer": { "geometryType": "esriGeometryPolygon" },
            "server": { "spatialReference": { "latestWkid": 3310, "wkid": 3310 } },
            "slug": "CALFIRE::DCAT_Test"
        })
    }

    #[test]
    fn test_customizations_cannot_overwrite_protected_fields() {
        let template = DatasetTemplate::build(Some(&json!({
            "@type": "SABOTAGE",
            "title": "{{metadata.metadata.name||item.title}}",
            "publisher": { "name": "Bad Actor" },
            "contactPoint": {
                "@type": "SABOTAGE",
                "fn": "{{item.owner}}",
                "hasEmail": "mailto:dcat.support@dc.gov"
            },
            "identifier": "SABOTAGE",
            "landingPage": "SABOTAGE",
            "webService": "SABOTAGE",
            "spatial": "SABOTAGE"
        })))
        .unwrap();

        let root = template.as_value();
        assert_eq!(root["@type"], Value::Null);
        assert_eq!(root["identifier"], Value::Null);
        assert_eq!(root["landingPage"], Value::Null);
        assert_eq!(root["webService"], Value::Null);
        assert_eq!(root["spatial"], json!("{{extent}}"));
        assert_eq!(root["contactPoint"]["@type"], json!("vcard:Contact"));
        assert_eq!(root["title"], json!("{{metadata.metadata.name||item.title}}"));
        assert_eq!(root["contactPoint"]["fn"], json!("{{item.owner}}"));
        assert_eq!(root["contactPoint"]["hasEmail"], json!("mailto:dcat.support@dc.gov"));
    }

    #[test]
    fn test_protected_fields_in_formatted_output() {
        let actual = format(
            calfire_dataset(),
            Some(json!({
                "@type": "SABOTAGE",
                "identifier": "SABOTAGE",
                "landingPage": "SABOTAGE",
                "webService": "SABOTAGE",
                "distribution": "SABOTAGE",
                "contactPoint": { "@type": "SABOTAGE", "fn": "{{owner}}" }
            })),
        );
        assert_eq!(actual["@type"], json!("dcat:Dataset"));
        assert_eq!(actual["identifier"], json!(format!("{}/maps/CALFIRE::DCAT_Test", SITE_URL)));
        assert_eq!(actual["landingPage"], json!(format!("{}/maps/CALFIRE::DCAT_Test", SITE_URL)));
        assert_eq!(actual.get("webService"), None);
        assert_eq!(actual["contactPoint"]["@type"], json!("vcard:Contact"));
        assert_eq!(actual["distribution"].as_array().unwrap().len(), 6);
        assert_eq!(actual["distribution"][0]["title"], json!("ArcGIS Hub Dataset"));
    }

    #[test]
    fn test_no_customizations() {
        assert!(DatasetTemplate::build(None).is_ok());
        assert!(DatasetTemplate::build(Some(&Value::Null)).is_ok());
        assert_eq!(DatasetTemplate::build(None).unwrap(), DatasetTemplate::default());
    }

    #[test]
    fn test_non_object_customizations_rejected() {
        let result = DatasetTemplate::build(Some(&json!(["title"])));
        assert!(matches!(result, Err(DcatError::InvalidTemplate(_))));
    }

    #[test]
    fn test_renders_full_dataset_with_srid() {
        let actual = format(calfire_dataset(), None);
        let out_sr = "?outSR=%7B%22latestWkid%22%3A3310%2C%22wkid%22%3A3310%7D";
        let landing_page = format!("{}/maps/CALFIRE::DCAT_Test", SITE_URL);
        let download = format!("{}/datasets/CALFIRE::DCAT_Test", SITE_URL);

        let expected = json!({
            "@type": "dcat:Dataset",
            "identifier": landing_page,
            "license": "",
            "landingPage": landing_page,
            "title": "DCAT_Test",
            "description": "Some Description",
            "keyword": ["Uno", "Dos", "Tres"],
            "issued": "2019-10-10T22:41:29.000Z",
            "modified": "2019-10-10T22:42:59.000Z",
            "publisher": { "name": "Test Source" },
            "contactPoint": { "@type": "vcard:Contact", "fn": "fpgis.CALFIRE" },
            "accessLevel": "public",
            "spatial": "-123.8832,35.0024,-118.3281,42.0122",
            "distribution": [
                {
                    "@type": "dcat:Distribution",
                    "title": "ArcGIS Hub Dataset",
                    "format": "Web Page",
                    "mediaType": "text/html",
                    "accessURL": landing_page
                },
                {
                    "@type": "dcat:Distribution",
                    "title": "ArcGIS GeoService",
                    "format": "ArcGIS GeoServices REST API",
                    "mediaType": "application/json",
                    "accessURL": SERVICE_URL
                },
                {
                    "@type": "dcat:Distribution",
                    "title": "GeoJSON",
                    "format": "GeoJSON",
                    "mediaType": "application/vnd.geo+json",
                    "accessURL": format!("{}.geojson{}", download, out_sr)
                },
                {
                    "@type": "dcat:Distribution",
                    "title": "CSV",
                    "format": "CSV",
                    "mediaType": "text/csv",
                    "accessURL": format!("{}.csv{}", download, out_sr)
                },
                {
                    "@type": "dcat:Distribution",
                    "title": "KML",
                    "format": "KML",
                    "mediaType": "application/vnd.google-earth.kml+xml",
                    "accessURL": format!("{}.kml{}", download, out_sr)
                },
                {
                    "@type": "dcat:Distribution",
                    "title": "Shapefile",
                    "format": "ZIP",
                    "mediaType": "application/zip",
                    "accessURL": format!("{}.zip{}", download, out_sr)
                }
            ],
            "theme": ["geospatial"]
        });

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_renders_links_without_srid() {
        let mut dataset = calfire_dataset();
        dataset["server"] = json!({});
        let actual = format(dataset, None);
        assert_eq!(
            actual["distribution"][3]["accessURL"],
            json!(format!("{}/datasets/CALFIRE::DCAT_Test.csv", SITE_URL))
        );
    }

    #[test]
    fn test_empty_theme_override_keeps_default() {
        let actual = format(calfire_dataset(), Some(json!({ "theme": [] })));
        assert_eq!(actual["theme"], json!(["geospatial"]));
    }

    #[test]
    fn test_theme_override_is_honored() {
        let actual = format(calfire_dataset(), Some(json!({ "theme": ["my theme"] })));
        assert_eq!(actual["theme"], json!(["my theme"]));
        assert_eq!(actual["spatial"], json!("-123.8832,35.0024,-118.3281,42.0122"));
    }

    #[test]
    fn test_bare_bbox_array() {
        let mut dataset = calfire_dataset();
        dataset["extent"] = json!([[-1.5, 2.0], [3.25, 4.0]]);
        let actual = format(dataset, None);
        assert_eq!(actual["spatial"], json!("-1.5000,2.0000,3.2500,4.0000"));
    }

    #[test]
    fn test_unresolvable_spatial_is_omitted() {
        let mut dataset = calfire_dataset();
        dataset.as_object_mut().unwrap().remove("extent");
        let actual = format(dataset, None);
        assert_eq!(actual.get("spatial"), None);
        assert_eq!(actual.get("theme"), None);

        let mut dataset = calfire_dataset();
        dataset["extent"] = json!({ "coordinates": [["a", 1], [2, 3]] });
        let actual = format(dataset, None);
        assert_eq!(actual.get("spatial"), None);
    }

    #[test]
    fn test_license_editable_with_template_value() {
        let mut dataset = calfire_dataset();
        dataset["licenseInfo"] = json!("licenseInfo text");
        let actual = format(dataset, Some(json!({ "license": "{{owner}}" })));
        assert_eq!(actual["license"], json!("fpgis.CALFIRE"));
    }

    #[test]
    fn test_license_editable_with_literal_value() {
        let mut dataset = calfire_dataset();
        dataset["licenseInfo"] = json!("licenseInfo text");
        let actual = format(dataset, Some(json!({ "license": "A HARDCODED LICENSE" })));
        assert_eq!(actual["license"], json!("A HARDCODED LICENSE"));
    }

    #[test]
    fn test_license_falls_back_to_structured_license_url() {
        let mut dataset = calfire_dataset();
        dataset["structuredLicense"] = json!({ "url": "https://google.com" });
        dataset["licenseInfo"] = json!("licenseInfo text");
        assert_eq!(format(dataset, None)["license"], json!("https://google.com"));
    }

    #[test]
    fn test_license_falls_back_to_license_info() {
        let mut dataset = calfire_dataset();
        dataset["licenseInfo"] = json!("licenseInfo text");
        assert_eq!(format(dataset, None)["license"], json!("licenseInfo text"));
    }

    #[test]
    fn test_license_empty_without_sources() {
        assert_eq!(format(calfire_dataset(), None)["license"], json!(""));
    }

    #[test]
    fn test_none_license_is_treated_as_absent() {
        let mut dataset = calfire_dataset();
        dataset["license"] = json!("none");
        let actual = format(dataset, Some(json!({ "license": "{{license || a-custom-license}}" })));
        assert_eq!(actual["license"], json!("a-custom-license"));
    }

    #[test]
    fn test_page_gets_default_keyword_without_tags() {
        let mut dataset = calfire_dataset();
        dataset["type"] = json!("Hub Page");
        dataset.as_object_mut().unwrap().remove("tags");

        assert_eq!(format(dataset.clone(), None)["keyword"], json!([DEFAULT_PAGE_KEYWORD]));

        dataset["tags"] = json!([]);
        assert_eq!(format(dataset.clone(), None)["keyword"], json!([DEFAULT_PAGE_KEYWORD]));

        dataset["tags"] = json!([""]);
        assert_eq!(format(dataset, None)["keyword"], json!([DEFAULT_PAGE_KEYWORD]));
    }

    #[test]
    fn test_tagged_page_keeps_tags() {
        let mut dataset = calfire_dataset();
        dataset["type"] = json!("Hub Page");
        assert_eq!(format(dataset, None)["keyword"], json!(["Uno", "Dos", "Tres"]));
    }

    #[test]
    fn test_template_distribution_is_prepended() {
        let actual = format(
            calfire_dataset(),
            Some(json!({
                "distribution": [{ "interpolated": "{{name}}", "constant": "myConstant" }]
            })),
        );
        let distributions = actual["distribution"].as_array().unwrap();
        assert_eq!(distributions.len(), 7);
        assert_eq!(distributions[0], json!({ "interpolated": "DCAT_Test", "constant": "myConstant" }));
        assert_eq!(distributions[1]["title"], json!("ArcGIS Hub Dataset"));
    }

    #[test]
    fn test_metadata_distribution_is_appended() {
        let mut dataset = calfire_dataset();
        dataset["metadata"] = json!({ "metadata": { "distInfo": { "distTranOps": { "onLineSrc": [{
            "protocol": "GeoService REST API",
            "orDesc": "endpoint",
            "linkage": format!("{}/datasets/00000000000000000000000000000000_0", SITE_URL),
            "orName": "ArcGIS GeoService"
        }] } } } });

        let actual = format(dataset, None);
        let last = actual["distribution"].as_array().unwrap().last().cloned().unwrap();
        assert_eq!(
            last,
            json!({
                "@type": "dcat:Distribution",
                "title": "ArcGIS GeoService",
                "format": "GeoService REST API",
                "accessURL": format!("{}/datasets/00000000000000000000000000000000_0", SITE_URL),
                "description": "endpoint"
            })
        );
    }

    #[test]
    fn test_malformed_online_sources_do_not_fail() {
        let mut dataset = calfire_dataset();
        dataset["metadata"] = json!({ "metadata": { "distInfo": { "distTranOps": {
            "onLineSrc": { "linkage": "https://foobar.com" }
        } } } });
        let actual = format(dataset, None);
        assert_eq!(actual["distribution"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_unresolved_protected_fields_become_empty() {
        let fields = vec!["contactPoint.fn".to_string()];
        let formatter = formatter(None).with_non_editable_fields(fields);
        let mut dataset = calfire_dataset();
        dataset.as_object_mut().unwrap().remove("owner");

        let actual = formatter.format_value(&DatasetRecord::new(dataset)).unwrap();
        assert_eq!(actual["contactPoint"]["fn"], json!(""));
    }

    #[test]
    fn test_unknown_transform_is_client_error() {
        let formatter = formatter(Some(json!({ "issued": "{{created:toFancyDate}}" })));
        let err = formatter.format(&DatasetRecord::new(calfire_dataset())).unwrap_err();
        assert!(matches!(err, DcatError::TemplateResolution(_)));
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("toFancyDate"));
    }

    #[test]
    fn test_missing_transform_table_is_client_error() {
        let formatter = formatter(None).with_transforms(Transforms::new());
        let err = formatter.format(&DatasetRecord::new(calfire_dataset())).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let err = formatter(None).format(&DatasetRecord::new(Value::Null)).unwrap_err();
        assert!(matches!(err, DcatError::InvalidRecord(_)));
    }

    #[test]
    fn test_dcat_us_3_uses_prefixed_distribution_key() {
        let formatter = formatter(Some(json!({ "dcat:distribution": ["distro1", "{{distroname}}"] })))
            .with_version(DcatVersion::V3_0);
        let actual = formatter.format_value(&DatasetRecord::new(calfire_dataset())).unwrap();
        assert_eq!(actual.get("distribution"), None);
        let distributions = actual["dcat:distribution"].as_array().unwrap();
        assert_eq!(distributions[0], json!("distro1"));
        assert_eq!(distributions[1]["title"], json!("ArcGIS Hub Dataset"));
    }

    #[test]
    fn test_v3_feed_drops_customized_v1_distribution_key() {
        let formatter = formatter(Some(json!({
            "distribution": "SABOTAGE",
            "dcat:distribution": "SABOTAGE"
        })))
        .with_version(DcatVersion::V3_0);
        let actual = formatter
            .format_value(&DatasetRecord::new(json!({ "id": "foo_0" })))
            .unwrap();

        assert_eq!(actual.get("distribution"), None);
        let distributions = actual["dcat:distribution"].as_array().unwrap();
        assert_eq!(distributions.len(), 4);
        assert!(distributions.iter().all(|d| d["@type"] == "dcat:Distribution"));
    }

    #[test]
    fn test_v1_feed_drops_customized_v3_distribution_key() {
        let formatter = formatter(Some(json!({ "dcat:distribution": "SABOTAGE" })));
        let actual = formatter
            .format_value(&DatasetRecord::new(json!({ "id": "foo_0" })))
            .unwrap();

        assert_eq!(actual.get("dcat:distribution"), None);
        assert_eq!(actual["distribution"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_entry_is_indented_two_tabs() {
        let entry = formatter(None).format(&DatasetRecord::new(json!({ "id": "foo" }))).unwrap();
        assert!(entry.starts_with("\t\t{\n\t\t\t\"@type\": \"dcat:Dataset\""));
        assert!(entry.ends_with("\n\t\t}"));
    }

    #[test]
    fn test_dependencies() {
        let deps = formatter(None).dependencies();
        for field in ["name", "created", "owner", "extent", "id", "url", "supportedExtensions"] {
            assert!(deps.iter().any(|d| d == field), "missing {}", field);
        }
        let unique: std::collections::HashSet<_> = deps.iter().collect();
        assert_eq!(unique.len(), deps.len());
    }
}
