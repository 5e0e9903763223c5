use serde::Serialize;
use serde_json::Value;

use crate::template::is_unresolved;

/// Largest CSV item (in bytes) that is served through the download proxy.
pub const MAX_PROXIED_CSV_SIZE: i64 = 5_000_000;

/// Path of operator-supplied download links inside the ISO metadata tree.
pub const METADATA_ONLINE_SOURCES_PATH: &str = "metadata.metadata.distInfo.distTranOps.onLineSrc";

const DISTRIBUTION_TYPE: &str = "dcat:Distribution";

/// Looks up a dotted path (`server.spatialReference.wkid`) in a JSON value.
///
/// Numeric segments index into arrays.
pub fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// JavaScript-style truthiness, used where the catalog's loose attributes
/// are tested for "set or not".
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One dataset record as returned by the content catalog.
///
/// Records are sparse and loosely typed, so the raw JSON is kept and the
/// attributes the feed needs are read through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    data: Value,
}

impl DatasetRecord {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    pub fn as_value(&self) -> &Value {
        &self.data
    }

    pub fn into_value(self) -> Value {
        self.data
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.data, path)
    }

    /// Returns the string at `path`, treating empty strings as absent.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn slug(&self) -> Option<&str> {
        self.get_str("slug")
    }

    /// Slug when present, else id. Used to build site URLs.
    pub fn site_key(&self) -> Option<&str> {
        self.slug().or_else(|| self.id())
    }

    /// Service URL of the record, if any.
    pub fn url(&self) -> Option<&str> {
        self.get_str("url")
    }

    /// True when the id carries a layer index (`<itemId>_<n>`).
    pub fn is_layer(&self) -> bool {
        self.id().is_some_and(|id| id.contains('_'))
    }

    /// True when the layer reports a geometry type.
    pub fn has_geometry_type(&self) -> bool {
        self.get("layer.geometryType").is_some_and(is_truthy)
    }

    /// True for public CSV items small enough to be served by the proxy.
    pub fn is_proxied_csv(&self) -> bool {
        let is_public = self.get_str("access") == Some("public");
        let is_csv = self.get_str("type") == Some("CSV");
        let within_size = self
            .get("size")
            .and_then(Value::as_i64)
            .is_some_and(|size| (0..=MAX_PROXIED_CSV_SIZE).contains(&size));
        is_public && is_csv && within_size
    }

    /// True for site pages, which get a default keyword when untagged.
    pub fn is_page(&self) -> bool {
        let page_type = matches!(self.get_str("type"), Some("Hub Page" | "Site Page"));
        let page_keyword = self
            .get("typeKeywords")
            .and_then(Value::as_array)
            .is_some_and(|keywords| keywords.iter().any(|k| k.as_str() == Some("hubPage")));
        page_type || page_keyword
    }

    /// True when `tags` holds at least one usable tag.
    pub fn has_tags(&self) -> bool {
        match self.get("tags") {
            Some(Value::Array(tags)) => match tags.first() {
                None => false,
                Some(Value::String(first)) => {
                    !first.is_empty() && !is_unresolved(first)
                }
                Some(_) => true,
            },
            Some(Value::String(tags)) => !tags.is_empty() && !is_unresolved(tags),
            Some(other) => is_truthy(other),
            None => false,
        }
    }

    /// Case-sensitive check against the comma-joined `supportedExtensions`.
    pub fn supports_extension(&self, extension: &str) -> bool {
        match self.get("supportedExtensions") {
            Some(Value::String(joined)) => joined.contains(extension),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(",")
                .contains(extension),
            _ => false,
        }
    }
}

impl From<Value> for DatasetRecord {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

/// One generated DCAT distribution.
///
/// `access_url` and `description` are tri-state: the outer `None` omits the
/// key, `Some(None)` writes `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionDescriptor {
    #[serde(rename = "@type")]
    pub kind: &'static str,
    pub title: Option<String>,
    pub format: Option<String>,
    #[serde(rename = "mediaType", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(rename = "accessURL", skip_serializing_if = "Option::is_none")]
    pub access_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl DistributionDescriptor {
    /// Builds a rule-generated distribution. A missing URL omits `accessURL`.
    pub fn new(title: &str, format: &str, media_type: &str, access_url: Option<String>) -> Self {
        Self {
            kind: DISTRIBUTION_TYPE,
            title: Some(title.to_string()),
            format: Some(format.to_string()),
            media_type: Some(media_type.to_string()),
            access_url: access_url.map(Some),
            description: None,
        }
    }

    /// Builds a distribution from one ISO metadata `onLineSrc` entry. Missing
    /// fields are written as `null`.
    pub fn from_online_source(source: &Value) -> Self {
        let field = |name: &str| {
            source
                .get(name)
                .filter(|v| is_truthy(v))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        };

        Self {
            kind: DISTRIBUTION_TYPE,
            title: field("orName"),
            format: field("protocol"),
            media_type: None,
            access_url: Some(field("linkage")),
            description: Some(field("orDesc")),
        }
    }
}
