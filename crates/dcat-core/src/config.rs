//! Configuration types for feed generation.
//!
//! A feed is configured in layers: in-code defaults, then an optional
//! `feed.toml`, then environment variables and command-line flags applied by
//! the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::DcatVersion;
use crate::error::DcatError;
use crate::formatter::{DatasetFormatter, DatasetTemplate, NON_EDITABLE_FIELDS};
use crate::template::Transforms;
use crate::urls::SiteUrls;

/// Returns the default location of the feed configuration file.
///
/// `<config dir>/dcat-feed/feed.toml`, e.g. `~/.config/dcat-feed/feed.toml`
/// on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dcat-feed").join("feed.toml"))
}

/// Contents of `feed.toml`.
///
/// ```toml
/// site_url = "https://my-site.hub.arcgis.com"
/// version = "3.0"
/// customizations = "customizations.json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub site_url: String,
    #[serde(default)]
    pub version: DcatVersion,
    /// Path to a JSON customization template.
    #[serde(default)]
    pub customizations: Option<PathBuf>,
    /// Replaces the default list of non-editable output paths.
    #[serde(default)]
    pub non_editable_fields: Option<Vec<String>>,
}

impl FeedConfig {
    /// Checks values that TOML parsing alone does not.
    pub fn validate(&self) -> Result<(), DcatError> {
        SiteUrls::new(&self.site_url)?;
        Ok(())
    }

    pub fn formatter_config(&self) -> FormatterConfig {
        let mut config = FormatterConfig::new(&self.site_url).with_version(self.version);
        if let Some(fields) = &self.non_editable_fields {
            config.non_editable_fields = fields.clone();
        }
        config
    }
}

/// Loads the feed configuration.
///
/// With `path` set the file must exist. Without it the default location is
/// tried and a missing file yields `Ok(None)`.
///
/// # Errors
///
/// Returns `DcatError::Config` if an explicit path does not exist,
/// `DcatError::ConfigParse` if the file is not valid TOML, and
/// `DcatError::InvalidUrl` if `site_url` is not an absolute URL.
pub fn load_feed_config(path: Option<&Path>) -> Result<Option<FeedConfig>, DcatError> {
    let path = match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(DcatError::Config(format!(
                    "configuration file not found: {}",
                    explicit.display()
                )));
            }
            explicit.to_path_buf()
        }
        None => match default_config_path() {
            Some(default) if default.exists() => default,
            _ => return Ok(None),
        },
    };

    let content = fs::read_to_string(&path)?;
    let config: FeedConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(Some(config))
}

/// Reads a JSON customization template from disk.
pub fn load_customizations(path: &Path) -> Result<Value, DcatError> {
    let content = fs::read_to_string(path)?;
    let customizations: Value = serde_json::from_str(&content)?;
    if !customizations.is_object() && !customizations.is_null() {
        return Err(DcatError::InvalidTemplate(format!(
            "{} does not contain a JSON object",
            path.display()
        )));
    }
    Ok(customizations)
}

/// Everything the dataset formatter needs besides the template.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    pub site_url: String,
    pub version: DcatVersion,
    pub transforms: Transforms,
    pub non_editable_fields: Vec<String>,
}

impl FormatterConfig {
    /// Defaults for `site_url`: DCAT-US 1.1, built-in transforms and the
    /// standard non-editable fields.
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            version: DcatVersion::default(),
            transforms: Transforms::with_defaults(),
            non_editable_fields: NON_EDITABLE_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn with_version(mut self, version: DcatVersion) -> Self {
        self.version = version;
        self
    }

    /// Builds the formatter for `template`.
    ///
    /// # Errors
    ///
    /// Returns `DcatError::InvalidUrl` if the site URL is not absolute.
    pub fn build(self, template: DatasetTemplate) -> Result<DatasetFormatter, DcatError> {
        let site = SiteUrls::new(&self.site_url)?;
        Ok(DatasetFormatter::new(site, template)
            .with_transforms(self.transforms)
            .with_non_editable_fields(self.non_editable_fields)
            .with_version(self.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_formatter_config_defaults() {
        let config = FormatterConfig::new("https://foobar.hub.arcgis.com");
        assert_eq!(config.version, DcatVersion::V1_1);
        assert!(config.transforms.contains("toISO"));
        assert!(config.transforms.contains("toArray"));
        assert_eq!(
            config.non_editable_fields,
            vec!["@type", "identifier", "landingPage", "webService", "contactPoint.@type", "spatial"]
        );
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
site_url = "https://foobar.hub.arcgis.com"
version = "3.0"
customizations = "custom.json"
non_editable_fields = ["@type", "identifier"]
"#,
        );

        let config = load_feed_config(Some(file.path())).unwrap().unwrap();
        assert_eq!(config.site_url, "https://foobar.hub.arcgis.com");
        assert_eq!(config.version, DcatVersion::V3_0);
        assert_eq!(config.customizations, Some(PathBuf::from("custom.json")));

        let formatter_config = config.formatter_config();
        assert_eq!(formatter_config.version, DcatVersion::V3_0);
        assert_eq!(formatter_config.non_editable_fields, vec!["@type", "identifier"]);
    }

    #[test]
    fn test_version_defaults_to_1_1() {
        let file = write_config(r#"site_url = "https://foobar.hub.arcgis.com""#);
        let config = load_feed_config(Some(file.path())).unwrap().unwrap();
        assert_eq!(config.version, DcatVersion::V1_1);
        assert_eq!(config.customizations, None);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = load_feed_config(Some(Path::new("/nonexistent/dcat-feed/feed.toml")));
        assert!(matches!(result, Err(DcatError::Config(_))));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let file = write_config("site_url = [unterminated");
        let result = load_feed_config(Some(file.path()));
        assert!(matches!(result, Err(DcatError::ConfigParse(_))));
    }

    #[test]
    fn test_unknown_version_is_an_error() {
        let file = write_config("site_url = \"https://foobar.hub.arcgis.com\"\nversion = \"2.0\"");
        assert!(matches!(load_feed_config(Some(file.path())), Err(DcatError::ConfigParse(_))));
    }

    #[test]
    fn test_invalid_site_url_is_rejected() {
        let file = write_config(r#"site_url = "not a url""#);
        assert!(matches!(load_feed_config(Some(file.path())), Err(DcatError::InvalidUrl(_))));
    }

    #[test]
    fn test_default_config_path_layout() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("dcat-feed/feed.toml"));
        }
    }

    #[test]
    fn test_load_customizations() {
        let file = write_config(r#"{ "title": "{{name}}" }"#);
        let customizations = load_customizations(file.path()).unwrap();
        assert_eq!(customizations["title"], "{{name}}");

        let file = write_config(r#"["not", "an", "object"]"#);
        assert!(matches!(load_customizations(file.path()), Err(DcatError::InvalidTemplate(_))));
    }

    #[test]
    fn test_build_formatter() {
        let formatter = FormatterConfig::new("https://foobar.hub.arcgis.com")
            .with_version(DcatVersion::V3_0)
            .build(DatasetTemplate::default())
            .unwrap();
        assert_eq!(formatter.version(), DcatVersion::V3_0);

        let result = FormatterConfig::new("nope").build(DatasetTemplate::default());
        assert!(matches!(result, Err(DcatError::InvalidUrl(_))));
    }
}
