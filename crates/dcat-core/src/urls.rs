use url::Url;

use crate::error::DcatError;
use crate::models::DatasetRecord;

/// Site-level URLs needed to build each dataset's links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    site_url: String,
}

/// URLs computed for one dataset record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrls {
    /// Stable dataset identifier written to `identifier`.
    pub identifier: String,
    /// Public page for the dataset, written to `landingPage`.
    pub landing_page: String,
    /// Base of the derived-format download links (`{download_link}.csv`).
    pub download_link: String,
}

impl SiteUrls {
    /// Creates the resolver for a site.
    ///
    /// # Errors
    ///
    /// Returns `DcatError::InvalidUrl` if `site_url` is not an absolute URL.
    pub fn new(site_url: &str) -> Result<Self, DcatError> {
        Url::parse(site_url).map_err(|_| DcatError::InvalidUrl(site_url.to_string()))?;
        Ok(Self {
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Resolves the landing page and download base for a record.
    ///
    /// ```
    /// use dcat_core::urls::SiteUrls;
    /// use dcat_core::models::DatasetRecord;
    /// use serde_json::json;
    ///
    /// let site = SiteUrls::new("https://my-site.hub.arcgis.com/").unwrap();
    /// let urls = site.resolve(&DatasetRecord::new(json!({ "id": "abc", "slug": "city::trails" })));
    /// assert_eq!(urls.landing_page, "https://my-site.hub.arcgis.com/maps/city::trails");
    /// assert_eq!(urls.download_link, "https://my-site.hub.arcgis.com/datasets/city::trails");
    /// ```
    pub fn resolve(&self, record: &DatasetRecord) -> ResolvedUrls {
        let key = record.site_key().unwrap_or_default();
        let landing_page = format!("{}/maps/{}", self.site_url, key);
        ResolvedUrls {
            identifier: landing_page.clone(),
            landing_page,
            download_link: format!("{}/datasets/{}", self.site_url, key),
        }
    }
}
