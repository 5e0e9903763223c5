use serde::Serialize;
use thiserror::Error;

/// Message sent to clients for errors that are not their fault.
pub const GENERIC_ERROR_MESSAGE: &str = "Encountered error while processing request";

/// Application-wide error types.
///
/// This enum represents every failure that can surface while building a DCAT feed.
/// Errors fall into two groups: client errors (4xx), caused by the template or the
/// records a caller supplied, and internal errors (5xx).
///
/// # Error Conversion
///
/// Library errors convert automatically through `#[from]`:
/// - `serde_json::Error` → `DcatError::SerializationError`
/// - `std::io::Error` → `DcatError::Io`
/// - `toml::de::Error` → `DcatError::ConfigParse`
///
/// # Examples
///
/// ```
/// use dcat_core::error::DcatError;
///
/// let err = DcatError::TemplateResolution("unknown transform".to_string());
/// assert_eq!(err.status_code(), 400);
/// assert_eq!(err.to_response().error, "unknown transform");
/// ```
#[derive(Error, Debug)]
pub enum DcatError {
    /// The dataset template could not be interpolated against a record.
    ///
    /// Most commonly raised when a placeholder names a transform that is not
    /// registered. Carries the interpolator's message verbatim.
    #[error("{0}")]
    TemplateResolution(String),

    /// A template or customization document has the wrong shape.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// A dataset record pulled from the source is not usable (not a JSON object).
    #[error("Invalid dataset record: {0}")]
    InvalidRecord(String),

    /// The upstream record source failed after streaming began.
    #[error("Record stream failed: {0}")]
    StreamTransport(String),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Reading or writing the feed failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML or has unexpected fields.
    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

/// JSON body returned to clients when a feed request fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl DcatError {
    /// Returns the HTTP-equivalent status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            DcatError::TemplateResolution(_)
            | DcatError::InvalidTemplate(_)
            | DcatError::InvalidRecord(_) => 400,
            _ => 500,
        }
    }

    /// Returns true if the caller caused this error.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Builds the `{ "error": ... }` body for this error.
    ///
    /// Client errors keep their literal message so template authors can fix
    /// them. Internal errors are reported with a generic message.
    pub fn to_response(&self) -> ErrorResponse {
        let error = if self.is_client_error() {
            self.to_string()
        } else {
            GENERIC_ERROR_MESSAGE.to_string()
        };
        ErrorResponse { error }
    }

    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            DcatError::TemplateResolution(msg) => {
                format!(
                    "Template error: {}\n   Check the placeholders and transform names in your customizations.",
                    msg
                )
            }
            DcatError::StreamTransport(msg) => {
                format!(
                    "The record source failed mid-feed: {}\n   The feed document is incomplete.",
                    msg
                )
            }
            DcatError::InvalidUrl(url) => {
                format!(
                    "Invalid site URL: {}\n   Example: https://my-site.hub.arcgis.com",
                    url
                )
            }
            DcatError::ConfigParse(e) => {
                format!("Invalid configuration file: {}\n   Check feed.toml syntax.", e)
            }
            _ => self.to_string(),
        }
    }
}
