//! DCAT Core - dataset formatting, distribution rules and streaming feed assembly.

pub mod catalog;
pub mod config;
pub mod distributions;
pub mod error;
pub mod feed;
pub mod formatter;
pub mod models;
pub mod template;
pub mod urls;

pub use catalog::{dcat_feed_stream, DcatVersion, DELIMITER, FOOTER};
pub use config::{
    default_config_path, load_customizations, load_feed_config, FeedConfig, FormatterConfig,
};
pub use distributions::{generate_distributions, DistributionKind, DISTRIBUTION_RULES};
pub use error::{DcatError, ErrorResponse};
pub use feed::FeedFormatterStream;
pub use formatter::{DatasetFormatter, DatasetTemplate, NON_EDITABLE_FIELDS};
pub use models::{DatasetRecord, DistributionDescriptor};
pub use template::{interpolate, list_dependencies, TemplateError, Transforms};
pub use urls::{ResolvedUrls, SiteUrls};
