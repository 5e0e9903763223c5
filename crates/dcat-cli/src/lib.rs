//! DCAT Feed CLI - Command-line driver for streaming DCAT-US feeds.
//!
//! This crate wires an NDJSON record source to the feed stream of `dcat-core`.

pub mod config;
pub mod source;

pub use config::{Command, Config, FeedSettings, VersionArg};
pub use source::{ndjson_records, open_records, RecordStream};
