use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use dcat_core::{
    dcat_feed_stream, load_customizations, load_feed_config, DatasetFormatter, DatasetTemplate,
    DcatError,
};
use dcat_feed::{open_records, Command, Config};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::parse();

    // Setup logging (stderr to keep stdout clean for the feed)
    let level = if config.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    match &config.command {
        Command::Feed {
            records,
            customizations,
        } => {
            if let Err(err) = run_feed(&config, records, customizations.clone()).await {
                error!("{}", err.user_message());
                eprintln!("{}", serde_json::to_string(&err.to_response())?);
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Template { customizations } => {
            let template = template_for(&config, customizations.clone())
                .context("Failed to build dataset template")?;
            println!("{}", serde_json::to_string_pretty(template.as_value())?);
        }
        Command::Dependencies { customizations } => {
            let template = template_for(&config, customizations.clone())
                .context("Failed to build dataset template")?;
            println!("{}", template.dependencies().join(","));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Loads configuration, builds the formatter and streams the feed
async fn run_feed(
    config: &Config,
    records: &Path,
    customizations: Option<PathBuf>,
) -> Result<(), DcatError> {
    let feed_config = load_feed_config(config.config.as_deref())?;
    let settings = config.feed_settings(feed_config, customizations)?;
    let template = load_template(settings.customizations.as_deref())?;
    let formatter = settings.formatter.build(template)?;
    write_feed(records, formatter).await
}

/// Builds the template for the `template` and `dependencies` commands
fn template_for(
    config: &Config,
    customizations: Option<PathBuf>,
) -> Result<DatasetTemplate, DcatError> {
    let customizations = match customizations {
        Some(path) => Some(path),
        None => load_feed_config(config.config.as_deref())?.and_then(|f| f.customizations),
    };
    load_template(customizations.as_deref())
}

/// Builds the dataset template, merging customizations when a path is given
fn load_template(customizations: Option<&Path>) -> Result<DatasetTemplate, DcatError> {
    let customizations = customizations.map(load_customizations).transpose()?;
    DatasetTemplate::build(customizations.as_ref())
}

/// Streams the feed for `records` to stdout, one chunk at a time
async fn write_feed(records: &Path, formatter: DatasetFormatter) -> Result<(), DcatError> {
    let version = formatter.version();
    info!("Writing DCAT-US {} feed from {}", version, records.display());

    let records = open_records(records).await?;
    let mut feed = dcat_feed_stream(records, formatter);
    let mut stdout = tokio::io::stdout();

    while let Some(chunk) = feed.next().await {
        stdout.write_all(chunk?.as_bytes()).await?;
    }
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    Ok(())
}
