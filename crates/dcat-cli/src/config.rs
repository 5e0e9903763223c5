use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use dcat_core::{DcatError, DcatVersion, FeedConfig, FormatterConfig};

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "dcat")]
#[command(
    author,
    version,
    about = "Stream DCAT-US catalog feeds from geospatial dataset records"
)]
#[command(after_help = "Examples:
  dcat feed records.ndjson --site-url https://my-site.hub.arcgis.com > catalog.json
  cat records.ndjson | dcat feed --dcat-version 3.0 --customizations custom.json
  dcat template --customizations custom.json
  dcat dependencies")]
pub struct Config {
    /// Public URL of the site the feed describes
    #[arg(long, env = "DCAT_SITE_URL", global = true)]
    pub site_url: Option<String>,

    /// DCAT-US version of the generated feed
    #[arg(long, env = "DCAT_VERSION", value_enum, global = true)]
    pub dcat_version: Option<VersionArg>,

    /// Custom path to the feed.toml configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log every formatted record
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream a DCAT feed built from newline-delimited JSON records
    #[command(after_help = "Examples:
  dcat feed records.ndjson                       # Read records from a file
  dcat feed - < records.ndjson                   # Read records from stdin
  dcat feed records.ndjson -t custom.json        # Apply a customization template")]
    Feed {
        /// NDJSON file with one dataset record per line, `-` for stdin
        #[arg(value_name = "RECORDS", default_value = "-")]
        records: PathBuf,

        /// JSON customization template merged onto the base template
        #[arg(short = 't', long, value_name = "PATH")]
        customizations: Option<PathBuf>,
    },
    /// Print the merged dataset template
    Template {
        /// JSON customization template merged onto the base template
        #[arg(short = 't', long, value_name = "PATH")]
        customizations: Option<PathBuf>,
    },
    /// Print the comma-separated record fields the feed reads
    Dependencies {
        /// JSON customization template merged onto the base template
        #[arg(short = 't', long, value_name = "PATH")]
        customizations: Option<PathBuf>,
    },
}

/// Supported DCAT-US versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VersionArg {
    /// DCAT-US 1.1 (Project Open Data)
    #[value(name = "1.1")]
    V1_1,
    /// DCAT-US 3.0 (JSON-LD context)
    #[value(name = "3.0")]
    V3_0,
}

impl From<VersionArg> for DcatVersion {
    fn from(arg: VersionArg) -> Self {
        match arg {
            VersionArg::V1_1 => DcatVersion::V1_1,
            VersionArg::V3_0 => DcatVersion::V3_0,
        }
    }
}

/// Settings for one feed run, after flags, environment and file are layered.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub formatter: FormatterConfig,
    pub customizations: Option<PathBuf>,
}

impl Config {
    /// Layers flags and environment over the configuration file.
    ///
    /// # Errors
    ///
    /// Returns `DcatError::Config` if no site URL is configured anywhere.
    pub fn feed_settings(
        &self,
        file: Option<FeedConfig>,
        customizations: Option<PathBuf>,
    ) -> Result<FeedSettings, DcatError> {
        let (mut formatter, file_customizations) = match file {
            Some(file) => (file.formatter_config(), file.customizations),
            None => {
                let site_url = self.site_url.clone().ok_or_else(|| {
                    DcatError::Config(
                        "no site URL: pass --site-url, set DCAT_SITE_URL or add site_url to feed.toml"
                            .to_string(),
                    )
                })?;
                (FormatterConfig::new(site_url), None)
            }
        };

        if let Some(site_url) = &self.site_url {
            formatter.site_url = site_url.clone();
        }
        if let Some(version) = self.dcat_version {
            formatter.version = DcatVersion::from(version);
        }

        Ok(FeedSettings {
            formatter,
            customizations: customizations.or(file_customizations),
        })
    }
}
