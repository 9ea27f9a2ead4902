//! Configuration file handling.
//!
//! Settings come from `branch_report.toml` (or the file given with
//! `--config`) and are then overridden by explicit command-line flags.

use crate::cli::Args;
use crate::loader::LoaderOptions;
use crate::views::ViewOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "branch_report.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

/// Where the two datasets live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Transaction log, path or URL.
    #[serde(default = "default_transactions")]
    pub transactions: String,

    /// SME loan log, path or URL.
    #[serde(default = "default_sme")]
    pub sme: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            transactions: default_transactions(),
            sme: default_sme(),
        }
    }
}

fn default_transactions() -> String {
    "synthetic_jwaneng_prepared.csv".to_string()
}

fn default_sme() -> String {
    "sme_jwaneng.csv".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the CSV and JSON outputs are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,

    /// Rows shown per table preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            histogram_bins: default_histogram_bins(),
            preview_rows: default_preview_rows(),
        }
    }
}

fn default_output_dir() -> String {
    "reports".to_string()
}

fn default_histogram_bins() -> usize {
    20
}

fn default_preview_rows() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for fetching URL sources.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the file named on the command line, else `branch_report.toml`
    /// when it exists, else the defaults.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.merge_with_args(args);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.report.histogram_bins == 0 {
            bail!("report.histogram_bins must be at least 1");
        }
        Ok(())
    }

    /// Command-line flags take precedence over file settings.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref t) = args.transactions {
            self.sources.transactions = t.clone();
        }
        if let Some(ref s) = args.sme {
            self.sources.sme = s.clone();
        }
        if let Some(ref dir) = args.output_dir {
            self.report.output_dir = dir.clone();
        }
        if let Some(bins) = args.bins {
            self.report.histogram_bins = bins;
        }
    }

    pub fn view_options(&self) -> ViewOptions {
        let defaults = ViewOptions::default();
        ViewOptions {
            histogram_bins: NonZeroUsize::new(self.report.histogram_bins)
                .unwrap_or(defaults.histogram_bins),
            ..defaults
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            http_timeout: Duration::from_secs(self.http.timeout_seconds),
        }
    }

    /// Default configuration as TOML, for `--init-config`.
    pub fn default_toml() -> String {
        let body = toml::to_string_pretty(&Config::default()).unwrap_or_default();
        format!(
            "# branch_report configuration\n# Command-line flags override these values.\n\n{}",
            body
        )
    }
}
