//! Command-line interface argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Branch report - transaction and SME loan analytics
///
/// Loads a transaction log and an SME loan log (local files or http(s)
/// URLs), then renders the catalog of views as markdown previews and CSV
/// files. Without --report an interactive menu is shown.
///
/// Examples:
///   branch_report
///   branch_report --transactions data/tx.csv --sme data/sme.csv --report
///   branch_report --sme https://example.com/sme.csv
///   branch_report --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Transaction dataset (path or URL)
    #[arg(short, long, value_name = "SOURCE", env = "BRANCH_REPORT_TRANSACTIONS")]
    pub transactions: Option<String>,

    /// SME loan dataset (path or URL)
    #[arg(short, long, value_name = "SOURCE", env = "BRANCH_REPORT_SME")]
    pub sme: Option<String>,

    /// Configuration file (defaults to ./branch_report.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for CSV and JSON outputs
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Number of histogram bins
    #[arg(long, value_name = "COUNT")]
    pub bins: Option<usize>,

    /// Generate every report once and exit instead of showing the menu
    #[arg(long)]
    pub report: bool,

    /// Write a default configuration file and exit
    #[arg(long)]
    pub init_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bins == Some(0) {
            return Err("--bins must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
