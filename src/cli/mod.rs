//! Command-line interface.
//!
//! `reconscan <TARGET>` sweeps the target's TCP ports, optionally grabs
//! banners from the open ones, prints the result and saves a report.

mod scan;

pub use scan::ScanCommand;

use crate::config::Settings;
use crate::error::{CliError, CliResult, ScanError};
use crate::logging::Verbosity;
use clap::Parser;
use std::path::PathBuf;

/// reconscan - concurrent TCP port sweeper.
///
/// Probes every requested port of a single host with bounded concurrency,
/// then reports which ones accepted a connection.
#[derive(Parser, Debug)]
#[command(name = "reconscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A fast, bounded TCP port sweeper", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub scan: ScanCommand,

    /// Enable verbose output (progress bar, debug logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a JSON settings file
    #[arg(long, global = true, value_name = "PATH", env = "RECONSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also append log lines to this file
    #[arg(long, value_name = "PATH", env = "RECONSCAN_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// Load settings and run the scan.
    pub async fn run(&self) -> CliResult<()> {
        let settings = Settings::load(self.config.as_deref())?;
        self.scan.execute(settings, self.verbosity()).await
    }
}

impl CliError {
    /// Process exit code for this error; 130 mirrors an interrupted shell job.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Scan(ScanError::Cancelled) => 130,
            _ => 1,
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
