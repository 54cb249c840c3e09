//! Error types for reconscan.
//!
//! Uses `thiserror` for ergonomic error definitions. Only scan-level
//! validation and cancellation errors leave the scanner; per-probe failures
//! are [`ProbeError`]s that get folded into "not open".

use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Scan-level errors surfaced to the caller of [`crate::scanner::Scanner`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid port range: {0}")]
    InvalidRange(String),

    #[error("invalid scan options: {0}")]
    InvalidConfig(String),

    #[error("scan cancelled")]
    Cancelled,
}

impl From<TargetError> for ScanError {
    fn from(err: TargetError) -> Self {
        let target = match &err {
            TargetError::Empty => String::new(),
            TargetError::InvalidFormat(t)
            | TargetError::DnsResolutionFailed(t, _)
            | TargetError::NoAddressesFound(t) => t.clone(),
        };
        Self::InvalidTarget {
            target,
            reason: err.to_string(),
        }
    }
}

impl From<PortError> for ScanError {
    fn from(err: PortError) -> Self {
        Self::InvalidRange(err.to_string())
    }
}

/// Why a single probe did not find the port open.
///
/// Never returned from a scan; recorded in the probe tally and logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("connect timed out")]
    TimedOut,

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("probe panicked: {0}")]
    Panicked(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directories")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),
}

/// Banner grabber setup errors.
#[derive(Error, Debug)]
pub enum BannerError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Report persistence errors.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to create report directory {path}: {reason}")]
    DirectoryError { path: PathBuf, reason: String },

    #[error("failed to write report {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors at the command-line boundary.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Banner(#[from] BannerError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ReportResult<T> = Result<T, ReportError>;
pub type CliResult<T> = Result<T, CliError>;
