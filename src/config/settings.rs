//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration and saved reports.

use crate::banner::BANNER_TIMEOUT;
use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{ScanOptions, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_PROBE_TIMEOUT};
use crate::types::PortSpec;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/reconscan)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/reconscan)
    pub data_dir: PathBuf,
}

impl Paths {
    /// Locate the per-user directories. Nothing is created here.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "reconscan", "reconscan")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
            data_dir: project.data_dir().to_path_buf(),
        })
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum simultaneous connection attempts.
    pub concurrency_limit: usize,
    /// Per-probe connect timeout in milliseconds.
    pub probe_timeout_ms: u64,
    /// Default port specification.
    pub ports: String,
    /// Per-port banner grabbing timeout in milliseconds.
    pub banner_timeout_ms: u64,
    /// Write a report after every scan.
    pub save_reports: bool,
    /// Where reports go; defaults to the XDG data directory.
    pub report_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            ports: PortSpec::full().to_string(),
            banner_timeout_ms: BANNER_TIMEOUT.as_millis() as u64,
            save_reports: true,
            report_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `path` if given, else from the default location.
    ///
    /// A missing default file means defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let file = match Paths::discover() {
                    Ok(paths) => paths.settings_file(),
                    Err(e) => {
                        debug!(error = %e, "no config directory, using defaults");
                        return Ok(Self::default());
                    }
                };
                if file.exists() {
                    Self::load_from(&file)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Scanner options derived from these settings.
    pub fn scan_options(&self) -> ConfigResult<ScanOptions> {
        let options = ScanOptions::new()
            .with_concurrency_limit(self.concurrency_limit)
            .with_timeout(Duration::from_millis(self.probe_timeout_ms));
        options
            .validate()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        Ok(options)
    }

    pub fn port_spec(&self) -> ConfigResult<PortSpec> {
        self.ports
            .parse()
            .map_err(|e: crate::types::PortError| ConfigError::InvalidValue(e.to_string()))
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }

    /// Report directory: configured, else the XDG default.
    pub fn resolve_report_dir(&self) -> ConfigResult<PathBuf> {
        match &self.report_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Paths::discover()?.reports_dir()),
        }
    }
}
