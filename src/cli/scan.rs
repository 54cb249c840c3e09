//! The scan command: resolve, sweep, grab banners, print, save.

use crate::banner::BannerGrabber;
use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::error::{CliResult, ScanError};
use crate::logging::Verbosity;
use crate::output;
use crate::report::{ReconReport, ReportFormat, ReportWriter};
use crate::scanner::{ScanOptions, Scanner};
use crate::types::{host_from_input, TargetSpec};
use chrono::Utc;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Scan a target for open ports.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Target URL or host (e.g. http://example.com, example.com, 10.0.0.1)
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Ports to scan (e.g. "80", "80,443", "1-1000", "22,80,8000-9000") [default: 1-65535]
    #[arg(short, long, env = "RECONSCAN_PORTS")]
    pub ports: Option<String>,

    /// Maximum number of simultaneous connection attempts [default: 1000]
    #[arg(short = 'c', long, env = "RECONSCAN_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Per-port connect timeout in milliseconds [default: 500]
    #[arg(short = 't', long, env = "RECONSCAN_TIMEOUT_MS")]
    pub timeout: Option<u64>,

    /// Grab banners from open ports after the scan
    #[arg(short = 'b', long)]
    pub banner: bool,

    /// Per-port banner timeout in milliseconds [default: 5000]
    #[arg(long, value_name = "MS")]
    pub banner_timeout: Option<u64>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    pub output: OutputFormat,

    /// Abort the scan after this many seconds
    #[arg(long, value_name = "SECS")]
    pub max_time: Option<u64>,

    /// Directory for saved reports
    #[arg(long, value_name = "DIR", env = "RECONSCAN_REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    /// Don't save a report
    #[arg(long)]
    pub no_report: bool,
}

impl ScanCommand {
    /// Apply command-line overrides on top of loaded settings.
    pub fn merge_settings(&self, mut settings: Settings) -> Settings {
        if let Some(ports) = &self.ports {
            settings.ports = ports.clone();
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency_limit = concurrency;
        }
        if let Some(timeout) = self.timeout {
            settings.probe_timeout_ms = timeout;
        }
        if let Some(timeout) = self.banner_timeout {
            settings.banner_timeout_ms = timeout;
        }
        if let Some(dir) = &self.report_dir {
            settings.report_dir = Some(dir.clone());
        }
        if self.no_report {
            settings.save_reports = false;
        }
        settings
    }

    /// Execute the scan command.
    pub async fn execute(&self, settings: Settings, verbosity: Verbosity) -> CliResult<()> {
        let settings = self.merge_settings(settings);
        let options = settings.scan_options()?;
        let candidates = settings.port_spec()?.candidates();
        let chatty = verbosity != Verbosity::Quiet && self.output == OutputFormat::Plain;

        let cancel = CancellationToken::new();
        let watchers = spawn_cancel_watchers(&cancel, self.max_time.map(Duration::from_secs));
        let outcome = self
            .run(&settings, options, &candidates, verbosity, chatty, &cancel)
            .await;
        for watcher in watchers {
            watcher.abort();
        }
        let report = outcome?;

        output::print_results(&report, self.output)?;

        if settings.save_reports {
            let writer = ReportWriter::new(settings.resolve_report_dir()?);
            for format in ReportFormat::ALL {
                let path = writer.save(&report, format)?;
                if chatty {
                    output::print_success(&format!("Report saved to {}", path.display()));
                }
            }
        }

        Ok(())
    }

    async fn run(
        &self,
        settings: &Settings,
        options: ScanOptions,
        candidates: &[u16],
        verbosity: Verbosity,
        chatty: bool,
        cancel: &CancellationToken,
    ) -> CliResult<ReconReport> {
        let target = TargetSpec::parse(host_from_input(&self.target))
            .map_err(ScanError::from)?
            .resolve_until(cancel)
            .await?;

        let mut scanner = Scanner::new(options);
        if chatty {
            output::print_scan_header(
                &target.original,
                &target.ip.to_string(),
                candidates.len(),
                scanner.options().concurrency_limit,
            );
        }

        let progress = (verbosity == Verbosity::Verbose && chatty)
            .then(|| progress_bar(candidates.len() as u64));
        if let Some(pb) = &progress {
            scanner = scanner.with_progress(pb.clone());
        }

        let started_at = Utc::now();
        let scanned = scanner
            .scan_target(&target, candidates, cancel.clone())
            .await;
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        let scanned = scanned?;

        let banners = if !self.banner {
            BTreeMap::new()
        } else if scanned.is_empty() {
            warn!(host = %scanned.target, "banner grabbing skipped: no open ports found");
            if chatty {
                output::print_warning("Skipping banner grabbing (no open ports found).");
            }
            BTreeMap::new()
        } else {
            info!(host = %scanned.target, ports = scanned.open_ports.len(), "grabbing banners");
            if chatty {
                output::print_info(&format!(
                    "Grabbing banners from {} open ports...",
                    scanned.open_ports.len()
                ));
            }
            let grabber = BannerGrabber::new(settings.banner_timeout())?;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(host = %scanned.target, "banner grabbing cancelled");
                    return Err(ScanError::Cancelled.into());
                }
                banners = grabber.grab_all(&scanned.target, &scanned.open_ports) => banners,
            }
        };

        Ok(ReconReport::from_scan(&scanned, started_at).with_banners(banners))
    }
}

/// Cancel on Ctrl-C, and after `max_time` if given. A second Ctrl-C exits
/// immediately.
fn spawn_cancel_watchers(
    cancel: &CancellationToken,
    max_time: Option<Duration>,
) -> Vec<JoinHandle<()>> {
    let mut watchers = Vec::with_capacity(2);

    let token = cancel.clone();
    watchers.push(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupted, cancelling scan");
        token.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted again, exiting");
            std::process::exit(130);
        }
    }));

    if let Some(limit) = max_time {
        let token = cancel.clone();
        watchers.push(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            warn!(limit_secs = limit.as_secs(), "time limit reached, cancelling scan");
            token.cancel();
        }));
    }

    watchers
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .map(|style| style.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
