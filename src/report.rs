//! Recon reports.
//!
//! A [`ReconReport`] gathers what one run found: the scan result plus any
//! banners. It renders to a sectioned text layout or a collapsible HTML page
//! and is saved as text, JSON or HTML under a report directory.

use crate::error::{ReportError, ReportResult};
use crate::scanner::{ProbeTally, ScanResult};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Unique identifier of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(Uuid);

impl ReportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell reports apart on screen.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything one run produced for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconReport {
    pub id: ReportId,
    /// Target as the user gave it.
    pub target: String,
    pub resolved_ip: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Distinct ports probed.
    pub ports_scanned: usize,
    pub open_ports: Vec<u16>,
    pub tally: ProbeTally,
    /// Banner per open port; empty when banner grabbing was skipped.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub banners: BTreeMap<u16, String>,
}

impl ReconReport {
    /// Build a report from a finished scan that started at `started_at`.
    pub fn from_scan(scan: &ScanResult, started_at: DateTime<Utc>) -> Self {
        Self {
            id: ReportId::new(),
            target: scan.target.original.clone(),
            resolved_ip: scan.target.ip.to_string(),
            started_at,
            completed_at: Utc::now(),
            duration_ms: scan.duration.as_millis() as u64,
            ports_scanned: scan.tally.probed,
            open_ports: scan.open_ports.clone(),
            tally: scan.tally,
            banners: BTreeMap::new(),
        }
    }

    pub fn with_banners(mut self, banners: BTreeMap<u16, String>) -> Self {
        self.banners = banners;
        self
    }

    fn timestamp(&self) -> String {
        self.completed_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    fn summary_line(&self) -> String {
        format!(
            "{} ports probed in {:.2}s: {} open, {} closed, {} timed out, {} errors",
            self.ports_scanned,
            self.duration_ms as f64 / 1000.0,
            self.tally.open,
            self.tally.closed,
            self.tally.timed_out,
            self.tally.errored,
        )
    }

    fn open_ports_section(&self) -> String {
        if self.open_ports.is_empty() {
            "No open ports or skipped.".to_string()
        } else {
            join_lines(self.open_ports.iter().map(ToString::to_string))
        }
    }

    fn banners_section(&self) -> String {
        if self.banners.is_empty() {
            "No banners or skipped.".to_string()
        } else {
            join_lines(
                self.banners
                    .iter()
                    .map(|(port, banner)| format!("Port {}: {}", port, banner)),
            )
        }
    }

    /// Render the sectioned plain-text report.
    pub fn render_text(&self) -> String {
        format!(
            "Target Domain: {target}\n\
             Resolved IP: {ip}\n\
             Timestamp: {timestamp}\n\
             Report ID: {id}\n\
             \n\
             [Port Scan]\n\
             {summary}\n\
             \n\
             [Open Ports]\n\
             {open_ports}\n\
             \n\
             [Banner Grabbing]\n\
             {banners}\n",
            target = self.target,
            ip = self.resolved_ip,
            timestamp = self.timestamp(),
            id = self.id,
            summary = self.summary_line(),
            open_ports = self.open_ports_section(),
            banners = self.banners_section(),
        )
    }

    /// Render a standalone HTML page: metadata, a bar chart of entries per
    /// section, and each section as a collapsible `<details>` block.
    pub fn render_html(&self) -> String {
        let sections = [
            ("Port Scan", self.summary_line()),
            ("Open Ports", self.open_ports_section()),
            ("Banner Grabbing", self.banners_section()),
        ];

        let blocks: String = sections
            .iter()
            .map(|(title, body)| {
                format!(
                    "\n<details>\n    <summary>{}</summary>\n    <pre>{}</pre>\n</details>\n",
                    title,
                    escape_html(body)
                )
            })
            .collect();

        let counts = format!("[{}, {}]", self.open_ports.len(), self.banners.len());

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Recon Report for {target}</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
    <style>
        body {{ font-family: 'Segoe UI', sans-serif; background-color: #f4f4f4; padding: 30px; }}
        .container {{ max-width: 950px; margin: auto; background: white; padding: 30px; border-radius: 10px; box-shadow: 0 0 10px rgba(0,0,0,0.1); }}
        .meta p {{ color: #555; }}
        details {{ margin-top: 20px; border: 1px solid #ccc; border-radius: 6px; padding: 10px; background-color: #f9f9f9; }}
        summary {{ font-weight: bold; cursor: pointer; }}
        pre {{ background: #f0f0f0; padding: 15px; white-space: pre-wrap; border-radius: 5px; }}
        .chart-box {{ margin-top: 20px; border: 1px solid #ddd; border-radius: 8px; padding: 15px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Reconnaissance Report</h1>
        <div class="meta">
            <p><b>Target Domain:</b> {target}</p>
            <p><b>Resolved IP:</b> {ip}</p>
            <p><b>Generated:</b> {timestamp}</p>
            <p><b>Report ID:</b> {id}</p>
        </div>
        <div class="chart-box">
            <h3>Summary</h3>
            <canvas id="chart" width="600" height="300"></canvas>
        </div>
{blocks}
    </div>
    <script>
new Chart(document.getElementById('chart').getContext('2d'), {{
    type: 'bar',
    data: {{
        labels: ['Open Ports', 'Banner Grabbing'],
        datasets: [{{ label: 'Entries', data: {counts}, backgroundColor: 'rgba(54, 162, 235, 0.6)' }}]
    }},
    options: {{ responsive: true, scales: {{ y: {{ beginAtZero: true, ticks: {{ precision: 0 }} }} }} }}
}});
    </script>
</body>
</html>
"#,
            target = escape_html(&self.target),
            ip = escape_html(&self.resolved_ip),
            timestamp = self.timestamp(),
            id = self.id,
            blocks = blocks,
            counts = counts,
        )
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn join_lines(lines: impl Iterator<Item = String>) -> String {
    lines.collect::<Vec<_>>().join("\n")
}

/// On-disk report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Html,
}

impl ReportFormat {
    /// Every format, in the order reports are written.
    pub const ALL: [ReportFormat; 3] = [Self::Text, Self::Json, Self::Html];
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

/// Writes reports into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `report` as `<target>_<YYYYmmdd_HHMMSS>_<id>.<ext>` and return the path.
    pub fn save(&self, report: &ReconReport, format: ReportFormat) -> ReportResult<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| ReportError::DirectoryError {
            path: self.dir.clone(),
            reason: e.to_string(),
        })?;

        let path = self.dir.join(file_name(report, format));
        let content = match format {
            ReportFormat::Text => report.render_text(),
            ReportFormat::Json => serde_json::to_string_pretty(report)?,
            ReportFormat::Html => report.render_html(),
        };

        fs::write(&path, content).map_err(|e| ReportError::WriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        info!(path = %path.display(), "report saved");
        Ok(path)
    }
}

fn file_name(report: &ReconReport, format: ReportFormat) -> String {
    let target: String = report
        .target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stamp = report
        .completed_at
        .with_timezone(&Local)
        .format("%Y%m%d_%H%M%S");
    format!(
        "{}_{}_{}.{}",
        target,
        stamp,
        report.id.short(),
        format.extension()
    )
}
