//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::report::ReconReport;
use console::style;
use std::io::{self, Write};

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "───────────────────────────────────────────────────────────────";

/// Write the report in human-readable form.
pub fn write_plain<W: Write>(out: &mut W, report: &ReconReport) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(HEAVY_RULE).cyan())?;
    writeln!(
        out,
        "                    {} Scan Results",
        style("reconscan").cyan().bold()
    )?;
    writeln!(out, "{}", style(HEAVY_RULE).cyan())?;
    writeln!(out)?;

    writeln!(out, "  {} {}", style("Target:").bold(), report.target)?;
    writeln!(out, "  {} {}", style("IP Address:").bold(), report.resolved_ip)?;
    writeln!(
        out,
        "  {} {}",
        style("Report ID:").bold(),
        style(report.id.short()).dim()
    )?;
    writeln!(out)?;

    writeln!(
        out,
        "  {} {} ports scanned in {:.2}s",
        style("Statistics:").bold(),
        report.ports_scanned,
        report.duration_ms as f64 / 1000.0
    )?;
    writeln!(
        out,
        "               {} open, {} not open ({} closed, {} timed out, {} errors)",
        style(report.tally.open).green().bold(),
        style(report.tally.not_open()).red(),
        report.tally.closed,
        style(report.tally.timed_out).yellow(),
        style(report.tally.errored).dim()
    )?;
    writeln!(out)?;

    if report.open_ports.is_empty() {
        writeln!(out, "  {}", style("No open ports found.").dim())?;
    } else {
        writeln!(out, "  {}", style(LIGHT_RULE).dim())?;
        writeln!(out, "  {:>6}  {}", style("PORT").bold(), style("BANNER").bold())?;
        writeln!(out, "  {}", style(LIGHT_RULE).dim())?;

        for port in &report.open_ports {
            let banner = report
                .banners
                .get(port)
                .map(|b| truncate_string(b, 52))
                .unwrap_or_default();
            writeln!(
                out,
                "  {:>6}  {}",
                style(port).green(),
                style(banner).dim()
            )?;
        }

        writeln!(out, "  {}", style(LIGHT_RULE).dim())?;
    }

    writeln!(out)?;
    writeln!(out, "{}", style(HEAVY_RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: &str, ip: &str, ports: usize, concurrency: usize) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("reconscan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Target: {} ({})",
        style("•").dim(),
        style(target).white().bold(),
        ip
    );
    println!(
        "{} Scanning {} ports, {} at a time...",
        style("•").dim(),
        style(ports).white().bold(),
        concurrency
    );
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate to at most `max_len` characters, adding an ellipsis if cut.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{ProbeTally, ScanResult};
    use crate::types::ScanTarget;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn report(open_ports: Vec<u16>) -> ReconReport {
        let scan = ScanResult {
            target: ScanTarget::new("example.com", "93.184.216.34".parse().unwrap()),
            open_ports,
            tally: ProbeTally::default(),
            duration: Duration::from_millis(2500),
        };
        ReconReport::from_scan(&scan, Utc::now())
    }

    fn render(report: &ReconReport) -> String {
        let mut buf = Vec::new();
        write_plain(&mut buf, report).unwrap();
        console::strip_ansi_codes(&String::from_utf8(buf).unwrap()).to_string()
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
    }

    #[test]
    fn test_plain_lists_ports_and_banners() {
        let mut banners = BTreeMap::new();
        banners.insert(80, "HTTP Banner: nginx".to_string());
        let text = render(&report(vec![22, 80]).with_banners(banners));

        assert!(text.contains("Target: example.com"));
        assert!(text.contains("IP Address: 93.184.216.34"));
        assert!(text.contains("2.50s"));
        assert!(text.contains("0 open, 0 not open (0 closed, 0 timed out, 0 errors)"));
        assert!(text.contains("80  HTTP Banner: nginx"));
        assert!(text.contains("    22  "));
    }

    #[test]
    fn test_plain_no_open_ports() {
        let text = render(&report(Vec::new()));
        assert!(text.contains("No open ports found."));
    }
}
