//! CSV output formatting.

use crate::report::ReconReport;
use std::io::{self, Write};

/// Write one `port,banner` row per open port.
pub fn write_csv<W: Write>(out: &mut W, report: &ReconReport) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["port", "banner"])?;
    for port in &report.open_ports {
        wtr.write_record([
            port.to_string().as_str(),
            report.banners.get(port).map_or("", String::as_str),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
