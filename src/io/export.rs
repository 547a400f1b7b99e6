//! CSV export for recorded energy samples.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::EnergySample;

/// Column header for CSV sample export.
const HEADER: &str = "time_s,node,kind,voltage_v,remaining_j,remaining_ah,\
                      illuminated,harvested_j,consumed_j,depleted";

/// Exports energy samples to a CSV file at the given path.
///
/// Writes a header row followed by one data row per sample. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(samples: &[EnergySample], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(samples, buf)
}

/// Writes energy samples as CSV to any writer.
///
/// The `illuminated` column is empty for nodes without an illumination cycle.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(samples: &[EnergySample], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for s in samples {
        wtr.write_record(&[
            format!("{:.3}", s.time_s),
            s.node.clone(),
            s.kind.to_string(),
            format!("{:.4}", s.voltage_v),
            format!("{:.4}", s.remaining_j),
            format!("{:.6}", s.remaining_ah),
            s.illuminated.map(|b| b.to_string()).unwrap_or_default(),
            format!("{:.4}", s.harvested_j),
            format!("{:.4}", s.consumed_j),
            s.depleted.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
