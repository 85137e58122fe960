//! CSV output formatter for the directory tree.

use super::TreeRow;
use crate::cli::CsvEntry;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::io;
use std::path::Path;

/// Writes one record per row (path, state, marker, depth) to `output`, or to
/// stdout when no file is given.
pub fn render(rows: &[TreeRow], output: Option<&Path>) -> Result<()> {
    let writer: Box<dyn io::Write> = match output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    write_rows(rows, writer)?;

    if let Some(path) = output {
        eprintln!("CSV output written to: {}", path.display());
    }
    Ok(())
}

/// Serializes rows into any writer.
pub fn write_rows<W: io::Write>(rows: &[TreeRow], writer: W) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(CsvEntry {
            path: row.path.display().to_string(),
            state: row.state.as_str().to_string(),
            marker: row.marker.as_str().to_string(),
            depth: row.depth,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
