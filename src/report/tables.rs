//! CSV table writer.
//!
//! Files are UTF-8 with a byte-order mark so spreadsheet tools pick
//! the right encoding, `\n` line endings, header first.

use super::OutputDir;
use crate::models::{AggregateTable, Table};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn csv_writer<W: Write>(mut writer: W) -> Result<csv::Writer<W>> {
    writer.write_all(UTF8_BOM)?;
    Ok(csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer))
}

/// Serialize a table with all its columns.
pub fn write_table_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut csv_writer = csv_writer(writer)?;

    csv_writer.write_record(table.columns())?;
    for row in table.rows() {
        csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Serialize an aggregate table: key columns, measure, then percentage if any.
pub fn write_aggregate_to<W: Write>(table: &AggregateTable, writer: W) -> Result<()> {
    let mut csv_writer = csv_writer(writer)?;

    csv_writer.write_record(table.header())?;
    for row in &table.rows {
        let mut record = row.keys.clone();
        record.push(row.value.to_string());
        if table.percentage_column.is_some() {
            record.push(row.percentage.map(|p| p.to_string()).unwrap_or_default());
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn create(out: &OutputDir, name: &str) -> Result<(PathBuf, BufWriter<File>)> {
    let path = out.file(&format!("{}.csv", name));
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok((path, BufWriter::new(file)))
}

/// Write `<name>.csv` into the output directory. Returns the written path.
pub fn write_table(out: &OutputDir, name: &str, table: &Table) -> Result<PathBuf> {
    let (path, file) = create(out, name)?;
    write_table_to(table, file).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {} ({} rows)", path.display(), table.len());
    Ok(path)
}

/// Write an aggregate table as `<name>.csv`. Returns the written path.
pub fn write_aggregate(out: &OutputDir, name: &str, table: &AggregateTable) -> Result<PathBuf> {
    let (path, file) = create(out, name)?;
    write_aggregate_to(table, file)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {} ({} rows)", path.display(), table.len());
    Ok(path)
}
