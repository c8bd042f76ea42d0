//! Numeric coercion and unit conversion.

use crate::config::ColumnsConfig;
use crate::models::{Cell, Table};
use thiserror::Error;
use tracing::debug;

/// Kilograms per metric ton.
pub const KG_PER_TON: f64 = 1000.0;

/// Errors raised while normalizing the combined table.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("column '{0}' not found in any year sheet")]
    MissingMeasure(String),
}

/// Outcome of normalization.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: Table,
    /// Rows removed because the volume was missing or unparseable.
    pub dropped: usize,
}

/// Coerce each present column in `columns` to numbers. Values that fail to
/// parse become `Cell::Empty`; absent columns are ignored.
pub fn coerce_numeric(table: &mut Table, columns: &[String]) {
    for column in columns {
        if let Some(idx) = table.column_index(column) {
            table.set_column(column, |row| row[idx].to_numeric());
        } else {
            debug!("Numeric column '{}' not present, skipping", column);
        }
    }
}

/// Coerce numeric columns, add the volume-in-tons column and drop rows
/// without a volume.
pub fn normalize(mut table: Table, columns: &ColumnsConfig) -> Result<Normalized, NormalizeError> {
    let volume_idx = table
        .column_index(&columns.volume)
        .ok_or_else(|| NormalizeError::MissingMeasure(columns.volume.clone()))?;

    coerce_numeric(&mut table, &columns.numeric);
    for measure in [&columns.volume, &columns.value] {
        if !columns.numeric.contains(measure) {
            coerce_numeric(&mut table, std::slice::from_ref(measure));
        }
    }

    table.set_column(&columns.volume_tons, |row| match row[volume_idx].as_number() {
        Some(kg) => Cell::Number(kg / KG_PER_TON),
        None => Cell::Empty,
    });

    let dropped = table.retain_rows(|row| !row[volume_idx].is_missing());
    debug!("Dropped {} rows without '{}'", dropped, columns.volume);

    Ok(Normalized { table, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table(volumes: Vec<Cell>) -> Table {
        let mut table = Table::new(vec![
            "Year".to_string(),
            "Trade volume".to_string(),
            "Trade value".to_string(),
        ]);
        for v in volumes {
            table.push_row(vec![Cell::from("2020"), v, Cell::from("12.5")]);
        }
        table
    }

    #[test]
    fn test_drops_unparseable_volume() {
        let table = raw_table(vec![
            Cell::Number(100.0),
            Cell::from("not a number"),
            Cell::from("250"),
            Cell::Empty,
        ]);

        let normalized = normalize(table, &ColumnsConfig::default()).unwrap();

        assert_eq!(normalized.dropped, 2);
        assert_eq!(normalized.table.len(), 2);
        assert_eq!(
            normalized.table.cell(1, "Trade volume"),
            Some(&Cell::Number(250.0))
        );
        assert!(normalized
            .table
            .rows()
            .iter()
            .all(|row| !row[1].is_missing()));
    }

    #[test]
    fn test_tons_column() {
        let table = raw_table(vec![Cell::Number(1500.0), Cell::Number(3.0)]);

        let normalized = normalize(table, &ColumnsConfig::default()).unwrap();
        let t = &normalized.table;

        assert_eq!(t.columns().last().map(String::as_str), Some("Trade volume (t)"));
        for row in 0..t.len() {
            let kg = t.cell(row, "Trade volume").and_then(Cell::as_number).unwrap();
            let tons = t.cell(row, "Trade volume (t)").and_then(Cell::as_number).unwrap();
            assert_eq!(tons, kg / 1000.0);
        }
    }

    #[test]
    fn test_secondary_numeric_column_coerced() {
        let table = raw_table(vec![Cell::Number(1.0)]);
        let normalized = normalize(table, &ColumnsConfig::default()).unwrap();
        assert_eq!(
            normalized.table.cell(0, "Trade value"),
            Some(&Cell::Number(12.5))
        );
    }

    #[test]
    fn test_renamed_value_column_coerced() {
        let mut table = Table::new(vec!["Trade volume".to_string(), "Valor".to_string()]);
        table.push_row(vec![Cell::Number(1.0), Cell::from("12.5")]);
        let columns = ColumnsConfig {
            value: "Valor".to_string(),
            ..ColumnsConfig::default()
        };

        let normalized = normalize(table, &columns).unwrap();

        assert_eq!(normalized.table.cell(0, "Valor"), Some(&Cell::Number(12.5)));
    }

    #[test]
    fn test_missing_volume_column() {
        let table = Table::new(vec!["Year".to_string()]);
        let err = normalize(table, &ColumnsConfig::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingMeasure(ref c) if c == "Trade volume"));
    }
}
