//! Workbook loading.
//!
//! This module opens the export workbook, picks out the per-year sheets
//! and stacks them into one table tagged with a year label.

use crate::models::{Cell, Table};
use calamine::{open_workbook_auto, Data, Range, Reader};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Fatal errors raised while loading the workbook.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open workbook {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read sheet '{sheet}'")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("no '{prefix} ...' sheets found in workbook {}", .path.display())]
    NoYearSheets { prefix: String, path: PathBuf },
}

/// A year sheet that was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetInfo {
    /// Sheet name as stored in the workbook.
    pub name: String,
    /// Year label derived from the name.
    pub year: String,
    /// Number of data rows (header excluded).
    pub rows: usize,
}

/// The combined year sheets.
#[derive(Debug, Clone)]
pub struct LoadedWorkbook {
    /// All rows of all year sheets, with the year column attached.
    pub table: Table,
    /// Sheets in workbook order.
    pub sheets: Vec<SheetInfo>,
}

impl LoadedWorkbook {
    /// Total rows across all sheets.
    pub fn total_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows).sum()
    }
}

/// Returns true when a sheet name carries the year prefix (case-insensitive).
pub fn is_year_sheet(name: &str, prefix: &str) -> bool {
    name.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// Derive the year label from a sheet name: "Year 2020" -> "2020".
pub fn year_label(name: &str, prefix: &str) -> String {
    name.replace(&format!("{} ", prefix), "").trim().to_string()
}

/// Load every year sheet of the workbook at `path` into one table.
pub fn load_year_sheets(
    path: &Path,
    prefix: &str,
    year_column: &str,
) -> Result<LoadedWorkbook, LoadError> {
    info!("Loading workbook: {}", path.display());

    let mut workbook = open_workbook_auto(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let year_sheets: Vec<String> = workbook
        .sheet_names()
        .into_iter()
        .filter(|name| is_year_sheet(name, prefix))
        .collect();

    if year_sheets.is_empty() {
        return Err(LoadError::NoYearSheets {
            prefix: prefix.to_string(),
            path: path.to_path_buf(),
        });
    }

    let mut frames = Vec::with_capacity(year_sheets.len());
    let mut sheets = Vec::with_capacity(year_sheets.len());

    for name in year_sheets {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|source| LoadError::Sheet {
                sheet: name.clone(),
                source,
            })?;

        let mut frame = range_to_table(&range);
        let year = year_label(&name, prefix);
        let label = Cell::Text(year.clone());
        frame.set_column(year_column, |_| label.clone());

        debug!("Sheet '{}' -> year {} ({} rows)", name, year, frame.len());
        sheets.push(SheetInfo {
            name,
            year,
            rows: frame.len(),
        });
        frames.push(frame);
    }

    let table = Table::concat(frames);
    info!(
        "Combined {} sheets into {} rows x {} columns",
        sheets.len(),
        table.len(),
        table.columns().len()
    );

    Ok(LoadedWorkbook { table, sheets })
}

/// Convert a sheet range into a table, using its first row as the header.
///
/// Column positions are absolute: blank leading columns the range skipped
/// come back as empty `Unnamed: <i>` columns.
pub fn range_to_table(range: &Range<Data>) -> Table {
    let offset = range.start().map_or(0, |(_, col)| col as usize);
    let mut rows = range.rows();

    let header = match rows.next() {
        Some(row) => header_names(&padded(row, offset)),
        None => return Table::default(),
    };

    let mut table = Table::new(header);
    for row in rows {
        table.push_row(padded(row, offset).iter().map(to_cell).collect());
    }
    table
}

fn padded(row: &[Data], offset: usize) -> Vec<Data> {
    let mut cells = vec![Data::Empty; offset];
    cells.extend_from_slice(row);
    cells
}

/// Column names from a header row. Blank names become `Unnamed: <i>` and
/// repeated names get a `.1`, `.2`, ... suffix.
fn header_names(row: &[Data]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(row.len());

    for (i, value) in row.iter().enumerate() {
        let base = match value {
            Data::Empty => format!("Unnamed: {}", i),
            other => other.to_string(),
        };

        let mut name = base.clone();
        let mut dup = 0;
        while names.contains(&name) {
            dup += 1;
            name = format!("{}.{}", base, dup);
        }
        names.push(name);
    }

    names
}

fn to_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_workbook, TestSheet};
    use tempfile::TempDir;

    #[test]
    fn test_is_year_sheet() {
        assert!(is_year_sheet("Year 2020", "Year"));
        assert!(is_year_sheet("YEAR 2021", "Year"));
        assert!(is_year_sheet("yearly totals", "Year"));
        assert!(!is_year_sheet("Summary", "Year"));
        assert!(!is_year_sheet("Notes Year 2020", "Year"));
    }

    #[test]
    fn test_year_label() {
        assert_eq!(year_label("Year 2020", "Year"), "2020");
        assert_eq!(year_label("Year  2019 ", "Year"), "2019");
        assert_eq!(year_label("YEAR 2021", "Year"), "YEAR 2021");
    }

    #[test]
    fn test_header_names() {
        let row = vec![
            Data::String("Exporter".to_string()),
            Data::Empty,
            Data::String("Exporter".to_string()),
            Data::Float(2020.0),
        ];
        assert_eq!(
            header_names(&row),
            vec!["Exporter", "Unnamed: 1", "Exporter.1", "2020"]
        );
    }

    #[test]
    fn test_range_keeps_absolute_column_positions() {
        // Data starts at B1, column A is blank
        let mut range = Range::new((0, 1), (1, 3));
        range.set_value((0, 1), Data::String("Trade volume".to_string()));
        range.set_value((0, 3), Data::String("Exporter".to_string()));
        range.set_value((1, 1), Data::Float(10.0));
        range.set_value((1, 3), Data::String("A".to_string()));

        let table = range_to_table(&range);

        assert_eq!(
            table.columns(),
            &["Unnamed: 0", "Trade volume", "Unnamed: 2", "Exporter"].map(String::from)
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, "Unnamed: 0"), Some(&Cell::Empty));
        assert_eq!(table.cell(0, "Trade volume"), Some(&Cell::Number(10.0)));
        assert_eq!(table.cell(0, "Exporter"), Some(&Cell::from("A")));
    }

    #[test]
    fn test_load_combines_year_sheets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.xlsx");
        write_workbook(
            &path,
            &[
                TestSheet::new(
                    "Year 2020",
                    &["Trade volume", "Exporter"],
                    vec![
                        vec![Cell::Number(100.0), Cell::from("A")],
                        vec![Cell::Number(200.0), Cell::from("B")],
                    ],
                ),
                TestSheet::new("Notes", &["Text"], vec![vec![Cell::from("ignored")]]),
                TestSheet::new(
                    "Year 2021",
                    &["Trade volume", "Importer"],
                    vec![vec![Cell::Number(300.0), Cell::from("Z")]],
                ),
            ],
        );

        let loaded = load_year_sheets(&path, "Year", "Year").unwrap();

        assert_eq!(loaded.sheets.len(), 2);
        assert_eq!(loaded.total_rows(), 3);
        assert_eq!(loaded.table.len(), loaded.total_rows());
        assert_eq!(
            loaded.table.columns(),
            &["Trade volume", "Exporter", "Year", "Importer"].map(String::from)
        );
        assert_eq!(loaded.table.cell(0, "Year"), Some(&Cell::from("2020")));
        assert_eq!(loaded.table.cell(2, "Year"), Some(&Cell::from("2021")));
        assert_eq!(loaded.table.cell(2, "Exporter"), Some(&Cell::Empty));
        assert_eq!(loaded.sheets[1].name, "Year 2021");
    }

    #[test]
    fn test_existing_year_column_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.xlsx");
        write_workbook(
            &path,
            &[TestSheet::new(
                "Year 2022",
                &["Year", "Trade volume"],
                vec![vec![Cell::Number(1999.0), Cell::Number(5.0)]],
            )],
        );

        let loaded = load_year_sheets(&path, "Year", "Year").unwrap();

        assert_eq!(loaded.table.columns(), &["Year", "Trade volume"].map(String::from));
        assert_eq!(loaded.table.cell(0, "Year"), Some(&Cell::from("2022")));
    }

    #[test]
    fn test_no_year_sheets_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.xlsx");
        write_workbook(
            &path,
            &[TestSheet::new("Summary", &["Trade volume"], vec![vec![Cell::Number(1.0)]])],
        );

        let err = load_year_sheets(&path, "Year", "Year").unwrap_err();
        assert!(matches!(err, LoadError::NoYearSheets { .. }));
    }

    #[test]
    fn test_missing_workbook_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_year_sheets(&dir.path().join("absent.xlsx"), "Year", "Year").unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }
}
