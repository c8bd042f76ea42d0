//! Shared helpers for tests that need a real workbook on disk.

use crate::models::Cell;
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// A worksheet to write: name, header row and data rows.
pub struct TestSheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TestSheet {
    pub fn new(name: &str, header: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }
}

/// Write the sheets to an xlsx file at `path`.
pub fn write_workbook(path: &Path, sheets: &[TestSheet]) {
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).unwrap();

        for (col, name) in sheet.header.iter().enumerate() {
            worksheet.write_string(0, col as u16, name).unwrap();
        }

        for (r, row) in sheet.rows.iter().enumerate() {
            let r = r as u32 + 1;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Number(n) => {
                        worksheet.write_number(r, c, *n).unwrap();
                    }
                    Cell::Text(s) => {
                        worksheet.write_string(r, c, s).unwrap();
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(r, c, *b).unwrap();
                    }
                }
            }
        }
    }

    workbook.save(path).unwrap();
}
