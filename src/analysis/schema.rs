//! Detection of the optional report columns.

use crate::config::ColumnsConfig;
use crate::models::Table;
use serde::Serialize;

/// Which optional columns the unified table carries.
///
/// Each report consults this set instead of probing the table itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub destination: bool,
    pub exporter: bool,
    pub importer: bool,
    pub bean: bool,
    pub municipality: bool,
}

impl Capabilities {
    /// Inspect the table's columns once.
    pub fn detect(table: &Table, columns: &ColumnsConfig) -> Self {
        Self {
            destination: table.has_column(&columns.destination),
            exporter: table.has_column(&columns.exporter),
            importer: table.has_column(&columns.importer),
            bean: table.has_column(&columns.bean),
            municipality: table.has_column(&columns.municipality),
        }
    }

    /// Exporter breakdown of the top municipalities needs both columns.
    pub fn municipality_exporters(&self) -> bool {
        self.municipality && self.exporter
    }
}
