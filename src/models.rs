//! Data models for the export analysis.
//!
//! This module contains the core data structures used throughout
//! the pipeline: dynamically typed cells, the unified record table,
//! and the aggregate tables produced by the reports.

use serde::Serialize;
use std::fmt;

/// A single spreadsheet value.
///
/// `Empty` doubles as the missing-value marker once columns are coerced.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    /// Blank cell or a value that failed numeric coercion.
    #[default]
    Empty,
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
    /// Boolean value.
    Bool(bool),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Bool(true) => write!(f, "True"),
            Cell::Bool(false) => write!(f, "False"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl Cell {
    /// Returns true for the missing-value marker.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Returns the numeric value, if this cell holds one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    /// Coerce to a number, mapping anything unparseable to `Empty`.
    pub fn to_numeric(&self) -> Cell {
        match self {
            Cell::Number(n) if n.is_nan() => Cell::Empty,
            Cell::Number(n) => Cell::Number(*n),
            Cell::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if !n.is_nan() => Cell::Number(n),
                _ => Cell::Empty,
            },
            Cell::Empty => Cell::Empty,
        }
    }

    /// The grouping key for this cell. Missing cells never form a group.
    pub fn group_key(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

/// A rectangular table of cells with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns true if the column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Appends a row, padding or cutting it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Returns the cell at `row` in the named column.
    #[cfg(test)]
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Replaces every value of a column, adding the column at the end when absent.
    pub fn set_column<F>(&mut self, name: &str, mut value: F)
    where
        F: FnMut(&[Cell]) -> Cell,
    {
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(Cell::Empty);
                }
                self.columns.len() - 1
            }
        };

        for row in &mut self.rows {
            let cell = value(row);
            row[idx] = cell;
        }
    }

    /// Keeps only the rows matching the predicate. Returns the number removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Cell]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Concatenates tables, taking the union of their columns in
    /// first-appearance order. Cells of absent columns are `Empty`.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut combined = Table::new(columns);
        for table in tables {
            let mapping: Vec<usize> = table
                .columns
                .iter()
                .filter_map(|c| combined.column_index(c))
                .collect();

            for row in table.rows {
                let mut out = vec![Cell::Empty; combined.columns.len()];
                for (cell, &target) in row.into_iter().zip(&mapping) {
                    out[target] = cell;
                }
                combined.rows.push(out);
            }
        }

        combined
    }
}

/// One row of an aggregate table.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// Key values, one per key column.
    pub keys: Vec<String>,
    /// Summed measure.
    pub value: f64,
    /// Share of the grand total in percent, when computed.
    pub percentage: Option<f64>,
}

/// A grouped and summed view of the unified table.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    /// Key column names (one or two).
    pub key_columns: Vec<String>,
    /// Name of the summed measure column.
    pub measure: String,
    /// Name of the percentage column, when the report computes one.
    pub percentage_column: Option<String>,
    /// Rows in output order.
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row for serialization.
    pub fn header(&self) -> Vec<String> {
        let mut header = self.key_columns.clone();
        header.push(self.measure.clone());
        if let Some(ref pct) = self.percentage_column {
            header.push(pct.clone());
        }
        header
    }

    /// The first `n` rows as a new table.
    pub fn head(&self, n: usize) -> AggregateTable {
        AggregateTable {
            rows: self.rows.iter().take(n).cloned().collect(),
            ..self.clone()
        }
    }

    /// Rows whose key at `position` equals `value`.
    pub fn filter_key(&self, position: usize, value: &str) -> AggregateTable {
        AggregateTable {
            rows: self
                .rows
                .iter()
                .filter(|r| r.keys.get(position).map(String::as_str) == Some(value))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Distinct key values at `position`, in lexicographic order.
    pub fn distinct_keys(&self, position: usize) -> Vec<String> {
        let mut keys: Vec<String> = self
            .rows
            .iter()
            .filter_map(|r| r.keys.get(position).cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// The key labels at `position` and the summed values, for charting.
    pub fn series(&self, position: usize) -> (Vec<String>, Vec<f64>) {
        self.rows
            .iter()
            .map(|r| (r.keys.get(position).cloned().unwrap_or_default(), r.value))
            .unzip()
    }
}

/// Visual form of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Vertical bars, one per label.
    Bar,
    /// Horizontal bars, first label at the top.
    BarHorizontal,
    /// Pie with percentage labels.
    Pie,
}

/// One chart to render: a labelled series plus captions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    /// File name inside the output directory.
    pub file: String,
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Kind of artifact written to the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Table,
    Chart,
}

/// A file produced by the run.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// Report the artifact belongs to (e.g. "A", "F2"), or "base".
    pub report: String,
    /// Table or chart.
    pub kind: ArtifactKind,
    /// File name relative to the output directory.
    pub file: String,
    /// Row count for tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row);
        }
        t
    }

    #[test]
    fn test_cell_to_numeric() {
        assert_eq!(Cell::from("12.5").to_numeric(), Cell::Number(12.5));
        assert_eq!(Cell::from(" 7 ").to_numeric(), Cell::Number(7.0));
        assert_eq!(Cell::from("n/a").to_numeric(), Cell::Empty);
        assert_eq!(Cell::from("1,200").to_numeric(), Cell::Empty);
        assert_eq!(Cell::from("nan").to_numeric(), Cell::Empty);
        assert_eq!(Cell::Bool(true).to_numeric(), Cell::Number(1.0));
        assert_eq!(Cell::Empty.to_numeric(), Cell::Empty);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(300.0).to_string(), "300");
        assert_eq!(Cell::Number(0.25).to_string(), "0.25");
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::from("Huila").to_string(), "Huila");
    }

    #[test]
    fn test_group_key_skips_missing() {
        assert_eq!(Cell::Empty.group_key(), None);
        assert_eq!(Cell::Number(f64::NAN).group_key(), None);
        assert_eq!(Cell::from("Japan").group_key(), Some("Japan".to_string()));
    }

    #[test]
    fn test_set_column_appends_and_overwrites() {
        let mut t = table(&["a"], vec![vec![Cell::Number(1.0)], vec![Cell::Number(2.0)]]);

        t.set_column("b", |row| Cell::Number(row[0].as_number().unwrap_or(0.0) * 10.0));
        assert_eq!(t.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(t.cell(1, "b"), Some(&Cell::Number(20.0)));

        t.set_column("a", |_| Cell::from("x"));
        assert_eq!(t.columns().len(), 2);
        assert_eq!(t.cell(0, "a"), Some(&Cell::from("x")));
    }

    #[test]
    fn test_concat_column_union() {
        let first = table(&["a", "b"], vec![vec![Cell::from("1"), Cell::from("2")]]);
        let second = table(&["b", "c"], vec![vec![Cell::from("3"), Cell::from("4")]]);

        let combined = Table::concat(vec![first, second]);

        assert_eq!(combined.columns(), &["a", "b", "c"].map(String::from));
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.rows()[0][2], Cell::Empty);
        assert_eq!(combined.rows()[1][0], Cell::Empty);
        assert_eq!(combined.rows()[1][1], Cell::from("3"));
    }

    #[test]
    fn test_retain_rows_counts_removed() {
        let mut t = table(
            &["v"],
            vec![vec![Cell::Number(1.0)], vec![Cell::Empty], vec![Cell::Number(3.0)]],
        );
        let removed = t.retain_rows(|row| !row[0].is_missing());
        assert_eq!(removed, 1);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_aggregate_distinct_keys_lexicographic() {
        let agg = AggregateTable {
            key_columns: vec!["Year".to_string(), "Importer".to_string()],
            measure: "Trade volume".to_string(),
            percentage_column: None,
            rows: ["2", "10", "2"]
                .iter()
                .map(|y| AggregateRow {
                    keys: vec![y.to_string(), "X".to_string()],
                    value: 1.0,
                    percentage: None,
                })
                .collect(),
        };

        assert_eq!(agg.distinct_keys(0), vec!["10".to_string(), "2".to_string()]);
        assert_eq!(agg.filter_key(0, "2").len(), 2);
        assert_eq!(agg.head(1).len(), 1);
        assert_eq!(agg.header(), vec!["Year", "Importer", "Trade volume"]);
    }
}
