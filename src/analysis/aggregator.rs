//! Grouping, summing and ranking.
//!
//! This module turns the unified table into aggregate tables: group by
//! one or two key columns, sum the measure, optionally attach each
//! group's share of the total and keep the top rows per partition.

use crate::models::{AggregateRow, AggregateTable, Table};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Row order of an aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending by key.
    Key,
    /// Descending by summed measure; ties keep key order.
    ValueDesc,
    /// Ascending by the first key, then descending by summed measure.
    PartitionThenValueDesc,
}

/// Definition of one aggregate table.
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    /// Key columns, partition key first for two-key specs.
    pub keys: Vec<String>,
    /// Column summed per group.
    pub measure: String,
    /// Header of the share-of-total column, if one is computed.
    pub percentage: Option<String>,
    pub order: SortOrder,
    /// Keep at most this many rows per value of the first key.
    pub top_per_partition: Option<usize>,
}

impl AggregateSpec {
    /// Sum `measure` by `keys`.
    pub fn new(keys: &[&str], measure: &str) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            measure: measure.to_string(),
            percentage: None,
            order: SortOrder::ValueDesc,
            top_per_partition: None,
        }
    }

    pub fn with_percentage(mut self, header: &str) -> Self {
        self.percentage = Some(header.to_string());
        self
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn top_per_partition(mut self, n: usize) -> Self {
        self.top_per_partition = Some(n);
        self
    }
}

/// Group `table` by `keys` and sum `measure`.
///
/// Rows with a missing key or measure do not contribute. Groups come back
/// in ascending key order.
pub fn group_sum(table: &Table, keys: &[String], measure: &str) -> Vec<AggregateRow> {
    let key_idx: Option<Vec<usize>> = keys.iter().map(|k| table.column_index(k)).collect();
    let (Some(key_idx), Some(measure_idx)) = (key_idx, table.column_index(measure)) else {
        return Vec::new();
    };

    let mut groups: BTreeMap<Vec<String>, f64> = BTreeMap::new();

    for row in table.rows() {
        let key: Option<Vec<String>> = key_idx.iter().map(|&i| row[i].group_key()).collect();
        let (Some(key), Some(value)) = (key, row[measure_idx].as_number()) else {
            continue;
        };
        *groups.entry(key).or_insert(0.0) += value;
    }

    groups
        .into_iter()
        .map(|(keys, value)| AggregateRow {
            keys,
            value,
            percentage: None,
        })
        .collect()
}

/// Set each row's share of the grand total, in percent.
///
/// A zero total leaves every percentage unset.
pub fn apply_percentages(rows: &mut [AggregateRow]) {
    let total: f64 = rows.iter().map(|r| r.value).sum();
    for row in rows.iter_mut() {
        row.percentage = if total != 0.0 && total.is_finite() {
            Some(row.value / total * 100.0)
        } else {
            None
        };
    }
}

fn value_desc(a: &AggregateRow, b: &AggregateRow) -> Ordering {
    b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal)
}

/// Stable sort in the requested order.
pub fn sort_rows(rows: &mut [AggregateRow], order: SortOrder) {
    match order {
        SortOrder::Key => rows.sort_by(|a, b| a.keys.cmp(&b.keys)),
        SortOrder::ValueDesc => rows.sort_by(value_desc),
        SortOrder::PartitionThenValueDesc => {
            rows.sort_by(|a, b| a.keys.first().cmp(&b.keys.first()).then_with(|| value_desc(a, b)))
        }
    }
}

/// Keep the first `n` rows of each run of equal first keys.
///
/// Expects rows already sorted so each partition is contiguous.
pub fn top_n_per_partition(rows: Vec<AggregateRow>, n: usize) -> Vec<AggregateRow> {
    let mut kept: Vec<AggregateRow> = Vec::with_capacity(rows.len());
    let mut current: Option<String> = None;
    let mut taken = 0;

    for row in rows {
        let partition = row.keys.first().cloned();
        if partition != current {
            current = partition;
            taken = 0;
        }
        if taken < n {
            kept.push(row);
            taken += 1;
        }
    }

    kept
}

/// Build the aggregate table described by `spec`.
pub fn aggregate(table: &Table, spec: &AggregateSpec) -> AggregateTable {
    let mut rows = group_sum(table, &spec.keys, &spec.measure);

    if spec.percentage.is_some() {
        apply_percentages(&mut rows);
    }

    sort_rows(&mut rows, spec.order);

    if let Some(n) = spec.top_per_partition {
        rows = top_n_per_partition(rows, n);
    }

    AggregateTable {
        key_columns: spec.keys.clone(),
        measure: spec.measure.clone(),
        percentage_column: spec.percentage.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    fn create_test_table(rows: &[(&str, &str, f64)]) -> Table {
        let mut table = Table::new(vec![
            "Year".to_string(),
            "Importer".to_string(),
            "Trade volume".to_string(),
        ]);
        for (year, importer, volume) in rows {
            table.push_row(vec![
                Cell::from(*year),
                Cell::from(*importer),
                Cell::Number(*volume),
            ]);
        }
        table
    }

    #[test]
    fn test_group_sum_by_year() {
        let table = create_test_table(&[
            ("2021", "X", 300.0),
            ("2020", "X", 100.0),
            ("2020", "Y", 200.0),
        ]);

        let rows = group_sum(&table, &["Year".to_string()], "Trade volume");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys, vec!["2020"]);
        assert_eq!(rows[0].value, 300.0);
        assert_eq!(rows[1].keys, vec!["2021"]);
        assert_eq!(rows[1].value, 300.0);
    }

    #[test]
    fn test_group_sum_skips_missing_keys() {
        let mut table = create_test_table(&[("2020", "X", 1.0)]);
        table.push_row(vec![Cell::from("2020"), Cell::Empty, Cell::Number(5.0)]);

        let rows = group_sum(&table, &["Importer".to_string()], "Trade volume");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 1.0);
    }

    #[test]
    fn test_group_sum_keys_by_display_text() {
        let mut table = create_test_table(&[("2020", "X", 1.0)]);
        table.push_row(vec![Cell::Number(2020.0), Cell::from("X"), Cell::Number(2.0)]);

        let rows = group_sum(&table, &["Year".to_string()], "Trade volume");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].keys, vec!["2020"]);
        assert_eq!(rows[0].value, 3.0);
    }

    #[test]
    fn test_group_sum_missing_column() {
        let table = create_test_table(&[("2020", "X", 1.0)]);
        assert!(group_sum(&table, &["Exporter".to_string()], "Trade volume").is_empty());
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let table = create_test_table(&[
            ("2020", "A", 1.0),
            ("2020", "B", 2.0),
            ("2021", "C", 3.5),
            ("2021", "A", 0.25),
        ]);
        let spec = AggregateSpec::new(&["Importer"], "Trade volume").with_percentage("Porcentaje");

        let agg = aggregate(&table, &spec);
        let total: f64 = agg.rows.iter().filter_map(|r| r.percentage).sum();

        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(agg.header(), vec!["Importer", "Trade volume", "Porcentaje"]);
    }

    #[test]
    fn test_percentages_zero_total() {
        let mut rows = vec![AggregateRow {
            keys: vec!["A".to_string()],
            value: 0.0,
            percentage: None,
        }];
        apply_percentages(&mut rows);
        assert_eq!(rows[0].percentage, None);
    }

    #[test]
    fn test_value_desc_is_stable() {
        let table = create_test_table(&[
            ("2020", "C", 5.0),
            ("2020", "A", 5.0),
            ("2020", "B", 9.0),
        ]);
        let spec = AggregateSpec::new(&["Importer"], "Trade volume");

        let agg = aggregate(&table, &spec);
        let (labels, values) = agg.series(0);

        // Ties keep ascending key order from the grouping step
        assert_eq!(labels, vec!["B", "A", "C"]);
        assert_eq!(values, vec![9.0, 5.0, 5.0]);
    }

    #[test]
    fn test_top_n_per_year() {
        let table = create_test_table(&[
            ("2020", "A", 10.0),
            ("2020", "B", 30.0),
            ("2020", "C", 20.0),
            ("2020", "D", 40.0),
            ("2021", "A", 5.0),
            ("2021", "B", 1.0),
        ]);
        let spec = AggregateSpec::new(&["Year", "Importer"], "Trade volume")
            .ordered(SortOrder::PartitionThenValueDesc)
            .top_per_partition(3);

        let agg = aggregate(&table, &spec);

        for year in agg.distinct_keys(0) {
            let part = agg.filter_key(0, &year);
            assert!(part.len() <= 3);
            assert!(part.rows.windows(2).all(|w| w[0].value >= w[1].value));
        }

        let keys: Vec<Vec<String>> = agg.rows.iter().map(|r| r.keys.clone()).collect();
        assert_eq!(
            keys,
            vec![
                vec!["2020", "D"],
                vec!["2020", "B"],
                vec!["2020", "C"],
                vec!["2021", "A"],
                vec!["2021", "B"],
            ]
            .into_iter()
            .map(|k| k.into_iter().map(String::from).collect::<Vec<_>>())
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_key_order() {
        let table = create_test_table(&[("2022", "A", 1.0), ("2020", "A", 9.0), ("2021", "A", 5.0)]);
        let spec = AggregateSpec::new(&["Year"], "Trade volume").ordered(SortOrder::Key);

        let agg = aggregate(&table, &spec);

        assert_eq!(agg.distinct_keys(0), agg.series(0).0);
    }
}
