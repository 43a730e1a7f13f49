//! FILENAME: pivot-engine/src/cache.rs
//! Pivot Cache - the partitioned internal representation a pivot is computed from.
//!
//! The cache is built in one pass over the source rows:
//! - rows failing the config filters are dropped
//! - every remaining row is assigned to its row group (first-seen order)
//! - the distinct column slices are collected and sorted
//!
//! Keys are structured tuples of field texts, so a field value containing
//! a separator can never merge two distinct groups.

use std::fmt;

use engine::{Row, RowValue};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::definition::PivotConfig;

/// Separator used when a key has to be rendered as a single string.
pub const KEY_SEPARATOR: &str = "|";

// ============================================================================
// GROUP KEY
// ============================================================================

/// A unique combination of field values (one entry per grouping field).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(pub SmallVec<[String; 4]>);

impl GroupKey {
    pub fn new(values: impl IntoIterator<Item = String>) -> Self {
        GroupKey(values.into_iter().collect())
    }

    /// Reads the key of `row` over `fields`.
    pub fn from_row(row: &Row, fields: &[String]) -> Self {
        GroupKey(fields.iter().map(|f| field_text(row.get(f))).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display form: values joined by the separator.
    pub fn joined(&self) -> String {
        self.0.join(KEY_SEPARATOR)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

// ============================================================================
// VALUE COERCION
// ============================================================================

/// Text of a field as used in pivot keys. Absent values are empty text.
pub fn field_text(value: &RowValue) -> String {
    value.to_text()
}

/// Strict numeric coercion for pivot aggregation: numbers, fully numeric
/// text and booleans. Empty and non-numeric values are excluded.
pub fn pivot_number(value: &RowValue) -> Option<f64> {
    match value {
        RowValue::Number(n) if !n.is_nan() => Some(*n),
        RowValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        RowValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
        }
        _ => None,
    }
}

// ============================================================================
// PIVOT CACHE
// ============================================================================

#[derive(Debug, Clone)]
pub struct PivotCache<'a> {
    /// Source rows that passed the config filters.
    pub records: Vec<&'a Row>,

    /// Row key -> indices into `records`, in first-seen order.
    row_groups: IndexMap<GroupKey, Vec<usize>, FxBuildHasher>,

    /// Column key of every record (parallel to `records`). Empty without
    /// column fields.
    record_slices: Vec<GroupKey>,

    /// Distinct column keys, sorted ascending.
    column_slices: Vec<GroupKey>,
}

impl<'a> PivotCache<'a> {
    pub fn build(config: &PivotConfig, source: &'a [Row]) -> Self {
        let records: Vec<&'a Row> = source.iter().filter(|row| config.accepts(row)).collect();

        let mut row_groups: IndexMap<GroupKey, Vec<usize>, FxBuildHasher> = IndexMap::with_hasher(FxBuildHasher);
        let mut record_slices = Vec::with_capacity(records.len());
        let mut distinct: FxHashSet<GroupKey> = FxHashSet::default();

        for (index, row) in records.iter().enumerate() {
            row_groups
                .entry(GroupKey::from_row(row, &config.row_fields))
                .or_default()
                .push(index);

            let slice = GroupKey::from_row(row, &config.column_fields);
            if !config.column_fields.is_empty() {
                distinct.insert(slice.clone());
            }
            record_slices.push(slice);
        }

        let mut column_slices: Vec<GroupKey> = distinct.into_iter().collect();
        column_slices.sort();

        PivotCache {
            records,
            row_groups,
            record_slices,
            column_slices,
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn row_keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.row_groups.keys()
    }

    pub fn row_group_count(&self) -> usize {
        self.row_groups.len()
    }

    pub fn column_slices(&self) -> &[GroupKey] {
        &self.column_slices
    }

    /// Records of one row group, optionally narrowed to one column slice.
    pub fn cell_records(&self, row_key: &GroupKey, slice: Option<&GroupKey>) -> Vec<&'a Row> {
        let Some(indices) = self.row_groups.get(row_key) else {
            return Vec::new();
        };
        indices
            .iter()
            .filter(|&&i| slice.map_or(true, |s| &self.record_slices[i] == s))
            .map(|&i| self.records[i])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_do_not_collide_on_separator() {
        let a = GroupKey::new(["a|b".to_string(), "c".to_string()]);
        let b = GroupKey::new(["a".to_string(), "b|c".to_string()]);
        assert_eq!(a.joined(), b.joined());
        assert_ne!(a, b);
    }

    #[test]
    fn strict_number_coercion() {
        assert_eq!(pivot_number(&RowValue::text(" 12.5 ")), Some(12.5));
        assert_eq!(pivot_number(&RowValue::Bool(true)), Some(1.0));
        assert_eq!(pivot_number(&RowValue::text("$12")), None);
        assert_eq!(pivot_number(&RowValue::text("")), None);
        assert_eq!(pivot_number(&RowValue::Empty), None);
    }

    #[test]
    fn cache_partitions_rows_and_sorts_slices() {
        let rows = Row::list_from_json(json!([
            { "region": "North", "product": "Pears", "sales": 1 },
            { "region": "South", "product": "Apples", "sales": 2 },
            { "region": "North", "product": "Apples", "sales": 3 }
        ]));
        let config = PivotConfig::new()
            .with_rows(&["region"])
            .with_columns(&["product"])
            .with_values(&["sales"]);
        let cache = PivotCache::build(&config, &rows);

        let keys: Vec<String> = cache.row_keys().map(|k| k.joined()).collect();
        assert_eq!(keys, vec!["North", "South"]);
        let slices: Vec<String> = cache.column_slices().iter().map(|k| k.joined()).collect();
        assert_eq!(slices, vec!["Apples", "Pears"]);

        let north = GroupKey::new(["North".to_string()]);
        let apples = GroupKey::new(["Apples".to_string()]);
        assert_eq!(cache.cell_records(&north, Some(&apples)).len(), 1);
        assert_eq!(cache.cell_records(&north, None).len(), 2);
    }
}
