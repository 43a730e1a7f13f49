//! FILENAME: pivot-engine/src/view.rs
//! Pivot View - the derived table handed back to the table engine.
//!
//! A `PivotResult` is an ordinary row/column pair so the normal sort and
//! pagination stages can run over it. The key metadata kept alongside lets a
//! host map any value cell back to the source rows behind it.

use engine::{find_column, Column, Row};
use serde::Serialize;

use crate::cache::GroupKey;
use crate::definition::AggregationType;

/// Where a synthesized value column comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotValueColumn {
    /// Key of the synthesized column.
    pub key: String,
    pub value_field: String,
    pub aggregation: AggregationType,
    /// Column slice, `None` when the pivot has no column fields.
    pub slice: Option<GroupKey>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PivotResult {
    pub rows: Vec<Row>,
    pub columns: Vec<Column>,

    /// Row key of each entry in `rows` (same order).
    pub row_keys: Vec<GroupKey>,

    /// Sorted column slices; empty without column fields.
    pub column_slices: Vec<GroupKey>,

    pub value_columns: Vec<PivotValueColumn>,

    /// Number of source rows that passed the filters.
    pub source_count: usize,
}

impl PivotResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        find_column(&self.columns, key)
    }

    pub fn value_column(&self, key: &str) -> Option<&PivotValueColumn> {
        self.value_columns.iter().find(|c| c.key == key)
    }

    /// Position of the result row carrying `row_key`.
    pub fn row_index(&self, row_key: &GroupKey) -> Option<usize> {
        self.row_keys.iter().position(|k| k == row_key)
    }
}

/// Source rows behind one pivot cell.
#[derive(Debug, Clone, Serialize)]
pub struct DrillDownResult {
    pub row_key: GroupKey,
    pub slice: Option<GroupKey>,
    pub rows: Vec<Row>,
    /// Matching rows before truncation.
    pub total_count: usize,
    pub is_truncated: bool,
}
