//! FILENAME: engine/src/column.rs
//! PURPOSE: Column descriptors - how a field is displayed, sorted, filtered and aggregated.
//! CONTEXT: Columns are configuration. The optional renderer and comparator are
//! host-supplied behavior and are skipped by serde.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::row::Row;
use crate::value::RowValue;

// ============================================================================
// COLUMN TYPE
// ============================================================================

/// Semantic type of a column. Drives rendered text and default comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    /// Markup text; compared and filtered on its tag-stripped content.
    Html,
    /// A URL with an optional fixed label.
    Link { text: Option<String> },
    /// An action button with an optional fixed label.
    Button { text: Option<String> },
    Image,
    /// Host-registered cell type, treated as text by the pipeline.
    Custom(String),
}

/// Statistics a column may request for group headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnAggregation {
    Sum,
    Min,
    Max,
}

// ============================================================================
// HOST CALLBACKS
// ============================================================================

/// Custom cell renderer. Returns markup or text; the pipeline only looks at
/// its text content.
#[derive(Clone)]
pub struct CellRenderer(pub Arc<dyn Fn(&RowValue, &Row) -> String + Send + Sync>);

impl fmt::Debug for CellRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CellRenderer")
    }
}

/// Custom comparator. `None` signals failure; the sort engine then falls back
/// to the type-based comparison for that pair.
#[derive(Clone)]
pub struct ValueComparator(
    pub Arc<dyn Fn(&RowValue, &RowValue) -> Option<Ordering> + Send + Sync>,
);

impl fmt::Debug for ValueComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueComparator")
    }
}

// ============================================================================
// COLUMN
// ============================================================================

fn default_true() -> bool {
    true
}

/// Describes one field to display, sort, filter or aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Field name in the row.
    pub key: String,

    /// Display label; the key is used when absent.
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default, rename = "type")]
    pub column_type: ColumnType,

    #[serde(default = "default_true")]
    pub sortable: bool,

    #[serde(default = "default_true")]
    pub filterable: bool,

    /// Statistics to compute per group.
    #[serde(default)]
    pub aggregations: Vec<ColumnAggregation>,

    #[serde(skip)]
    pub render: Option<CellRenderer>,

    #[serde(skip)]
    pub comparator: Option<ValueComparator>,
}

impl Column {
    pub fn new(key: impl Into<String>) -> Self {
        Column {
            key: key.into(),
            label: None,
            column_type: ColumnType::Text,
            sortable: true,
            filterable: true,
            aggregations: Vec::new(),
            render: None,
            comparator: None,
        }
    }

    pub fn number(key: impl Into<String>) -> Self {
        Column::new(key).with_type(ColumnType::Number)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn with_aggregations(mut self, aggregations: &[ColumnAggregation]) -> Self {
        self.aggregations = aggregations.to_vec();
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&RowValue, &Row) -> String + Send + Sync + 'static,
    {
        self.render = Some(CellRenderer(Arc::new(render)));
        self
    }

    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&RowValue, &RowValue) -> Option<Ordering> + Send + Sync + 'static,
    {
        self.comparator = Some(ValueComparator(Arc::new(comparator)));
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    pub fn wants(&self, aggregation: ColumnAggregation) -> bool {
        self.aggregations.contains(&aggregation)
    }
}

/// Finds a column by key.
pub fn find_column<'c>(columns: &'c [Column], key: &str) -> Option<&'c Column> {
    columns.iter().find(|c| c.key == key)
}
