//! FILENAME: pivot-engine/src/definition.rs
//! Pivot Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE a pivot:
//! which fields group rows, which fields slice columns, which fields are
//! aggregated and how, and which source rows take part at all.

use std::collections::BTreeMap;
use std::fmt;

use engine::{Row, RowValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cache::pivot_number;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for value fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Avg => "avg",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Count => "count",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FILTER DEFINITIONS
// ============================================================================

/// Comparison applied by a pivot filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    BeginsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

/// A predicate on one source field. Rows failing any filter are left out
/// of the pivot before grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotFilter {
    pub operator: FilterOperator,
    pub value: String,
}

impl PivotFilter {
    pub fn new(operator: FilterOperator, value: impl Into<String>) -> Self {
        PivotFilter {
            operator,
            value: value.into(),
        }
    }

    pub fn matches(&self, value: &RowValue) -> bool {
        let text = value.to_text();
        match self.operator {
            FilterOperator::Equals => self.equals(value, &text),
            FilterOperator::NotEquals => !self.equals(value, &text),
            FilterOperator::Contains => text.to_lowercase().contains(&self.value.to_lowercase()),
            FilterOperator::NotContains => !text.to_lowercase().contains(&self.value.to_lowercase()),
            FilterOperator::BeginsWith => text.to_lowercase().starts_with(&self.value.to_lowercase()),
            FilterOperator::EndsWith => text.to_lowercase().ends_with(&self.value.to_lowercase()),
            FilterOperator::GreaterThan => self.compare(value, |a, b| a > b),
            FilterOperator::GreaterThanOrEqual => self.compare(value, |a, b| a >= b),
            FilterOperator::LessThan => self.compare(value, |a, b| a < b),
            FilterOperator::LessThanOrEqual => self.compare(value, |a, b| a <= b),
        }
    }

    /// Numbers compare numerically, everything else by exact text.
    fn equals(&self, value: &RowValue, text: &str) -> bool {
        match (pivot_number(value), self.value.trim().parse::<f64>().ok()) {
            (Some(a), Some(b)) => a == b,
            _ => text == self.value,
        }
    }

    /// A value that is not a number never passes a numeric comparison.
    fn compare(&self, value: &RowValue, op: impl Fn(f64, f64) -> bool) -> bool {
        match (pivot_number(value), self.value.trim().parse::<f64>().ok()) {
            (Some(a), Some(b)) => op(a, b),
            _ => false,
        }
    }
}

// ============================================================================
// FIELD AREAS
// ============================================================================

/// The field lists a field can be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PivotArea {
    Rows,
    Columns,
    Values,
}

// ============================================================================
// PIVOT CONFIG
// ============================================================================

/// The complete description of a pivot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PivotConfig {
    /// Fields whose value combination forms one output row.
    pub row_fields: Vec<String>,

    /// Fields whose value combination forms one column slice.
    pub column_fields: Vec<String>,

    /// Fields to aggregate.
    pub value_fields: Vec<String>,

    /// Value field -> aggregation. Missing entries aggregate with `sum`.
    pub aggregations: IndexMap<String, AggregationType>,

    /// Field -> predicate.
    pub filters: BTreeMap<String, PivotFilter>,
}

impl PivotConfig {
    pub fn new() -> Self {
        PivotConfig::default()
    }

    pub fn with_rows(mut self, fields: &[&str]) -> Self {
        self.row_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_columns(mut self, fields: &[&str]) -> Self {
        self.column_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_values(mut self, fields: &[&str]) -> Self {
        self.value_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_aggregation(mut self, field: impl Into<String>, aggregation: AggregationType) -> Self {
        self.aggregations.insert(field.into(), aggregation);
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, filter: PivotFilter) -> Self {
        self.filters.insert(field.into(), filter);
        self
    }

    pub fn aggregation_for(&self, field: &str) -> AggregationType {
        self.aggregations.get(field).copied().unwrap_or_default()
    }

    /// No row and no column fields: the pivot is a single summary row.
    pub fn is_summary(&self) -> bool {
        self.row_fields.is_empty() && self.column_fields.is_empty()
    }

    pub fn fields(&self, area: PivotArea) -> &[String] {
        match area {
            PivotArea::Rows => &self.row_fields,
            PivotArea::Columns => &self.column_fields,
            PivotArea::Values => &self.value_fields,
        }
    }

    fn fields_mut(&mut self, area: PivotArea) -> &mut Vec<String> {
        match area {
            PivotArea::Rows => &mut self.row_fields,
            PivotArea::Columns => &mut self.column_fields,
            PivotArea::Values => &mut self.value_fields,
        }
    }

    /// Appends `field` to `area`, taking it out of any other area first.
    /// A new value field starts with `sum`.
    pub fn add_field(&mut self, area: PivotArea, field: &str) {
        for other in [PivotArea::Rows, PivotArea::Columns, PivotArea::Values] {
            if other != area {
                self.remove_field(other, field);
            }
        }
        if self.fields(area).iter().any(|f| f == field) {
            return;
        }
        self.fields_mut(area).push(field.to_string());
        if area == PivotArea::Values {
            self.aggregations.entry(field.to_string()).or_default();
        }
    }

    /// Removes `field` from `area`; a removed value field forgets its aggregation.
    pub fn remove_field(&mut self, area: PivotArea, field: &str) -> bool {
        let fields = self.fields_mut(area);
        let Some(index) = fields.iter().position(|f| f == field) else {
            return false;
        };
        fields.remove(index);
        if area == PivotArea::Values {
            self.aggregations.shift_remove(field);
        }
        true
    }

    /// Swaps `field` with its neighbour (`offset` -1 or +1). Moving past
    /// either end does nothing.
    pub fn move_field(&mut self, area: PivotArea, field: &str, offset: isize) -> bool {
        let fields = self.fields_mut(area);
        let Some(index) = fields.iter().position(|f| f == field) else {
            return false;
        };
        let Some(target) = index.checked_add_signed(offset).filter(|t| *t < fields.len()) else {
            return false;
        };
        fields.swap(index, target);
        true
    }

    pub fn accepts(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(field, filter)| filter.matches(row.get(field)))
    }

    /// Applies a partial update; only the provided parts are replaced.
    pub fn apply(&mut self, update: PivotConfigUpdate) {
        if let Some(rows) = update.row_fields {
            self.row_fields = rows;
        }
        if let Some(columns) = update.column_fields {
            self.column_fields = columns;
        }
        if let Some(values) = update.value_fields {
            self.value_fields = values;
        }
        if let Some(aggregations) = update.aggregations {
            self.aggregations = aggregations;
        }
        if let Some(filters) = update.filters {
            self.filters = filters;
        }
    }
}

/// A partial `PivotConfig`. Absent parts keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PivotConfigUpdate {
    pub row_fields: Option<Vec<String>>,
    pub column_fields: Option<Vec<String>>,
    pub value_fields: Option<Vec<String>>,
    pub aggregations: Option<IndexMap<String, AggregationType>>,
    pub filters: Option<BTreeMap<String, PivotFilter>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PivotConfig = serde_json::from_value(json!({
            "rowFields": ["region"],
            "valueFields": ["sales", "units"],
            "aggregations": { "units": "avg" },
            "filters": { "year": { "operator": "greaterThanOrEqual", "value": "2020" } }
        }))
        .unwrap();
        assert!(config.column_fields.is_empty());
        assert_eq!(config.aggregation_for("sales"), AggregationType::Sum);
        assert_eq!(config.aggregation_for("units"), AggregationType::Avg);
        assert!(!config.is_summary());
    }

    #[test]
    fn filter_operators() {
        let year = RowValue::Number(2021.0);
        assert!(PivotFilter::new(FilterOperator::GreaterThan, "2020").matches(&year));
        assert!(PivotFilter::new(FilterOperator::Equals, "2021.0").matches(&year));
        assert!(!PivotFilter::new(FilterOperator::LessThan, "abc").matches(&year));

        let city = RowValue::text("Amsterdam");
        assert!(PivotFilter::new(FilterOperator::BeginsWith, "ams").matches(&city));
        assert!(PivotFilter::new(FilterOperator::NotContains, "rotter").matches(&city));
        assert!(!PivotFilter::new(FilterOperator::GreaterThan, "0").matches(&city));
        assert!(!PivotFilter::new(FilterOperator::Equals, "amsterdam").matches(&city));
    }

    #[test]
    fn fields_move_between_areas() {
        let mut config = PivotConfig::new().with_rows(&["region", "product"]);
        config.add_field(PivotArea::Values, "product");
        assert_eq!(config.row_fields, vec!["region"]);
        assert_eq!(config.aggregation_for("product"), AggregationType::Sum);
        assert!(config.aggregations.contains_key("product"));

        config.add_field(PivotArea::Rows, "year");
        assert!(config.move_field(PivotArea::Rows, "year", -1));
        assert_eq!(config.row_fields, vec!["year", "region"]);
        assert!(!config.move_field(PivotArea::Rows, "year", -1));

        assert!(config.remove_field(PivotArea::Values, "product"));
        assert!(config.aggregations.is_empty());
    }

    #[test]
    fn partial_update_keeps_untouched_parts() {
        let mut config = PivotConfig::new().with_rows(&["region"]).with_values(&["sales"]);
        config.apply(PivotConfigUpdate {
            column_fields: Some(vec!["product".to_string()]),
            ..PivotConfigUpdate::default()
        });
        assert_eq!(config.row_fields, vec!["region"]);
        assert_eq!(config.column_fields, vec!["product"]);
    }
}
