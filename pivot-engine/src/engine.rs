//! FILENAME: pivot-engine/src/engine.rs
//! Pivot Engine - turns source rows and a `PivotConfig` into a derived table.
//!
//! Algorithm:
//! 1. Build the cache: filter source rows, partition them by row key and
//!    collect the sorted column slices
//! 2. Generate the columns: one text column per row field, then one number
//!    column per (column slice x value field)
//! 3. For every row group, aggregate each value field over the group's rows
//!    that fall into each slice
//!
//! Without row and column fields the result is one summary row instead.

use engine::{find_column, AggregateAccumulator, Column, ColumnType, Row, RowValue};
use engine::{log_debug, log_enter, log_exit};
use rustc_hash::FxHashSet;

use crate::cache::{pivot_number, GroupKey, PivotCache};
use crate::definition::{AggregationType, PivotConfig};
use crate::view::{DrillDownResult, PivotResult, PivotValueColumn};

// ============================================================================
// PIVOT CALCULATOR
// ============================================================================

/// The calculation engine for one pivot pass.
pub struct PivotCalculator<'a> {
    config: &'a PivotConfig,

    /// Columns of the source data, used for labels only.
    source_columns: &'a [Column],

    cache: PivotCache<'a>,
}

impl<'a> PivotCalculator<'a> {
    pub fn new(config: &'a PivotConfig, source: &'a [Row], source_columns: &'a [Column]) -> Self {
        PivotCalculator {
            config,
            source_columns,
            cache: PivotCache::build(config, source),
        }
    }

    /// Executes the full calculation.
    pub fn calculate(&self) -> PivotResult {
        if self.config.value_fields.is_empty() && self.config.is_summary() {
            return PivotResult::default();
        }
        if self.config.is_summary() {
            return self.summary();
        }

        let value_columns = self.value_columns();

        let mut columns: Vec<Column> = self
            .config
            .row_fields
            .iter()
            .map(|field| Column::new(field.clone()).with_label(self.field_label(field)))
            .collect();
        columns.extend(value_columns.iter().map(|vc| {
            let label = match &vc.slice {
                Some(slice) => format!("{} ({})", self.field_label(&vc.value_field), slice.joined()),
                None => self.field_label(&vc.value_field),
            };
            Column::new(vc.key.clone())
                .with_label(label)
                .with_type(ColumnType::Number)
        }));

        let mut rows = Vec::with_capacity(self.cache.row_group_count());
        let mut row_keys = Vec::with_capacity(self.cache.row_group_count());
        for row_key in self.cache.row_keys() {
            let mut row = Row::new();
            for (i, field) in self.config.row_fields.iter().enumerate() {
                row.set(field.clone(), row_key.get(i).unwrap_or_default());
            }
            for vc in &value_columns {
                let records = self.cache.cell_records(row_key, vc.slice.as_ref());
                row.set(vc.key.clone(), aggregate(&records, &vc.value_field, vc.aggregation));
            }
            rows.push(row);
            row_keys.push(row_key.clone());
        }

        log_debug!(
            "PIVOT",
            "{} source rows -> {} rows x {} columns",
            self.cache.record_count(),
            rows.len(),
            columns.len()
        );

        PivotResult {
            rows,
            columns,
            row_keys,
            column_slices: self.cache.column_slices().to_vec(),
            value_columns,
            source_count: self.cache.record_count(),
        }
    }

    /// One row aggregating every value field over all filtered source rows.
    fn summary(&self) -> PivotResult {
        let mut row = Row::new();
        let mut columns = Vec::with_capacity(self.config.value_fields.len());
        let mut value_columns = Vec::with_capacity(self.config.value_fields.len());

        for field in &self.config.value_fields {
            let aggregation = self.config.aggregation_for(field);
            row.set(field.clone(), aggregate(&self.cache.records, field, aggregation));
            columns.push(
                Column::number(field.clone())
                    .with_label(format!("{} ({})", self.field_label(field), aggregation))
                    .sortable(false),
            );
            value_columns.push(PivotValueColumn {
                key: field.clone(),
                value_field: field.clone(),
                aggregation,
                slice: None,
            });
        }

        PivotResult {
            rows: vec![row],
            columns,
            row_keys: vec![GroupKey::default()],
            column_slices: Vec::new(),
            value_columns,
            source_count: self.cache.record_count(),
        }
    }

    /// Value columns in output order: slices outer, value fields inner.
    fn value_columns(&self) -> Vec<PivotValueColumn> {
        let slices: Vec<Option<&GroupKey>> = if self.config.column_fields.is_empty() {
            vec![None]
        } else {
            self.cache.column_slices().iter().map(Some).collect()
        };

        let mut used: FxHashSet<String> = self.config.row_fields.iter().cloned().collect();
        let mut out = Vec::with_capacity(slices.len() * self.config.value_fields.len());
        for slice in slices {
            for field in &self.config.value_fields {
                let base = match slice {
                    Some(s) => format!("{}_{}", field, s.joined()),
                    None => field.clone(),
                };
                let key = unique_key(base, &mut used);
                out.push(PivotValueColumn {
                    key,
                    value_field: field.clone(),
                    aggregation: self.config.aggregation_for(field),
                    slice: slice.cloned(),
                });
            }
        }
        out
    }

    fn field_label(&self, field: &str) -> String {
        find_column(self.source_columns, field)
            .map(|c| c.display_label().to_string())
            .unwrap_or_else(|| field.to_string())
    }
}

/// Distinct slices can render to the same joined text; later ones get a suffix.
fn unique_key(base: String, used: &mut FxHashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}~{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Aggregates `field` over `records`. `count` is the number of records;
/// the other functions use the numeric values only and yield 0 without any.
pub fn aggregate(records: &[&Row], field: &str, aggregation: AggregationType) -> f64 {
    let acc: AggregateAccumulator = records.iter().map(|r| pivot_number(r.get(field))).collect();
    if aggregation != AggregationType::Count && !acc.has_numbers() {
        return 0.0;
    }
    match aggregation {
        AggregationType::Sum => acc.sum,
        AggregationType::Avg => acc.average().unwrap_or(0.0),
        AggregationType::Min => acc.min.unwrap_or(0.0),
        AggregationType::Max => acc.max.unwrap_or(0.0),
        AggregationType::Count => acc.count as f64,
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Calculates a pivot from config and source rows.
/// This is the main entry point for the calculation engine.
pub fn calculate_pivot(config: &PivotConfig, source: &[Row], source_columns: &[Column]) -> PivotResult {
    log_enter!("PIVOT", "calculate_pivot", "rows={}", source.len());
    let result = PivotCalculator::new(config, source, source_columns).calculate();
    log_exit!("PIVOT", "calculate_pivot", "rows={}", result.rows.len());
    result
}

/// Returns the source rows behind one cell: the rows of `row_key`, narrowed
/// to `slice` when given. At most `max_records` rows are cloned.
pub fn drill_down(
    config: &PivotConfig,
    source: &[Row],
    row_key: &GroupKey,
    slice: Option<&GroupKey>,
    max_records: usize,
) -> DrillDownResult {
    let cache = PivotCache::build(config, source);
    let matching = if config.is_summary() {
        cache.records.clone()
    } else {
        cache.cell_records(row_key, slice)
    };

    let total_count = matching.len();
    DrillDownResult {
        row_key: row_key.clone(),
        slice: slice.cloned(),
        rows: matching.into_iter().take(max_records).cloned().collect(),
        total_count,
        is_truncated: total_count > max_records,
    }
}

/// Field names offered for pivot configuration: the keys of the first row.
pub fn available_fields(source: &[Row]) -> Vec<String> {
    source
        .first()
        .map(|row| row.fields.keys().cloned().collect())
        .unwrap_or_default()
}

/// Value of one synthesized cell, for hosts that address cells by key.
pub fn cell_value<'r>(result: &'r PivotResult, row_key: &GroupKey, column_key: &str) -> Option<&'r RowValue> {
    let index = result.row_index(row_key)?;
    result.rows.get(index).map(|row| row.get(column_key))
}
