//! FILENAME: engine/src/group.rs
//! Group & Aggregate Engine - partitions an already filtered and sorted row
//! sequence by one column and computes the requested per-column statistics.

use indexmap::IndexMap;
use serde::Serialize;

use crate::aggregate::AggregateAccumulator;
use crate::column::{Column, ColumnAggregation};
use crate::row::Row;

/// Group key used for rows whose group-by value is absent.
pub const NULL_GROUP_KEY: &str = "(null)";

/// Statistics for one column within one group. A statistic that was not
/// requested, or that had no numeric input, is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ColumnAggregate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ColumnAggregate {
    pub fn get(&self, aggregation: ColumnAggregation) -> Option<f64> {
        match aggregation {
            ColumnAggregation::Sum => self.sum,
            ColumnAggregation::Min => self.min,
            ColumnAggregation::Max => self.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult<'a> {
    pub value: String,
    pub rows: Vec<&'a Row>,
    /// Column key -> statistics. Columns without any numeric value are absent.
    pub aggregates: IndexMap<String, ColumnAggregate>,
}

impl<'a> GroupResult<'a> {
    /// Row count of the group, independent of numeric validity.
    pub fn count(&self) -> usize {
        self.rows.len()
    }
}

/// String form of a row's group-by value.
pub fn group_key(row: &Row, key: &str) -> String {
    let value = row.get(key);
    if value.is_empty() {
        NULL_GROUP_KEY.to_string()
    } else {
        value.to_text()
    }
}

/// Partitions `rows` by the string form of `key`, in first-seen order.
pub fn group_rows<'a>(rows: &[&'a Row], key: &str, columns: &[Column]) -> Vec<GroupResult<'a>> {
    let mut partitions: IndexMap<String, Vec<&'a Row>> = IndexMap::new();
    for row in rows {
        partitions.entry(group_key(row, key)).or_default().push(*row);
    }

    partitions
        .into_iter()
        .map(|(value, rows)| {
            let aggregates = compute_aggregates(&rows, columns);
            GroupResult { value, rows, aggregates }
        })
        .collect()
}

/// Per-column statistics over `rows` for every column that requests any.
pub fn compute_aggregates(rows: &[&Row], columns: &[Column]) -> IndexMap<String, ColumnAggregate> {
    let mut out = IndexMap::new();
    for column in columns.iter().filter(|c| !c.aggregations.is_empty()) {
        let acc: AggregateAccumulator = rows.iter().map(|r| r.get(&column.key).to_number()).collect();
        if !acc.has_numbers() {
            continue;
        }
        let aggregate = ColumnAggregate {
            sum: column.wants(ColumnAggregation::Sum).then_some(acc.sum),
            min: acc.min.filter(|_| column.wants(ColumnAggregation::Min)),
            max: acc.max.filter(|_| column.wants(ColumnAggregation::Max)),
        };
        out.insert(column.key.clone(), aggregate);
    }
    out
}
