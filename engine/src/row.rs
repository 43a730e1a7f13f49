//! FILENAME: engine/src/row.rs
//! PURPOSE: The record type flowing through the pipeline.
//! CONTEXT: A row is an insertion-ordered mapping of field name to value plus
//! a reserved identity slot. The identity is never part of the user fields;
//! it is serialized under `ROW_ID_KEY` so hosts can round-trip it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::RowValue;

/// Process-wide unique identifier assigned by the identity index.
pub type RowId = u64;

/// Reserved key under which the row identity is serialized.
pub const ROW_ID_KEY: &str = "__rowId";

static EMPTY: RowValue = RowValue::Empty;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "__rowId", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,

    #[serde(flatten)]
    pub fields: IndexMap<String, RowValue>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RowValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builds a row from a JSON object. Non-objects yield `None`.
    pub fn from_json(value: serde_json::Value) -> Option<Row> {
        match value {
            serde_json::Value::Object(map) => {
                let mut row = Row::new();
                for (key, value) in map {
                    if key == ROW_ID_KEY {
                        row.id = value.as_u64();
                        continue;
                    }
                    row.fields.insert(key, RowValue::from(value));
                }
                Some(row)
            }
            _ => None,
        }
    }

    /// Builds a row collection from a JSON array of objects.
    pub fn list_from_json(value: serde_json::Value) -> Vec<Row> {
        match value {
            serde_json::Value::Array(items) => items.into_iter().filter_map(Row::from_json).collect(),
            other => Row::from_json(other).into_iter().collect(),
        }
    }

    /// Field access. A missing field is an absent value, never an error.
    pub fn get(&self, key: &str) -> &RowValue {
        self.fields.get(key).unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<RowValue>) -> Option<RowValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn children(&self, children_field: &str) -> Option<&[Row]> {
        self.get(children_field).as_rows()
    }

    pub fn children_mut(&mut self, children_field: &str) -> Option<&mut Vec<Row>> {
        match self.fields.get_mut(children_field) {
            Some(RowValue::Rows(rows)) => Some(rows),
            _ => None,
        }
    }

    /// True when the children field holds at least one row.
    pub fn has_children(&self, children_field: &str) -> bool {
        self.children(children_field).is_some_and(|c| !c.is_empty())
    }

    /// True when the "potential children" marker is set.
    pub fn has_potential_children(&self, marker_field: &str) -> bool {
        self.get(marker_field).is_truthy()
    }

    /// Shallow merge: every field of `patch` overwrites the same field here.
    /// The identity of `self` is kept.
    pub fn merge(&mut self, patch: Row) {
        for (key, value) in patch.fields {
            self.fields.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_read_as_empty() {
        let row = Row::new().with("name", "Anna");
        assert_eq!(row.get("name"), &RowValue::text("Anna"));
        assert!(row.get("score").is_empty());
    }

    #[test]
    fn json_rows_keep_field_order_and_reserved_id() {
        let row = Row::from_json(json!({ "__rowId": 7, "b": 1, "a": "x" })).unwrap();
        assert_eq!(row.id, Some(7));
        let keys: Vec<&str> = row.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn serde_round_trip_uses_reserved_key() {
        let mut row = Row::new().with("name", "Ben").with("score", 95.0);
        row.id = Some(3);
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value, json!({ "__rowId": 3, "name": "Ben", "score": 95.0 }));

        let back: Row = serde_json::from_value(value).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn children_and_markers() {
        let row = Row::from_json(json!({
            "id": 1,
            "children": [{ "id": 2 }],
            "hasChildren": true
        }))
        .unwrap();
        assert!(row.has_children("children"));
        assert!(row.has_potential_children("hasChildren"));
        assert!(!row.has_children("kids"));
    }

    #[test]
    fn merge_overwrites_fields_but_keeps_identity() {
        let mut row = Row::new().with("a", 1.0).with("b", 2.0);
        row.id = Some(1);
        let mut patch = Row::new().with("b", 5.0).with("c", "new");
        patch.id = Some(99);
        row.merge(patch);
        assert_eq!(row.id, Some(1));
        assert_eq!(row.get("b"), &RowValue::Number(5.0));
        assert_eq!(row.get("c"), &RowValue::text("new"));
    }
}
