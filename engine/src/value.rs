//! FILENAME: engine/src/value.rs
//! PURPOSE: Defines the value a single row field can hold.
//! CONTEXT: Rows are open-ended mappings from field name to `RowValue`.
//! Nested row collections (tree children) are values too, which is how
//! hierarchy is expressed. Coercions used by filtering, sorting and
//! aggregation live here so every stage agrees on them.

use serde::{Deserialize, Serialize};

use crate::row::Row;

/// The raw data held by one field of a row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Rows(Vec<Row>),
}

impl RowValue {
    pub fn text(s: impl Into<String>) -> Self {
        RowValue::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RowValue::Empty)
    }

    /// Nested rows, if this value is a row collection.
    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            RowValue::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Loose truthiness, used for "potential children" markers.
    pub fn is_truthy(&self) -> bool {
        match self {
            RowValue::Empty => false,
            RowValue::Bool(b) => *b,
            RowValue::Number(n) => *n != 0.0 && !n.is_nan(),
            RowValue::Text(s) => !s.is_empty(),
            RowValue::Rows(rows) => !rows.is_empty(),
        }
    }

    /// Returns the plain string form of the value.
    /// Empty values and nested rows have no textual form.
    pub fn to_text(&self) -> String {
        match self {
            RowValue::Empty => String::new(),
            RowValue::Bool(b) => b.to_string(),
            RowValue::Number(n) => format_number(*n),
            RowValue::Text(s) => s.clone(),
            RowValue::Rows(_) => String::new(),
        }
    }

    /// Lenient numeric coercion used by sorting, filtering and group aggregates.
    ///
    /// Numbers are returned as is. Text is reduced to its digits, signs and
    /// decimal points, and the longest leading decimal literal is parsed.
    /// Everything else is "no value".
    pub fn to_number(&self) -> Option<f64> {
        match self {
            RowValue::Number(n) => Some(*n),
            RowValue::Text(s) => {
                let stripped: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'))
                    .collect();
                parse_leading_float(&stripped)
            }
            _ => None,
        }
    }
}

/// Formats a number without unnecessary decimal places.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Parses the longest prefix of `s` that forms a decimal literal
/// (optional sign, digits, at most one decimal point).
fn parse_leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return None;
    }
    s[..end].parse::<f64>().ok()
}

impl From<f64> for RowValue {
    fn from(value: f64) -> Self {
        RowValue::Number(value)
    }
}

impl From<i64> for RowValue {
    fn from(value: i64) -> Self {
        RowValue::Number(value as f64)
    }
}

impl From<bool> for RowValue {
    fn from(value: bool) -> Self {
        RowValue::Bool(value)
    }
}

impl From<&str> for RowValue {
    fn from(value: &str) -> Self {
        RowValue::Text(value.to_string())
    }
}

impl From<String> for RowValue {
    fn from(value: String) -> Self {
        RowValue::Text(value)
    }
}

impl From<Vec<Row>> for RowValue {
    fn from(value: Vec<Row>) -> Self {
        RowValue::Rows(value)
    }
}

impl From<serde_json::Value> for RowValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => RowValue::Empty,
            Value::Bool(b) => RowValue::Bool(b),
            Value::Number(n) => n.as_f64().map(RowValue::Number).unwrap_or_default(),
            Value::String(s) => RowValue::Text(s),
            Value::Array(items) if items.iter().all(Value::is_object) => {
                RowValue::Rows(items.into_iter().filter_map(Row::from_json).collect())
            }
            other => RowValue::Text(other.to_string()),
        }
    }
}
