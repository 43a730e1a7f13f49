//! FILENAME: engine/src/sort.rs
//! Sort Engine - type-aware, stable ordering of rows by one column.
//!
//! Comparison order: a custom comparator when the column carries one (falling
//! back on failure), then absent values first, then a type-specific
//! comparison. Direction reverses the whole comparison, so absent values
//! trail in descending order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::column::{find_column, Column, ColumnType};
use crate::filter::strip_markup;
use crate::row::Row;
use crate::value::RowValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub key: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        SortSpec {
            key: key.into(),
            direction,
        }
    }

    pub fn asc(key: impl Into<String>) -> Self {
        SortSpec::new(key, SortDirection::Asc)
    }

    pub fn desc(key: impl Into<String>) -> Self {
        SortSpec::new(key, SortDirection::Desc)
    }
}

/// Finds the column a sort applies to. An unknown key sorts nothing.
pub fn resolve_sort_column<'c>(columns: &'c [Column], sort: Option<&SortSpec>) -> Option<&'c Column> {
    let sort = sort?;
    find_column(columns, &sort.key)
}

/// Compares two raw values the way `column` wants them ordered (ascending).
pub fn compare_values(a: &RowValue, b: &RowValue, column: &Column) -> Ordering {
    if let Some(comparator) = &column.comparator {
        if let Some(ordering) = (comparator.0)(a, b) {
            return ordering;
        }
    }
    compare_default(a, b, &column.column_type)
}

/// Type-based comparison without any custom comparator.
pub fn compare_default(a: &RowValue, b: &RowValue, column_type: &ColumnType) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    match column_type {
        ColumnType::Number => compare_numbers(a.to_number(), b.to_number()),
        ColumnType::Html => natural_cmp(&strip_markup(&a.to_text()), &strip_markup(&b.to_text())),
        _ => natural_cmp(&a.to_text(), &b.to_text()),
    }
}

/// Unparsable numbers count as absent and sort first.
fn compare_numbers(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Natural, case-insensitive text comparison: digit runs compare by numeric
/// value ("item2" < "item10"), everything else by folded characters.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let run_a = take_digits(&mut left);
                let run_b = take_digits(&mut right);
                let ordering = compare_digit_runs(&run_a, &run_b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Stable sort of row references by one column.
pub fn sort_rows(rows: &mut [&Row], column: &Column, direction: SortDirection) {
    rows.sort_by(|ra, rb| direction.apply(compare_values(ra.get(&column.key), rb.get(&column.key), column)));
}

/// Same as `sort_rows` for owned rows (used on sibling lists in tree mode).
pub fn sort_owned_rows(rows: &mut [Row], column: &Column, direction: SortDirection) {
    rows.sort_by(|ra, rb| direction.apply(compare_values(ra.get(&column.key), rb.get(&column.key), column)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        Row::list_from_json(json!([
            { "name": "item10", "price": "$5" },
            { "name": "Item2", "price": 20 },
            { "name": null, "price": "n/a" },
            { "name": "item1", "price": 5 }
        ]))
    }

    fn keys(rows: &[&Row], key: &str) -> Vec<String> {
        rows.iter().map(|r| r.get(key).to_text()).collect()
    }

    #[test]
    fn natural_order_ignores_case() {
        assert_eq!(natural_cmp("item2", "Item10"), Ordering::Less);
        assert_eq!(natural_cmp("ABC", "abc"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "ab"), Ordering::Less);
        assert_eq!(natural_cmp("x007", "x7"), Ordering::Equal);
    }

    #[test]
    fn text_sort_puts_absent_first() {
        let data = rows();
        let mut refs: Vec<&Row> = data.iter().collect();
        sort_rows(&mut refs, &Column::new("name"), SortDirection::Asc);
        assert_eq!(keys(&refs, "name"), vec!["", "item1", "Item2", "item10"]);

        sort_rows(&mut refs, &Column::new("name"), SortDirection::Desc);
        assert_eq!(keys(&refs, "name"), vec!["item10", "Item2", "item1", ""]);
    }

    #[test]
    fn number_sort_coerces_and_is_stable() {
        let data = rows();
        let mut refs: Vec<&Row> = data.iter().collect();
        sort_rows(&mut refs, &Column::number("price"), SortDirection::Asc);
        // "n/a" has no numeric value; "$5" and 5 tie and keep input order
        assert_eq!(keys(&refs, "name"), vec!["", "item10", "item1", "Item2"]);
    }

    #[test]
    fn html_compares_text_content() {
        let a = RowValue::text("<b>beta</b>");
        let b = RowValue::text("<i>Alpha</i>");
        assert_eq!(compare_default(&a, &b, &ColumnType::Html), Ordering::Greater);
    }

    #[test]
    fn failing_comparator_falls_back() {
        let column = Column::number("n").with_comparator(|a, b| match (a, b) {
            (RowValue::Number(x), RowValue::Number(y)) => y.partial_cmp(x),
            _ => None,
        });
        assert_eq!(
            compare_values(&RowValue::Number(1.0), &RowValue::Number(2.0), &column),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&RowValue::text("1"), &RowValue::text("2"), &column),
            Ordering::Less
        );
    }

    #[test]
    fn unknown_sort_key_resolves_to_nothing() {
        let columns = vec![Column::new("name")];
        assert!(resolve_sort_column(&columns, Some(&SortSpec::asc("missing"))).is_none());
        assert!(resolve_sort_column(&columns, None).is_none());
        assert!(resolve_sort_column(&columns, Some(&SortSpec::desc("name"))).is_some());
    }
}
