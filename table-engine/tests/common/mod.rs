//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for table-engine integration tests.

#![allow(dead_code)]

use engine::{Column, ColumnAggregation, Row, TreeOptions};
use serde_json::json;
use table_engine::{DataTable, TableOptions};

/// Test harness wrapping one table instance.
pub struct TestHarness {
    pub table: DataTable,
}

impl TestHarness {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>, options: TableOptions) -> Self {
        TestHarness {
            table: DataTable::new(columns, rows, options),
        }
    }

    /// The three-person score table.
    pub fn with_people() -> Self {
        Self::with_people_options(TableOptions::default())
    }

    pub fn with_people_options(options: TableOptions) -> Self {
        Self::new(PeopleFixture::columns(), PeopleFixture::rows(), options)
    }

    /// Department revenue rows with a `sum` aggregate on `rev`.
    pub fn with_departments() -> Self {
        let rows = Row::list_from_json(json!([
            { "dept": "A", "rev": 10 },
            { "dept": "B", "rev": 5 },
            { "dept": "A", "rev": 7 }
        ]));
        let columns = vec![
            Column::new("dept"),
            Column::number("rev").with_aggregations(&[ColumnAggregation::Sum]),
        ];
        Self::new(columns, rows, TableOptions::default())
    }

    /// A small file-system style tree.
    pub fn with_tree(tree: TreeOptions) -> Self {
        let rows = Row::list_from_json(json!([
            { "id": 1, "name": "src", "children": [
                { "id": 2, "name": "lib.rs" },
                { "id": 3, "name": "target", "children": [{ "id": 4, "name": "debug" }] }
            ]},
            { "id": 5, "name": "docs", "hasChildren": true }
        ]));
        let columns = vec![Column::number("id"), Column::new("name")];
        Self::new(columns, rows, TableOptions::default().with_tree(tree))
    }

    /// Numbered rows `n` = 1..=count.
    pub fn with_numbers(count: usize, page_size: usize) -> Self {
        let rows = (1..=count)
            .map(|n| Row::new().with("n", n as f64).with("parity", if n % 2 == 0 { "even" } else { "odd" }))
            .collect();
        let columns = vec![Column::number("n"), Column::new("parity")];
        Self::new(columns, rows, TableOptions::default().with_page_size(page_size))
    }

    /// `key` of every row on the current page, as numbers.
    pub fn page_numbers(&self, key: &str) -> Vec<f64> {
        numbers(&self.table.view().rows(), key)
    }

    /// `key` of every row on the current page, as text.
    pub fn page_texts(&self, key: &str) -> Vec<String> {
        texts(&self.table.view().rows(), key)
    }
}

pub fn numbers(rows: &[&Row], key: &str) -> Vec<f64> {
    rows.iter().filter_map(|r| r.get(key).to_number()).collect()
}

pub fn texts(rows: &[&Row], key: &str) -> Vec<String> {
    rows.iter().map(|r| r.get(key).to_text()).collect()
}

/// Scores of three people.
pub struct PeopleFixture;

impl PeopleFixture {
    pub fn rows() -> Vec<Row> {
        Row::list_from_json(json!([
            { "id": 1, "name": "Anna", "score": 70 },
            { "id": 2, "name": "Ben", "score": 95 },
            { "id": 3, "name": "Cara", "score": 95 }
        ]))
    }

    pub fn columns() -> Vec<Column> {
        vec![Column::number("id"), Column::new("name"), Column::number("score")]
    }
}

/// Sample sales data for pivot tests.
pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["Region", "Product", "Quarter", "Sales", "Quantity"]
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("North", "Widget", "Q1", 1000.0, 10.0),
            ("North", "Gadget", "Q1", 1500.0, 15.0),
            ("South", "Widget", "Q1", 800.0, 8.0),
            ("South", "Gadget", "Q1", 1200.0, 12.0),
            ("North", "Widget", "Q2", 1100.0, 11.0),
            ("North", "Gadget", "Q2", 1600.0, 16.0),
            ("South", "Widget", "Q2", 900.0, 9.0),
            ("South", "Gadget", "Q2", 1300.0, 13.0),
            ("East", "Widget", "Q1", 700.0, 7.0),
            ("East", "Gadget", "Q2", 500.0, 5.0),
        ]
    }

    pub fn rows() -> Vec<Row> {
        Self::data()
            .into_iter()
            .map(|(region, product, quarter, sales, quantity)| {
                Row::new()
                    .with("region", region)
                    .with("product", product)
                    .with("quarter", quarter)
                    .with("sales", sales)
                    .with("quantity", quantity)
            })
            .collect()
    }

    pub fn columns() -> Vec<Column> {
        let keys = ["region", "product", "quarter", "sales", "quantity"];
        Self::headers()
            .into_iter()
            .zip(keys)
            .map(|(label, key)| {
                let column = if key == "sales" || key == "quantity" {
                    Column::number(key)
                } else {
                    Column::new(key)
                };
                column.with_label(label)
            })
            .collect()
    }

    pub fn harness() -> TestHarness {
        TestHarness::new(Self::columns(), Self::rows(), TableOptions::default())
    }
}
