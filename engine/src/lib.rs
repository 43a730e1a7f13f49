//! FILENAME: engine/src/lib.rs
//! PURPOSE: Shared row model and the stateless stages of the row data pipeline.
//! CONTEXT: Every stage is a pure function of its inputs. The stateful table
//! (`table-engine`) and the pivot producer (`pivot-engine`) compose them.

pub mod aggregate;
pub mod column;
pub mod error;
pub mod filter;
pub mod group;
pub mod identity;
pub mod logging;
pub mod pagination;
pub mod row;
pub mod sort;
pub mod tree;
pub mod value;

// Re-export commonly used types at the crate root
pub use aggregate::AggregateAccumulator;
pub use column::{find_column, CellRenderer, Column, ColumnAggregation, ColumnType, ValueComparator};
pub use error::EngineError;
pub use filter::{
    cell_text, filter_rows, markup_text, strip_markup, tree_visibility, CompiledFilter, FilterMode,
    FilterSpec, RowMatcher,
};
pub use group::{compute_aggregates, group_key, group_rows, ColumnAggregate, GroupResult, NULL_GROUP_KEY};
pub use identity::{resolve_path, resolve_path_mut, RowIdentityIndex, RowPath};
pub use pagination::{paginate, PageWindow, DEFAULT_PAGE_SIZE};
pub use row::{Row, RowId, ROW_ID_KEY};
pub use sort::{
    compare_default, compare_values, natural_cmp, resolve_sort_column, sort_owned_rows, sort_rows,
    SortDirection, SortSpec,
};
pub use tree::{
    flatten_tree, ChildLoadTicket, ExpandAction, FlattenParams, LoadOutcome, NodeState, TreeNodeView,
    TreeOptions, TreeState,
};
pub use value::{format_number, RowValue};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scores() -> (Vec<Row>, Vec<Column>) {
        let mut rows = Row::list_from_json(json!([
            { "id": 1, "name": "Anna", "score": 70 },
            { "id": 2, "name": "Ben", "score": 95 },
            { "id": 3, "name": "Cara", "score": 95 }
        ]));
        RowIdentityIndex::new().reindex(&mut rows, "children");
        let columns = vec![Column::number("id"), Column::new("name"), Column::number("score")];
        (rows, columns)
    }

    fn ids(rows: &[&Row]) -> Vec<f64> {
        rows.iter().filter_map(|r| r.get("id").to_number()).collect()
    }

    #[test]
    fn filter_sort_paginate_chain() {
        let (rows, columns) = scores();
        let refs: Vec<&Row> = rows.iter().collect();

        let filter = CompiledFilter::compile(&FilterSpec::plain(""));
        let mut visible = filter_rows(&refs, &columns, &filter);

        let score = resolve_sort_column(&columns, Some(&SortSpec::desc("score"))).unwrap();
        sort_rows(&mut visible, score, SortDirection::Desc);
        assert_eq!(ids(&visible), vec![2.0, 3.0, 1.0]);

        let by_id = find_column(&columns, "id").unwrap();
        sort_rows(&mut visible, by_id, SortDirection::Asc);
        let (page_one, window) = paginate(visible.clone(), 1, Some(2));
        let (page_two, _) = paginate(visible, 2, Some(2));
        assert_eq!(window.total_pages, 2);
        assert_eq!(ids(&page_one), vec![1.0, 2.0]);
        assert_eq!(ids(&page_two), vec![3.0]);
    }

    #[test]
    fn reversing_direction_twice_restores_order() {
        let (rows, columns) = scores();
        let mut refs: Vec<&Row> = rows.iter().collect();
        let name = find_column(&columns, "name").unwrap();

        sort_rows(&mut refs, name, SortDirection::Asc);
        let first = ids(&refs);
        sort_rows(&mut refs, name, SortDirection::Desc);
        sort_rows(&mut refs, name, SortDirection::Asc);
        assert_eq!(ids(&refs), first);
    }
}
