//! FILENAME: table-engine/src/view.rs
//! Table View - the ordered rows of one page, ready for rendering.
//!
//! Pipeline: filter -> sort -> (group | tree flatten) -> page window.
//! Stages the server handles are skipped. With server pagination the stored
//! rows already are the page, so nothing is sliced and the total comes from
//! the last response.

use engine::{
    filter_rows, flatten_tree, group_rows, paginate, resolve_sort_column, sort_rows, tree_visibility,
    Column, CompiledFilter, FlattenParams, GroupResult, PageWindow, Row, RowId, SortDirection,
    TreeNodeView,
};
use serde::Serialize;

use crate::definition::TableOptions;
use crate::state::TableState;

/// One group on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView<'a> {
    #[serde(flatten)]
    pub group: GroupResult<'a>,
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum TableBody<'a> {
    Rows(Vec<&'a Row>),
    Groups(Vec<GroupView<'a>>),
    Tree(Vec<TreeNodeView<'a>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView<'a> {
    pub body: TableBody<'a>,
    pub window: PageWindow,
    /// Message of the last invalid filter pattern.
    pub filter_error: Option<&'a str>,
    /// A remote page load is in flight.
    pub loading: bool,
}

impl<'a> TableView<'a> {
    /// Rows on the page, in display order. Grouped pages list every row of
    /// every group; tree pages list the emitted nodes.
    pub fn rows(&self) -> Vec<&'a Row> {
        match &self.body {
            TableBody::Rows(rows) => rows.clone(),
            TableBody::Groups(groups) => groups.iter().flat_map(|g| g.group.rows.iter().copied()).collect(),
            TableBody::Tree(nodes) => nodes.iter().map(|n| n.row).collect(),
        }
    }

    /// Ids of `rows()`.
    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows().iter().filter_map(|r| r.id).collect()
    }

    /// Number of entries on the page: rows, groups or tree nodes.
    pub fn len(&self) -> usize {
        match &self.body {
            TableBody::Rows(rows) => rows.len(),
            TableBody::Groups(groups) => groups.len(),
            TableBody::Tree(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn groups(&self) -> &[GroupView<'a>] {
        match &self.body {
            TableBody::Groups(groups) => groups,
            _ => &[],
        }
    }

    pub fn tree_nodes(&self) -> &[TreeNodeView<'a>] {
        match &self.body {
            TableBody::Tree(nodes) => nodes,
            _ => &[],
        }
    }
}

/// Runs the whole pipeline over `rows` for the current state.
pub fn compute_view<'a>(
    rows: &'a [Row],
    columns: &'a [Column],
    options: &'a TableOptions,
    state: &'a TableState,
    loading: bool,
) -> TableView<'a> {
    let server = options.server;

    let pass_through = CompiledFilter::pass_through();
    let filter = if options.filterable && !server.filtering {
        &state.compiled
    } else {
        &pass_through
    };

    let sort: Option<(&Column, SortDirection)> = if options.sortable && !server.sorting {
        state.sort.as_ref().and_then(|spec| {
            resolve_sort_column(columns, Some(spec))
                .filter(|column| column.sortable)
                .map(|column| (column, spec.direction))
        })
    } else {
        None
    };

    let (body, window) = if options.tree.enabled && !state.is_pivot() {
        let visible = filter
            .is_active()
            .then(|| tree_visibility(rows, columns, filter, &options.tree.children_field));
        let params = FlattenParams {
            options: &options.tree,
            state: &state.tree,
            sort,
            visible: visible.as_ref(),
        };
        let nodes = flatten_tree(rows, &params);
        let (nodes, window) = window_items(nodes, options, state);
        (TableBody::Tree(nodes), window)
    } else {
        let refs: Vec<&Row> = rows.iter().collect();
        let mut matched = filter_rows(&refs, columns, filter);
        if let Some((column, direction)) = sort {
            sort_rows(&mut matched, column, direction);
        }

        match grouping_key(options, state) {
            Some(key) => {
                let groups: Vec<GroupView<'a>> = group_rows(&matched, key, columns)
                    .into_iter()
                    .map(|group| GroupView {
                        collapsed: state.collapsed_groups.contains(&group.value),
                        group,
                    })
                    .collect();
                let (groups, window) = window_items(groups, options, state);
                (TableBody::Groups(groups), window)
            }
            None => {
                let (page, window) = window_items(matched, options, state);
                (TableBody::Rows(page), window)
            }
        }
    };

    TableView {
        body,
        window,
        filter_error: state.filter_error(),
        loading,
    }
}

/// Grouping is suspended in tree and pivot mode.
fn grouping_key<'s>(options: &TableOptions, state: &'s TableState) -> Option<&'s str> {
    if !options.groupable || state.is_pivot() {
        return None;
    }
    state.group_by.as_deref().filter(|key| !key.is_empty())
}

fn window_items<T>(items: Vec<T>, options: &TableOptions, state: &TableState) -> (Vec<T>, PageWindow) {
    if options.server.pagination && !state.is_pivot() {
        let total = state.server_total.unwrap_or(items.len());
        return (items, PageWindow::compute(state.page, state.page_size, total));
    }
    let page_size = options.pagination.then_some(state.page_size);
    paginate(items, state.page, page_size)
}
