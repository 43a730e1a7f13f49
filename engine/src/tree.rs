//! FILENAME: engine/src/tree.rs
//! PURPOSE: Tree Flattening Engine - expand/collapse bookkeeping, lazy child
//! load coordination and depth-first flattening of a hierarchy into rows.
//! CONTEXT: `TreeState` stores the expanded and loading flags independently.
//! A node mid-load is loading and not yet expanded, so its children only
//! appear once the load completes. Every load carries a token; completing
//! with an outdated token is reported as stale and changes nothing.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::row::{Row, RowId};
use crate::sort::{sort_rows, SortDirection};

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeOptions {
    pub enabled: bool,
    /// Field holding the child row collection.
    pub children_field: String,
    /// Field flagging that a node may have children not loaded yet.
    pub has_children_field: String,
    /// Load children on first expand through the host loader.
    pub lazy: bool,
    /// Start with every parent node expanded.
    pub initially_expanded: bool,
    /// Indent per level in pixels. Rendering only.
    pub indent: u32,
}

impl Default for TreeOptions {
    fn default() -> Self {
        TreeOptions {
            enabled: false,
            children_field: "children".to_string(),
            has_children_field: "hasChildren".to_string(),
            lazy: false,
            initially_expanded: false,
            indent: 16,
        }
    }
}

impl TreeOptions {
    pub fn enabled() -> Self {
        TreeOptions {
            enabled: true,
            ..TreeOptions::default()
        }
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn initially_expanded(mut self, initially_expanded: bool) -> Self {
        self.initially_expanded = initially_expanded;
        self
    }

    /// Materialized children or the potential-children marker.
    pub fn may_have_children(&self, row: &Row) -> bool {
        row.has_children(&self.children_field) || row.has_potential_children(&self.has_children_field)
    }

    /// True when expanding `row` has to go through the child loader first.
    /// A stored children list, even an empty one, counts as loaded.
    pub fn needs_lazy_load(&self, row: &Row) -> bool {
        self.enabled
            && self.lazy
            && row.children(&self.children_field).is_none()
            && row.has_potential_children(&self.has_children_field)
    }
}

// ============================================================================
// NODE STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeState {
    Leaf,
    Collapsed,
    Loading,
    Expanded,
}

/// Handle for one in-flight child load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChildLoadTicket {
    pub row_id: RowId,
    pub token: u64,
}

/// What an expand request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandAction {
    /// The node is now expanded; children were already available.
    Expanded,
    AlreadyExpanded,
    /// The host must load children and complete the ticket.
    LoadChildren(ChildLoadTicket),
    /// A load for this node is already in flight.
    AlreadyLoading,
    NotFound,
    /// The node has no children and no potential children.
    Leaf,
}

/// Result of completing an asynchronous load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadOutcome {
    Applied,
    /// The ticket was superseded or cancelled; the result was discarded.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct TreeState {
    expanded: FxHashSet<RowId>,
    /// Row id -> token of its in-flight load.
    loading: FxHashMap<RowId, u64>,
    next_token: u64,
}

impl TreeState {
    pub fn new() -> Self {
        TreeState::default()
    }

    /// Forgets expand and loading flags. In-flight tickets become stale.
    pub fn clear(&mut self) {
        self.expanded.clear();
        self.loading.clear();
    }

    pub fn is_expanded(&self, id: RowId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn is_loading(&self, id: RowId) -> bool {
        self.loading.contains_key(&id)
    }

    pub fn expanded_ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.expanded.iter().copied()
    }

    pub fn node_state(&self, row: &Row, options: &TreeOptions) -> NodeState {
        let Some(id) = row.id else {
            return NodeState::Leaf;
        };
        if self.is_loading(id) {
            NodeState::Loading
        } else if self.is_expanded(id) {
            NodeState::Expanded
        } else if options.may_have_children(row) {
            NodeState::Collapsed
        } else {
            NodeState::Leaf
        }
    }

    /// Resolves an expand request for `row`, starting a load when needed.
    pub fn request_expand(&mut self, row: &Row, options: &TreeOptions) -> ExpandAction {
        let Some(id) = row.id else {
            return ExpandAction::NotFound;
        };
        if self.is_loading(id) {
            return ExpandAction::AlreadyLoading;
        }
        if self.is_expanded(id) {
            return ExpandAction::AlreadyExpanded;
        }
        if options.needs_lazy_load(row) {
            return ExpandAction::LoadChildren(self.begin_load(id));
        }
        if !options.may_have_children(row) {
            return ExpandAction::Leaf;
        }
        self.expanded.insert(id);
        ExpandAction::Expanded
    }

    /// Reverts to collapsed; materialized children are kept by the caller.
    pub fn collapse(&mut self, id: RowId) -> bool {
        self.expanded.remove(&id)
    }

    pub fn expand(&mut self, id: RowId) {
        self.expanded.insert(id);
    }

    /// Issues a fresh ticket, superseding any earlier one for the node.
    pub fn begin_load(&mut self, id: RowId) -> ChildLoadTicket {
        self.next_token += 1;
        self.loading.insert(id, self.next_token);
        ChildLoadTicket {
            row_id: id,
            token: self.next_token,
        }
    }

    pub fn is_current(&self, ticket: &ChildLoadTicket) -> bool {
        self.loading.get(&ticket.row_id) == Some(&ticket.token)
    }

    /// Ends a load. Success or failure alike, a current ticket leaves the
    /// node expanded.
    pub fn finish_load(&mut self, ticket: &ChildLoadTicket) -> LoadOutcome {
        if !self.is_current(ticket) {
            return LoadOutcome::Stale;
        }
        self.loading.remove(&ticket.row_id);
        self.expanded.insert(ticket.row_id);
        LoadOutcome::Applied
    }

    /// Marks every node under `rows` that may have children as expanded.
    /// Nodes still waiting for a lazy load are left collapsed.
    pub fn seed_expanded(&mut self, rows: &[Row], options: &TreeOptions) {
        for row in rows {
            if let Some(id) = row.id {
                if options.may_have_children(row) && !options.needs_lazy_load(row) {
                    self.expanded.insert(id);
                }
            }
            if let Some(children) = row.children(&options.children_field) {
                self.seed_expanded(children, options);
            }
        }
    }

    /// Drops flags for ids the predicate rejects (rows that no longer exist).
    pub fn retain(&mut self, mut keep: impl FnMut(RowId) -> bool) {
        self.expanded.retain(|id| keep(*id));
        self.loading.retain(|id, _| keep(*id));
    }
}

// ============================================================================
// FLATTENING
// ============================================================================

/// One emitted line of a flattened tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TreeNodeView<'a> {
    pub row: &'a Row,
    /// 0 for roots.
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub loading: bool,
}

/// Inputs for one flattening pass.
#[derive(Debug, Clone, Copy)]
pub struct FlattenParams<'p> {
    pub options: &'p TreeOptions,
    pub state: &'p TreeState,
    /// Sibling sort: applied within each children list, never across levels.
    pub sort: Option<(&'p Column, SortDirection)>,
    /// Filter visibility. `Some` means a filter is active: only listed nodes
    /// are emitted and every emitted node is treated as expanded.
    pub visible: Option<&'p FxHashSet<RowId>>,
}

/// Depth-first, pre-order flattening.
pub fn flatten_tree<'a>(roots: &'a [Row], params: &FlattenParams<'_>) -> Vec<TreeNodeView<'a>> {
    let mut out = Vec::new();
    flatten_level(roots, 0, params, &mut out);
    out
}

fn flatten_level<'a>(nodes: &'a [Row], depth: usize, params: &FlattenParams<'_>, out: &mut Vec<TreeNodeView<'a>>) {
    let mut ordered: Vec<&'a Row> = nodes.iter().collect();
    if let Some((column, direction)) = params.sort {
        sort_rows(&mut ordered, column, direction);
    }

    for node in ordered {
        if let Some(visible) = params.visible {
            if !node.id.is_some_and(|id| visible.contains(&id)) {
                continue;
            }
        }

        let (expanded, loading) = match node.id {
            Some(id) => (
                params.visible.is_some() || params.state.is_expanded(id),
                params.state.is_loading(id),
            ),
            None => (params.visible.is_some(), false),
        };

        out.push(TreeNodeView {
            row: node,
            depth,
            has_children: params.options.may_have_children(node),
            expanded,
            loading,
        });

        if expanded {
            if let Some(children) = node.children(&params.options.children_field) {
                flatten_level(children, depth + 1, params, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{tree_visibility, CompiledFilter, FilterSpec};
    use crate::identity::RowIdentityIndex;
    use serde_json::json;

    fn forest() -> Vec<Row> {
        let mut rows = Row::list_from_json(json!([
            { "name": "b-root", "children": [
                { "name": "z" },
                { "name": "a", "children": [{ "name": "deep" }] }
            ]},
            { "name": "a-root", "hasChildren": true }
        ]));
        RowIdentityIndex::new().reindex(&mut rows, "children");
        rows
    }

    fn names(nodes: &[TreeNodeView<'_>]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| format!("{}@{}", n.row.get("name").to_text(), n.depth))
            .collect()
    }

    #[test]
    fn collapsed_tree_shows_roots_only() {
        let rows = forest();
        let options = TreeOptions::enabled();
        let state = TreeState::new();
        let params = FlattenParams { options: &options, state: &state, sort: None, visible: None };
        let flat = flatten_tree(&rows, &params);
        assert_eq!(names(&flat), vec!["b-root@0", "a-root@0"]);
        assert!(flat.iter().all(|n| n.has_children && !n.expanded));
    }

    #[test]
    fn expanded_nodes_recurse_with_sibling_sort() {
        let rows = forest();
        let options = TreeOptions::enabled();
        let mut state = TreeState::new();
        assert_eq!(state.request_expand(&rows[0], &options), ExpandAction::Expanded);
        assert_eq!(state.request_expand(&rows[0], &options), ExpandAction::AlreadyExpanded);

        let name = Column::new("name");
        let params = FlattenParams {
            options: &options,
            state: &state,
            sort: Some((&name, SortDirection::Asc)),
            visible: None,
        };
        let flat = flatten_tree(&rows, &params);
        assert_eq!(
            names(&flat),
            vec![
                "a-root@0",
                "b-root@0",
                "a@1",
                "z@1",
            ]
        );
    }

    #[test]
    fn leaf_cannot_expand() {
        let rows = forest();
        let options = TreeOptions::enabled();
        let mut state = TreeState::new();
        let leaf = &rows[0].children("children").unwrap()[0];
        assert_eq!(state.request_expand(leaf, &options), ExpandAction::Leaf);
        assert_eq!(state.node_state(leaf, &options), NodeState::Leaf);
    }

    #[test]
    fn lazy_load_tickets_go_stale_when_superseded() {
        let rows = forest();
        let options = TreeOptions::enabled().lazy(true);
        let mut state = TreeState::new();
        let lazy_root = &rows[1];

        let first = match state.request_expand(lazy_root, &options) {
            ExpandAction::LoadChildren(ticket) => ticket,
            other => panic!("expected load, got {:?}", other),
        };
        assert_eq!(state.request_expand(lazy_root, &options), ExpandAction::AlreadyLoading);
        assert_eq!(state.node_state(lazy_root, &options), NodeState::Loading);
        assert!(!state.is_expanded(first.row_id));

        let second = state.begin_load(first.row_id);
        assert_eq!(state.finish_load(&first), LoadOutcome::Stale);
        assert_eq!(state.finish_load(&second), LoadOutcome::Applied);
        assert_eq!(state.node_state(lazy_root, &options), NodeState::Expanded);
    }

    #[test]
    fn active_filter_forces_ancestors_open() {
        let rows = forest();
        let options = TreeOptions::enabled();
        let state = TreeState::new();
        let columns = vec![Column::new("name")];
        let filter = CompiledFilter::compile(&FilterSpec::plain("deep").tree_aware(true));
        let visible = tree_visibility(&rows, &columns, &filter, &options.children_field);

        let params = FlattenParams { options: &options, state: &state, sort: None, visible: Some(&visible) };
        let flat = flatten_tree(&rows, &params);
        assert_eq!(
            names(&flat),
            vec!["b-root@0", "a@1", "deep@2"]
        );
        assert!(flat[0].expanded);
    }

    #[test]
    fn seeding_expands_every_parent() {
        let rows = forest();
        let options = TreeOptions::enabled().initially_expanded(true);
        let mut state = TreeState::new();
        state.seed_expanded(&rows, &options);
        let mut ids: Vec<RowId> = state.expanded_ids().collect();
        ids.sort_unstable();
        // b-root=0, a=2, a-root=4
        assert_eq!(ids, vec![0, 2, 4]);
        assert!(state.collapse(0));
        assert!(!state.is_expanded(0));
    }
}
