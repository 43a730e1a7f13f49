//! FILENAME: table-engine/src/engine.rs
//! Table Engine - one stateful table instance.
//!
//! `DataTable` exclusively owns the rows, the identity index and the state.
//! Every setter mutates synchronously and tells the host whether a remote
//! load is needed; `view()` is a pure read of the current state.
//!
//! The two suspending operations (lazy children, remote pages) are split in
//! two phases: a request that hands out a ticket, and a completion that
//! takes the ticket back. Completions for superseded tickets are dropped.

use engine::{
    find_column, resolve_path_mut, ChildLoadTicket, Column, EngineError, ExpandAction, FilterMode,
    LoadOutcome, Row, RowId, RowIdentityIndex, RowValue, SortSpec, DEFAULT_PAGE_SIZE,
};
use engine::{log_debug, log_info, log_warn};
use pivot_engine::{
    available_fields, calculate_pivot, drill_down, DrillDownResult, GroupKey, PivotArea, PivotConfig,
    PivotConfigUpdate, PivotResult,
};

use crate::definition::TableOptions;
use crate::loader::{ChildLoader, LoadError, PageLoader};
use crate::remote::{should_fetch, PageRequest, PageResponse, PageTicket, RefreshAction, RefreshReason, RemoteBridge};
use crate::state::{PageSelection, PivotMode, TableState};
use crate::view::{compute_view, TableView};

pub struct DataTable {
    options: TableOptions,
    columns: Vec<Column>,

    /// Current rows: the data, or the pivot output in pivot mode.
    rows: Vec<Row>,

    index: RowIdentityIndex,
    state: TableState,
    remote: RemoteBridge,
}

impl DataTable {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>, options: TableOptions) -> Self {
        let state = TableState::from_options(&options);
        let mut table = DataTable {
            options,
            columns,
            rows: Vec::new(),
            index: RowIdentityIndex::new(),
            state,
            remote: RemoteBridge::new(),
        };
        table.replace_rows(rows);
        table
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn data(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Any row by id, nested children included.
    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.index.get(&self.rows, id, &self.options.tree.children_field)
    }

    pub fn filter_error(&self) -> Option<&str> {
        self.state.filter_error()
    }

    pub fn is_loading(&self) -> bool {
        self.remote.is_loading()
    }

    /// The current page. Deterministic for unchanged state.
    pub fn view(&self) -> TableView<'_> {
        compute_view(&self.rows, &self.columns, &self.options, &self.state, self.remote.is_loading())
    }

    // ========================================================================
    // DATA
    // ========================================================================

    /// Replaces every row. Ids restart from zero; expand and selection state
    /// is dropped and an in-flight page load becomes stale. In pivot mode the
    /// pivot source is replaced instead.
    pub fn set_data(&mut self, rows: Vec<Row>) {
        log_debug!("TABLE", "set_data rows={}", rows.len());
        self.state.page = 1;
        if let Some(pivot) = self.state.pivot.as_mut() {
            pivot.original_rows = rows;
            self.recompute_pivot();
            return;
        }
        self.remote.cancel();
        self.replace_rows(rows);
    }

    pub fn set_columns(&mut self, columns: Vec<Column>) {
        if let Some(pivot) = self.state.pivot.as_mut() {
            pivot.original_columns = columns;
            self.recompute_pivot();
            return;
        }
        self.columns = columns;
    }

    fn replace_rows(&mut self, rows: Vec<Row>) {
        let children_field = &self.options.tree.children_field;
        self.rows = rows;
        self.index.reset();
        self.index.reindex(&mut self.rows, children_field);
        self.state.tree.clear();
        self.state.selection.clear();
        if self.options.tree.enabled && self.options.tree.initially_expanded {
            self.state.tree.seed_expanded(&self.rows, &self.options.tree);
        }
    }

    /// Inserts a root row at `index` (appends when absent or out of range)
    /// and returns its id.
    pub fn add_row(&mut self, row: Row, index: Option<usize>) -> Option<RowId> {
        let children_field = &self.options.tree.children_field;
        let mut row = row;
        self.index.assign_ids(std::slice::from_mut(&mut row), children_field);
        let id = row.id;

        if self.options.tree.enabled && self.options.tree.initially_expanded {
            self.state.tree.seed_expanded(std::slice::from_ref(&row), &self.options.tree);
        }

        match index {
            Some(position) if position < self.rows.len() => self.rows.insert(position, row),
            _ => self.rows.push(row),
        }
        self.index.build_index(&self.rows, children_field);
        log_debug!("TABLE", "add_row id={:?} rows={}", id, self.rows.len());
        id
    }

    /// Shallow-merges `patch` into the row. New nested children get ids.
    pub fn update_row(&mut self, id: RowId, patch: Row) -> Option<&Row> {
        let children_field = &self.options.tree.children_field;
        let row = self.index.get_mut(&mut self.rows, id, children_field)?;
        row.merge(patch);
        self.index.reindex(&mut self.rows, children_field);
        log_debug!("TABLE", "update_row id={}", id);
        self.index.get(&self.rows, id, children_field)
    }

    /// Removes a row (at any depth) with its descendants.
    pub fn delete_row(&mut self, id: RowId) -> Option<Row> {
        let children_field = &self.options.tree.children_field;
        let path = self.index.path(id)?.to_vec();
        let (position, parent) = path.split_last()?;

        let siblings = if parent.is_empty() {
            &mut self.rows
        } else {
            resolve_path_mut(&mut self.rows, parent, children_field)?.children_mut(children_field)?
        };
        if *position >= siblings.len() {
            return None;
        }
        let removed = siblings.remove(*position);

        self.index.build_index(&self.rows, children_field);
        let index = &self.index;
        self.state.selection.retain(|id| index.contains(*id));
        self.state.tree.retain(|id| index.contains(id));
        log_debug!("TABLE", "delete_row id={} rows={}", id, self.rows.len());
        Some(removed)
    }

    // ========================================================================
    // FILTER / SORT / GROUP / PAGE
    // ========================================================================

    /// First refresh after construction.
    pub fn init(&mut self) -> RefreshAction {
        self.refresh(RefreshReason::Init)
    }

    /// Replaces the filter text; `mode` switches the match mode when given.
    /// Back to page 1.
    pub fn set_filter(&mut self, text: &str, mode: Option<FilterMode>) -> RefreshAction {
        self.state.page = 1;
        self.state.set_filter(text, mode);
        log_debug!("TABLE", "set_filter '{}' mode={:?}", text, self.state.filter.mode);
        self.refresh(RefreshReason::Filter)
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) -> RefreshAction {
        if let Some(spec) = &sort {
            if find_column(&self.columns, &spec.key).is_none() {
                log_warn!("SORT", "{}; rows keep their order", EngineError::UnknownColumn(spec.key.clone()));
            }
        }
        self.state.sort = sort;
        if should_fetch(RefreshReason::Sort, &self.options.server) {
            self.state.page = 1;
        }
        self.refresh(RefreshReason::Sort)
    }

    /// Header click: a new key sorts ascending, the current key flips.
    pub fn toggle_sort(&mut self, key: &str) -> RefreshAction {
        let next = match &self.state.sort {
            Some(current) if current.key == key => SortSpec::new(key, current.direction.toggled()),
            _ => SortSpec::asc(key),
        };
        self.set_sort(Some(next))
    }

    /// Moves to `page`, clamped into the current page range.
    pub fn set_page(&mut self, page: usize) -> RefreshAction {
        let total_pages = self.view().window.total_pages;
        self.state.page = page.clamp(1, total_pages);
        self.refresh(RefreshReason::Page)
    }

    /// Zero falls back to the default size. Back to page 1.
    pub fn set_page_size(&mut self, page_size: usize) -> RefreshAction {
        self.state.page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        self.state.page = 1;
        self.refresh(RefreshReason::Page)
    }

    /// Groups rows by `key`; `None` or an empty key turns grouping off.
    pub fn set_group_by(&mut self, key: Option<&str>) {
        self.state.group_by = key.filter(|k| !k.is_empty()).map(str::to_string);
        self.state.collapsed_groups.clear();
        self.state.page = 1;
    }

    /// Flips a group's collapsed flag and returns the new value.
    pub fn toggle_group(&mut self, value: &str) -> bool {
        if self.state.collapsed_groups.remove(value) {
            false
        } else {
            self.state.collapsed_groups.insert(value.to_string());
            true
        }
    }

    // ========================================================================
    // REMOTE
    // ========================================================================

    /// Parameters for the page loader built from the current state.
    pub fn page_request(&self) -> PageRequest {
        let sort = self.state.sort.as_ref();
        PageRequest {
            page: self.state.page,
            page_size: self.state.page_size,
            sort_key: sort.map(|s| s.key.clone()),
            sort_direction: sort.map(|s| s.direction).unwrap_or_default(),
            filter_text: self.state.filter.text.clone(),
            filter_mode: self.state.filter.mode,
        }
    }

    fn refresh(&mut self, reason: RefreshReason) -> RefreshAction {
        if self.state.is_pivot() || !should_fetch(reason, &self.options.server) {
            return RefreshAction::Local;
        }
        let request = self.page_request();
        let action = self.remote.begin(request);
        match &action {
            RefreshAction::Remote(ticket) => {
                log_info!("REMOTE", "load {:?} page={} token={}", reason, ticket.request.page, ticket.token);
            }
            RefreshAction::Pending => log_debug!("REMOTE", "identical load already in flight"),
            RefreshAction::Local => {}
        }
        action
    }

    /// Applies a page loader result. A failed load leaves an empty page and
    /// keeps the previous total.
    pub fn complete_page_load(
        &mut self,
        ticket: &PageTicket,
        result: Result<PageResponse, LoadError>,
    ) -> LoadOutcome {
        if !self.remote.finish(ticket) {
            log_debug!("REMOTE", "stale page load token={} discarded", ticket.token);
            return LoadOutcome::Stale;
        }
        match result {
            Ok(response) => {
                let total = response.total_count();
                log_info!(
                    "REMOTE",
                    "loaded page={} rows={} total={}",
                    ticket.request.page,
                    response.rows.len(),
                    total
                );
                self.replace_rows(response.rows);
                self.state.server_total = Some(total);
                self.state.page = ticket.request.page.max(1);
            }
            Err(err) => {
                log_warn!("REMOTE", "page load token={} failed: {}", ticket.token, err);
                self.replace_rows(Vec::new());
            }
        }
        LoadOutcome::Applied
    }

    /// Runs the loader for a `Remote` action and applies its result.
    /// Returns `None` when there was nothing to load.
    pub async fn run_remote<L: PageLoader>(&mut self, action: RefreshAction, loader: &L) -> Option<LoadOutcome> {
        let RefreshAction::Remote(ticket) = action else {
            return None;
        };
        let result = loader.load_page(&ticket.request).await;
        Some(self.complete_page_load(&ticket, result))
    }

    // ========================================================================
    // TREE
    // ========================================================================

    pub fn request_expand(&mut self, id: RowId) -> ExpandAction {
        let Some(row) = self.index.get(&self.rows, id, &self.options.tree.children_field) else {
            return ExpandAction::NotFound;
        };
        let action = self.state.tree.request_expand(row, &self.options.tree);
        if let ExpandAction::LoadChildren(ticket) = &action {
            log_debug!("TREE", "load children row={} token={}", id, ticket.token);
        }
        action
    }

    /// Keeps materialized children.
    pub fn collapse_row(&mut self, id: RowId) -> bool {
        self.state.tree.collapse(id)
    }

    /// Expanded rows collapse; anything else goes through `request_expand`.
    pub fn toggle_row(&mut self, id: RowId) -> Option<ExpandAction> {
        if self.collapse_row(id) {
            return None;
        }
        Some(self.request_expand(id))
    }

    /// Stores loaded children under the row and expands it. A failed load
    /// stores no children; the node is still expanded.
    pub fn complete_children_load(
        &mut self,
        ticket: &ChildLoadTicket,
        result: Result<Vec<Row>, LoadError>,
    ) -> LoadOutcome {
        if !self.state.tree.is_current(ticket) {
            log_debug!("TREE", "stale children load row={} token={} discarded", ticket.row_id, ticket.token);
            return LoadOutcome::Stale;
        }

        let children = match result {
            Ok(children) => children,
            Err(err) => {
                log_warn!("TREE", "children load row={} failed: {}", ticket.row_id, err);
                Vec::new()
            }
        };

        let children_field = &self.options.tree.children_field;
        let Some(row) = self.index.get_mut(&mut self.rows, ticket.row_id, children_field) else {
            let gone = ticket.row_id;
            self.state.tree.retain(|id| id != gone);
            return LoadOutcome::Stale;
        };
        log_debug!("TREE", "children loaded row={} count={}", ticket.row_id, children.len());
        row.set(children_field.clone(), RowValue::Rows(children));
        self.index.reindex(&mut self.rows, children_field);

        if self.options.tree.initially_expanded {
            let loaded = self
                .index
                .get(&self.rows, ticket.row_id, children_field)
                .and_then(|row| row.children(children_field));
            if let Some(loaded) = loaded {
                self.state.tree.seed_expanded(loaded, &self.options.tree);
            }
        }
        self.state.tree.finish_load(ticket)
    }

    /// `request_expand`, running the loader when the row needs one.
    pub async fn expand_row_with<L: ChildLoader>(&mut self, id: RowId, loader: &L) -> ExpandAction {
        let action = self.request_expand(id);
        let ticket = match action {
            ExpandAction::LoadChildren(ticket) => ticket,
            other => return other,
        };
        let Some(row) = self.row(id).cloned() else {
            return action;
        };
        let result = loader.load_children(&row).await;
        self.complete_children_load(&ticket, result);
        action
    }

    // ========================================================================
    // PIVOT
    // ========================================================================

    pub fn is_pivot_mode(&self) -> bool {
        self.state.is_pivot()
    }

    pub fn pivot_config(&self) -> Option<&PivotConfig> {
        self.state.pivot.as_ref().map(|p| &p.config)
    }

    pub fn pivot_result(&self) -> Option<&PivotResult> {
        self.state.pivot.as_ref().map(|p| &p.result)
    }

    /// Swaps the pivot output in as the table's rows and columns. The data
    /// it replaces is kept aside; enabling again keeps the first backup.
    pub fn enable_pivot(&mut self, config: PivotConfig) {
        let (original_rows, original_columns) = match self.state.pivot.take() {
            Some(active) => (active.original_rows, active.original_columns),
            None => (std::mem::take(&mut self.rows), std::mem::take(&mut self.columns)),
        };
        log_info!(
            "PIVOT",
            "enable rows={:?} columns={:?} values={:?}",
            config.row_fields,
            config.column_fields,
            config.value_fields
        );
        self.state.pivot = Some(PivotMode {
            config,
            result: PivotResult::default(),
            original_rows,
            original_columns,
        });
        self.state.page = 1;
        self.recompute_pivot();
    }

    /// Restores the rows and columns pivot mode replaced.
    pub fn disable_pivot(&mut self) {
        let Some(active) = self.state.pivot.take() else {
            return;
        };
        log_info!("PIVOT", "disable, restoring {} rows", active.original_rows.len());
        self.columns = active.original_columns;
        self.state.page = 1;
        self.replace_rows(active.original_rows);
    }

    /// Partial update of the active config. Does nothing outside pivot mode.
    pub fn update_pivot_config(&mut self, update: PivotConfigUpdate) -> bool {
        let Some(active) = self.state.pivot.as_mut() else {
            return false;
        };
        active.config.apply(update);
        self.recompute_pivot();
        true
    }

    pub fn clear_pivot_config(&mut self) -> bool {
        let Some(active) = self.state.pivot.as_mut() else {
            return false;
        };
        active.config = PivotConfig::default();
        self.recompute_pivot();
        true
    }

    pub fn add_pivot_field(&mut self, area: PivotArea, field: &str) -> bool {
        self.edit_pivot_config(|config| {
            config.add_field(area, field);
            true
        })
    }

    pub fn remove_pivot_field(&mut self, area: PivotArea, field: &str) -> bool {
        self.edit_pivot_config(|config| config.remove_field(area, field))
    }

    /// `offset` -1 moves the field up, +1 down.
    pub fn move_pivot_field(&mut self, area: PivotArea, field: &str, offset: isize) -> bool {
        self.edit_pivot_config(|config| config.move_field(area, field, offset))
    }

    fn edit_pivot_config(&mut self, edit: impl FnOnce(&mut PivotConfig) -> bool) -> bool {
        let Some(active) = self.state.pivot.as_mut() else {
            return false;
        };
        if !edit(&mut active.config) {
            return false;
        }
        self.recompute_pivot();
        true
    }

    fn recompute_pivot(&mut self) {
        let Some(active) = self.state.pivot.as_mut() else {
            return;
        };
        active.result = calculate_pivot(&active.config, &active.original_rows, &active.original_columns);
        log_debug!(
            "PIVOT",
            "recomputed rows={} columns={}",
            active.result.rows.len(),
            active.result.columns.len()
        );
        self.columns = active.result.columns.clone();
        let rows = active.result.rows.clone();
        self.replace_rows(rows);
    }

    /// Field names offered for pivot configuration, taken from the first
    /// original row.
    pub fn available_fields(&self) -> Vec<String> {
        match &self.state.pivot {
            Some(active) => available_fields(&active.original_rows),
            None => available_fields(&self.rows),
        }
    }

    /// Source rows behind one pivot cell. `column_key` narrows to the
    /// column slice of that value column.
    pub fn drill_down(&self, row_key: &GroupKey, column_key: Option<&str>, max_records: usize) -> Option<DrillDownResult> {
        let active = self.state.pivot.as_ref()?;
        let slice = column_key
            .and_then(|key| active.result.value_column(key))
            .and_then(|column| column.slice.as_ref());
        Some(drill_down(&active.config, &active.original_rows, row_key, slice, max_records))
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    /// Returns false for an unknown id.
    pub fn select_row(&mut self, id: RowId, selected: bool) -> bool {
        if !self.index.contains(id) {
            return false;
        }
        if selected {
            self.state.selection.insert(id);
        } else {
            self.state.selection.remove(&id);
        }
        true
    }

    /// Selects or clears every row on the current page.
    pub fn select_page(&mut self, selected: bool) {
        let ids = self.view().row_ids();
        for id in ids {
            if selected {
                self.state.selection.insert(id);
            } else {
                self.state.selection.remove(&id);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.state.selection.clear();
    }

    pub fn is_selected(&self, id: RowId) -> bool {
        self.state.selection.contains(&id)
    }

    /// Selected rows in id order.
    pub fn selected_rows(&self) -> Vec<&Row> {
        let mut ids: Vec<RowId> = self.state.selection.iter().copied().collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.row(id)).collect()
    }

    pub fn page_selection(&self) -> PageSelection {
        let ids = self.view().row_ids();
        let selected = ids.iter().filter(|id| self.state.selection.contains(*id)).count();
        PageSelection::from_counts(selected, ids.len())
    }
}
