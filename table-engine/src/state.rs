//! FILENAME: table-engine/src/state.rs
//! Table State - everything the host changes after construction.
//!
//! The state never touches rows. `DataTable` owns the rows and feeds both
//! into the view pipeline.

use engine::{CompiledFilter, Column, FilterMode, FilterSpec, Row, RowId, SortSpec, TreeState};
use pivot_engine::{PivotConfig, PivotResult};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::definition::TableOptions;

/// Tri-state checkbox over the rows of the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSelection {
    None,
    Partial,
    All,
}

impl PageSelection {
    pub fn from_counts(selected: usize, total: usize) -> Self {
        if total == 0 || selected == 0 {
            PageSelection::None
        } else if selected == total {
            PageSelection::All
        } else {
            PageSelection::Partial
        }
    }
}

/// Active pivot: its config, its output and the data it replaced.
#[derive(Debug, Clone)]
pub struct PivotMode {
    pub config: PivotConfig,
    pub result: PivotResult,
    pub original_rows: Vec<Row>,
    pub original_columns: Vec<Column>,
}

#[derive(Debug, Clone)]
pub struct TableState {
    pub filter: FilterSpec,

    /// `filter` compiled once per change. Its `error` is what the host shows.
    pub compiled: CompiledFilter,

    pub sort: Option<SortSpec>,

    pub group_by: Option<String>,

    /// Group values whose rows are folded away in the display.
    pub collapsed_groups: FxHashSet<String>,

    /// 1-based, clamped whenever the view is computed.
    pub page: usize,

    pub page_size: usize,

    pub tree: TreeState,

    pub selection: FxHashSet<RowId>,

    /// Total reported by the last successful remote load.
    pub server_total: Option<usize>,

    pub pivot: Option<PivotMode>,
}

impl TableState {
    pub fn from_options(options: &TableOptions) -> Self {
        let filter = FilterSpec::new("", options.filter_mode).tree_aware(options.tree.enabled);
        TableState {
            compiled: CompiledFilter::pass_through(),
            filter,
            sort: options.sort.clone(),
            group_by: options.group_by.clone(),
            collapsed_groups: FxHashSet::default(),
            page: 1,
            page_size: if options.page_size == 0 { engine::DEFAULT_PAGE_SIZE } else { options.page_size },
            tree: TreeState::new(),
            selection: FxHashSet::default(),
            server_total: None,
            pivot: None,
        }
    }

    /// Replaces the filter text (and mode when given) and recompiles.
    pub fn set_filter(&mut self, text: &str, mode: Option<FilterMode>) {
        self.filter.text = text.to_string();
        if let Some(mode) = mode {
            self.filter.mode = mode;
        }
        self.compiled = CompiledFilter::compile(&self.filter);
    }

    pub fn filter_error(&self) -> Option<&str> {
        self.compiled.error.as_deref()
    }

    pub fn is_pivot(&self) -> bool {
        self.pivot.is_some()
    }
}
