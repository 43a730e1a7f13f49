//! FILENAME: table-engine/src/definition.rs
//! Table Definition - The serializable configuration.
//!
//! Everything a host sets at construction: page sizes, sort/filter/group
//! defaults, tree options and which stages the server handles.

use engine::{FilterMode, SortSpec, TreeOptions, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};

/// Stages delegated to the host's page loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerCapabilities {
    pub pagination: bool,
    pub sorting: bool,
    pub filtering: bool,
}

impl ServerCapabilities {
    pub fn any(&self) -> bool {
        self.pagination || self.sorting || self.filtering
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOptions {
    pub page_size: usize,

    /// Page sizes a host may offer.
    pub page_sizes: Vec<usize>,

    /// When false every row is on page 1.
    pub pagination: bool,

    /// Global switch for local sorting.
    pub sortable: bool,

    /// Global switch for local filtering.
    pub filterable: bool,

    /// When false `group_by` is ignored.
    pub groupable: bool,

    pub filter_mode: FilterMode,

    pub sort: Option<SortSpec>,

    pub group_by: Option<String>,

    pub tree: TreeOptions,

    pub server: ServerCapabilities,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            page_size: DEFAULT_PAGE_SIZE,
            page_sizes: vec![10, 25, 50, 100],
            pagination: true,
            sortable: true,
            filterable: true,
            groupable: true,
            filter_mode: FilterMode::Plain,
            sort: None,
            group_by: None,
            tree: TreeOptions::default(),
            server: ServerCapabilities::default(),
        }
    }
}

impl TableOptions {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_tree(mut self, tree: TreeOptions) -> Self {
        self.tree = tree;
        self
    }

    pub fn with_server(mut self, server: ServerCapabilities) -> Self {
        self.server = server;
        self
    }

    pub fn with_group_by(mut self, key: impl Into<String>) -> Self {
        self.group_by = Some(key.into());
        self
    }

    pub fn without_pagination(mut self) -> Self {
        self.pagination = false;
        self
    }
}
