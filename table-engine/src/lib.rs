//! FILENAME: table-engine/src/lib.rs
//! Stateful data table built on the `engine` pipeline stages.
//!
//! A `DataTable` owns its rows, their identity index and the user-facing
//! state (filter, sort, grouping, page, tree expansion, selection, pivot
//! mode). It depends on `engine` for the stages and on `pivot-engine` for
//! pivot mode.
//!
//! Layers:
//! - `definition`: Serializable options (what the table IS)
//! - `state`: Mutable state set by the host
//! - `remote` / `loader`: Server-delegated stages and host loaders
//! - `view`: The current page (WHAT we display)
//! - `engine`: The table itself (HOW state changes)

pub mod definition;
pub mod state;
pub mod loader;
pub mod remote;
pub mod view;
pub mod engine;

pub use definition::{ServerCapabilities, TableOptions};
pub use loader::{ChildLoader, LoadError, PageLoader};
pub use remote::{should_fetch, PageRequest, PageResponse, PageTicket, RefreshAction, RefreshReason, RemoteBridge};
pub use state::{PageSelection, PivotMode, TableState};
pub use view::{compute_view, GroupView, TableBody, TableView};
pub use crate::engine::DataTable;
