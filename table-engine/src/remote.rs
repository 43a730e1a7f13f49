//! FILENAME: table-engine/src/remote.rs
//! Remote Bridge - decides when the local pipeline is bypassed in favour of
//! the host's page loader, and keeps overlapping loads from clobbering each
//! other.
//!
//! Every load gets a ticket with a fresh token. Only the newest ticket can
//! be completed; an older completion is stale and discarded.

use engine::{FilterMode, Row, SortDirection};
use serde::{Deserialize, Serialize};

use crate::definition::ServerCapabilities;

/// What caused a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshReason {
    Init,
    Sort,
    Filter,
    Page,
}

/// True when `reason` has to go through the page loader.
pub fn should_fetch(reason: RefreshReason, server: &ServerCapabilities) -> bool {
    if server.pagination {
        return true;
    }
    match reason {
        RefreshReason::Sort => server.sorting,
        RefreshReason::Filter => server.filtering,
        RefreshReason::Init => server.sorting || server.filtering,
        RefreshReason::Page => false,
    }
}

/// Parameters handed to the page loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
    pub sort_key: Option<String>,
    pub sort_direction: SortDirection,
    pub filter_text: String,
    pub filter_mode: FilterMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    #[serde(default)]
    pub rows: Vec<Row>,
    /// Total row count on the server. The row count is used when absent.
    #[serde(default)]
    pub total: Option<usize>,
}

impl PageResponse {
    pub fn new(rows: Vec<Row>, total: usize) -> Self {
        PageResponse {
            rows,
            total: Some(total),
        }
    }

    pub fn total_count(&self) -> usize {
        self.total.unwrap_or(self.rows.len())
    }
}

/// Handle for one in-flight page load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageTicket {
    pub token: u64,
    pub request: PageRequest,
}

/// What a state change asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshAction {
    /// The view can be read right away.
    Local,
    /// Run the page loader for this ticket and complete it.
    Remote(PageTicket),
    /// The identical request is already in flight.
    Pending,
}

impl RefreshAction {
    pub fn ticket(&self) -> Option<&PageTicket> {
        match self {
            RefreshAction::Remote(ticket) => Some(ticket),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RemoteBridge {
    next_token: u64,
    in_flight: Option<PageTicket>,
}

impl RemoteBridge {
    pub fn new() -> Self {
        RemoteBridge::default()
    }

    /// Issues a ticket for `request`, superseding any older one.
    pub fn begin(&mut self, request: PageRequest) -> RefreshAction {
        if let Some(current) = &self.in_flight {
            if current.request == request {
                return RefreshAction::Pending;
            }
        }
        self.next_token += 1;
        let ticket = PageTicket {
            token: self.next_token,
            request,
        };
        self.in_flight = Some(ticket.clone());
        RefreshAction::Remote(ticket)
    }

    pub fn is_current(&self, ticket: &PageTicket) -> bool {
        self.in_flight.as_ref().is_some_and(|t| t.token == ticket.token)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Closes the current ticket. Returns false for a stale one.
    pub fn finish(&mut self, ticket: &PageTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Drops the in-flight ticket; its completion will be stale.
    pub fn cancel(&mut self) {
        self.in_flight = None;
    }
}
