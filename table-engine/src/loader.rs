//! FILENAME: table-engine/src/loader.rs
//! Host-supplied asynchronous loaders for lazy children and remote pages.
//!
//! Both traits are implemented for plain closures returning futures, so a
//! host can pass `|row: &Row| async move { ... }` directly.

use std::future::Future;

use engine::Row;
use thiserror::Error;

use crate::remote::{PageRequest, PageResponse};

/// Failure reported by a host loader. Never surfaces past the table: a
/// failed child load yields no children, a failed page load an empty page.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Load failed: {0}")]
    Failed(String),

    #[error("Load cancelled")]
    Cancelled,
}

impl From<String> for LoadError {
    fn from(message: String) -> Self {
        LoadError::Failed(message)
    }
}

impl From<&str> for LoadError {
    fn from(message: &str) -> Self {
        LoadError::Failed(message.to_string())
    }
}

/// Loads the children of a lazily expandable row.
pub trait ChildLoader {
    fn load_children(&self, row: &Row) -> impl Future<Output = Result<Vec<Row>, LoadError>>;
}

impl<F, Fut> ChildLoader for F
where
    F: Fn(&Row) -> Fut,
    Fut: Future<Output = Result<Vec<Row>, LoadError>>,
{
    fn load_children(&self, row: &Row) -> impl Future<Output = Result<Vec<Row>, LoadError>> {
        self(row)
    }
}

/// Loads one page of rows from a server that sorts, filters or paginates.
pub trait PageLoader {
    fn load_page(&self, request: &PageRequest) -> impl Future<Output = Result<PageResponse, LoadError>>;
}

impl<F, Fut> PageLoader for F
where
    F: Fn(&PageRequest) -> Fut,
    Fut: Future<Output = Result<PageResponse, LoadError>>,
{
    fn load_page(&self, request: &PageRequest) -> impl Future<Output = Result<PageResponse, LoadError>> {
        self(request)
    }
}
