//! FILENAME: engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid filter pattern '{pattern}': {message}")]
    InvalidFilterPattern { pattern: String, message: String },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}
