//! FILENAME: pivot-engine/src/lib.rs
//! Pivot / cross-tab subsystem.
//!
//! This crate turns a row collection into a derived table whose rows are
//! row-field groupings and whose columns are value fields, optionally sliced
//! by column-field groupings. It depends on `engine` only for shared types
//! (Row, Column, AggregateAccumulator).
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot IS)
//! - `cache`: Partitioned internal representation (HOW we compute)
//! - `view`: Derived rows and columns (WHAT we display)
//! - `engine`: Calculation engine (HOW we calculate)

pub mod definition;
pub mod cache;
pub mod view;
pub mod engine;

pub use definition::*;
pub use cache::*;
pub use view::*;
pub use crate::engine::{aggregate, available_fields, calculate_pivot, cell_value, drill_down, PivotCalculator};
