//! # Evorobo IO
//!
//! Persistence layer for optimization runs.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - JSON helpers for values stored as text
//! - The SQLite schema of a run file and its version check
//! - Row types and queries for the EA tables and optimizer checkpoints
//! - Read-only replay queries

/// SQLite open, schema creation and version checks
pub mod database;
/// Rows of the evolutionary-algorithm tables
pub mod ea;
/// Error types and result aliases for I/O operations
pub mod error;
/// Checkpoint rows of the optimizer table
pub mod optimizer_state;
/// Queries used to pick individuals for replay
pub mod replay;
/// JSON serialization helpers
pub mod serialization;

pub use database::{
    check_schema_version, create_tables, open_database_sqlite, open_existing, schema_version,
    SCHEMA_VERSION,
};
pub use error::{IoError, Result};
pub use optimizer_state::DbOptimizerState;
pub use serialization::{from_json, to_json, to_json_pretty};
