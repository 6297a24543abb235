//! SQLite persistence layer for the cognitive memory engine: schema
//! migrations, a single-writer `StorageEngine`, and the query modules that
//! implement the data-store contract each higher-level crate relies on.

pub mod engine;
pub mod migrations;
pub mod queries;

pub use engine::StorageEngine;

/// Wrap a raw SQLite error message as a `CortexError::StorageError`. Every
/// query module funnels its `rusqlite::Error` conversions through here so
/// storage failures surface uniformly regardless of which table they came
/// from.
pub fn to_storage_err(msg: String) -> cme_core::CortexError {
    cme_core::CortexError::StorageError(cme_core::errors::StorageError::SqliteError { message: msg })
}
