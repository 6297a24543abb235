//! Persistence-layer errors (C0/C1/C2/C5 data-store contract).

/// Errors raised by the SQLite-backed persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {message}")]
    SqliteError { message: String },

    #[error("migration v{version:03} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid filter field '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },

    #[error("connection pool exhausted")]
    PoolExhausted,
}
