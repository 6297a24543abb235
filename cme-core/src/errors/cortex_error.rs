use super::{ConsolidationError, EmbeddingError, SearchError, StorageError};

/// Top-level error type for the cognitive memory engine.
/// All subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum CortexError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("memory not found: {id}")]
    NotFoundError { id: String },

    #[error("forbidden: memory {id} is not owned by the caller")]
    ForbiddenError { id: String },

    #[error("conflict: {0}")]
    ConflictError(String),

    #[error("transaction failed, rolled back: {0}")]
    TransactionError(String),

    #[error("operation timed out after {elapsed_ms}ms")]
    TimeoutError { elapsed_ms: u64 },

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("search error: {0}")]
    SearchError(#[from] SearchError),

    #[error("consolidation error: {0}")]
    ConsolidationError(#[from] ConsolidationError),

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Convenience type alias.
pub type CortexResult<T> = Result<T, CortexError>;
