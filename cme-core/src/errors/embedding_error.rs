//! Errors surfaced by the external embedding provider (C9).

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedder request failed: {0}")]
    RequestFailed(String),

    #[error("embedder returned {found} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("embedder retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}
