use serde::{Deserialize, Serialize};

/// Configuration for the SQLite-backed persistence layer (C0/C1/C2/C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file, or ":memory:" for an ephemeral store.
    pub database_path: String,
    /// Embedding vector dimension, shared across all five sectors.
    pub vector_dimension: usize,
    /// Default namespace for embeddings when the caller does not specify one.
    pub default_namespace: String,
    /// Default page size for metadata filter results.
    pub default_page_size: usize,
    /// Hard cap on metadata filter / batch page size.
    pub max_page_size: usize,
    /// Max number of items accepted by batch create/retrieve/delete.
    pub max_batch_size: usize,
    /// Configured upper bound reported by `getStats` as `total_capacity`.
    pub total_capacity: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: ":memory:".to_string(),
            vector_dimension: 768,
            default_namespace: "default".to_string(),
            default_page_size: 50,
            max_page_size: 500,
            max_batch_size: 100,
            total_capacity: 1_000_000,
        }
    }
}
