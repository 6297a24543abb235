//! Consolidation-engine errors (C8).

/// Cluster-scoped failure during consolidation; other clusters proceed.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidationError {
    #[error("cluster around centroid {centroid_id} ({member_count} members) failed: {cause}")]
    ClusterFailed {
        centroid_id: String,
        member_count: usize,
        cause: String,
    },

    #[error("summariser call failed: {0}")]
    SummarizerFailed(String),

    #[error("invalid consolidation config '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },
}
