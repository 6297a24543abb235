/// Outcome of consolidating one accepted cluster.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    pub summary_memory_id: String,
    pub consolidated_memory_ids: Vec<String>,
    pub mean_similarity: f64,
    pub topic: String,
}

/// Result of one `consolidate` call for a user.
#[derive(Debug, Clone, Default)]
pub struct ConsolidationReport {
    pub candidates_considered: usize,
    pub clusters: Vec<ClusterOutcome>,
    pub skipped_clusters: usize,
}
