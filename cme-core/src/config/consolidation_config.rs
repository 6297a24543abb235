use serde::{Deserialize, Serialize};

/// Parameters for one consolidation run (C8), operator-provided per user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Minimum pairwise cosine similarity for two memories to join a cluster.
    pub similarity_threshold: f64,
    /// Minimum accepted cluster size.
    pub min_cluster_size: usize,
    /// Maximum unconsolidated episodic memories loaded per run.
    pub batch_size: usize,
    /// Multiplier applied to an original's `strength` once consolidated.
    pub strength_reduction_factor: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            min_cluster_size: 5,
            batch_size: 100,
            strength_reduction_factor: 0.5,
        }
    }
}

impl ConsolidationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err("similarity_threshold must be within [0, 1]".to_string());
        }
        if self.min_cluster_size < 2 {
            return Err("min_cluster_size must be at least 2".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.strength_reduction_factor) {
            return Err("strength_reduction_factor must be within [0, 1]".to_string());
        }
        Ok(())
    }
}
