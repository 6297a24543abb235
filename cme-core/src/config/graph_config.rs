use serde::{Deserialize, Serialize};

/// Configuration for waypoint-link proposal and graph-view assembly (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Similarity threshold above which a waypoint link is proposed at write time.
    pub waypoint_similarity_threshold: f64,
    /// Maximum number of waypoint links proposed per new memory.
    pub max_waypoints_per_memory: usize,
    /// Weight assigned to symmetric consolidation edges.
    pub consolidation_link_weight: f64,
    /// Default/maximum depth for `getGraph` BFS.
    pub default_graph_depth: usize,
    pub max_graph_depth: usize,
    /// Size of the default seed set when `getGraph` is called without a center.
    pub default_seed_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            waypoint_similarity_threshold: 0.6,
            max_waypoints_per_memory: 5,
            consolidation_link_weight: 0.9,
            default_graph_depth: 2,
            max_graph_depth: 5,
            default_seed_size: 10,
        }
    }
}
