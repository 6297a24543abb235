use serde::{Deserialize, Serialize};

/// Configuration for the integrated search engine (C3/C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum accepted length of a raw full-text query string.
    pub max_query_chars: usize,
    /// Maximum `limit` a caller may request.
    pub max_limit: usize,
    /// Default `limit` when the caller omits one.
    pub default_limit: usize,
    /// Wall-clock deadline for one integrated search call, across all
    /// fanned-out strategies.
    pub max_execution_time_ms: u64,
    /// Result cache capacity (entries), keyed by non-pagination query shape.
    pub cache_capacity: u64,
    /// Result cache TTL.
    pub cache_ttl_secs: u64,
    /// Full-text strategy weight in the composite score.
    pub weight_fulltext: f64,
    /// Vector-similarity strategy weight.
    pub weight_vector: f64,
    /// Metadata-filter strategy weight.
    pub weight_metadata: f64,
    /// `similarTo` strategy weight.
    pub weight_similarity: f64,
    /// How long analytics records are retained.
    pub analytics_retention_days: u32,
    /// Whether to execute strategies sequentially instead of fanned out.
    pub sequential_execution: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_query_chars: 1000,
            max_limit: 200,
            default_limit: 20,
            max_execution_time_ms: 5_000,
            cache_capacity: 1_000,
            cache_ttl_secs: 60,
            weight_fulltext: 0.30,
            weight_vector: 0.35,
            weight_metadata: 0.15,
            weight_similarity: 0.20,
            analytics_retention_days: 30,
            sequential_execution: false,
        }
    }
}
