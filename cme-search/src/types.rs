//! Query input, per-strategy/composite output, and analytics shapes for
//! the integrated search engine.

use chrono::{DateTime, Utc};

use cme_core::memory::{Memory, Sector};
use cme_storage::queries::metadata_ops::MetadataFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    FullText,
    Vector,
    Metadata,
    Similarity,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::FullText => "full_text",
            StrategyKind::Vector => "vector",
            StrategyKind::Metadata => "metadata",
            StrategyKind::Similarity => "similarity",
        }
    }
}

/// A search request. At least one of `text`, `embedding`, `metadata`, or
/// `similar_to` must be set.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub user_id: String,
    pub text: Option<String>,
    pub embedding: Option<(Sector, Vec<f32>)>,
    pub metadata: Option<MetadataFilter>,
    pub similar_to: Option<String>,
    pub min_strength: Option<f64>,
    pub min_salience: Option<f64>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct StrategyScore {
    pub strategy: StrategyKind,
    pub score: f64,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub memory: Memory,
    pub composite_score: f64,
    pub rank: usize,
    pub strategy_scores: Vec<StrategyScore>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total_considered: usize,
    pub cache_hit: bool,
    pub elapsed_ms: u64,
}

/// One row of the search-analytics feed: an aggregate fact about a single
/// `search()` call, independent of its result content.
#[derive(Debug, Clone)]
pub struct AnalyticsRecord {
    pub query_id: String,
    pub strategies_used: Vec<StrategyKind>,
    pub elapsed_ms: u64,
    pub results_count: usize,
    pub cache_hit: bool,
    pub query_shape: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsAggregate {
    pub total_searches: u64,
    pub mean_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub cache_hit_rate: f64,
    pub mean_results: f64,
    pub strategy_usage: Vec<(String, u64)>,
    pub top_queries: Vec<(String, u64)>,
}
