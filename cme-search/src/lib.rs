//! Integrated search (C7): fans a query out to the full-text, vector,
//! metadata, and similarity strategies concurrently under a deadline,
//! composite-scores the union, and caches/records the result.

pub mod analytics;
pub mod engine;
pub mod strategies;
pub mod types;

pub use analytics::Analytics;
pub use engine::SearchEngine;
pub use types::{
    AnalyticsAggregate, AnalyticsRecord, SearchHit, SearchQuery, SearchResponse, StrategyKind, StrategyScore,
};
