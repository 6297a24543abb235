//! Request/response shapes for the memory repository's public contract.

use chrono::{DateTime, Utc};

use cme_core::memory::{Memory, MemoryEvent, Metadata, Sector};

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub user_id: String,
    pub session_id: Option<String>,
    pub content: String,
    pub primary_sector: Sector,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub memory_id: String,
    pub user_id: String,
    pub content: Option<String>,
    pub strength: Option<f64>,
    pub salience: Option<f64>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub memory: Memory,
    pub embeddings_regenerated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BatchCreateRequest {
    pub user_id: String,
    pub session_id: Option<String>,
    pub memories: Vec<(String, Sector, Option<Metadata>)>,
}

#[derive(Debug, Clone)]
pub struct BatchItemResult {
    pub index: usize,
    pub memory: Option<Memory>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchRetrieveResult {
    pub found: Vec<Memory>,
    pub not_found: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchDeleteResult {
    pub id: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SectorCount {
    pub sector: Sector,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct RecentActivityItem {
    pub memory_id: String,
    pub recorded_at: String,
    pub event_type: String,
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub counts_by_sector: Vec<SectorCount>,
    pub total_memories: i64,
    pub total_capacity: u64,
    pub consolidation_pending: i64,
    pub recent_activity: Vec<RecentActivityItem>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphQuery {
    pub user_id: String,
    pub center_memory_id: Option<String>,
    pub depth: usize,
    pub type_filter: Option<Vec<Sector>>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphViewResult {
    pub nodes: Vec<Memory>,
    pub edges: Vec<cme_core::memory::Link>,
}

#[derive(Debug, Clone, Default)]
pub struct TimelineQuery {
    pub user_id: String,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub emotional_only: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EmotionalTrendPoint {
    pub day: String,
    pub event_count: usize,
    pub mean_salience: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TimelineResult {
    pub events: Vec<MemoryEvent>,
    pub emotional_trend: Vec<EmotionalTrendPoint>,
}
