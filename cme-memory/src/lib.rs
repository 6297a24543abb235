//! Transactional memory repository (C6): CRUD, batch operations, stats,
//! graph views, and the timeline — all backed by `cme-storage` and
//! `cme-graph`, one `StorageEngine::transaction` per mutating call.

pub mod repository;
pub mod types;

pub use repository::MemoryRepository;
pub use types::{
    BatchCreateRequest, BatchDeleteResult, BatchItemResult, BatchRetrieveResult, CreateRequest,
    EmotionalTrendPoint, GraphQuery, GraphViewResult, RecentActivityItem, SectorCount, Stats,
    TimelineQuery, TimelineResult, UpdateOutcome, UpdateRequest,
};
