//! Query modules, one per concern. Each is a thin wrapper over raw SQL —
//! no business logic (ownership checks, validation, cache invalidation)
//! lives here; that belongs to the crate that calls into storage.

pub mod consolidation_ops;
pub mod embedding_ops;
pub mod fts_ops;
pub mod link_ops;
pub mod memory_crud;
pub mod metadata_ops;
pub mod stats_ops;
pub mod timeline_ops;
