//! # cme-core
//!
//! Shared domain types, error taxonomy, and configuration for the
//! cognitive memory engine. Every other `cme-*` crate depends on this
//! one; it depends on nothing in the workspace.

pub mod config;
pub mod errors;
pub mod memory;
pub mod traits;

pub use config::CortexConfig;
pub use errors::{CortexError, CortexResult};
pub use memory::{
    EmbeddingStatus, Link, LinkType, Memory, MemoryEvent, MemoryEventType, Metadata, Sector,
};
pub use traits::{Embedding, EmbeddingProvider, Summarizer};
