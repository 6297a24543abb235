//! Core domain types: `Memory`, its five-sector tag, metadata, links, and
//! the append-only event/history records that back the timeline and
//! consolidation audit trail.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the five categories a memory is primarily associated with;
/// also the axis along which five embeddings are produced per memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Episodic,
    Semantic,
    Procedural,
    Emotional,
    Reflective,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Episodic,
        Sector::Semantic,
        Sector::Procedural,
        Sector::Emotional,
        Sector::Reflective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Episodic => "episodic",
            Sector::Semantic => "semantic",
            Sector::Procedural => "procedural",
            Sector::Emotional => "emotional",
            Sector::Reflective => "reflective",
        }
    }

    pub fn parse(s: &str) -> Option<Sector> {
        Some(match s {
            "episodic" => Sector::Episodic,
            "semantic" => Sector::Semantic,
            "procedural" => Sector::Procedural,
            "emotional" => Sector::Emotional,
            "reflective" => Sector::Reflective,
            _ => return None,
        })
    }
}

/// State of the five per-sector embedding vectors for a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    Pending,
    Complete,
    Failed,
}

impl EmbeddingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingStatus::Pending => "pending",
            EmbeddingStatus::Complete => "complete",
            EmbeddingStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<EmbeddingStatus> {
        Some(match s {
            "pending" => EmbeddingStatus::Pending,
            "complete" => EmbeddingStatus::Complete,
            "failed" => EmbeddingStatus::Failed,
            _ => return None,
        })
    }
}

/// Minimum/maximum content length, per the data model invariant.
pub const MIN_CONTENT_LEN: usize = 10;
pub const MAX_CONTENT_LEN: usize = 100_000;

/// A single memory record. Invariants (content bounds, sector validity,
/// `consolidated_into != id`) are enforced by the repository on
/// create/update, not re-checked on every field access here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub primary_sector: Sector,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
    pub salience: f64,
    pub strength: f64,
    pub decay_rate: f64,
    pub embedding_status: EmbeddingStatus,
    pub consolidated_into: Option<String>,
    pub consolidated_from: Option<Vec<String>>,
    /// blake3 hash of `content`, used to detect whether an update changed
    /// content (and therefore whether embeddings must be regenerated).
    pub content_hash: String,
}

impl Memory {
    pub fn content_hash_of(content: &str) -> String {
        blake3::hash(content.as_bytes()).to_hex().to_string()
    }

    pub fn is_summary(&self) -> bool {
        self.consolidated_from.is_some()
    }
}

/// Per-memory metadata row: keywords/tags as sets, a category, free context,
/// importance, atomicity, and an optional parent for hierarchical notes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metadata {
    pub keywords: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub category: Option<String>,
    pub context: String,
    pub importance: f64,
    pub is_atomic: bool,
    pub parent_id: Option<String>,
}

/// The closed set of directed edge kinds between memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Semantic,
    Temporal,
    Causal,
    Associative,
    Consolidation,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Semantic => "semantic",
            LinkType::Temporal => "temporal",
            LinkType::Causal => "causal",
            LinkType::Associative => "associative",
            LinkType::Consolidation => "consolidation",
        }
    }

    pub fn parse(s: &str) -> Option<LinkType> {
        Some(match s {
            "semantic" => LinkType::Semantic,
            "temporal" => LinkType::Temporal,
            "causal" => LinkType::Causal,
            "associative" => LinkType::Associative,
            "consolidation" => LinkType::Consolidation,
            _ => return None,
        })
    }
}

/// A directed weighted edge between two memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub source_id: String,
    pub target_id: String,
    pub link_type: LinkType,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub traversal_count: u64,
}

/// Append-only audit row for one consolidation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub summary_memory_id: String,
    pub consolidated_memory_ids: Vec<String>,
    pub similarity_threshold: f64,
    pub cluster_size: usize,
    pub consolidated_at: DateTime<Utc>,
}

/// The kinds of mutation the timeline (`getTimeline`) replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryEventType {
    Created,
    ContentUpdated,
    AccessRecorded,
    MetadataUpdated,
    LinkAdded,
    LinkRemoved,
    SoftDeleted,
    Restored,
    Consolidated,
}

impl MemoryEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryEventType::Created => "created",
            MemoryEventType::ContentUpdated => "content_updated",
            MemoryEventType::AccessRecorded => "access_recorded",
            MemoryEventType::MetadataUpdated => "metadata_updated",
            MemoryEventType::LinkAdded => "link_added",
            MemoryEventType::LinkRemoved => "link_removed",
            MemoryEventType::SoftDeleted => "soft_deleted",
            MemoryEventType::Restored => "restored",
            MemoryEventType::Consolidated => "consolidated",
        }
    }

    pub fn parse(s: &str) -> Option<MemoryEventType> {
        Some(match s {
            "created" => MemoryEventType::Created,
            "content_updated" => MemoryEventType::ContentUpdated,
            "access_recorded" => MemoryEventType::AccessRecorded,
            "metadata_updated" => MemoryEventType::MetadataUpdated,
            "link_added" => MemoryEventType::LinkAdded,
            "link_removed" => MemoryEventType::LinkRemoved,
            "soft_deleted" => MemoryEventType::SoftDeleted,
            "restored" => MemoryEventType::Restored,
            "consolidated" => MemoryEventType::Consolidated,
            _ => return None,
        })
    }
}

/// One row of the append-only `memory_events` log backing `getTimeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub event_id: u64,
    pub memory_id: String,
    pub user_id: String,
    pub recorded_at: DateTime<Utc>,
    pub event_type: MemoryEventType,
    pub delta: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_round_trips() {
        for s in Sector::ALL {
            assert_eq!(Sector::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn content_hash_is_stable() {
        let a = Memory::content_hash_of("hello world");
        let b = Memory::content_hash_of("hello world");
        let c = Memory::content_hash_of("hello world!");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
