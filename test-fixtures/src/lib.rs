//! Fixture builders and deterministic test doubles shared by integration
//! tests across the workspace. Depends only on `cme-core` so it can be a
//! dev-dependency of any crate without creating a dependency cycle.

use chrono::Utc;

use cme_core::errors::CortexResult;
use cme_core::memory::{EmbeddingStatus, Link, LinkType, Memory, Metadata, Sector};
use cme_core::traits::{Embedding, EmbeddingProvider, Summarizer};

/// Builds a `Memory` with sensible defaults, overridden field by field.
pub struct MemoryBuilder {
    memory: Memory,
}

impl MemoryBuilder {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let now = Utc::now();
        Self {
            memory: Memory {
                id: id.into(),
                content_hash: Memory::content_hash_of(&content),
                content,
                user_id: user_id.into(),
                session_id: None,
                primary_sector: Sector::Episodic,
                created_at: now,
                last_accessed: now,
                access_count: 0,
                salience: 0.5,
                strength: 1.0,
                decay_rate: 0.1,
                embedding_status: EmbeddingStatus::Complete,
                consolidated_into: None,
                consolidated_from: None,
            },
        }
    }

    pub fn sector(mut self, sector: Sector) -> Self {
        self.memory.primary_sector = sector;
        self
    }

    pub fn strength(mut self, strength: f64) -> Self {
        self.memory.strength = strength;
        self
    }

    pub fn salience(mut self, salience: f64) -> Self {
        self.memory.salience = salience;
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.memory.session_id = Some(session_id.into());
        self
    }

    pub fn build(self) -> Memory {
        self.memory
    }
}

/// Builds a `Metadata` row.
#[derive(Default)]
pub struct MetadataBuilder {
    metadata: Metadata,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.metadata.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.metadata.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.metadata.category = Some(category.into());
        self
    }

    pub fn importance(mut self, importance: f64) -> Self {
        self.metadata.importance = importance;
        self
    }

    pub fn build(self) -> Metadata {
        self.metadata
    }
}

/// A waypoint link builder; defaults to `LinkType::Semantic`, weight 0.5.
pub fn make_link(source_id: impl Into<String>, target_id: impl Into<String>, link_type: LinkType, weight: f64) -> Link {
    Link {
        source_id: source_id.into(),
        target_id: target_id.into(),
        link_type,
        weight,
        created_at: Utc::now(),
        traversal_count: 0,
    }
}

/// A deterministic `EmbeddingProvider`: the vector is a function of the
/// text's blake3 hash, so equal inputs always embed identically and
/// distinct inputs embed distinctly without any real model.
pub struct DeterministicEmbedder {
    dimension: usize,
}

impl DeterministicEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for DeterministicEmbedder {
    async fn embed(&self, text: &str, sector: Sector) -> CortexResult<Embedding> {
        let hash = blake3::hash(format!("{}:{}", sector.as_str(), text).as_bytes());
        let bytes = hash.as_bytes();
        Ok((0..self.dimension)
            .map(|i| (bytes[i % 32] as f32 / 255.0) * 2.0 - 1.0)
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// A `Summarizer` double that concatenates a fixed prefix with the topic
/// and a count of the inputs it was given, with no external call.
pub struct EchoSummarizer;

#[async_trait::async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(&self, _instruction: &str, texts: &[String], topic: &str) -> CortexResult<String> {
        Ok(format!("Summary of {} related memories about {topic}.", texts.len()))
    }
}
