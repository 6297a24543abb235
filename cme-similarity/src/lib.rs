//! Composite multi-factor similarity between two memories (C4): a
//! weighted sum of keyword overlap, tag overlap, semantic-sector content
//! similarity, category match, and temporal proximity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use cme_core::config::SimilarityConfig;
use cme_core::memory::{Memory, Metadata};

/// Per-factor breakdown, returned when `findSimilar` is asked for an
/// explanation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityBreakdown {
    pub keyword_overlap: f64,
    pub tag_overlap: f64,
    pub content_similarity: f64,
    pub category_match: f64,
    pub temporal_proximity: f64,
    pub composite: f64,
}

/// The two memories plus the bits their similarity depends on: metadata
/// (keyword/tag/category) and an optional semantic-sector embedding.
pub struct SimilarityInput<'a> {
    pub memory: &'a Memory,
    pub metadata: Option<&'a Metadata>,
    pub semantic_embedding: Option<&'a [f32]>,
}

/// Computes composite similarity, memoizing per-pair results for the
/// lifetime of one calculator instance (one request/run).
pub struct SimilarityCalculator {
    config: SimilarityConfig,
    cache: DashMap<(String, String), SimilarityBreakdown>,
}

impl SimilarityCalculator {
    pub fn new(config: SimilarityConfig) -> Self {
        debug_assert!(config.is_valid(), "similarity weights must sum to 1.0");
        Self {
            config,
            cache: DashMap::new(),
        }
    }

    /// Composite similarity between `a` and `b`, memoized by id pair
    /// (order-independent — `(a, b)` and `(b, a)` share a cache entry).
    pub fn similarity(&self, a: &SimilarityInput<'_>, b: &SimilarityInput<'_>) -> SimilarityBreakdown {
        if a.memory.id == b.memory.id {
            return SimilarityBreakdown {
                keyword_overlap: 1.0,
                tag_overlap: 1.0,
                content_similarity: 1.0,
                category_match: 1.0,
                temporal_proximity: 1.0,
                composite: 1.0,
            };
        }

        let key = if a.memory.id <= b.memory.id {
            (a.memory.id.clone(), b.memory.id.clone())
        } else {
            (b.memory.id.clone(), a.memory.id.clone())
        };
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let keyword_overlap = a
            .metadata
            .zip(b.metadata)
            .map(|(ma, mb)| jaccard(&lower(&ma.keywords), &lower(&mb.keywords)))
            .unwrap_or(0.0);

        let tag_overlap = a
            .metadata
            .zip(b.metadata)
            .map(|(ma, mb)| jaccard(&lower(&ma.tags), &lower(&mb.tags)))
            .unwrap_or(0.0);

        let content_similarity = a
            .semantic_embedding
            .zip(b.semantic_embedding)
            .map(|(va, vb)| cosine_similarity(va, vb))
            .unwrap_or(0.0);

        let category_match = a
            .metadata
            .zip(b.metadata)
            .and_then(|(ma, mb)| Some((ma.category.as_ref()?, mb.category.as_ref()?)))
            .map(|(ca, cb)| {
                if !ca.is_empty() && ca.to_lowercase() == cb.to_lowercase() {
                    1.0
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0);

        let temporal_proximity =
            temporal_proximity(a.memory.created_at, b.memory.created_at, self.config.temporal_lambda());

        let composite = self.config.weight_keyword_overlap * keyword_overlap
            + self.config.weight_tag_overlap * tag_overlap
            + self.config.weight_content_similarity * content_similarity
            + self.config.weight_category_match * category_match
            + self.config.weight_temporal_proximity * temporal_proximity;

        let breakdown = SimilarityBreakdown {
            keyword_overlap,
            tag_overlap,
            content_similarity,
            category_match,
            temporal_proximity,
            composite,
        };
        self.cache.insert(key, breakdown);
        breakdown
    }
}

fn lower(set: &BTreeSet<String>) -> BTreeSet<String> {
    set.iter().map(|s| s.to_lowercase()).collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

fn temporal_proximity(a: DateTime<Utc>, b: DateTime<Utc>, lambda: f64) -> f64 {
    let minutes = (a - b).num_seconds().abs() as f64 / 60.0;
    (-lambda * minutes).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cme_core::memory::Sector;

    fn memory_at(id: &str, minutes_ago: i64) -> Memory {
        Memory {
            id: id.to_string(),
            content: "hello world test content".to_string(),
            user_id: "u1".to_string(),
            session_id: None,
            primary_sector: Sector::Episodic,
            created_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
            last_accessed: Utc::now(),
            access_count: 0,
            salience: 0.5,
            strength: 1.0,
            decay_rate: 0.0,
            embedding_status: cme_core::memory::EmbeddingStatus::Complete,
            consolidated_into: None,
            consolidated_from: None,
            content_hash: Memory::content_hash_of("hello world test content"),
        }
    }

    #[test]
    fn identical_ids_return_one() {
        let calc = SimilarityCalculator::new(SimilarityConfig::default());
        let m = memory_at("m1", 0);
        let input = SimilarityInput {
            memory: &m,
            metadata: None,
            semantic_embedding: None,
        };
        assert_eq!(calc.similarity(&input, &input).composite, 1.0);
    }

    #[test]
    fn missing_inputs_contribute_zero_not_error() {
        let calc = SimilarityCalculator::new(SimilarityConfig::default());
        let a = memory_at("a", 0);
        let b = memory_at("b", 1000);
        let ia = SimilarityInput {
            memory: &a,
            metadata: None,
            semantic_embedding: None,
        };
        let ib = SimilarityInput {
            memory: &b,
            metadata: None,
            semantic_embedding: None,
        };
        let breakdown = calc.similarity(&ia, &ib);
        assert_eq!(breakdown.keyword_overlap, 0.0);
        assert_eq!(breakdown.content_similarity, 0.0);
        assert!(breakdown.composite >= 0.0);
    }

    #[test]
    fn jaccard_full_overlap_is_one() {
        let a: BTreeSet<String> = ["rust".into(), "sqlite".into()].into();
        let b = a.clone();
        assert_eq!(jaccard(&a, &b), 1.0);
    }

    #[test]
    fn temporal_proximity_decays_with_distance() {
        let lambda = SimilarityConfig::default().temporal_lambda();
        let close = temporal_proximity(Utc::now(), Utc::now(), lambda);
        let far = temporal_proximity(Utc::now(), Utc::now() - chrono::Duration::hours(10), lambda);
        assert!(close > far);
    }

    #[test]
    fn result_is_memoized_symmetrically() {
        let calc = SimilarityCalculator::new(SimilarityConfig::default());
        let a = memory_at("a", 0);
        let b = memory_at("b", 5);
        let ia = SimilarityInput {
            memory: &a,
            metadata: None,
            semantic_embedding: None,
        };
        let ib = SimilarityInput {
            memory: &b,
            metadata: None,
            semantic_embedding: None,
        };
        let ab = calc.similarity(&ia, &ib);
        let ba = calc.similarity(&ib, &ia);
        assert_eq!(calc.cache.len(), 1);
        assert_eq!(ab.composite, ba.composite);
    }
}
