//! The four retrieval strategies an integrated search fans out to. Each
//! returns `(memory_id, score ∈ [0,1], explanation)`; a strategy that
//! finds nothing returns an empty vec, never an error that aborts the
//! whole search (failures are caught and absorbed by the caller).

use cme_core::errors::CortexResult;
use cme_core::memory::Sector;
use cme_storage::queries::{embedding_ops, fts_ops, metadata_ops};
use cme_storage::StorageEngine;

use crate::types::StrategyScore;

pub type ScoredIds = Vec<(String, StrategyScore)>;

pub fn run_fulltext(
    storage: &StorageEngine,
    user_id: &str,
    text: &str,
    max_query_chars: usize,
    limit: usize,
) -> CortexResult<ScoredIds> {
    let parsed = cme_fulltext::parse_query(text, max_query_chars)?;
    storage.read(|conn| {
        let hits = fts_ops::search_fts(conn, user_id, &parsed.match_expr, limit)?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }
        let worst = hits.iter().map(|h| h.rank).fold(f64::MIN, f64::max);
        let best = hits.iter().map(|h| h.rank).fold(f64::MAX, f64::min);
        let spread = (worst - best).max(1e-9);

        Ok(hits
            .into_iter()
            .map(|hit| {
                let score = 1.0 - (hit.rank - best) / spread;
                let explanation = format!("matched \"{}\": {}", parsed.matched_terms.join(", "), hit.snippet);
                (
                    hit.memory_id,
                    StrategyScore {
                        strategy: crate::types::StrategyKind::FullText,
                        score,
                        explanation,
                    },
                )
            })
            .collect())
    })
}

pub fn run_vector(
    storage: &StorageEngine,
    user_id: &str,
    sector: Sector,
    query: &[f32],
    limit: usize,
) -> CortexResult<ScoredIds> {
    storage.read(|conn| {
        let hits = embedding_ops::vector_similarity_search(conn, user_id, sector, "default", query, limit)?;
        Ok(hits
            .into_iter()
            .map(|(id, score)| {
                (
                    id,
                    StrategyScore {
                        strategy: crate::types::StrategyKind::Vector,
                        score: score.clamp(0.0, 1.0),
                        explanation: format!("{:.0}% cosine similarity on the {} vector", score.clamp(0.0, 1.0) * 100.0, sector.as_str()),
                    },
                )
            })
            .collect())
    })
}

pub fn run_metadata(
    storage: &StorageEngine,
    user_id: &str,
    filter: &metadata_ops::MetadataFilter,
) -> CortexResult<ScoredIds> {
    storage.read(|conn| {
        let ids = metadata_ops::find_by_metadata(conn, user_id, filter)?;
        Ok(ids
            .into_iter()
            .map(|id| {
                (
                    id,
                    StrategyScore {
                        strategy: crate::types::StrategyKind::Metadata,
                        score: 1.0,
                        explanation: "matched metadata filter".to_string(),
                    },
                )
            })
            .collect())
    })
}

/// `similarTo`: prefilter candidates by semantic-vector proximity to the
/// reference memory, then score each with the full C4 composite so the
/// explanation carries per-factor detail.
pub fn run_similarity(
    storage: &StorageEngine,
    similarity: &cme_similarity::SimilarityCalculator,
    user_id: &str,
    reference_id: &str,
    namespace: &str,
    limit: usize,
) -> CortexResult<ScoredIds> {
    storage.read(|conn| {
        let Some(reference) = cme_storage::queries::memory_crud::get_memory_owned(conn, reference_id, user_id)? else {
            return Ok(Vec::new());
        };
        let reference_metadata = metadata_ops::get_metadata(conn, reference_id)?;
        let reference_embedding = embedding_ops::get_embedding(conn, reference_id, Sector::Semantic, namespace)?;

        let candidate_ids: Vec<String> = if let Some(vector) = &reference_embedding {
            embedding_ops::vector_similarity_search(conn, user_id, Sector::Semantic, namespace, vector, limit * 4)?
                .into_iter()
                .map(|(id, _)| id)
                .filter(|id| id != reference_id)
                .collect()
        } else {
            Vec::new()
        };

        let reference_input = cme_similarity::SimilarityInput {
            memory: &reference,
            metadata: reference_metadata.as_ref(),
            semantic_embedding: reference_embedding.as_deref(),
        };

        let mut scored = Vec::with_capacity(candidate_ids.len());
        for id in candidate_ids {
            let Some(candidate) = cme_storage::queries::memory_crud::get_memory(conn, &id)? else {
                continue;
            };
            let candidate_metadata = metadata_ops::get_metadata(conn, &id)?;
            let candidate_embedding = embedding_ops::get_embedding(conn, &id, Sector::Semantic, namespace)?;
            let candidate_input = cme_similarity::SimilarityInput {
                memory: &candidate,
                metadata: candidate_metadata.as_ref(),
                semantic_embedding: candidate_embedding.as_deref(),
            };
            let breakdown = similarity.similarity(&reference_input, &candidate_input);
            scored.push((
                id,
                StrategyScore {
                    strategy: crate::types::StrategyKind::Similarity,
                    score: breakdown.composite.clamp(0.0, 1.0),
                    explanation: format!(
                        "{:.0}% similar to {reference_id} (content {:.0}%, keywords {:.0}%)",
                        breakdown.composite.clamp(0.0, 1.0) * 100.0,
                        breakdown.content_similarity * 100.0,
                        breakdown.keyword_overlap * 100.0,
                    ),
                },
            ));
        }
        Ok(scored)
    })
}
