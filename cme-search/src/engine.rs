//! `SearchEngine`: validates a `SearchQuery`, fans out to the applicable
//! strategies under a deadline, composes scores, hydrates and paginates
//! hits, and records analytics — all behind a non-pagination result cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use cme_core::config::SearchConfig;
use cme_core::errors::{CortexError, CortexResult};
use cme_similarity::SimilarityCalculator;
use cme_storage::queries::memory_crud;
use cme_storage::StorageEngine;

use crate::analytics::Analytics;
use crate::strategies::{self, ScoredIds};
use crate::types::{AnalyticsRecord, SearchHit, SearchQuery, SearchResponse, StrategyKind, StrategyScore};

pub struct SearchEngine {
    storage: Arc<StorageEngine>,
    similarity: Arc<SimilarityCalculator>,
    config: SearchConfig,
    cache: moka::sync::Cache<String, Arc<(Vec<(String, Vec<StrategyScore>)>, Vec<StrategyKind>)>>,
    analytics: Analytics,
}

impl SearchEngine {
    pub fn new(storage: Arc<StorageEngine>, similarity: Arc<SimilarityCalculator>, config: SearchConfig) -> Self {
        let cache = moka::sync::Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .build();
        let analytics = Analytics::new(config.analytics_retention_days);
        Self {
            storage,
            similarity,
            config,
            cache,
            analytics,
        }
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub async fn search(&self, query: SearchQuery) -> CortexResult<SearchResponse> {
        validate(&query, &self.config)?;
        let start = Instant::now();
        let query_id = Uuid::new_v4().to_string();
        let cacheable = query.embedding.is_none();
        let cache_key = cache_key(&query);

        let (entry, cache_hit) = if cacheable {
            if let Some(cached) = self.cache.get(&cache_key) {
                (cached, true)
            } else {
                let executed = self.execute_strategies(&query).await?;
                let entry = Arc::new(executed);
                self.cache.insert(cache_key.clone(), entry.clone());
                (entry, false)
            }
        } else {
            (Arc::new(self.execute_strategies(&query).await?), false)
        };
        let (scored, strategies_used) = &*entry;

        let response = self.compose(&query, scored)?;

        self.analytics.record(AnalyticsRecord {
            query_id,
            strategies_used: strategies_used.clone(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            results_count: response.hits.len(),
            cache_hit,
            query_shape: cache_key,
            recorded_at: now(),
        });

        Ok(SearchResponse {
            elapsed_ms: start.elapsed().as_millis() as u64,
            cache_hit,
            ..response
        })
    }

    async fn execute_strategies(
        &self,
        query: &SearchQuery,
    ) -> CortexResult<(Vec<(String, Vec<StrategyScore>)>, Vec<StrategyKind>)> {
        let deadline = Duration::from_millis(self.config.max_execution_time_ms);
        let run = self.run_all(query);

        let (fulltext, vector, metadata, similarity) = tokio::time::timeout(deadline, run)
            .await
            .map_err(|_| CortexError::TimeoutError {
                elapsed_ms: self.config.max_execution_time_ms,
            })?;

        let mut per_memory: std::collections::HashMap<String, Vec<StrategyScore>> = std::collections::HashMap::new();
        let mut strategies_used = Vec::new();

        for (kind, result) in [
            (StrategyKind::FullText, fulltext),
            (StrategyKind::Vector, vector),
            (StrategyKind::Metadata, metadata),
            (StrategyKind::Similarity, similarity),
        ] {
            let Some(scores) = result else { continue };
            strategies_used.push(kind);
            match scores {
                Ok(scores) => {
                    for (id, score) in scores {
                        per_memory.entry(id).or_default().push(score);
                    }
                }
                Err(e) => {
                    tracing::warn!(strategy = kind.as_str(), error = %e, "search strategy failed, absorbed");
                }
            }
        }

        Ok((per_memory.into_iter().collect(), strategies_used))
    }

    /// Runs each applicable strategy concurrently; strategies whose input
    /// field is absent from the query are skipped (`None`) rather than run
    /// with a default. Each strategy's own storage error is kept, not
    /// propagated, so `execute_strategies` can absorb it per-strategy.
    async fn run_all(
        &self,
        query: &SearchQuery,
    ) -> (
        Option<CortexResult<ScoredIds>>,
        Option<CortexResult<ScoredIds>>,
        Option<CortexResult<ScoredIds>>,
        Option<CortexResult<ScoredIds>>,
    ) {
        let storage = self.storage.clone();
        let similarity_calc = self.similarity.clone();
        let limit = (query.offset + query.limit).max(self.config.default_limit);

        let fulltext = query.text.clone().map(|text| {
            let storage = storage.clone();
            let user_id = query.user_id.clone();
            let max_chars = self.config.max_query_chars;
            async move {
                tokio::task::spawn_blocking(move || strategies::run_fulltext(&storage, &user_id, &text, max_chars, limit))
                    .await
                    .map_err(|e| CortexError::TransactionError(e.to_string()))?
            }
        });

        let vector = query.embedding.clone().map(|(sector, vector)| {
            let storage = storage.clone();
            let user_id = query.user_id.clone();
            async move {
                tokio::task::spawn_blocking(move || strategies::run_vector(&storage, &user_id, sector, &vector, limit))
                    .await
                    .map_err(|e| CortexError::TransactionError(e.to_string()))?
            }
        });

        let metadata = query.metadata.clone().map(|filter| {
            let storage = storage.clone();
            let user_id = query.user_id.clone();
            async move {
                tokio::task::spawn_blocking(move || strategies::run_metadata(&storage, &user_id, &filter))
                    .await
                    .map_err(|e| CortexError::TransactionError(e.to_string()))?
            }
        });

        let similarity = query.similar_to.clone().map(|reference_id| {
            let storage = storage.clone();
            let user_id = query.user_id.clone();
            let namespace = "default".to_string();
            async move {
                tokio::task::spawn_blocking(move || {
                    strategies::run_similarity(&storage, &similarity_calc, &user_id, &reference_id, &namespace, limit)
                })
                .await
                .map_err(|e| CortexError::TransactionError(e.to_string()))?
            }
        });

        match (fulltext, vector, metadata, similarity) {
            (Some(a), Some(b), Some(c), Some(d)) => {
                let (a, b, c, d) = tokio::join!(a, b, c, d);
                (Some(a), Some(b), Some(c), Some(d))
            }
            (a, b, c, d) => {
                // At least one strategy is absent; join only the present ones
                // so absent fields never spend a deadline tick waiting on
                // nothing.
                let a = match a {
                    Some(fut) => Some(fut.await),
                    None => None,
                };
                let b = match b {
                    Some(fut) => Some(fut.await),
                    None => None,
                };
                let c = match c {
                    Some(fut) => Some(fut.await),
                    None => None,
                };
                let d = match d {
                    Some(fut) => Some(fut.await),
                    None => None,
                };
                (a, b, c, d)
            }
        }
    }

    /// Composite-scores, hydrates, filters, sorts, and paginates.
    fn compose(&self, query: &SearchQuery, scored: &[(String, Vec<StrategyScore>)]) -> CortexResult<SearchResponse> {
        let weight_of = |kind: StrategyKind| match kind {
            StrategyKind::FullText => self.config.weight_fulltext,
            StrategyKind::Vector => self.config.weight_vector,
            StrategyKind::Metadata => self.config.weight_metadata,
            StrategyKind::Similarity => self.config.weight_similarity,
        };

        let mut composed: Vec<(String, f64, Vec<StrategyScore>)> = scored
            .iter()
            .map(|(id, scores)| {
                let weight_sum: f64 = scores.iter().map(|s| weight_of(s.strategy)).sum();
                let weighted: f64 = scores.iter().map(|s| weight_of(s.strategy) * s.score).sum();
                let composite = if weight_sum > 0.0 { weighted / weight_sum } else { 0.0 };
                (id.clone(), composite, scores.clone())
            })
            .collect();

        let total_considered = composed.len();

        self.storage.read(|conn| {
            composed.sort_by(|a, b| match b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal) {
                std::cmp::Ordering::Equal => a.0.cmp(&b.0),
                other => other,
            });

            let mut hits = Vec::new();
            for (id, composite, strategy_scores) in &composed {
                let Some(memory) = memory_crud::get_memory_owned(conn, id, &query.user_id)? else {
                    continue;
                };
                if let Some(min_strength) = query.min_strength {
                    if memory.strength < min_strength {
                        continue;
                    }
                }
                if let Some(min_salience) = query.min_salience {
                    if memory.salience < min_salience {
                        continue;
                    }
                }
                hits.push((memory, *composite, strategy_scores.clone()));
            }

            let paginated: Vec<SearchHit> = hits
                .into_iter()
                .enumerate()
                .skip(query.offset)
                .take(query.limit)
                .map(|(index, (memory, composite_score, strategy_scores))| SearchHit {
                    memory,
                    composite_score,
                    rank: index + 1,
                    strategy_scores,
                })
                .collect();

            Ok(SearchResponse {
                hits: paginated,
                total_considered,
                cache_hit: false,
                elapsed_ms: 0,
            })
        })
    }
}

fn cache_key(query: &SearchQuery) -> String {
    format!(
        "u={}|text={:?}|meta={:?}|simto={:?}|minS={:?}|minSal={:?}",
        query.user_id, query.text, query.metadata, query.similar_to, query.min_strength, query.min_salience
    )
}

fn validate(query: &SearchQuery, config: &SearchConfig) -> CortexResult<()> {
    if query.text.is_none() && query.embedding.is_none() && query.metadata.is_none() && query.similar_to.is_none() {
        return Err(CortexError::ValidationError(
            "at least one search criterion is required".to_string(),
        ));
    }
    if query.limit > config.max_limit {
        return Err(CortexError::ValidationError(format!(
            "limit {} exceeds max {}",
            query.limit, config.max_limit
        )));
    }
    if let Some(min_strength) = query.min_strength {
        if !(0.0..=1.0).contains(&min_strength) {
            return Err(CortexError::ValidationError("min_strength must be in [0,1]".to_string()));
        }
    }
    if let Some(min_salience) = query.min_salience {
        if !(0.0..=1.0).contains(&min_salience) {
            return Err(CortexError::ValidationError("min_salience must be in [0,1]".to_string()));
        }
    }
    Ok(())
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    use cme_core::memory::{EmbeddingStatus, Memory, Sector};
    use cme_core::config::SimilarityConfig;
    use cme_storage::queries::{embedding_ops, memory_crud};

    fn seed_memory(storage: &StorageEngine, id: &str, user_id: &str, content: &str, embedding: Vec<f32>) {
        storage
            .transaction(|conn| {
                let now = chrono::Utc::now();
                let memory = Memory {
                    id: id.to_string(),
                    content: content.to_string(),
                    user_id: user_id.to_string(),
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
                    content_hash: Memory::content_hash_of(content),
                };
                memory_crud::insert_memory(conn, &memory)?;
                embedding_ops::upsert_embedding(conn, id, Sector::Semantic, "default", &embedding)?;
                Ok(())
            })
            .unwrap();
    }

    fn engine(storage: Arc<StorageEngine>) -> SearchEngine {
        SearchEngine::new(storage, Arc::new(SimilarityCalculator::new(SimilarityConfig::default())), SearchConfig::default())
    }

    #[tokio::test]
    async fn search_requires_at_least_one_criterion() {
        let storage = Arc::new(StorageEngine::open(":memory:").unwrap());
        let engine = engine(storage);
        let err = engine
            .search(SearchQuery {
                user_id: "u1".into(),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CortexError::ValidationError(_)));
    }

    #[tokio::test]
    async fn fulltext_search_finds_matching_memory() {
        let storage = Arc::new(StorageEngine::open(":memory:").unwrap());
        seed_memory(&storage, "m1", "u1", "remember to water the garden plants", vec![0.1; 8]);
        seed_memory(&storage, "m2", "u1", "quarterly budget review notes", vec![0.9; 8]);
        let engine = engine(storage);

        let response = engine
            .search(SearchQuery {
                user_id: "u1".into(),
                text: Some("garden plants".into()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].memory.id, "m1");
        assert_eq!(response.hits[0].rank, 1);
    }

    #[tokio::test]
    async fn vector_search_ranks_by_cosine_similarity() {
        let storage = Arc::new(StorageEngine::open(":memory:").unwrap());
        seed_memory(&storage, "m1", "u1", "a note about the weekend trip", vec![1.0, 0.0, 0.0, 0.0]);
        seed_memory(&storage, "m2", "u1", "a note about a different topic entirely", vec![0.0, 1.0, 0.0, 0.0]);
        let engine = engine(storage);

        let response = engine
            .search(SearchQuery {
                user_id: "u1".into(),
                embedding: Some((Sector::Semantic, vec![1.0, 0.0, 0.0, 0.0])),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.hits[0].memory.id, "m1");
    }

    #[tokio::test]
    async fn result_cache_is_reused_across_identical_text_queries() {
        let storage = Arc::new(StorageEngine::open(":memory:").unwrap());
        seed_memory(&storage, "m1", "u1", "a memory about mountain hiking trails", vec![0.2; 8]);
        let engine = engine(storage);

        let query = SearchQuery {
            user_id: "u1".into(),
            text: Some("hiking trails".into()),
            limit: 10,
            ..Default::default()
        };

        let first = engine.search(query.clone()).await.unwrap();
        assert!(!first.cache_hit);

        let second = engine.search(query).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.hits.len(), first.hits.len());

        let agg = engine.analytics().aggregate();
        assert_eq!(agg.total_searches, 2);
        assert!((agg.cache_hit_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn raw_embedding_queries_bypass_the_cache() {
        let storage = Arc::new(StorageEngine::open(":memory:").unwrap());
        seed_memory(&storage, "m1", "u1", "a memory about mountain hiking trails", vec![0.2; 8]);
        let engine = engine(storage);

        let query = SearchQuery {
            user_id: "u1".into(),
            embedding: Some((Sector::Semantic, vec![0.2; 8])),
            limit: 10,
            ..Default::default()
        };

        engine.search(query.clone()).await.unwrap();
        let second = engine.search(query).await.unwrap();
        assert!(!second.cache_hit);
    }

    #[tokio::test]
    async fn pagination_is_deterministic_and_respects_limit_offset() {
        let storage = Arc::new(StorageEngine::open(":memory:").unwrap());
        for i in 0..5 {
            seed_memory(
                &storage,
                &format!("m{i}"),
                "u1",
                &format!("a journal entry number {i} about daily reflections"),
                vec![0.1 * i as f32; 8],
            );
        }
        let engine = engine(storage);

        let page1 = engine
            .search(SearchQuery {
                user_id: "u1".into(),
                text: Some("journal entry daily reflections".into()),
                limit: 2,
                offset: 0,
                ..Default::default()
            })
            .await
            .unwrap();
        let page2 = engine
            .search(SearchQuery {
                user_id: "u1".into(),
                text: Some("journal entry daily reflections".into()),
                limit: 2,
                offset: 2,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page1.hits.len(), 2);
        assert_eq!(page1.hits[0].rank, 1);
        assert_eq!(page2.hits[0].rank, 3);
        assert_ne!(page1.hits[0].memory.id, page2.hits[0].memory.id);
    }

    #[tokio::test]
    async fn min_strength_filter_excludes_weak_memories() {
        let storage = Arc::new(StorageEngine::open(":memory:").unwrap());
        seed_memory(&storage, "m1", "u1", "a sturdy memory about recent travel plans", vec![0.1; 8]);
        storage
            .transaction(|conn| {
                let mut memory = memory_crud::get_memory(conn, "m1")?.unwrap();
                memory.strength = 0.1;
                memory_crud::update_memory(conn, &memory)?;
                Ok(())
            })
            .unwrap();
        let engine = engine(storage);

        let response = engine
            .search(SearchQuery {
                user_id: "u1".into(),
                text: Some("travel plans".into()),
                min_strength: Some(0.5),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(response.hits.is_empty());
    }
}
