//! `ConsolidationEngine`: the C8 orchestration. One `consolidate` call
//! loads a batch of unconsolidated episodic memories for a user, clusters
//! them, calls the summariser per accepted cluster, and applies each
//! cluster atomically — all cluster-apply transactions sequential, other
//! clusters proceeding even if one fails.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use cme_core::config::{ConsolidationConfig, GraphConfig};
use cme_core::errors::{CortexError, CortexResult};
use cme_core::memory::{ConsolidationHistoryEntry, EmbeddingStatus, Memory, Metadata, Sector};
use cme_core::traits::Summarizer;
use cme_storage::queries::{consolidation_ops, embedding_ops, link_ops, memory_crud, metadata_ops};
use cme_storage::StorageEngine;

use crate::clustering::{self, ClusterCandidate};
use crate::types::{ClusterOutcome, ConsolidationReport};

const SUMMARIZER_INSTRUCTION: &str =
    "Summarize the following related memories into a single coherent semantic memory.";

pub struct ConsolidationEngine {
    storage: Arc<StorageEngine>,
    summarizer: Arc<dyn Summarizer>,
    graph_config: GraphConfig,
    /// Per-user advisory lock: presence of a key means a consolidation is
    /// in flight for that user. Single-process try-lock, not a DB lock.
    locks: DashMap<String, ()>,
}

impl ConsolidationEngine {
    pub fn new(storage: Arc<StorageEngine>, summarizer: Arc<dyn Summarizer>, graph_config: GraphConfig) -> Self {
        Self {
            storage,
            summarizer,
            graph_config,
            locks: DashMap::new(),
        }
    }

    pub async fn consolidate(&self, user_id: &str, config: ConsolidationConfig) -> CortexResult<ConsolidationReport> {
        config
            .validate()
            .map_err(CortexError::ValidationError)?;

        if self.locks.insert(user_id.to_string(), ()).is_some() {
            return Err(CortexError::ConflictError(format!(
                "consolidation already running for user {user_id}"
            )));
        }
        let result = self.consolidate_locked(user_id, &config).await;
        self.locks.remove(user_id);
        result
    }

    async fn consolidate_locked(&self, user_id: &str, config: &ConsolidationConfig) -> CortexResult<ConsolidationReport> {
        let memories = self.storage.read(|conn| memory_crud::get_unconsolidated_episodic(conn, user_id, config.batch_size))?;

        let mut owned_embeddings: Vec<Vec<f32>> = Vec::with_capacity(memories.len());
        let mut owned_metadata: Vec<Option<Metadata>> = Vec::with_capacity(memories.len());
        let mut with_embedding: Vec<Memory> = Vec::with_capacity(memories.len());

        self.storage.read(|conn| {
            for memory in memories {
                let Some(embedding) = embedding_ops::get_embedding(conn, &memory.id, Sector::Semantic, "default")? else {
                    continue;
                };
                let metadata = metadata_ops::get_metadata(conn, &memory.id)?;
                owned_embeddings.push(embedding);
                owned_metadata.push(metadata);
                with_embedding.push(memory);
            }
            Ok(())
        })?;

        let candidates: Vec<ClusterCandidate> = with_embedding
            .iter()
            .zip(&owned_embeddings)
            .zip(&owned_metadata)
            .map(|((memory, embedding), metadata)| ClusterCandidate {
                memory,
                metadata: metadata.as_ref(),
                embedding,
            })
            .collect();

        let candidates_considered = candidates.len();
        let similarities = clustering::similarity_matrix(&candidates);
        let clusters = clustering::cluster(&candidates, &similarities, config.similarity_threshold, config.min_cluster_size);

        let mut outcomes = Vec::with_capacity(clusters.len());
        let mut skipped_clusters = 0;

        for cluster in clusters {
            let member_ids: Vec<String> = cluster.member_indices.iter().map(|&i| candidates[i].memory.id.clone()).collect();
            let centroid = &candidates[cluster.centroid_index];
            let topic = clustering::extract_topic(centroid);

            let texts: Vec<String> = cluster.member_indices.iter().map(|&i| candidates[i].memory.content.clone()).collect();

            let summary_text = match self.summarizer.summarize(SUMMARIZER_INSTRUCTION, &texts, &topic).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(user_id, topic, cause = %e, "summariser failed, skipping cluster");
                    skipped_clusters += 1;
                    continue;
                }
            };

            match self.apply_cluster(user_id, &summary_text, &member_ids, config) {
                Ok(summary_id) => outcomes.push(ClusterOutcome {
                    summary_memory_id: summary_id,
                    consolidated_memory_ids: member_ids,
                    mean_similarity: cluster.mean_similarity,
                    topic,
                }),
                Err(e) => {
                    tracing::warn!(user_id, topic, cause = %e, "cluster apply failed, rolled back, continuing");
                    skipped_clusters += 1;
                }
            }
        }

        Ok(ConsolidationReport {
            candidates_considered,
            clusters: outcomes,
            skipped_clusters,
        })
    }

    /// Insert the summary, its consolidation links, weaken the originals,
    /// and record the audit row — all in one transaction.
    fn apply_cluster(
        &self,
        user_id: &str,
        summary_text: &str,
        member_ids: &[String],
        config: &ConsolidationConfig,
    ) -> CortexResult<String> {
        let summary_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let member_ids = member_ids.to_vec();
        let graph_config = self.graph_config.clone();
        let similarity_threshold = config.similarity_threshold;
        let strength_reduction_factor = config.strength_reduction_factor;

        self.storage.transaction(|conn| {
            let summary = Memory {
                id: summary_id.clone(),
                content: summary_text.to_string(),
                user_id: user_id.to_string(),
                session_id: None,
                primary_sector: Sector::Semantic,
                created_at: now,
                last_accessed: now,
                access_count: 0,
                salience: 0.8,
                strength: 1.0,
                decay_rate: 0.01,
                embedding_status: EmbeddingStatus::Pending,
                consolidated_into: None,
                consolidated_from: Some(member_ids.clone()),
                content_hash: Memory::content_hash_of(summary_text),
            };
            memory_crud::insert_memory(conn, &summary)?;

            for link in cme_graph::consolidation_links(&summary_id, &member_ids, now, &graph_config) {
                link_ops::upsert_link(conn, &link)?;
            }

            for id in &member_ids {
                memory_crud::apply_consolidation_to_original(conn, id, strength_reduction_factor, &summary_id)?;
            }

            consolidation_ops::insert_history(
                conn,
                &ConsolidationHistoryEntry {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    summary_memory_id: summary_id.clone(),
                    consolidated_memory_ids: member_ids.clone(),
                    similarity_threshold,
                    cluster_size: member_ids.len(),
                    consolidated_at: now,
                },
            )?;

            Ok(())
        })?;

        Ok(summary_id)
    }
}
