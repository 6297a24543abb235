//! `MemoryRepository`: the C6 transactional contract. Every mutating
//! method opens exactly one `StorageEngine::transaction`; embedder calls
//! (async, network-bound) always happen before the transaction opens —
//! SQLite's write lock should never be held across external I/O.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use cme_core::config::{GraphConfig, StorageConfig};
use cme_core::errors::{CortexError, CortexResult};
use cme_core::memory::{
    EmbeddingStatus, Memory, MemoryEventType, Metadata, Sector, MAX_CONTENT_LEN, MIN_CONTENT_LEN,
};
use cme_core::traits::{Embedding, EmbeddingProvider};
use cme_storage::queries::{embedding_ops, link_ops, memory_crud, metadata_ops, stats_ops, timeline_ops};
use cme_storage::StorageEngine;

use crate::types::{
    BatchCreateRequest, BatchDeleteResult, BatchItemResult, BatchRetrieveResult, CreateRequest,
    EmotionalTrendPoint, GraphQuery, GraphViewResult, RecentActivityItem, SectorCount, Stats,
    TimelineQuery, TimelineResult, UpdateOutcome, UpdateRequest,
};

pub struct MemoryRepository {
    storage: Arc<StorageEngine>,
    embedder: Arc<dyn EmbeddingProvider>,
    graph_config: GraphConfig,
    storage_config: StorageConfig,
}

fn validate_content(content: &str) -> CortexResult<()> {
    let len = content.chars().count();
    if !(MIN_CONTENT_LEN..=MAX_CONTENT_LEN).contains(&len) {
        return Err(CortexError::ValidationError(format!(
            "content length {len} out of bounds [{MIN_CONTENT_LEN}, {MAX_CONTENT_LEN}]"
        )));
    }
    Ok(())
}

impl MemoryRepository {
    pub fn new(
        storage: Arc<StorageEngine>,
        embedder: Arc<dyn EmbeddingProvider>,
        graph_config: GraphConfig,
        storage_config: StorageConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            graph_config,
            storage_config,
        }
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    pub async fn create(&self, req: CreateRequest) -> CortexResult<Memory> {
        validate_content(&req.content)?;

        let embeddings = self.embedder.embed_all_sectors(&req.content).await?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let namespace = self.storage_config.default_namespace.clone();

        let memory = self.storage.transaction(|conn| {
            insert_one_in_tx(
                conn,
                &id,
                &req.user_id,
                req.session_id.as_deref(),
                &req.content,
                req.primary_sector,
                &req.metadata,
                &embeddings,
                &namespace,
                &self.graph_config,
                now,
            )
        })?;

        tracing::info!(memory_id = %memory.id, user_id = %memory.user_id, "memory created");
        Ok(memory)
    }

    pub fn retrieve(&self, id: &str, user_id: &str) -> CortexResult<Option<Memory>> {
        self.storage.transaction(|conn| {
            let Some(memory) = memory_crud::get_memory_owned(conn, id, user_id)? else {
                return Ok(None);
            };
            let now = Utc::now();
            memory_crud::record_access(conn, id, now)?;
            timeline_ops::append_event(
                conn,
                id,
                user_id,
                now,
                MemoryEventType::AccessRecorded,
                &serde_json::json!({}),
            )?;
            Ok(Some(Memory {
                last_accessed: now,
                access_count: memory.access_count + 1,
                ..memory
            }))
        })
    }

    pub async fn update(&self, req: UpdateRequest) -> CortexResult<UpdateOutcome> {
        if req.content.is_none() && req.strength.is_none() && req.salience.is_none() && req.metadata.is_none() {
            return Err(CortexError::ValidationError(
                "update requires at least one field".to_string(),
            ));
        }

        let current = self
            .storage
            .read(|conn| memory_crud::get_memory(conn, &req.memory_id))?
            .ok_or_else(|| CortexError::NotFoundError {
                id: req.memory_id.clone(),
            })?;
        if current.user_id != req.user_id {
            return Err(CortexError::ForbiddenError {
                id: req.memory_id.clone(),
            });
        }

        if let Some(content) = &req.content {
            validate_content(content)?;
        }

        let content_changed = req
            .content
            .as_ref()
            .map(|c| Memory::content_hash_of(c) != current.content_hash)
            .unwrap_or(false);

        let new_embeddings: Option<Vec<(Sector, Embedding)>> = if content_changed {
            Some(self.embedder.embed_all_sectors(req.content.as_ref().unwrap()).await?)
        } else {
            None
        };

        let namespace = self.storage_config.default_namespace.clone();
        let now = Utc::now();

        let updated = self.storage.transaction(|conn| {
            let mut memory = current.clone();
            let mut delta = serde_json::Map::new();

            if let Some(content) = &req.content {
                memory.content = content.clone();
                memory.content_hash = Memory::content_hash_of(content);
                delta.insert("content".into(), serde_json::Value::Bool(true));
            }
            if let Some(strength) = req.strength {
                memory.strength = strength;
                delta.insert("strength".into(), serde_json::json!(strength));
            }
            if let Some(salience) = req.salience {
                memory.salience = salience;
                delta.insert("salience".into(), serde_json::json!(salience));
            }
            memory.last_accessed = now;

            if let Some(embeddings) = &new_embeddings {
                for (sector, vector) in embeddings {
                    embedding_ops::upsert_embedding(conn, &memory.id, *sector, &namespace, vector)?;
                }
                memory.embedding_status = EmbeddingStatus::Complete;

                link_ops::delete_links_for_memory(conn, &memory.id)?;
                if let Some((_, semantic_vector)) =
                    embeddings.iter().find(|(s, _)| *s == Sector::Semantic)
                {
                    let candidates = embedding_ops::vector_similarity_search(
                        conn,
                        &memory.user_id,
                        Sector::Semantic,
                        &namespace,
                        semantic_vector,
                        self.graph_config.max_waypoints_per_memory,
                    )?;
                    let links = cme_graph::propose_waypoint_links(
                        &memory.id,
                        now,
                        &candidates,
                        &self.graph_config,
                    );
                    for link in &links {
                        link_ops::upsert_link(conn, link)?;
                    }
                }
            }

            if let Some(metadata) = &req.metadata {
                metadata_ops::upsert_metadata(conn, &memory.id, metadata)?;
                delta.insert("metadata".into(), serde_json::Value::Bool(true));
            }

            memory_crud::update_memory(conn, &memory)?;

            let event_type = if content_changed {
                MemoryEventType::ContentUpdated
            } else {
                MemoryEventType::MetadataUpdated
            };
            timeline_ops::append_event(
                conn,
                &memory.id,
                &memory.user_id,
                now,
                event_type,
                &serde_json::Value::Object(delta),
            )?;

            Ok(memory)
        })?;

        tracing::info!(memory_id = %updated.id, content_changed, "memory updated");
        Ok(UpdateOutcome {
            memory: updated,
            embeddings_regenerated: content_changed,
        })
    }

    pub fn delete(&self, id: &str, user_id: &str, soft: bool) -> CortexResult<()> {
        self.storage.transaction(|conn| {
            let Some(memory) = memory_crud::get_memory(conn, id)? else {
                return Err(CortexError::NotFoundError { id: id.to_string() });
            };
            if memory.user_id != user_id {
                return Err(CortexError::ForbiddenError { id: id.to_string() });
            }

            let now = Utc::now();
            if soft {
                memory_crud::soft_delete(conn, id)?;
                timeline_ops::append_event(
                    conn,
                    id,
                    user_id,
                    now,
                    MemoryEventType::SoftDeleted,
                    &serde_json::json!({}),
                )?;
            } else {
                embedding_ops::delete_embeddings_for_memory(conn, id)?;
                metadata_ops::delete_metadata_for_memory(conn, id)?;
                link_ops::delete_links_for_memory(conn, id)?;
                memory_crud::hard_delete(conn, id)?;
            }
            Ok(())
        })
    }

    pub async fn batch_create(&self, req: BatchCreateRequest) -> CortexResult<Vec<BatchItemResult>> {
        if req.memories.len() > self.storage_config.max_batch_size {
            return Err(CortexError::ValidationError(format!(
                "batch_create accepts at most {} items, got {}",
                self.storage_config.max_batch_size,
                req.memories.len()
            )));
        }

        let mut prepared: Vec<Option<(String, Sector, Option<Metadata>, Vec<(Sector, Embedding)>)>> =
            Vec::with_capacity(req.memories.len());
        let mut results: Vec<BatchItemResult> = (0..req.memories.len())
            .map(|index| BatchItemResult {
                index,
                memory: None,
                error: None,
            })
            .collect();

        for (index, (content, sector, metadata)) in req.memories.iter().enumerate() {
            if let Err(e) = validate_content(content) {
                results[index].error = Some(e.to_string());
                prepared.push(None);
                continue;
            }
            match self.embedder.embed_all_sectors(content).await {
                Ok(embeddings) => prepared.push(Some((content.clone(), *sector, metadata.clone(), embeddings))),
                Err(e) => {
                    results[index].error = Some(e.to_string());
                    prepared.push(None);
                }
            }
        }

        let namespace = self.storage_config.default_namespace.clone();
        let now = Utc::now();
        let user_id = req.user_id.clone();
        let session_id = req.session_id.clone();
        let graph_config = self.graph_config.clone();

        let outcomes = self.storage.transaction(|conn| {
            let mut outcomes: Vec<Option<CortexResult<Memory>>> = Vec::with_capacity(prepared.len());
            for item in &prepared {
                let Some((content, sector, metadata, embeddings)) = item else {
                    outcomes.push(None);
                    continue;
                };
                let id = Uuid::new_v4().to_string();
                let savepoint = format!("sp_{}", outcomes.len());
                conn.execute_batch(&format!("SAVEPOINT {savepoint}"))
                    .map_err(|e| cme_storage::to_storage_err(e.to_string()))?;

                let result = insert_one_in_tx(
                    conn,
                    &id,
                    &user_id,
                    session_id.as_deref(),
                    content,
                    *sector,
                    metadata,
                    embeddings,
                    &namespace,
                    &graph_config,
                    now,
                );

                match &result {
                    Ok(_) => {
                        conn.execute_batch(&format!("RELEASE {savepoint}"))
                            .map_err(|e| cme_storage::to_storage_err(e.to_string()))?;
                    }
                    Err(_) => {
                        conn.execute_batch(&format!("ROLLBACK TO {savepoint}"))
                            .map_err(|e| cme_storage::to_storage_err(e.to_string()))?;
                        conn.execute_batch(&format!("RELEASE {savepoint}"))
                            .map_err(|e| cme_storage::to_storage_err(e.to_string()))?;
                    }
                }
                outcomes.push(Some(result));
            }
            Ok(outcomes)
        })?;

        for (index, outcome) in outcomes.into_iter().enumerate() {
            if let Some(result) = outcome {
                match result {
                    Ok(memory) => results[index].memory = Some(memory),
                    Err(e) => results[index].error = Some(e.to_string()),
                }
            }
        }

        Ok(results)
    }

    pub fn batch_retrieve(
        &self,
        user_id: &str,
        ids: &[String],
        include_deleted: bool,
    ) -> CortexResult<BatchRetrieveResult> {
        if ids.len() > self.storage_config.max_batch_size {
            return Err(CortexError::ValidationError(format!(
                "batch_retrieve accepts at most {} ids, got {}",
                self.storage_config.max_batch_size,
                ids.len()
            )));
        }

        self.storage.read(|conn| {
            let mut found = Vec::new();
            let mut not_found = Vec::new();
            for id in ids {
                match memory_crud::get_memory_owned(conn, id, user_id)? {
                    Some(m) if include_deleted || m.strength > 0.0 => found.push(m),
                    _ => not_found.push(id.clone()),
                }
            }
            Ok(BatchRetrieveResult { found, not_found })
        })
    }

    pub fn batch_delete(&self, user_id: &str, ids: &[String], soft: bool) -> CortexResult<Vec<BatchDeleteResult>> {
        if ids.len() > self.storage_config.max_batch_size {
            return Err(CortexError::ValidationError(format!(
                "batch_delete accepts at most {} ids, got {}",
                self.storage_config.max_batch_size,
                ids.len()
            )));
        }

        ids.iter()
            .map(|id| match self.delete(id, user_id, soft) {
                Ok(()) => BatchDeleteResult {
                    id: id.clone(),
                    succeeded: true,
                    error: None,
                },
                Err(e) => BatchDeleteResult {
                    id: id.clone(),
                    succeeded: false,
                    error: Some(e.to_string()),
                },
            })
            .map(Ok)
            .collect()
    }

    pub fn get_stats(&self, user_id: &str) -> CortexResult<Stats> {
        self.storage.read(|conn| {
            let counts_by_sector = memory_crud::count_by_sector(conn, user_id)?
                .into_iter()
                .map(|(sector, count)| SectorCount { sector, count })
                .collect();
            let total_memories = stats_ops::total_memory_count(conn, user_id)?;
            let consolidation_pending = memory_crud::count_consolidation_pending(conn, user_id)?;
            let recent_activity = stats_ops::get_recent_activity(conn, user_id, self.storage_config.default_page_size)?
                .into_iter()
                .map(|a| RecentActivityItem {
                    memory_id: a.memory_id,
                    recorded_at: a.recorded_at,
                    event_type: a.event_type,
                })
                .collect();

            Ok(Stats {
                counts_by_sector,
                total_memories,
                total_capacity: self.storage_config.total_capacity,
                consolidation_pending,
                recent_activity,
            })
        })
    }

    /// BFS-assembles a graph view via `cme-graph`, then hydrates node ids
    /// into full `Memory` records and applies the sector `type_filter`
    /// post-hydration (the BFS itself only understands `LinkType`, not
    /// `Sector` — see `cme-graph::bfs_graph`).
    pub fn get_graph(&self, query: GraphQuery) -> CortexResult<GraphViewResult> {
        let depth = query.depth.min(self.graph_config.max_graph_depth);
        self.storage.read(|conn| {
            let seeds = match &query.center_memory_id {
                Some(id) => vec![id.clone()],
                None => memory_crud::get_recent_for_user(conn, &query.user_id, self.graph_config.default_seed_size)?
                    .into_iter()
                    .map(|m| m.id)
                    .collect(),
            };

            let view = cme_graph::bfs_graph(&seeds, depth, &self.graph_config, None, |frontier| {
                link_ops::get_outgoing_links(conn, frontier)
            })?;

            let mut nodes = memory_crud::get_memories(conn, &view.nodes)?
                .into_iter()
                .filter(|m| m.user_id == query.user_id)
                .collect::<Vec<_>>();

            if let Some(sectors) = &query.type_filter {
                nodes.retain(|m| sectors.contains(&m.primary_sector));
            }

            let kept_ids: std::collections::HashSet<&str> = nodes.iter().map(|m| m.id.as_str()).collect();
            let edges = view
                .edges
                .into_iter()
                .filter(|l| kept_ids.contains(l.source_id.as_str()) && kept_ids.contains(l.target_id.as_str()))
                .collect();

            Ok(GraphViewResult { nodes, edges })
        })
    }

    pub fn get_timeline(&self, query: TimelineQuery) -> CortexResult<TimelineResult> {
        let limit = query.limit.min(500).max(1);
        self.storage.read(|conn| {
            let mut events = timeline_ops::get_timeline_for_user(conn, &query.user_id, query.since, limit)?;

            if let Some(until) = query.until {
                events.retain(|e| e.recorded_at <= until);
            }
            if query.emotional_only {
                let mut kept = Vec::with_capacity(events.len());
                for event in events {
                    if let Some(memory) = memory_crud::get_memory(conn, &event.memory_id)? {
                        if memory.primary_sector == Sector::Emotional {
                            kept.push(event);
                        }
                    }
                }
                events = kept;
            }

            let emotional_trend = compute_emotional_trend(conn, &query.user_id, &events)?;

            Ok(TimelineResult { events, emotional_trend })
        })
    }
}

/// Daily event-count and mean-salience aggregates over the emotional-sector
/// memories touched by `events`.
fn compute_emotional_trend(
    conn: &Connection,
    user_id: &str,
    events: &[cme_core::memory::MemoryEvent],
) -> CortexResult<Vec<EmotionalTrendPoint>> {
    use std::collections::BTreeMap;

    let mut by_day: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for event in events {
        let Some(memory) = memory_crud::get_memory(conn, &event.memory_id)? else {
            continue;
        };
        if memory.user_id != user_id || memory.primary_sector != Sector::Emotional {
            continue;
        }
        let day = event.recorded_at.format("%Y-%m-%d").to_string();
        let entry = by_day.entry(day).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += memory.salience;
    }

    Ok(by_day
        .into_iter()
        .map(|(day, (count, salience_sum))| EmotionalTrendPoint {
            day,
            event_count: count,
            mean_salience: salience_sum / count as f64,
        })
        .collect())
}

/// Shared insertion path for `create` and `batch_create`: persist the
/// memory row, its five embeddings, optional metadata, proposed waypoint
/// links, and a `Created` event — all within the caller's transaction.
#[allow(clippy::too_many_arguments)]
fn insert_one_in_tx(
    conn: &Connection,
    id: &str,
    user_id: &str,
    session_id: Option<&str>,
    content: &str,
    primary_sector: Sector,
    metadata: &Option<Metadata>,
    embeddings: &[(Sector, Embedding)],
    namespace: &str,
    graph_config: &GraphConfig,
    now: chrono::DateTime<Utc>,
) -> CortexResult<Memory> {
    let salience = metadata.as_ref().map(|m| m.importance).unwrap_or(0.5);

    let memory = Memory {
        id: id.to_string(),
        content: content.to_string(),
        user_id: user_id.to_string(),
        session_id: session_id.map(str::to_string),
        primary_sector,
        created_at: now,
        last_accessed: now,
        access_count: 0,
        salience,
        strength: 1.0,
        decay_rate: 0.0,
        embedding_status: EmbeddingStatus::Complete,
        consolidated_into: None,
        consolidated_from: None,
        content_hash: Memory::content_hash_of(content),
    };

    memory_crud::insert_memory(conn, &memory)?;

    for (sector, vector) in embeddings {
        embedding_ops::upsert_embedding(conn, &memory.id, *sector, namespace, vector)?;
    }

    if let Some(md) = metadata {
        metadata_ops::upsert_metadata(conn, &memory.id, md)?;
    }

    if let Some((_, semantic_vector)) = embeddings.iter().find(|(s, _)| *s == Sector::Semantic) {
        let candidates = embedding_ops::vector_similarity_search(
            conn,
            user_id,
            Sector::Semantic,
            namespace,
            semantic_vector,
            graph_config.max_waypoints_per_memory,
        )?;
        let links = cme_graph::propose_waypoint_links(&memory.id, now, &candidates, graph_config);
        for link in &links {
            link_ops::upsert_link(conn, link)?;
        }
    }

    timeline_ops::append_event(
        conn,
        &memory.id,
        user_id,
        now,
        MemoryEventType::Created,
        &serde_json::json!({}),
    )?;

    Ok(memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder {
        dimension: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, text: &str, sector: Sector) -> CortexResult<Embedding> {
            let seed = text.len() as f32 + sector as u8 as f32;
            Ok((0..self.dimension).map(|i| (seed + i as f32).sin()).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    fn repo() -> MemoryRepository {
        MemoryRepository::new(
            Arc::new(StorageEngine::open(":memory:").unwrap()),
            Arc::new(FixedEmbedder { dimension: 8 }),
            GraphConfig::default(),
            StorageConfig::default(),
        )
    }

    #[tokio::test]
    async fn create_then_retrieve_round_trips() {
        let repo = repo();
        let created = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "remember to water the plants".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();

        assert_eq!(created.strength, 1.0);
        assert_eq!(created.salience, 0.5);
        assert_eq!(created.embedding_status, EmbeddingStatus::Complete);

        let fetched = repo.retrieve(&created.id, "u1").unwrap().unwrap();
        assert_eq!(fetched.access_count, 1);
        assert_eq!(fetched.content, created.content);
    }

    #[tokio::test]
    async fn retrieve_is_forbidden_for_wrong_owner() {
        let repo = repo();
        let created = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "a private note about the weekend plans".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();

        assert!(repo.retrieve(&created.id, "u2").unwrap().is_none());
    }

    #[tokio::test]
    async fn create_rejects_content_out_of_bounds() {
        let repo = repo();
        let err = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "short".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CortexError::ValidationError(_)));
    }

    #[tokio::test]
    async fn update_regenerates_embeddings_only_when_content_changes() {
        let repo = repo();
        let created = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "the original content of this memory".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();

        let scalar_only = repo
            .update(UpdateRequest {
                memory_id: created.id.clone(),
                user_id: "u1".into(),
                strength: Some(0.5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!scalar_only.embeddings_regenerated);

        let content_changed = repo
            .update(UpdateRequest {
                memory_id: created.id.clone(),
                user_id: "u1".into(),
                content: Some("a rewritten version of this memory's content".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(content_changed.embeddings_regenerated);
    }

    #[tokio::test]
    async fn update_fails_not_found_and_forbidden() {
        let repo = repo();
        let not_found = repo
            .update(UpdateRequest {
                memory_id: "missing".into(),
                user_id: "u1".into(),
                strength: Some(0.5),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(not_found, CortexError::NotFoundError { .. }));

        let created = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "owned by u1, not to be touched by u2".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();

        let forbidden = repo
            .update(UpdateRequest {
                memory_id: created.id,
                user_id: "u2".into(),
                strength: Some(0.1),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(forbidden, CortexError::ForbiddenError { .. }));
    }

    #[tokio::test]
    async fn soft_delete_keeps_row_hard_delete_removes_it() {
        let repo = repo();
        let created = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "a memory that will be soft-deleted first".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();

        repo.delete(&created.id, "u1", true).unwrap();
        let after_soft = repo
            .storage()
            .read(|conn| memory_crud::get_memory(conn, &created.id))
            .unwrap()
            .unwrap();
        assert_eq!(after_soft.strength, 0.0);

        repo.delete(&created.id, "u1", false).unwrap();
        let after_hard = repo
            .storage()
            .read(|conn| memory_crud::get_memory(conn, &created.id))
            .unwrap();
        assert!(after_hard.is_none());
    }

    #[tokio::test]
    async fn batch_create_is_per_item_independent() {
        let repo = repo();
        let result = repo
            .batch_create(BatchCreateRequest {
                user_id: "u1".into(),
                session_id: None,
                memories: vec![
                    ("a valid piece of memory content here".into(), Sector::Episodic, None),
                    ("too short".into(), Sector::Episodic, None),
                    ("another perfectly valid memory content".into(), Sector::Semantic, None),
                ],
            })
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert!(result[0].memory.is_some());
        assert!(result[1].error.is_some());
        assert!(result[2].memory.is_some());
    }

    #[tokio::test]
    async fn batch_retrieve_splits_found_and_not_found() {
        let repo = repo();
        let created = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "findable content for batch retrieve test".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();

        let result = repo
            .batch_retrieve("u1", &[created.id.clone(), "missing".into()], false)
            .unwrap();
        assert_eq!(result.found.len(), 1);
        assert_eq!(result.not_found, vec!["missing".to_string()]);
    }

    #[tokio::test]
    async fn stats_report_sector_counts() {
        let repo = repo();
        repo.create(CreateRequest {
            user_id: "u1".into(),
            session_id: None,
            content: "one episodic memory for stats counting".into(),
            primary_sector: Sector::Episodic,
            metadata: None,
        })
        .await
        .unwrap();

        let stats = repo.get_stats("u1").unwrap();
        assert_eq!(stats.total_memories, 1);
        assert_eq!(stats.counts_by_sector.len(), 1);
        assert_eq!(stats.counts_by_sector[0].sector, Sector::Episodic);
    }

    #[tokio::test]
    async fn graph_reaches_waypoint_linked_memories() {
        let mut config = GraphConfig::default();
        config.waypoint_similarity_threshold = -1.0;
        let repo = MemoryRepository::new(
            Arc::new(StorageEngine::open(":memory:").unwrap()),
            Arc::new(FixedEmbedder { dimension: 8 }),
            config,
            StorageConfig::default(),
        );

        let first = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "first memory in a waypoint-linked pair".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();
        let second = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "second memory in a waypoint-linked pair".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();

        let view = repo
            .get_graph(GraphQuery {
                user_id: "u1".into(),
                center_memory_id: Some(second.id.clone()),
                depth: 2,
                type_filter: None,
            })
            .unwrap();

        assert!(view.nodes.iter().any(|m| m.id == first.id));
    }

    #[tokio::test]
    async fn timeline_reports_created_event() {
        let repo = repo();
        let created = repo
            .create(CreateRequest {
                user_id: "u1".into(),
                session_id: None,
                content: "a memory whose creation shows in the timeline".into(),
                primary_sector: Sector::Episodic,
                metadata: None,
            })
            .await
            .unwrap();

        let timeline = repo
            .get_timeline(TimelineQuery {
                user_id: "u1".into(),
                since: None,
                until: None,
                emotional_only: false,
                limit: 50,
            })
            .unwrap();

        assert!(timeline
            .events
            .iter()
            .any(|e| e.memory_id == created.id && e.event_type == MemoryEventType::Created));
    }
}
