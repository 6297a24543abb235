//! Boolean full-text search and multi-strategy composite ranking,
//! exercised against `SearchEngine` fed by memories created through
//! `MemoryRepository` so embeddings, FTS, and metadata are populated the
//! same way a live system would populate them.

use std::sync::Arc;

use cme_core::config::{GraphConfig, SearchConfig, SimilarityConfig, StorageConfig};
use cme_core::memory::Sector;
use cme_memory::{CreateRequest, MemoryRepository};
use cme_search::{SearchEngine, SearchQuery};
use cme_similarity::SimilarityCalculator;
use cme_storage::queries::metadata_ops::MetadataFilter;
use cme_storage::StorageEngine;
use test_fixtures::{DeterministicEmbedder, MetadataBuilder};

async fn seeded_repo_and_engine() -> (MemoryRepository, SearchEngine, Arc<StorageEngine>) {
    let storage = Arc::new(StorageEngine::open(":memory:").unwrap());
    let repo = MemoryRepository::new(
        storage.clone(),
        Arc::new(DeterministicEmbedder::default()),
        GraphConfig::default(),
        StorageConfig::default(),
    );
    let engine = SearchEngine::new(
        storage.clone(),
        Arc::new(SimilarityCalculator::new(SimilarityConfig::default())),
        SearchConfig::default(),
    );
    (repo, engine, storage)
}

#[tokio::test]
async fn s2_boolean_search_respects_and_not() {
    let (repo, engine, _storage) = seeded_repo_and_engine().await;

    repo.create(CreateRequest {
        user_id: "u1".into(),
        session_id: None,
        content: "machine learning and neural networks are closely related fields".into(),
        primary_sector: Sector::Semantic,
        metadata: None,
    })
    .await
    .unwrap();
    repo.create(CreateRequest {
        user_id: "u1".into(),
        session_id: None,
        content: "supervised learning is one branch of machine learning".into(),
        primary_sector: Sector::Semantic,
        metadata: None,
    })
    .await
    .unwrap();
    repo.create(CreateRequest {
        user_id: "u1".into(),
        session_id: None,
        content: "unsupervised learning finds patterns without labels".into(),
        primary_sector: Sector::Semantic,
        metadata: None,
    })
    .await
    .unwrap();

    let and_response = engine
        .search(SearchQuery {
            user_id: "u1".into(),
            text: Some("machine AND learning AND neural AND networks".into()),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!and_response.hits.is_empty());
    for hit in &and_response.hits {
        assert!(hit.memory.content.contains("machine"));
        assert!(hit.memory.content.contains("neural"));
    }

    let not_response = engine
        .search(SearchQuery {
            user_id: "u1".into(),
            text: Some("learning NOT supervised".into()),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!not_response.hits.is_empty());
    for hit in &not_response.hits {
        assert!(!hit.memory.content.contains("supervised"));
    }
}

#[tokio::test]
async fn s3_multi_strategy_composite_outranks_single_strategy() {
    let (repo, engine, _storage) = seeded_repo_and_engine().await;

    let strong = repo
        .create(CreateRequest {
            user_id: "u1".into(),
            session_id: None,
            content: "the database connection pool handles sql queries efficiently".into(),
            primary_sector: Sector::Semantic,
            metadata: Some(MetadataBuilder::new().tags(["sql"]).build()),
        })
        .await
        .unwrap();

    let weak = repo
        .create(CreateRequest {
            user_id: "u1".into(),
            session_id: None,
            content: "the database migration script ran without incident today".into(),
            primary_sector: Sector::Semantic,
            metadata: None,
        })
        .await
        .unwrap();

    let response = engine
        .search(SearchQuery {
            user_id: "u1".into(),
            text: Some("database".into()),
            embedding: None,
            metadata: Some(MetadataFilter {
                tags: Some(vec!["sql".to_string()]),
                ..Default::default()
            }),
            similar_to: Some(strong.id.clone()),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();

    let strong_hit = response.hits.iter().find(|h| h.memory.id == strong.id);
    let weak_hit = response.hits.iter().find(|h| h.memory.id == weak.id);

    assert!(strong_hit.is_some());
    if let (Some(strong_hit), Some(weak_hit)) = (strong_hit, weak_hit) {
        assert!(strong_hit.composite_score >= weak_hit.composite_score);
        assert!(strong_hit.strategy_scores.len() >= weak_hit.strategy_scores.len());
    }
}
