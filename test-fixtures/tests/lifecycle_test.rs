//! Full create/retrieve/update/delete lifecycle, ownership isolation, and
//! partial-failure batch semantics, exercised against `MemoryRepository`.

use std::sync::Arc;

use cme_core::config::{GraphConfig, StorageConfig};
use cme_core::errors::CortexError;
use cme_core::memory::Sector;
use cme_memory::{BatchCreateRequest, CreateRequest, MemoryRepository, UpdateRequest};
use cme_storage::StorageEngine;
use test_fixtures::DeterministicEmbedder;

fn repo() -> MemoryRepository {
    MemoryRepository::new(
        Arc::new(StorageEngine::open(":memory:").unwrap()),
        Arc::new(DeterministicEmbedder::default()),
        GraphConfig::default(),
        StorageConfig::default(),
    )
}

#[tokio::test]
async fn s1_store_retrieve_update_delete() {
    let repo = repo();

    let created = repo
        .create(CreateRequest {
            user_id: "u1".into(),
            session_id: None,
            content: "Machine learning is a subset of AI concerned with statistical models".into(),
            primary_sector: Sector::Semantic,
            metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(created.strength, 1.0);

    let retrieved = repo.retrieve(&created.id, "u1").unwrap().unwrap();
    assert_eq!(retrieved.access_count, 1);

    let updated = repo
        .update(UpdateRequest {
            memory_id: created.id.clone(),
            user_id: "u1".into(),
            content: Some(
                "Machine learning is a subset of artificial intelligence concerned with statistical models and data-driven inference"
                    .into(),
            ),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(updated.embeddings_regenerated);

    repo.delete(&created.id, "u1", false).unwrap();
    assert!(repo.retrieve(&created.id, "u1").unwrap().is_none());
}

#[tokio::test]
async fn s5_ownership_isolation_on_delete() {
    let repo = repo();
    let created = repo
        .create(CreateRequest {
            user_id: "u1".into(),
            session_id: None,
            content: "a private memory belonging only to u1, never to u2".into(),
            primary_sector: Sector::Episodic,
            metadata: None,
        })
        .await
        .unwrap();

    let err = repo.delete(&created.id, "u2", false).unwrap_err();
    assert!(matches!(err, CortexError::NotFoundError { .. }));

    assert!(repo.retrieve(&created.id, "u1").unwrap().is_some());
}

#[tokio::test]
async fn s6_batch_create_partial_failure() {
    let repo = repo();

    let memories = vec![
        ("the first memory has plenty of content to pass validation".to_string(), Sector::Episodic, None),
        ("the second memory also has plenty of content to pass validation".to_string(), Sector::Episodic, None),
        ("short".to_string(), Sector::Episodic, None),
        ("the fourth memory also has plenty of content to pass validation".to_string(), Sector::Episodic, None),
        ("the fifth memory also has plenty of content to pass validation".to_string(), Sector::Episodic, None),
    ];

    let results = repo
        .batch_create(BatchCreateRequest {
            user_id: "u1".into(),
            session_id: None,
            memories,
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    let success_count = results.iter().filter(|r| r.memory.is_some()).count();
    let failure_count = results.iter().filter(|r| r.error.is_some()).count();
    assert_eq!(success_count, 4);
    assert_eq!(failure_count, 1);
    assert!(results[2].memory.is_none());
    assert!(results[2].error.is_some());

    for (i, result) in results.iter().enumerate() {
        if i == 2 {
            continue;
        }
        let memory = result.memory.as_ref().unwrap();
        assert!(repo.retrieve(&memory.id, "u1").unwrap().is_some());
    }
}
