// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Knowledge synchronization against a knowledge base file that changes
//! on disk between syncs

use flocksense::{
    embeddings::{Embedder, HashEmbedder, EMBEDDING_DIMENSION},
    knowledge::{seed, KnowledgeStore},
    llm::LlmService,
    rag::{KnowledgeIndex, RagService},
    usage::UsageTracker,
};
use std::sync::Arc;
use tokio::sync::RwLock;

async fn service_for(path: &std::path::Path) -> RagService {
    let store = KnowledgeStore::load_or_seed(path).await.unwrap();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    let index = Arc::new(RwLock::new(KnowledgeIndex::new(EMBEDDING_DIMENSION, 1000)));
    RagService::new(
        store,
        embedder,
        index,
        Arc::new(LlmService::with_providers(vec![])),
        UsageTracker::ephemeral(),
        4,
        0.25,
        5,
    )
}

#[tokio::test]
async fn test_sync_follows_file_edits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diseases.json");
    let mut diseases = seed::builtin_diseases();
    std::fs::write(&path, serde_json::to_string(&diseases).unwrap()).unwrap();

    let service = service_for(&path).await;

    // First sync indexes every disease
    let report = service.sync_knowledge().await.unwrap();
    assert_eq!(report.indexed, diseases.len());
    assert_eq!(service.index_size().await, diseases.len());

    // Edit one entry: its document is re-embedded, the rest are skipped
    diseases[0].symptoms = "Completely rewritten symptom description".to_string();
    std::fs::write(&path, serde_json::to_string(&diseases).unwrap()).unwrap();

    let report = service.sync_knowledge().await.unwrap();
    assert_eq!(report.indexed, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(report.unchanged, diseases.len() - 1);

    // Remove an entry: its index document goes away
    diseases.pop();
    std::fs::write(&path, serde_json::to_string(&diseases).unwrap()).unwrap();

    let report = service.sync_knowledge().await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(service.index_size().await, diseases.len());
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diseases.json");
    std::fs::write(
        &path,
        serde_json::to_string(&seed::builtin_diseases()).unwrap(),
    )
    .unwrap();

    let service = service_for(&path).await;
    service.sync_knowledge().await.unwrap();
    let size_after_first = service.index_size().await;

    for _ in 0..3 {
        let report = service.sync_knowledge().await.unwrap();
        assert_eq!(report.indexed, 0);
        assert_eq!(report.updated, 0);
        assert_eq!(report.removed, 0);
    }
    assert_eq!(service.index_size().await, size_after_first);
}
