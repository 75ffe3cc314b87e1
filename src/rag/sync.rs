// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Knowledge-base synchronization into the vector index
//!
//! Each disease becomes one document (stable id = disease code). A SHA-256
//! content hash decides whether a document needs re-embedding, so repeated
//! syncs only pay for what actually changed.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::info;

use super::index::KnowledgeIndex;
use crate::embeddings::Embedder;
use crate::knowledge::KnowledgeStore;

/// Outcome of one synchronization pass
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    /// Documents embedded for the first time
    pub indexed: usize,
    /// Documents re-embedded because their content changed
    pub updated: usize,
    /// Index entries dropped because the disease no longer exists
    pub removed: usize,
    /// Documents whose hash matched and were skipped
    pub unchanged: usize,
}

impl SyncReport {
    pub fn total_live(&self) -> usize {
        self.indexed + self.updated + self.unchanged
    }
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Synchronize the knowledge store into the vector index
pub async fn sync_index(
    store: &KnowledgeStore,
    embedder: &dyn Embedder,
    index: &RwLock<KnowledgeIndex>,
) -> Result<SyncReport> {
    let diseases = store.all().await;
    let mut report = SyncReport::default();

    // Decide what needs embedding before taking the write lock
    let mut pending: Vec<(String, String, String, serde_json::Value, bool)> = Vec::new();
    {
        let index = index.read().await;
        for disease in &diseases {
            let text = KnowledgeStore::format_disease(disease);
            let hash = content_hash(&text);
            if index.is_current(&disease.code, &hash) {
                report.unchanged += 1;
                continue;
            }
            let existed = index.contains(&disease.code);
            let metadata = json!({
                "code": disease.code,
                "name": disease.name,
                "text": text,
            });
            pending.push((disease.code.clone(), text, hash, metadata, existed));
        }
    }

    if !pending.is_empty() {
        let texts: Vec<String> = pending.iter().map(|(_, text, _, _, _)| text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        let mut index = index.write().await;
        for ((id, _text, hash, metadata, existed), vector) in pending.into_iter().zip(vectors) {
            index.upsert(id, vector, hash, metadata)?;
            if existed {
                report.updated += 1;
            } else {
                report.indexed += 1;
            }
        }
    }

    // Drop entries for diseases removed from the knowledge base
    let live: HashSet<String> = diseases.iter().map(|d| d.code.clone()).collect();
    report.removed = index.write().await.retain_ids(&live);

    info!(
        "🔄 Knowledge sync complete: {} indexed, {} updated, {} removed, {} unchanged",
        report.indexed, report.updated, report.removed, report.unchanged
    );
    Ok(report)
}
