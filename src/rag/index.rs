// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// In-memory vector index over knowledge documents
// Entries carry a content hash so synchronization can skip unchanged docs

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::embeddings::cosine_similarity;

/// Maximum metadata size per document (10KB)
const MAX_METADATA_SIZE: usize = 10 * 1024;

/// Indexed document
#[derive(Clone, Debug)]
pub struct DocEntry {
    pub vector: Vec<f32>,
    pub content_hash: String,
    pub metadata: Value,
}

/// Result from a similarity search
#[derive(Clone, Debug)]
pub struct DocMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Value,
}

/// Vector index keyed by stable document id (the disease code).
///
/// Supports semantic search via cosine similarity; the knowledge base is
/// dozens of documents, so exhaustive scoring is the right tool.
#[derive(Debug)]
pub struct KnowledgeIndex {
    dimension: usize,
    docs: HashMap<String, DocEntry>,
    max_docs: usize,
}

impl KnowledgeIndex {
    pub fn new(dimension: usize, max_docs: usize) -> Self {
        Self {
            dimension,
            docs: HashMap::new(),
            max_docs,
        }
    }

    /// Insert or replace a document.
    ///
    /// Rejects wrong dimensions, non-finite values, oversized metadata and
    /// inserts beyond capacity.
    pub fn upsert(
        &mut self,
        id: String,
        vector: Vec<f32>,
        content_hash: String,
        metadata: Value,
    ) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(anyhow!(
                "Invalid vector dimensions: expected {}, got {}",
                self.dimension,
                vector.len()
            ));
        }

        if vector.iter().any(|v| v.is_nan() || v.is_infinite()) {
            return Err(anyhow!(
                "Invalid vector values: contains NaN or Infinity"
            ));
        }

        let metadata_size = serde_json::to_string(&metadata)?.len();
        if metadata_size > MAX_METADATA_SIZE {
            return Err(anyhow!(
                "Metadata too large: {} bytes (max: {} bytes)",
                metadata_size,
                MAX_METADATA_SIZE
            ));
        }

        if !self.docs.contains_key(&id) && self.docs.len() >= self.max_docs {
            return Err(anyhow!(
                "Maximum document capacity reached: {} (max: {})",
                self.docs.len(),
                self.max_docs
            ));
        }

        self.docs.insert(
            id,
            DocEntry {
                vector,
                content_hash,
                metadata,
            },
        );
        Ok(())
    }

    /// Whether a document with this id already carries this content hash
    pub fn is_current(&self, id: &str, content_hash: &str) -> bool {
        self.docs
            .get(id)
            .map(|e| e.content_hash == content_hash)
            .unwrap_or(false)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.docs.remove(id).is_some()
    }

    /// Drop every document whose id is not in `keep`; returns removed count
    pub fn retain_ids(&mut self, keep: &HashSet<String>) -> usize {
        let before = self.docs.len();
        self.docs.retain(|id, _| keep.contains(id));
        before - self.docs.len()
    }

    pub fn count(&self) -> usize {
        self.docs.len()
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }

    /// Top-k cosine-similarity search with an optional minimum score
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<DocMatch>> {
        if query.len() != self.dimension {
            return Err(anyhow!(
                "Invalid query dimensions: expected {}, got {}",
                self.dimension,
                query.len()
            ));
        }

        if self.docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<DocMatch> = self
            .docs
            .iter()
            .map(|(id, entry)| DocMatch {
                id: id.clone(),
                score: cosine_similarity(query, &entry.vector),
                metadata: entry.metadata.clone(),
            })
            .collect();

        if let Some(min_score) = threshold {
            matches.retain(|m| m.score >= min_score);
        }

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(k);

        Ok(matches)
    }
}
