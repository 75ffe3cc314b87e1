// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embeddings for knowledge retrieval
//!
//! Two implementations live behind the [`Embedder`] trait:
//! - [`OnnxEmbedder`]: all-MiniLM-L6-v2 via ONNX Runtime (production)
//! - [`HashEmbedder`]: deterministic SHA-256 embedding used when no model
//!   files are installed and in tests

pub mod onnx_model;

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

pub use onnx_model::OnnxEmbedder;

/// Dimension shared by both embedders (matches all-MiniLM-L6-v2)
pub const EMBEDDING_DIMENSION: usize = 384;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a fixed-dimension vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; default implementation loops over [`Self::embed`]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}

/// L2-normalize a vector in place; zero vectors are left untouched
pub fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Cosine similarity between two vectors (0.0 on dimension mismatch)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Deterministic embedding derived from token content.
///
/// Not semantically meaningful, but stable across runs, which is all the
/// index plumbing and the tests need when no ONNX model is installed.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let tokens: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();

        // Hash each token so texts sharing words share vector components
        let mut embedding = vec![0.0f32; self.dimension];
        let units: Vec<&str> = if tokens.is_empty() {
            vec![""]
        } else {
            tokens.iter().map(|s| s.as_str()).collect()
        };

        for unit in &units {
            let mut hasher = Sha256::new();
            hasher.update(unit.as_bytes());
            let hash = hasher.finalize();
            for i in 0..self.dimension {
                let byte_value = hash[i % hash.len()];
                embedding[i] += (byte_value as f32 / 255.0) * 2.0 - 1.0;
            }
        }

        normalize(&mut embedding);
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash-fallback"
    }
}
