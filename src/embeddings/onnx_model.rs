// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX sentence-transformer embedder (all-MiniLM-L6-v2)
//!
//! Wraps ONNX Runtime to produce 384-dimensional sentence embeddings:
//! BERT tokenization, a single forward pass, attention-mask weighted mean
//! pooling over token embeddings, then L2 normalization.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{info, warn};

use super::{normalize, Embedder, EMBEDDING_DIMENSION};

/// Sentence embedder backed by an ONNX Runtime session.
///
/// The session is wrapped in `Arc<Mutex>` so one loaded model can be shared
/// across handler tasks.
#[derive(Clone)]
pub struct OnnxEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbedder {
    /// Load the embedding model and its tokenizer from disk.
    ///
    /// CUDA is attempted first; on failure the session falls back to CPU.
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        let session = match cuda_result {
            Ok(s) => {
                info!("✅ Embedding model loaded with CUDA execution provider");
                s
            }
            Err(e) => {
                warn!("⚠️ CUDA unavailable for embedding model ({}), using CPU", e);
                Session::builder()
                    .context("Failed to create session builder")?
                    .with_execution_providers([CPUExecutionProvider::default().build()])
                    .context("Failed to set CPU execution provider")?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .context("Failed to set optimization level")?
                    .with_intra_threads(4)
                    .context("Failed to set intra threads")?
                    .commit_from_file(model_path)
                    .with_context(|| {
                        format!("Failed to load ONNX model from {}", model_path.display())
                    })?
            }
        };

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: EMBEDDING_DIMENSION,
        })
    }

    fn run_forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings: Vec<_> = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        // Pad all sequences to the longest in the batch
        let mut input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * max_len);
        let mut token_type_ids = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            input_ids.extend(ids.iter().map(|&id| id as i64));
            attention_mask.extend(mask.iter().map(|&m| m as i64));
            token_type_ids.extend(std::iter::repeat(0i64).take(ids.len()));

            let padding = max_len - ids.len();
            input_ids.extend(std::iter::repeat(0i64).take(padding));
            attention_mask.extend(std::iter::repeat(0i64).take(padding));
            token_type_ids.extend(std::iter::repeat(0i64).take(padding));
        }

        let mask_for_pooling = attention_mask.clone();

        let input_ids_array = Array2::from_shape_vec((texts.len(), max_len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((texts.len(), max_len), attention_mask)
            .context("Failed to create attention_mask array")?;
        let token_type_ids_array = Array2::from_shape_vec((texts.len(), max_len), token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let mut session = self.session.lock().unwrap();
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // Token-level output [batch, seq_len, hidden]; pool to sentence level
        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch_idx in 0..texts.len() {
            let batch_item = output_array.index_axis(Axis(0), batch_idx);
            let seq_len = batch_item.shape()[0];
            let hidden_dim = batch_item.shape()[1];

            let item_mask = &mask_for_pooling[batch_idx * max_len..(batch_idx + 1) * max_len];

            let mut pooled = vec![0.0f32; hidden_dim];
            let mut sum_mask = 0.0f32;
            for i in 0..seq_len {
                let mask_value = item_mask[i] as f32;
                sum_mask += mask_value;
                for j in 0..hidden_dim {
                    pooled[j] += batch_item[[i, j]] * mask_value;
                }
            }
            for val in &mut pooled {
                *val /= sum_mask.max(1e-9);
            }

            if pooled.len() != self.dimension {
                anyhow::bail!(
                    "Unexpected embedding dimension: {} (expected {})",
                    pooled.len(),
                    self.dimension
                );
            }

            normalize(&mut pooled);
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.run_forward(&[text.to_string()])?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedding model returned no output"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.run_forward(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
