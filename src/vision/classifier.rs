// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX disease classifier for fecal images

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Classification result: top-1 plus the full probability map
#[derive(Debug, Clone)]
pub struct Classification {
    pub class_name: String,
    pub confidence: f32,
    /// (class name, probability) in model output order
    pub probabilities: Vec<(String, f32)>,
}

/// Classification model wrapper around an ONNX Runtime session
pub struct OnnxClassifier {
    session: Arc<Mutex<Session>>,
    class_names: Vec<String>,
    input_size: u32,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("class_names", &self.class_names)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load the classification model from disk (CUDA with CPU fallback)
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        class_names: Vec<String>,
        input_size: u32,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            anyhow::bail!("Classification model not found: {}", model_path.display());
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
                info!("✅ Classification model loaded with CUDA execution provider");
                s
            }
            Err(e) => {
                warn!(
                    "⚠️ CUDA unavailable for classification model ({}), using CPU",
                    e
                );
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
                        format!(
                            "Failed to load classification model from {}",
                            model_path.display()
                        )
                    })?
            }
        };

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            class_names,
            input_size,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Classify a fecal image into one of the known disease classes
    pub fn classify(&self, image: &DynamicImage) -> Result<Classification> {
        let size = self.input_size;
        let resized = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();

        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }

        let mut session = self.session.lock().unwrap();
        let outputs = session.run(ort::inputs![
            "images" => Value::from_array(input)?
        ])?;
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract classification output tensor")?;

        // [1, nc] -> [nc]
        let scores: Vec<f32> = output.index_axis(Axis(0), 0).iter().copied().collect();
        if scores.len() != self.class_names.len() {
            anyhow::bail!(
                "Model emitted {} classes but {} names are configured",
                scores.len(),
                self.class_names.len()
            );
        }

        let probabilities = to_probabilities(&scores);
        let (top_idx, top_prob) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .context("Classification output was empty")?;

        Ok(Classification {
            class_name: self.class_names[top_idx].clone(),
            confidence: top_prob,
            probabilities: self
                .class_names
                .iter()
                .cloned()
                .zip(probabilities)
                .collect(),
        })
    }
}

/// Normalize raw output into probabilities.
///
/// Exported classification heads usually emit a softmaxed distribution
/// already; raw logits (negatives, or a sum far from 1) get a softmax.
pub fn to_probabilities(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let looks_normalized = scores.iter().all(|&s| (0.0..=1.0).contains(&s))
        && (sum - 1.0).abs() < 0.01;
    if looks_normalized {
        return scores.to_vec();
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.iter().map(|&e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_probabilities_passthrough_for_normalized() {
        let scores = vec![0.7, 0.2, 0.1];
        assert_eq!(to_probabilities(&scores), scores);
    }

    #[test]
    fn test_to_probabilities_softmaxes_logits() {
        let probs = to_probabilities(&[2.0, 1.0, -1.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn test_to_probabilities_is_stable_for_large_logits() {
        let probs = to_probabilities(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_missing_model_file_errors() {
        let result = OnnxClassifier::new(
            "/nonexistent/model.onnx",
            vec!["Healthy".to_string()],
            224,
        );
        assert!(result.is_err());
    }
}
