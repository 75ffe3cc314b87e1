// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Diagnosis orchestration over the detection and classification models

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::annotate::{draw_boxes, is_healthy_class};
use super::classifier::OnnxClassifier;
use super::detector::OnnxDetector;
use super::image_utils::{self, ImageError};
use crate::config::Settings;
use crate::knowledge::KnowledgeStore;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("{0} model is not loaded")]
    ModelNotLoaded(&'static str),

    #[error("Inference failed: {0}")]
    Inference(#[from] anyhow::Error),

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// One detection box as returned to clients (and persisted as raw_result)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionBoxOut {
    /// 1-based index within the frame
    pub id: usize,
    pub class_name: String,
    pub confidence: f32,
    /// [x1, y1, x2, y2] in original image pixels
    pub bbox: [f32; 4],
}

/// Aggregated result of a detection pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub total_chickens: usize,
    pub healthy_count: usize,
    pub sick_count: usize,
    pub detections: Vec<DetectionBoxOut>,
    pub has_sick_chickens: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    /// Annotated JPEG, base64-encoded (omitted on stream frames)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// Result of a fecal-image classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub disease: String,
    pub confidence: f32,
    pub all_probabilities: HashMap<String, f32>,
    pub is_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

fn round_to(value: f32, digits: i32) -> f32 {
    let factor = 10f32.powi(digits);
    (value * factor).round() / factor
}

/// Service running the two pretrained models and shaping their output.
///
/// Models are optional: a missing file leaves the corresponding endpoint
/// degraded (503) instead of preventing startup.
#[derive(Clone)]
pub struct DiagnosisService {
    detector: Option<Arc<OnnxDetector>>,
    classifier: Option<Arc<OnnxClassifier>>,
    knowledge: KnowledgeStore,
    conf_threshold: f32,
}

impl DiagnosisService {
    /// Load both models, warn-and-continue on failure
    pub fn load(settings: &Settings, knowledge: KnowledgeStore) -> Self {
        let detector = match OnnxDetector::new(
            &settings.detection_model_path,
            settings.detection_class_names.clone(),
            settings.detection_input_size,
            settings.detection_iou_threshold,
        ) {
            Ok(model) => {
                info!("✅ Detection model loaded from {}", settings.detection_model_path);
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!("⚠️ Detection model unavailable: {}", e);
                None
            }
        };

        let classifier = match OnnxClassifier::new(
            &settings.classification_model_path,
            settings.classification_class_names.clone(),
            settings.classification_input_size,
        ) {
            Ok(model) => {
                info!(
                    "✅ Classification model loaded from {}",
                    settings.classification_model_path
                );
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!("⚠️ Classification model unavailable: {}", e);
                None
            }
        };

        Self {
            detector,
            classifier,
            knowledge,
            conf_threshold: settings.detection_conf_threshold,
        }
    }

    /// Service with injected models (tests)
    pub fn with_models(
        detector: Option<Arc<OnnxDetector>>,
        classifier: Option<Arc<OnnxClassifier>>,
        knowledge: KnowledgeStore,
        conf_threshold: f32,
    ) -> Self {
        Self {
            detector,
            classifier,
            knowledge,
            conf_threshold,
        }
    }

    pub fn detector_loaded(&self) -> bool {
        self.detector.is_some()
    }

    pub fn classifier_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    /// Detect healthy/sick chickens in an image and aggregate the result.
    ///
    /// `annotate` controls whether the color-coded JPEG is produced
    /// (uploads yes, stream frames no).
    pub fn detect_sick_chickens(
        &self,
        image: &DynamicImage,
        annotate: bool,
    ) -> Result<DetectionOutcome, VisionError> {
        let detector = self
            .detector
            .as_ref()
            .ok_or(VisionError::ModelNotLoaded("detection"))?;

        let raw = detector.detect(image, self.conf_threshold)?;

        let mut healthy_count = 0;
        let mut sick_count = 0;
        let detections: Vec<DetectionBoxOut> = raw
            .iter()
            .enumerate()
            .map(|(idx, d)| {
                if is_healthy_class(&d.class_name) {
                    healthy_count += 1;
                } else {
                    sick_count += 1;
                }
                DetectionBoxOut {
                    id: idx + 1,
                    class_name: d.class_name.clone(),
                    confidence: round_to(d.confidence, 3),
                    bbox: [
                        round_to(d.bbox[0], 2),
                        round_to(d.bbox[1], 2),
                        round_to(d.bbox[2], 2),
                        round_to(d.bbox[3], 2),
                    ],
                }
            })
            .collect();

        let alert = if sick_count > 0 {
            Some(format!(
                "⚠️ Detected {} individuals showing abnormal signs. Inspect the housing closely.",
                sick_count
            ))
        } else {
            None
        };

        let image_base64 = if annotate {
            let annotated = draw_boxes(image, &raw);
            Some(image_utils::encode_jpeg_base64(&annotated)?)
        } else {
            None
        };

        Ok(DetectionOutcome {
            total_chickens: detections.len(),
            healthy_count,
            sick_count,
            detections,
            has_sick_chickens: sick_count > 0,
            alert,
            image_base64,
        })
    }

    /// Classify a fecal image and enrich the result from the knowledge base
    pub async fn classify_disease(
        &self,
        image: &DynamicImage,
    ) -> Result<ClassificationOutcome, VisionError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(VisionError::ModelNotLoaded("classification"))?;

        let classification = classifier.classify(image)?;

        let all_probabilities: HashMap<String, f32> = classification
            .probabilities
            .iter()
            .map(|(name, prob)| (name.clone(), round_to(*prob, 4)))
            .collect();

        let is_healthy = classification.class_name.eq_ignore_ascii_case("healthy");

        // Attach the matching knowledge entry when one exists
        let (description, recommendation) = if is_healthy {
            (None, None)
        } else {
            match self.knowledge.find_by_name(&classification.class_name).await {
                Some(disease) => {
                    let recommendation = disease
                        .first_step()
                        .map(|s| s.description.clone())
                        .or_else(|| Some(disease.prevention.clone()));
                    (Some(disease.symptoms.clone()), recommendation)
                }
                None => (None, None),
            }
        };

        Ok(ClassificationOutcome {
            disease: classification.class_name,
            confidence: round_to(classification.confidence, 4),
            all_probabilities,
            is_healthy,
            description,
            recommendation,
        })
    }
}
