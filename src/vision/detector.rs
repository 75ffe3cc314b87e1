// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX object detector for flagging healthy/sick chickens
//!
//! Runs a YOLO-style detection model exported to ONNX. The model itself is
//! pretrained and treated as a black box; this module owns the surrounding
//! plumbing: letterbox preprocessing, decoding the `[1, 4+nc, N]` output
//! (cxcywh + per-class scores), confidence filtering, class-aware NMS and
//! rescaling boxes back to original pixel coordinates.

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{Array4, ArrayView2, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Gray value used to pad the letterboxed input
const PAD_VALUE: f32 = 114.0 / 255.0;

/// One detected chicken
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    /// [x1, y1, x2, y2] in original image pixels
    pub bbox: [f32; 4],
}

/// Geometry of a letterboxed input: uniform scale plus centering pads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Compute the letterbox mapping an `width`x`height` image into a
    /// `size`x`size` square
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: (size as f32 - new_w) / 2.0,
            pad_y: (size as f32 - new_h) / 2.0,
        }
    }

    /// Map a point from model coordinates back to original pixels
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Detection model wrapper around an ONNX Runtime session
pub struct OnnxDetector {
    session: Arc<Mutex<Session>>,
    class_names: Vec<String>,
    input_size: u32,
    iou_threshold: f32,
}

impl std::fmt::Debug for OnnxDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetector")
            .field("class_names", &self.class_names)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OnnxDetector {
    /// Load the detection model from disk.
    ///
    /// CUDA is attempted first; on failure the session falls back to CPU.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        class_names: Vec<String>,
        input_size: u32,
        iou_threshold: f32,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
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
                info!("✅ Detection model loaded with CUDA execution provider");
                s
            }
            Err(e) => {
                warn!("⚠️ CUDA unavailable for detection model ({}), using CPU", e);
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
                        format!("Failed to load detection model from {}", model_path.display())
                    })?
            }
        };

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            class_names,
            input_size,
            iou_threshold,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Detect chickens in an image.
    ///
    /// Boxes below `conf_threshold` are dropped; overlapping same-class
    /// boxes are merged by NMS; coordinates are in original pixels.
    pub fn detect(&self, image: &DynamicImage, conf_threshold: f32) -> Result<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let letterbox = Letterbox::fit(width, height, self.input_size);
        let input = preprocess(image, self.input_size, &letterbox);

        let mut session = self.session.lock().unwrap();
        let outputs = session.run(ort::inputs![
            "images" => Value::from_array(input)?
        ])?;
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract detection output tensor")?;

        // [1, 4+nc, N] -> [4+nc, N]
        let predictions = output.index_axis(Axis(0), 0);
        let predictions = predictions
            .into_dimensionality::<ndarray::Ix2>()
            .context("Unexpected detection output shape")?;

        let detections = decode_predictions(
            predictions,
            &self.class_names,
            conf_threshold,
            &letterbox,
            width as f32,
            height as f32,
        );

        Ok(non_max_suppression(detections, self.iou_threshold))
    }
}

/// Letterbox an image into an NCHW f32 tensor normalized to [0, 1]
fn preprocess(image: &DynamicImage, size: u32, letterbox: &Letterbox) -> Array4<f32> {
    let new_w = ((image.width() as f32) * letterbox.scale).round() as u32;
    let new_h = ((image.height() as f32) * letterbox.scale).round() as u32;
    let resized = image
        .resize_exact(new_w.max(1), new_h.max(1), FilterType::Triangle)
        .to_rgb8();

    let mut input = Array4::<f32>::from_elem((1, 3, size as usize, size as usize), PAD_VALUE);
    let x_off = letterbox.pad_x.round() as usize;
    let y_off = letterbox.pad_y.round() as usize;

    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = x as usize + x_off;
        let ty = y as usize + y_off;
        if tx < size as usize && ty < size as usize {
            for c in 0..3 {
                input[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    input
}

/// Decode a `[4+nc, N]` prediction matrix into detections in original
/// pixel coordinates
pub fn decode_predictions(
    predictions: ArrayView2<f32>,
    class_names: &[String],
    conf_threshold: f32,
    letterbox: &Letterbox,
    orig_width: f32,
    orig_height: f32,
) -> Vec<Detection> {
    let rows = predictions.shape()[0];
    let anchors = predictions.shape()[1];
    if rows < 5 {
        return Vec::new();
    }
    let num_classes = (rows - 4).min(class_names.len());

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        // Best class for this anchor
        let mut best_class = 0usize;
        let mut best_score = 0.0f32;
        for class in 0..num_classes {
            let score = predictions[[4 + class, anchor]];
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        if best_score < conf_threshold {
            continue;
        }

        let cx = predictions[[0, anchor]];
        let cy = predictions[[1, anchor]];
        let w = predictions[[2, anchor]];
        let h = predictions[[3, anchor]];

        let (x1, y1) = letterbox.to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_original(cx + w / 2.0, cy + h / 2.0);

        detections.push(Detection {
            class_id: best_class,
            class_name: class_names[best_class].clone(),
            confidence: best_score,
            bbox: [
                x1.clamp(0.0, orig_width),
                y1.clamp(0.0, orig_height),
                x2.clamp(0.0, orig_width),
                y2.clamp(0.0, orig_height),
            ],
        });
    }

    detections
}

/// Intersection-over-union of two xyxy boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - intersection;

    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Class-aware greedy non-maximum suppression
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
