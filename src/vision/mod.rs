// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision pipeline: image decoding, ONNX detection/classification,
//! annotation, aggregation and camera-stream frame sampling

pub mod annotate;
pub mod classifier;
pub mod detector;
pub mod image_utils;
pub mod sampler;
pub mod service;

pub use classifier::{Classification, OnnxClassifier};
pub use detector::{Detection, Letterbox, OnnxDetector};
pub use image_utils::{decode_base64_image, decode_image_bytes, ImageError, ImageInfo};
pub use sampler::{FrameSampler, StreamAggregate};
pub use service::{
    ClassificationOutcome, DetectionBoxOut, DetectionOutcome, DiagnosisService, VisionError,
};
