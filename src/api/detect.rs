// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image upload endpoints: detection and disease classification

use axum::extract::State;
use axum_extra::extract::Multipart;
use serde_json::json;
use std::sync::atomic::Ordering;

use super::errors::ApiError;
use super::server::AppState;
use crate::storage::RecordSource;
use crate::vision::image_utils::decode_image_bytes;
use crate::vision::{ClassificationOutcome, DetectionOutcome};

/// Pull the uploaded image out of the `file` multipart field
async fn read_upload(multipart: &mut Multipart) -> Result<bytes::Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {}", e)));
        }
    }

    Err(ApiError::ValidationError {
        field: "file".to_string(),
        message: "No file uploaded".to_string(),
    })
}

/// Detect healthy and sick chickens in an image
pub async fn detect_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<axum::Json<DetectionOutcome>, ApiError> {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let bytes = read_upload(&mut multipart).await?;
    let (image, _info) = decode_image_bytes(&bytes)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid image file: {}", e)))?;

    let outcome = state.diagnosis.detect_sick_chickens(&image, true)?;
    state.metrics.detections_total.fetch_add(1, Ordering::Relaxed);

    state
        .store
        .record_detection(
            RecordSource::Upload,
            outcome.total_chickens,
            outcome.healthy_count,
            outcome.sick_count,
            json!(outcome.detections),
        )
        .await;

    Ok(axum::Json(outcome))
}

/// Classify chicken disease from a fecal image
pub async fn classify_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<axum::Json<ClassificationOutcome>, ApiError> {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let bytes = read_upload(&mut multipart).await?;
    let (image, _info) = decode_image_bytes(&bytes)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid image file: {}", e)))?;

    let outcome = state.diagnosis.classify_disease(&image).await?;
    state
        .metrics
        .classifications_total
        .fetch_add(1, Ordering::Relaxed);

    state
        .store
        .record_diagnosis(
            &outcome.disease,
            outcome.confidence,
            outcome.all_probabilities.clone(),
        )
        .await;

    Ok(axum::Json(outcome))
}
