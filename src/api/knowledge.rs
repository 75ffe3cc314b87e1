// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Knowledge synchronization endpoint

use axum::extract::State;
use std::sync::atomic::Ordering;

use super::errors::ApiError;
use super::server::AppState;
use crate::rag::SyncReport;

/// Re-read the knowledge base and synchronize the vector index
pub async fn sync_handler(
    State(state): State<AppState>,
) -> Result<axum::Json<SyncReport>, ApiError> {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let report = state
        .rag
        .sync_knowledge()
        .await
        .map_err(|e| ApiError::InternalError(format!("Knowledge sync failed: {}", e)))?;

    Ok(axum::Json(report))
}
