// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service info, health and metrics handlers

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;

use super::server::AppState;
use crate::storage::StoreStats;

pub const SERVICE_NAME: &str = "Poultry Disease Diagnosis API";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    pub endpoints: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelsLoaded {
    pub detection: bool,
    pub classification: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub models_loaded: ModelsLoaded,
    pub knowledge_docs: usize,
    pub index_size: usize,
    pub llm_providers: Vec<String>,
    pub results: StoreStats,
}

/// Root endpoint - API info
pub async fn root_handler() -> axum::Json<ServiceInfo> {
    axum::Json(ServiceInfo {
        name: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
        status: "running".to_string(),
        endpoints: json!({
            "health": "/health",
            "detect": "/api/v1/detect",
            "classify": "/api/v1/classify",
            "chat": "/api/v1/chat/ask",
            "knowledge_sync": "/api/v1/knowledge/sync",
            "usage": "/api/v1/usage/summary",
            "camera_stream": "/ws/camera-stream",
        }),
    })
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        models_loaded: ModelsLoaded {
            detection: state.diagnosis.detector_loaded(),
            classification: state.diagnosis.classifier_loaded(),
        },
        knowledge_docs: state.rag.knowledge_docs().await,
        index_size: state.rag.index_size().await,
        llm_providers: state.rag.provider_names(),
        results: state.store.stats().await,
    })
}

/// Prometheus-style plaintext metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    let metrics = &state.metrics;
    let body = format!(
        "# HELP http_requests_total Total number of HTTP requests\n\
         # TYPE http_requests_total counter\n\
         http_requests_total {}\n\
         # HELP detections_total Total detection passes\n\
         # TYPE detections_total counter\n\
         detections_total {}\n\
         # HELP classifications_total Total classification passes\n\
         # TYPE classifications_total counter\n\
         classifications_total {}\n\
         # HELP chat_requests_total Total chat completions requested\n\
         # TYPE chat_requests_total counter\n\
         chat_requests_total {}\n\
         # HELP stream_frames_total Total camera-stream frames received\n\
         # TYPE stream_frames_total counter\n\
         stream_frames_total {}\n",
        metrics.requests_total.load(Ordering::Relaxed),
        metrics.detections_total.load(Ordering::Relaxed),
        metrics.classifications_total.load(Ordering::Relaxed),
        metrics.chat_requests_total.load(Ordering::Relaxed),
        metrics.stream_frames_total.load(Ordering::Relaxed),
    );

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}
