// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route registration and plumbing tests
//!
//! These tests drive the full router with no models installed and no LLM
//! providers configured: the service must stay up and degrade cleanly.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use flocksense::{
    api::{build_router, AppState, Metrics},
    config::Settings,
    embeddings::{Embedder, HashEmbedder, EMBEDDING_DIMENSION},
    knowledge::KnowledgeStore,
    llm::LlmService,
    rag::{KnowledgeIndex, RagService},
    storage::DiagnosisStore,
    usage::UsageTracker,
    vision::DiagnosisService,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::util::ServiceExt; // for `oneshot`

/// Helper: AppState with no models and no providers
async fn test_state() -> AppState {
    let knowledge = KnowledgeStore::load_or_seed("/nonexistent/kb.json")
        .await
        .unwrap();
    let diagnosis = DiagnosisService::with_models(None, None, knowledge.clone(), 0.6);
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    let index = Arc::new(RwLock::new(KnowledgeIndex::new(EMBEDDING_DIMENSION, 1000)));
    let llm = Arc::new(LlmService::with_providers(vec![]));
    let usage = UsageTracker::ephemeral();
    let rag = Arc::new(RagService::new(
        knowledge,
        embedder,
        index,
        llm,
        usage.clone(),
        4,
        0.25,
        5,
    ));

    AppState {
        settings: Arc::new(Settings::from_env()),
        diagnosis,
        rag,
        store: DiagnosisStore::ephemeral(),
        usage,
        metrics: Arc::new(Metrics::default()),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

#[tokio::test]
async fn test_root_returns_service_info() {
    let app = build_router(test_state().await);
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Poultry Disease Diagnosis API");
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["detect"], "/api/v1/detect");
}

#[tokio::test]
async fn test_health_reports_degraded_models() {
    let app = build_router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["models_loaded"]["detection"], false);
    assert_eq!(body["models_loaded"]["classification"], false);
    assert!(body["knowledge_docs"].as_u64().unwrap() > 0);
    assert_eq!(body["llm_providers"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = build_router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detect_rejects_non_multipart_body() {
    let app = build_router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/detect")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_knowledge_sync_indexes_seeded_diseases() {
    let state = test_state().await;
    let expected = state.rag.knowledge_docs().await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/knowledge/sync")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["indexed"].as_u64().unwrap() as usize, expected);
    assert_eq!(body["removed"], 0);
}

#[tokio::test]
async fn test_usage_summary_starts_empty() {
    let app = build_router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/usage/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_requests"], 0);
    assert_eq!(body["total_tokens"], 0);
}

#[tokio::test]
async fn test_metrics_exposes_counters() {
    let app = build_router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body_bytes.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
    assert!(text.contains("stream_frames_total"));
}
