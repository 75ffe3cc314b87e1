// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Chat endpoint behavior with and without a working provider

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use flocksense::{
    api::{build_router, AppState, Metrics},
    config::Settings,
    embeddings::{Embedder, HashEmbedder, EMBEDDING_DIMENSION},
    knowledge::KnowledgeStore,
    llm::{ChatMessage, Completion, LlmError, LlmProvider, LlmService, TokenUsage},
    rag::{KnowledgeIndex, RagService},
    storage::DiagnosisStore,
    usage::UsageTracker,
    vision::DiagnosisService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::util::ServiceExt;

struct CannedProvider;

#[async_trait]
impl LlmProvider for CannedProvider {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        Ok(Completion {
            text: "Medicate the drinking water with toltrazuril.".to_string(),
            provider: "canned".to_string(),
            model: "canned-1".to_string(),
            usage: TokenUsage::new(150, 30),
            processing_time_ms: 2,
        })
    }
    fn name(&self) -> &'static str {
        "canned"
    }
    fn model(&self) -> &str {
        "canned-1"
    }
    fn is_available(&self) -> bool {
        true
    }
}

async fn state_with_providers(providers: Vec<Box<dyn LlmProvider>>) -> AppState {
    let knowledge = KnowledgeStore::load_or_seed("/nonexistent/kb.json")
        .await
        .unwrap();
    let diagnosis = DiagnosisService::with_models(None, None, knowledge.clone(), 0.6);
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    let index = Arc::new(RwLock::new(KnowledgeIndex::new(EMBEDDING_DIMENSION, 1000)));
    let llm = Arc::new(LlmService::with_providers(providers));
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
    // Populate the index so retrieval has something to rank
    rag.sync_knowledge().await.unwrap();

    AppState {
        settings: Arc::new(Settings::from_env()),
        diagnosis,
        rag,
        store: DiagnosisStore::ephemeral(),
        usage,
        metrics: Arc::new(Metrics::default()),
    }
}

async fn post_chat(app: axum::Router, payload: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/chat/ask")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body_bytes).unwrap())
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let app = build_router(state_with_providers(vec![]).await);
    let (status, body) = post_chat(app, json!({"message": "  "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
    assert_eq!(body["details"]["field"], "message");
}

#[tokio::test]
async fn test_unconfigured_assistant_answers_politely() {
    let app = build_router(state_with_providers(vec![]).await);
    let (status, body) = post_chat(app, json!({"message": "what is coccidiosis?"})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["answer"].as_str().unwrap().contains("not been configured"));
    assert!(body.get("usage").is_none());
}

#[tokio::test]
async fn test_answer_includes_sources_and_usage() {
    let state = state_with_providers(vec![Box::new(CannedProvider)]).await;
    let usage = state.usage.clone();
    let app = build_router(state);

    let (status, body) = post_chat(
        app,
        json!({
            "message": "My chickens have bloody droppings, which disease is this?",
            "history": [
                {"role": "user", "content": "hello"},
                {"role": "ai", "content": "how can I help?"}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["answer"],
        "Medicate the drinking water with toltrazuril."
    );
    assert!(!body["sources"].as_array().unwrap().is_empty());
    assert_eq!(body["usage"]["provider"], "canned");
    assert_eq!(body["usage"]["total_tokens"], 180);

    // The call was accounted
    let summary = usage.summary().await;
    assert_eq!(summary.total_requests, 1);
    assert_eq!(summary.by_feature["chat"].total_tokens, 180);
}
