// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat endpoint backed by the RAG service

use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;

use super::errors::ApiError;
use super::server::AppState;
use crate::rag::{ChatAnswer, HistoryMessage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

pub type ChatResponse = ChatAnswer;

/// Ask a question to the AI veterinary expert
pub async fn ask_handler(
    State(state): State<AppState>,
    axum::Json(request): axum::Json<ChatRequest>,
) -> Result<axum::Json<ChatResponse>, ApiError> {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    if request.message.trim().is_empty() {
        return Err(ApiError::ValidationError {
            field: "message".to_string(),
            message: "Message cannot be empty".to_string(),
        });
    }

    state
        .metrics
        .chat_requests_total
        .fetch_add(1, Ordering::Relaxed);

    let answer = state
        .rag
        .answer_question(&request.message, &request.history)
        .await;

    Ok(axum::Json(answer))
}
