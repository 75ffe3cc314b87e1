// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Usage accounting endpoint

use axum::extract::State;
use std::sync::atomic::Ordering;

use super::server::AppState;
use crate::usage::UsageSummary;

/// Aggregated AI usage (requests, tokens, estimated cost)
pub async fn summary_handler(State(state): State<AppState>) -> axum::Json<UsageSummary> {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
    axum::Json(state.usage.summary().await)
}
