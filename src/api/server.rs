//! HTTP server wiring: shared state, router and startup

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{camera_stream, chat, detect, handlers, knowledge, usage};
use crate::config::Settings;
use crate::rag::RagService;
use crate::storage::DiagnosisStore;
use crate::usage::UsageTracker;
use crate::vision::DiagnosisService;

/// Hand-rolled request counters surfaced on /metrics
#[derive(Debug, Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub detections_total: AtomicU64,
    pub classifications_total: AtomicU64,
    pub chat_requests_total: AtomicU64,
    pub stream_frames_total: AtomicU64,
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub diagnosis: DiagnosisService,
    pub rag: Arc<RagService>,
    pub store: DiagnosisStore,
    pub usage: UsageTracker,
    pub metrics: Arc<Metrics>,
}

/// Build the application router with all routes and layers
pub fn build_router(state: AppState) -> Router {
    let cors = if state.settings.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = state
            .settings
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/v1/detect", post(detect::detect_handler))
        .route("/api/v1/classify", post(detect::classify_handler))
        .route("/api/v1/chat/ask", post(chat::ask_handler))
        .route("/api/v1/knowledge/sync", post(knowledge::sync_handler))
        .route("/api/v1/usage/summary", get(usage::summary_handler))
        .route("/ws/camera-stream", get(camera_stream::camera_stream_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = state.settings.api_addr.parse()?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 API server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
