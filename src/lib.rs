// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod embeddings;
pub mod knowledge;
pub mod llm;
pub mod rag;
pub mod storage;
pub mod usage;
pub mod vision;

// Re-export main types
pub use api::{build_router, start_server, ApiError, AppState, ErrorResponse, Metrics};
pub use config::Settings;
pub use embeddings::{Embedder, HashEmbedder, OnnxEmbedder, EMBEDDING_DIMENSION};
pub use knowledge::{Disease, KnowledgeStore, Medicine, TreatmentStep};
pub use llm::{ChatMessage, ChatRole, Completion, LlmProvider, LlmService, TokenUsage};
pub use rag::{ChatAnswer, HistoryMessage, KnowledgeIndex, RagService, SyncReport};
pub use storage::{DiagnosisStore, RecordSource, StoreStats};
pub use usage::{UsageSummary, UsageTracker};
pub use vision::{
    ClassificationOutcome, DetectionOutcome, DiagnosisService, FrameSampler, OnnxClassifier,
    OnnxDetector, StreamAggregate,
};
