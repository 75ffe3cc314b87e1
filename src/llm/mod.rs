// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// LLM access: chat types, provider trait, concrete clients and the
// priority/failover service that switches between them

pub mod gemini;
pub mod openai;
pub mod provider;
pub mod service;
pub mod types;

pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatProvider;
pub use provider::LlmProvider;
pub use service::LlmService;
pub use types::{ChatMessage, ChatRole, Completion, LlmError, TokenUsage};
