// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of the conversation handed to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Estimated USD cost for this usage on the given model.
    ///
    /// Unknown models cost 0.0; the table only needs the models this
    /// service actually dispatches to.
    pub fn estimate_cost(&self, model: &str) -> f64 {
        // (prompt, completion) USD per 1M tokens
        let (prompt_rate, completion_rate) = match model {
            m if m.starts_with("gemini-1.5-flash") => (0.075, 0.30),
            m if m.starts_with("gemini-1.5-pro") => (1.25, 5.00),
            m if m.starts_with("gpt-4o-mini") => (0.15, 0.60),
            m if m.starts_with("gpt-4o") => (2.50, 10.00),
            _ => (0.0, 0.0),
        };
        (self.prompt_tokens as f64 * prompt_rate + self.completion_tokens as f64 * completion_rate)
            / 1_000_000.0
    }
}

/// Successful completion from a provider
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub processing_time_ms: u64,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No LLM provider is configured")]
    NoProviders,

    #[error("All LLM providers failed (last error: {last})")]
    AllProvidersFailed { last: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{provider} API error: {message}")]
    Api { provider: String, message: String },

    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}
