// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! LLM provider trait definition

use async_trait::async_trait;

use super::types::{ChatMessage, Completion, LlmError};

/// Trait implemented by each chat-completion backend.
///
/// Multiple providers can be configured with automatic failover; the
/// service tries them in priority order.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a chat completion over the assembled messages.
    ///
    /// System-role messages are translated into whatever the backend
    /// expects (system instruction, leading system message, ...).
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError>;

    /// Provider name for logging and usage accounting
    fn name(&self) -> &'static str;

    /// Model this provider dispatches to
    fn model(&self) -> &str;

    /// Whether the provider is usable (has an API key, etc.)
    fn is_available(&self) -> bool;

    /// Provider priority (lower = preferred)
    fn priority(&self) -> u8 {
        100
    }
}
