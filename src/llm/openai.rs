// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible chat provider (hosted APIs or a local sidecar)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRole, Completion, LlmError, TokenUsage};

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 1024;

// --- chat/completions serde structs ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for any endpoint speaking the OpenAI chat-completions dialect.
///
/// Used as the fallback provider; typically points at a local sidecar.
pub struct OpenAiCompatProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatProvider {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    fn wire_role(role: ChatRole) -> &'static str {
        match role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let start = std::time::Instant::now();

        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: Self::wire_role(m.role).to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "openai-compat".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .filter(|t| !t.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(Completion {
            text,
            provider: self.name().to_string(),
            model: self.model.clone(),
            usage,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        !self.endpoint.is_empty()
    }

    fn priority(&self) -> u8 {
        20
    }
}
