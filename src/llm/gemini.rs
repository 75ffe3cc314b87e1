// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Google Gemini provider via the Generative Language REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRole, Completion, LlmError, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 1024;

// --- generateContent serde structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Gemini chat-completion provider (preferred when a key is configured)
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout_ms: u64) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Override the API base URL (used against local test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(messages: &[ChatMessage]) -> GenerateRequest {
        // System turns become the systemInstruction; the rest map to
        // user/model contents in order.
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let system_instruction = if system_text.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_text.join("\n\n"),
                }],
            })
        };

        let contents = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| Content {
                role: Some(
                    match m.role {
                        ChatRole::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GenerateRequest {
            system_instruction,
            contents,
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let start = std::time::Instant::now();
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = Self::build_request(messages);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "gemini".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        debug!("Gemini response parsed ({} candidates)", parsed.candidates.len());

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.clone())
            .ok_or(LlmError::EmptyResponse)?;

        let usage = parsed
            .usage_metadata
            .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
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
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn priority(&self) -> u8 {
        10
    }
}
