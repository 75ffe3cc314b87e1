// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! LLM service orchestration
//!
//! Holds the configured providers sorted by priority and fails over to the
//! next one when a completion errors.

use tracing::{debug, info, warn};

use super::gemini::GeminiProvider;
use super::openai::OpenAiCompatProvider;
use super::provider::LlmProvider;
use super::types::{ChatMessage, Completion, LlmError};
use crate::config::Settings;

/// Provider chain with priority ordering and failover
pub struct LlmService {
    providers: Vec<Box<dyn LlmProvider>>,
}

impl LlmService {
    /// Build the provider chain from configuration.
    ///
    /// Gemini is preferred when a key is present (priority 10); an
    /// OpenAI-compatible endpoint acts as fallback (priority 20).
    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        let mut providers: Vec<Box<dyn LlmProvider>> = Vec::new();

        if let Some(key) = &settings.google_api_key {
            providers.push(Box::new(GeminiProvider::new(
                key.clone(),
                settings.gemini_model.clone(),
                settings.provider_timeout_ms,
            )?));
            debug!("Gemini provider enabled ({})", settings.gemini_model);
        }

        if let Some(base) = &settings.openai_api_base {
            providers.push(Box::new(OpenAiCompatProvider::new(
                base,
                settings.openai_api_key.clone(),
                settings.openai_model.clone(),
                settings.provider_timeout_ms,
            )?));
            debug!("OpenAI-compatible provider enabled ({})", base);
        }

        providers.sort_by_key(|p| p.priority());
        Ok(Self { providers })
    }

    /// Build a service from pre-constructed providers (tests, custom chains)
    pub fn with_providers(mut providers: Vec<Box<dyn LlmProvider>>) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self { providers }
    }

    pub fn has_providers(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }

    /// Names of the available providers, in dispatch order
    pub fn available_providers(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.name())
            .collect()
    }

    /// Run a completion, trying providers in priority order
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        if self.providers.is_empty() {
            return Err(LlmError::NoProviders);
        }

        let mut last_error: Option<LlmError> = None;

        for provider in &self.providers {
            if !provider.is_available() {
                continue;
            }

            debug!("Trying LLM provider: {}", provider.name());
            match provider.complete(messages).await {
                Ok(completion) => {
                    info!(
                        "Completion from {} ({}): {} tokens in {}ms",
                        completion.provider,
                        completion.model,
                        completion.usage.total_tokens,
                        completion.processing_time_ms,
                    );
                    return Ok(completion);
                }
                Err(e) => {
                    warn!("LLM provider {} failed: {}, trying next", provider.name(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(LlmError::AllProvidersFailed {
                last: e.to_string(),
            }),
            None => Err(LlmError::NoProviders),
        }
    }
}
