// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval-augmented chat service

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn};

use super::index::KnowledgeIndex;
use super::prompt;
use super::sync::{sync_index, SyncReport};
use crate::embeddings::Embedder;
use crate::knowledge::KnowledgeStore;
use crate::llm::{LlmService, TokenUsage};
use crate::usage::UsageTracker;

/// Reply used when no LLM provider is configured (original behavior:
/// answer politely instead of erroring)
const NOT_CONFIGURED_REPLY: &str = "Sorry, the chat assistant has not been configured with an \
API key yet. Please contact the administrator.";

/// Fallback source label when the whole knowledge base is used as context
const FULL_KB_SOURCE: &str = "Poultry disease knowledge base";

/// One past turn as sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Usage block attached to a chat answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerUsage {
    pub provider: String,
    pub model: String,
    #[serde(flatten)]
    pub tokens: TokenUsage,
    pub cost_est: f64,
}

/// Final answer returned to the API layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<AnswerUsage>,
}

/// Orchestrates retrieve → assemble → complete → account
pub struct RagService {
    store: KnowledgeStore,
    embedder: Arc<dyn Embedder>,
    index: Arc<RwLock<KnowledgeIndex>>,
    llm: Arc<LlmService>,
    usage: UsageTracker,
    top_k: usize,
    min_score: f32,
    history_window: usize,
}

impl RagService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: KnowledgeStore,
        embedder: Arc<dyn Embedder>,
        index: Arc<RwLock<KnowledgeIndex>>,
        llm: Arc<LlmService>,
        usage: UsageTracker,
        top_k: usize,
        min_score: f32,
        history_window: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            llm,
            usage,
            top_k,
            min_score,
            history_window,
        }
    }

    /// Re-read the knowledge base from disk and synchronize the index
    pub async fn sync_knowledge(&self) -> anyhow::Result<SyncReport> {
        self.store.reload().await?;
        sync_index(&self.store, self.embedder.as_ref(), &self.index).await
    }

    pub async fn index_size(&self) -> usize {
        self.index.read().await.count()
    }

    pub fn has_providers(&self) -> bool {
        self.llm.has_providers()
    }

    /// Names of the available LLM providers, in dispatch order
    pub fn provider_names(&self) -> Vec<String> {
        self.llm
            .available_providers()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Number of diseases currently in the knowledge store
    pub async fn knowledge_docs(&self) -> usize {
        self.store.len().await
    }

    /// Retrieve context for a question.
    ///
    /// Falls back to the full knowledge text when retrieval finds nothing
    /// above the score threshold (or the embedder fails) so small
    /// knowledge bases always reach the model.
    async fn retrieve_context(&self, question: &str) -> (String, Vec<String>) {
        let matches = match self.embedder.embed(question).await {
            Ok(query) => match self.index.read().await.search(&query, self.top_k, Some(self.min_score)) {
                Ok(matches) => matches,
                Err(e) => {
                    warn!("Index search failed: {}, falling back to full context", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Question embedding failed: {}, falling back to full context", e);
                Vec::new()
            }
        };

        if matches.is_empty() {
            return (self.store.format_context().await, vec![FULL_KB_SOURCE.to_string()]);
        }

        let mut context = "Reference knowledge on common poultry diseases:\n\n".to_string();
        let mut sources = Vec::with_capacity(matches.len());
        for doc in &matches {
            if let Some(text) = doc.metadata.get("text").and_then(|t| t.as_str()) {
                context.push_str(text);
            }
            if let Some(name) = doc.metadata.get("name").and_then(|n| n.as_str()) {
                sources.push(name.to_string());
            }
        }
        (context, sources)
    }

    /// Answer a question with retrieval-augmented generation.
    ///
    /// Provider failures become an apologetic answer rather than an error,
    /// matching the original service contract.
    pub async fn answer_question(
        &self,
        question: &str,
        history: &[HistoryMessage],
    ) -> ChatAnswer {
        if !self.llm.has_providers() {
            return ChatAnswer {
                answer: NOT_CONFIGURED_REPLY.to_string(),
                sources: Vec::new(),
                usage: None,
            };
        }

        let (context, sources) = self.retrieve_context(question).await;
        let messages = prompt::build_messages(&context, history, question, self.history_window);

        match self.llm.complete(&messages).await {
            Ok(completion) => {
                let cost_est = completion.usage.estimate_cost(&completion.model);
                self.usage
                    .log_usage(
                        "chat",
                        &completion.provider,
                        &completion.model,
                        completion.usage.prompt_tokens,
                        completion.usage.completion_tokens,
                        cost_est,
                    )
                    .await;

                ChatAnswer {
                    answer: completion.text,
                    sources,
                    usage: Some(AnswerUsage {
                        provider: completion.provider,
                        model: completion.model,
                        tokens: completion.usage,
                        cost_est,
                    }),
                }
            }
            Err(e) => {
                error!("❌ RAG completion failed: {}", e);
                ChatAnswer {
                    answer: format!("An error occurred while processing the question: {}", e),
                    sources: Vec::new(),
                    usage: None,
                }
            }
        }
    }
}
