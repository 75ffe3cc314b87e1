// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Provider-switching behavior of the LLM service under mixed
//! availability and transient failures

use async_trait::async_trait;
use flocksense::llm::{
    ChatMessage, Completion, LlmError, LlmProvider, LlmService, TokenUsage,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct FlakyProvider {
    name: &'static str,
    priority: u8,
    available: bool,
    fail_once: AtomicBool,
    calls: Arc<AtomicUsize>,
}

impl FlakyProvider {
    fn boxed(
        name: &'static str,
        priority: u8,
        available: bool,
        fail_once: bool,
    ) -> (Box<dyn LlmProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Self {
                name,
                priority,
                available,
                fail_once: AtomicBool::new(fail_once),
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

#[async_trait]
impl LlmProvider for FlakyProvider {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_once.swap(false, Ordering::SeqCst) {
            return Err(LlmError::Api {
                provider: self.name.to_string(),
                message: "rate limited".to_string(),
            });
        }
        Ok(Completion {
            text: format!("answer via {}", self.name),
            provider: self.name.to_string(),
            model: "m".to_string(),
            usage: TokenUsage::new(10, 10),
            processing_time_ms: 1,
        })
    }
    fn name(&self) -> &'static str {
        self.name
    }
    fn model(&self) -> &str {
        "m"
    }
    fn is_available(&self) -> bool {
        self.available
    }
    fn priority(&self) -> u8 {
        self.priority
    }
}

#[tokio::test]
async fn test_transient_failure_falls_through_then_recovers() {
    let (primary, primary_calls) = FlakyProvider::boxed("primary", 10, true, true);
    let (fallback, fallback_calls) = FlakyProvider::boxed("fallback", 20, true, false);
    let service = LlmService::with_providers(vec![primary, fallback]);

    // First call: primary errors once, fallback serves
    let completion = service.complete(&[ChatMessage::user("q")]).await.unwrap();
    assert_eq!(completion.provider, "fallback");
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);

    // Second call: primary recovered and serves again
    let completion = service.complete(&[ChatMessage::user("q")]).await.unwrap();
    assert_eq!(completion.provider, "primary");
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unavailable_providers_are_never_called() {
    let (off, off_calls) = FlakyProvider::boxed("off", 1, false, false);
    let (on, _) = FlakyProvider::boxed("on", 50, true, false);
    let service = LlmService::with_providers(vec![off, on]);

    let completion = service.complete(&[ChatMessage::user("q")]).await.unwrap();
    assert_eq!(completion.provider, "on");
    assert_eq!(off_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.available_providers(), vec!["on"]);
}

#[tokio::test]
async fn test_no_available_provider_is_a_typed_error() {
    let (off_a, _) = FlakyProvider::boxed("a", 1, false, false);
    let (off_b, _) = FlakyProvider::boxed("b", 2, false, false);
    let service = LlmService::with_providers(vec![off_a, off_b]);

    let err = service.complete(&[ChatMessage::user("q")]).await.unwrap_err();
    assert!(matches!(err, LlmError::NoProviders));
}
