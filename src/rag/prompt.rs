// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prompt assembly for the veterinary chat assistant

use crate::llm::{ChatMessage, ChatRole};

use super::service::HistoryMessage;

pub const SYSTEM_PERSONA: &str = "You are a veterinary expert specializing in poultry diseases. \
Use the reference knowledge below to answer the farmer's questions in a professional, caring and \
easy-to-understand way.";

pub const SYSTEM_RULES: &str = "NOTES:\n\
1. If the question is not related to poultry diseases or veterinary knowledge, politely decline.\n\
2. If the answer is not covered by the provided knowledge, you may draw on your general expertise \
but must clearly mark it as supplementary information.\n\
3. Always advise the farmer to observe the flock closely and contact a local veterinarian if the \
situation is serious.";

/// Build the system prompt embedding the retrieved knowledge context
pub fn build_system_prompt(context: &str) -> String {
    format!("{}\n\n{}\n\n{}", SYSTEM_PERSONA, context, SYSTEM_RULES)
}

/// Assemble the full message list: system prompt, the last `window`
/// history turns, then the current question.
pub fn build_messages(
    context: &str,
    history: &[HistoryMessage],
    question: &str,
    window: usize,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(build_system_prompt(context))];

    let start = history.len().saturating_sub(window);
    for msg in &history[start..] {
        let role = if msg.role.eq_ignore_ascii_case("user") {
            ChatRole::User
        } else {
            ChatRole::Assistant
        };
        messages.push(ChatMessage {
            role,
            content: msg.content.clone(),
        });
    }

    messages.push(ChatMessage::user(question));
    messages
}
