// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Vector index over the disease knowledge base, knowledge synchronization,
// prompt assembly and the chat-answering service

pub mod index;
pub mod prompt;
pub mod service;
pub mod sync;

pub use index::{DocMatch, KnowledgeIndex};
pub use service::{ChatAnswer, HistoryMessage, RagService};
pub use sync::SyncReport;
