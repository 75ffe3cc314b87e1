// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use flocksense::{
    api::{start_server, AppState, Metrics},
    config::Settings,
    embeddings::{Embedder, HashEmbedder, OnnxEmbedder},
    knowledge::KnowledgeStore,
    llm::LlmService,
    rag::{sync::sync_index, KnowledgeIndex, RagService},
    storage::DiagnosisStore,
    usage::UsageTracker,
    vision::DiagnosisService,
};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

/// Upper bound on indexed knowledge documents
const MAX_INDEX_DOCS: usize = 10_000;

#[derive(Parser, Debug)]
#[command(name = "flocksense", about = "Poultry-disease diagnosis backend")]
struct Args {
    /// Path to an env file loaded before reading configuration
    #[arg(long)]
    env_file: Option<String>,

    /// Override the API listen address
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path).ok();
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("🚀 Starting Poultry Disease Diagnosis API v{}...\n", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::from_env();
    if let Some(addr) = args.addr {
        settings.api_addr = addr;
    }
    if let Err(e) = settings.validate() {
        eprintln!("❌ Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // Knowledge base (seeded on fresh installs)
    let knowledge = KnowledgeStore::load_or_seed(&settings.knowledge_path).await?;
    println!("🌱 Knowledge base ready ({} diseases)", knowledge.len().await);

    // Vision models load warn-and-continue; endpoints degrade to 503
    println!("🧠 Loading vision models...");
    let diagnosis = DiagnosisService::load(&settings, knowledge.clone());
    println!(
        "   Detection: {}  Classification: {}",
        if diagnosis.detector_loaded() { "✅" } else { "✗ (endpoint disabled)" },
        if diagnosis.classifier_loaded() { "✅" } else { "✗ (endpoint disabled)" },
    );

    // Embedder: ONNX when installed, deterministic fallback otherwise
    let embedder: Arc<dyn Embedder> = match OnnxEmbedder::new(
        "all-MiniLM-L6-v2",
        &settings.embedding_model_path,
        &settings.embedding_tokenizer_path,
    )
    .await
    {
        Ok(model) => {
            println!("🧠 Embedding model ready ({}D)", model.dimension());
            Arc::new(model)
        }
        Err(e) => {
            println!("⚠️ Embedding model unavailable: {}", e);
            println!("   Falling back to deterministic hash embeddings");
            Arc::new(HashEmbedder::default())
        }
    };

    // Vector index + initial knowledge sync
    let index = Arc::new(RwLock::new(KnowledgeIndex::new(
        embedder.dimension(),
        MAX_INDEX_DOCS,
    )));
    match sync_index(&knowledge, embedder.as_ref(), &index).await {
        Ok(report) => println!(
            "🔄 Knowledge index synced ({} documents)",
            report.total_live()
        ),
        Err(e) => println!("⚠️ Initial knowledge sync failed: {}", e),
    }

    // LLM provider chain
    let llm = Arc::new(LlmService::from_settings(&settings)?);
    if llm.has_providers() {
        println!(
            "🤖 LLM providers: {}",
            llm.available_providers().join(", ")
        );
    } else {
        println!("⚠️ No LLM provider configured - chat assistant disabled");
        println!("   Set GOOGLE_API_KEY (or OPENAI_API_BASE) to enable it");
    }

    // Persistence
    let usage = UsageTracker::open(&settings.data_dir).await;
    let store = DiagnosisStore::open(&settings.data_dir).await;

    let rag = Arc::new(RagService::new(
        knowledge,
        embedder,
        index,
        llm,
        usage.clone(),
        settings.rag_top_k,
        settings.rag_min_score,
        settings.history_window,
    ));

    let state = AppState {
        settings: Arc::new(settings.clone()),
        diagnosis,
        rag,
        store,
        usage,
        metrics: Arc::new(Metrics::default()),
    };

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("🎉 Poultry Disease Diagnosis API is running!");
    println!("{}", separator);
    println!("API Address:    {}", settings.api_addr);
    println!("\nAPI Endpoints:");
    println!("  Health:       GET  /health");
    println!("  Detect:       POST /api/v1/detect");
    println!("  Classify:     POST /api/v1/classify");
    println!("  Chat:         POST /api/v1/chat/ask");
    println!("  Sync:         POST /api/v1/knowledge/sync");
    println!("  Usage:        GET  /api/v1/usage/summary");
    println!("  Stream:       WS   /ws/camera-stream");
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    let server = tokio::spawn(async move {
        if let Err(e) = start_server(state).await {
            eprintln!("❌ API server error: {}", e);
        }
    });

    signal::ctrl_c().await?;

    println!("\n⏹️ Shutting down...");
    server.abort();
    println!("👋 Goodbye!");
    Ok(())
}
