//! AI usage accounting
//!
//! Every LLM call is recorded with its token counts and estimated cost.
//! Logging never fails the request that produced it: persistence errors
//! are logged and swallowed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{error, info};

/// One accounted AI call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub feature: String,
    pub provider: String,
    pub model: String,
    pub tokens_prompt: u32,
    pub tokens_completion: u32,
    pub total_tokens: u32,
    pub cost_est: f64,
    pub created_at: DateTime<Utc>,
}

/// Aggregates for one grouping key (feature or provider)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageBucket {
    pub requests: u64,
    pub total_tokens: u64,
    pub cost_est: f64,
}

/// Aggregated view over all recorded usage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub total_cost_est: f64,
    pub by_feature: HashMap<String, UsageBucket>,
    pub by_provider: HashMap<String, UsageBucket>,
}

/// In-memory ledger with JSONL persistence under the data directory
#[derive(Clone)]
pub struct UsageTracker {
    ledger_path: Option<PathBuf>,
    records: Arc<RwLock<Vec<UsageRecord>>>,
}

impl UsageTracker {
    /// In-memory only tracker (tests, ephemeral runs)
    pub fn ephemeral() -> Self {
        Self {
            ledger_path: None,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Tracker persisting to `<data_dir>/usage_log.jsonl`.
    ///
    /// Existing records are loaded back so summaries survive restarts.
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Self {
        let dir = data_dir.as_ref();
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            error!("❌ Failed to create data directory {}: {}", dir.display(), e);
            return Self::ephemeral();
        }

        let ledger_path = dir.join("usage_log.jsonl");
        let mut records = Vec::new();
        if ledger_path.exists() {
            match tokio::fs::read_to_string(&ledger_path).await {
                Ok(raw) => {
                    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
                        match serde_json::from_str::<UsageRecord>(line) {
                            Ok(record) => records.push(record),
                            Err(e) => error!("❌ Skipping corrupt usage record: {}", e),
                        }
                    }
                    info!("📊 Usage ledger loaded: {} records", records.len());
                }
                Err(e) => error!("❌ Failed to read usage ledger: {}", e),
            }
        }

        Self {
            ledger_path: Some(ledger_path),
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Record one AI call. Never fails; persistence errors are swallowed.
    pub async fn log_usage(
        &self,
        feature: &str,
        provider: &str,
        model: &str,
        tokens_prompt: u32,
        tokens_completion: u32,
        cost_est: f64,
    ) {
        let record = UsageRecord {
            feature: feature.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            tokens_prompt,
            tokens_completion,
            total_tokens: tokens_prompt + tokens_completion,
            cost_est,
            created_at: Utc::now(),
        };

        info!(
            "📊 Usage: {} | {} | {} tokens",
            record.feature, record.provider, record.total_tokens
        );

        if let Some(path) = &self.ledger_path {
            if let Err(e) = append_jsonl(path, &record).await {
                error!("❌ Failed to persist usage record: {}", e);
            }
        }

        self.records.write().await.push(record);
    }

    /// Most recent records, newest first
    pub async fn recent(&self, limit: usize) -> Vec<UsageRecord> {
        let records = self.records.read().await;
        records.iter().rev().take(limit).cloned().collect()
    }

    pub async fn summary(&self) -> UsageSummary {
        let records = self.records.read().await;
        let mut summary = UsageSummary::default();

        for record in records.iter() {
            summary.total_requests += 1;
            summary.total_tokens += record.total_tokens as u64;
            summary.total_cost_est += record.cost_est;

            let feature = summary.by_feature.entry(record.feature.clone()).or_default();
            feature.requests += 1;
            feature.total_tokens += record.total_tokens as u64;
            feature.cost_est += record.cost_est;

            let provider = summary.by_provider.entry(record.provider.clone()).or_default();
            provider.requests += 1;
            provider.total_tokens += record.total_tokens as u64;
            provider.cost_est += record.cost_est;
        }

        summary
    }
}

async fn append_jsonl(path: &Path, record: &UsageRecord) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    Ok(())
}
