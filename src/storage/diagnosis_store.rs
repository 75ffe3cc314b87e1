// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persistent store for detection and diagnosis results
//!
//! Records append to JSONL files under the data directory and are kept
//! in memory for the stats surface. Persistence is best-effort: a failed
//! write never fails the diagnosis request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

/// Where a record originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Upload,
    Stream,
}

/// Result of one detection pass (healthy/sick flagging)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: Uuid,
    pub source: RecordSource,
    pub total_chickens: usize,
    pub healthy_count: usize,
    pub sick_count: usize,
    /// Per-box details as returned to the client
    pub raw_result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Result of one disease classification (fecal image)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub id: Uuid,
    pub predicted_disease: String,
    pub confidence: f32,
    pub all_probabilities: HashMap<String, f32>,
    pub created_at: DateTime<Utc>,
}

/// Counters surfaced on the health/metrics endpoints
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total_detections: usize,
    pub total_diagnoses: usize,
    /// Diagnoses whose predicted disease is not "Healthy"
    pub sick_cases: usize,
}

#[derive(Clone)]
pub struct DiagnosisStore {
    detections_path: Option<PathBuf>,
    diagnoses_path: Option<PathBuf>,
    detections: Arc<RwLock<Vec<DetectionRecord>>>,
    diagnoses: Arc<RwLock<Vec<DiagnosisRecord>>>,
}

impl DiagnosisStore {
    /// In-memory only store (tests, ephemeral runs)
    pub fn ephemeral() -> Self {
        Self {
            detections_path: None,
            diagnoses_path: None,
            detections: Arc::new(RwLock::new(Vec::new())),
            diagnoses: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Store persisting under `data_dir`, loading any existing records
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Self {
        let dir = data_dir.as_ref();
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            error!("❌ Failed to create data directory {}: {}", dir.display(), e);
            return Self::ephemeral();
        }

        let detections_path = dir.join("detections.jsonl");
        let diagnoses_path = dir.join("diagnoses.jsonl");

        let detections: Vec<DetectionRecord> = load_jsonl(&detections_path).await;
        let diagnoses: Vec<DiagnosisRecord> = load_jsonl(&diagnoses_path).await;
        info!(
            "🗂️ Result store loaded: {} detections, {} diagnoses",
            detections.len(),
            diagnoses.len()
        );

        Self {
            detections_path: Some(detections_path),
            diagnoses_path: Some(diagnoses_path),
            detections: Arc::new(RwLock::new(detections)),
            diagnoses: Arc::new(RwLock::new(diagnoses)),
        }
    }

    /// Record a detection result; returns the record id
    pub async fn record_detection(
        &self,
        source: RecordSource,
        total_chickens: usize,
        healthy_count: usize,
        sick_count: usize,
        raw_result: serde_json::Value,
    ) -> Uuid {
        let record = DetectionRecord {
            id: Uuid::new_v4(),
            source,
            total_chickens,
            healthy_count,
            sick_count,
            raw_result,
            created_at: Utc::now(),
        };
        let id = record.id;

        if let Some(path) = &self.detections_path {
            if let Err(e) = append_jsonl(path, &record).await {
                error!("❌ Failed to persist detection record: {}", e);
            }
        }
        self.detections.write().await.push(record);
        id
    }

    /// Record a classification result; returns the record id
    pub async fn record_diagnosis(
        &self,
        predicted_disease: &str,
        confidence: f32,
        all_probabilities: HashMap<String, f32>,
    ) -> Uuid {
        let record = DiagnosisRecord {
            id: Uuid::new_v4(),
            predicted_disease: predicted_disease.to_string(),
            confidence,
            all_probabilities,
            created_at: Utc::now(),
        };
        let id = record.id;

        if let Some(path) = &self.diagnoses_path {
            if let Err(e) = append_jsonl(path, &record).await {
                error!("❌ Failed to persist diagnosis record: {}", e);
            }
        }
        self.diagnoses.write().await.push(record);
        id
    }

    /// Most recent diagnoses, newest first
    pub async fn recent_diagnoses(&self, limit: usize) -> Vec<DiagnosisRecord> {
        let diagnoses = self.diagnoses.read().await;
        diagnoses.iter().rev().take(limit).cloned().collect()
    }

    pub async fn stats(&self) -> StoreStats {
        let detections = self.detections.read().await;
        let diagnoses = self.diagnoses.read().await;
        StoreStats {
            total_detections: detections.len(),
            total_diagnoses: diagnoses.len(),
            sick_cases: diagnoses
                .iter()
                .filter(|d| !d.predicted_disease.eq_ignore_ascii_case("healthy"))
                .count(),
        }
    }
}

async fn load_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        return Vec::new();
    }
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    error!("❌ Skipping corrupt record in {}: {}", path.display(), e);
                    None
                }
            })
            .collect(),
        Err(e) => {
            error!("❌ Failed to read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

async fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> anyhow::Result<()> {
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
