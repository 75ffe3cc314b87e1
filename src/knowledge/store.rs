// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! File-backed knowledge store with seed fallback

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::seed;
use super::types::Disease;

/// Disease knowledge base, loaded from JSON on disk.
///
/// Falls back to the built-in seed set when the file is absent so the
/// service stays usable on a fresh install.
#[derive(Clone)]
pub struct KnowledgeStore {
    path: PathBuf,
    diseases: Arc<RwLock<Vec<Disease>>>,
}

impl KnowledgeStore {
    /// Load the knowledge base from `path`, seeding defaults if missing
    pub async fn load_or_seed<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let diseases = if path.exists() {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read knowledge base {}", path.display()))?;
            let diseases: Vec<Disease> = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid knowledge base JSON at {}", path.display()))?;
            info!(
                "🌱 Knowledge base loaded: {} diseases from {}",
                diseases.len(),
                path.display()
            );
            diseases
        } else {
            warn!(
                "⚠️ Knowledge base not found at {}, using built-in seed data",
                path.display()
            );
            seed::builtin_diseases()
        };

        Ok(Self {
            path,
            diseases: Arc::new(RwLock::new(diseases)),
        })
    }

    /// Re-read the knowledge base from disk (no-op when the file is absent)
    pub async fn reload(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(self.len().await);
        }
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read knowledge base {}", self.path.display()))?;
        let fresh: Vec<Disease> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid knowledge base JSON at {}", self.path.display()))?;
        let count = fresh.len();
        *self.diseases.write().await = fresh;
        Ok(count)
    }

    pub async fn len(&self) -> usize {
        self.diseases.read().await.len()
    }

    /// Snapshot of all diseases
    pub async fn all(&self) -> Vec<Disease> {
        self.diseases.read().await.clone()
    }

    pub async fn find_by_code(&self, code: &str) -> Option<Disease> {
        self.diseases
            .read()
            .await
            .iter()
            .find(|d| d.code == code)
            .cloned()
    }

    /// Case-insensitive lookup by common name
    pub async fn find_by_name(&self, name: &str) -> Option<Disease> {
        let needle = name.trim().to_lowercase();
        self.diseases
            .read()
            .await
            .iter()
            .find(|d| d.name.to_lowercase() == needle)
            .cloned()
    }

    /// Render one disease as the text block embedded into prompts
    pub fn format_disease(disease: &Disease) -> String {
        let mut text = match &disease.name_latin {
            Some(latin) => format!("DISEASE: {} ({})\n", disease.name, latin),
            None => format!("DISEASE: {}\n", disease.name),
        };
        text.push_str(&format!("- Symptoms: {}\n", disease.symptoms));
        text.push_str(&format!("- Cause: {}\n", disease.cause));
        text.push_str(&format!("- Prevention: {}\n", disease.prevention));

        if !disease.treatment_steps.is_empty() {
            text.push_str("TREATMENT PLAN:\n");
            let mut steps = disease.treatment_steps.clone();
            steps.sort_by_key(|s| s.step_order);
            for step in &steps {
                text.push_str(&format!("  Step {}: {}\n", step.step_order, step.description));
                if let Some(action) = &step.action {
                    text.push_str(&format!("    -> Action: {}\n", action));
                }
                for med in &step.medicines {
                    match &med.active_ingredient {
                        Some(ingredient) => text.push_str(&format!(
                            "    -> Medicine: {} ({}). Dosage: {}\n",
                            med.name, ingredient, med.dosage
                        )),
                        None => text.push_str(&format!(
                            "    -> Medicine: {}. Dosage: {}\n",
                            med.name, med.dosage
                        )),
                    }
                }
            }
        }
        text.push_str("---\n");
        text
    }

    /// Render the full knowledge base as one context block
    pub async fn format_context(&self) -> String {
        let diseases = self.diseases.read().await;
        let mut context =
            "Reference knowledge on common poultry diseases:\n\n".to_string();
        for disease in diseases.iter() {
            context.push_str(&Self::format_disease(disease));
        }
        context
    }
}
