// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration loaded from environment variables

use std::env;

/// Runtime settings for the diagnosis service
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP API binds to
    pub api_addr: String,
    /// Allowed CORS origins ("*" for any)
    pub cors_origins: Vec<String>,

    /// Path to the detection ONNX model (healthy/sick chickens)
    pub detection_model_path: String,
    /// Path to the classification ONNX model (fecal diseases)
    pub classification_model_path: String,
    /// Class names of the detection model, in output order
    pub detection_class_names: Vec<String>,
    /// Class names of the classification model, in output order
    pub classification_class_names: Vec<String>,
    /// Minimum confidence for a detection box to be kept
    pub detection_conf_threshold: f32,
    /// IoU threshold for non-maximum suppression
    pub detection_iou_threshold: f32,
    /// Square input size of the detection model
    pub detection_input_size: u32,
    /// Square input size of the classification model
    pub classification_input_size: u32,

    /// Path to the sentence-transformer ONNX model for embeddings
    pub embedding_model_path: String,
    /// Path to the tokenizer JSON next to the embedding model
    pub embedding_tokenizer_path: String,

    /// Google Gemini API key (chat assistant disabled without any provider key)
    pub google_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Optional OpenAI-compatible fallback endpoint (e.g. a local sidecar)
    pub openai_api_base: Option<String>,
    /// API key for the OpenAI-compatible endpoint
    pub openai_api_key: Option<String>,
    /// Model name for the OpenAI-compatible endpoint
    pub openai_model: String,
    /// Outbound provider request timeout in milliseconds
    pub provider_timeout_ms: u64,

    /// Path to the disease knowledge base JSON
    pub knowledge_path: String,
    /// Directory for result logs and usage ledgers
    pub data_dir: String,

    /// Process every Nth frame on the camera stream
    pub frame_stride: u32,
    /// Number of past exchanges kept when assembling the chat prompt
    pub history_window: usize,
    /// Number of knowledge documents retrieved per question
    pub rag_top_k: usize,
    /// Minimum cosine score for a retrieved document to be used
    pub rag_min_score: f32,
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Self {
        Self {
            api_addr: env::var("API_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            cors_origins: env_list("CORS_ORIGINS", "*"),

            detection_model_path: env::var("DETECTION_MODEL_PATH")
                .unwrap_or_else(|_| "model_store/detection_best.onnx".to_string()),
            classification_model_path: env::var("CLASSIFICATION_MODEL_PATH")
                .unwrap_or_else(|_| "model_store/classification_best.onnx".to_string()),
            detection_class_names: env_list("DETECTION_CLASS_NAMES", "healthy,sick"),
            classification_class_names: env_list(
                "CLASSIFICATION_CLASS_NAMES",
                "Coccidiosis,Healthy,New Castle Disease,Salmonella",
            ),
            detection_conf_threshold: env_parse("DETECTION_CONF_THRESHOLD", 0.6),
            detection_iou_threshold: env_parse("DETECTION_IOU_THRESHOLD", 0.45),
            detection_input_size: env_parse("DETECTION_INPUT_SIZE", 640),
            classification_input_size: env_parse("CLASSIFICATION_INPUT_SIZE", 224),

            embedding_model_path: env::var("EMBEDDING_MODEL_PATH")
                .unwrap_or_else(|_| "model_store/all-MiniLM-L6-v2-onnx/model.onnx".to_string()),
            embedding_tokenizer_path: env::var("EMBEDDING_TOKENIZER_PATH").unwrap_or_else(|_| {
                "model_store/all-MiniLM-L6-v2-onnx/tokenizer.json".to_string()
            }),

            google_api_key: env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            openai_api_base: env::var("OPENAI_API_BASE").ok().filter(|u| !u.is_empty()),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            provider_timeout_ms: env_parse("PROVIDER_TIMEOUT_MS", 30_000),

            knowledge_path: env::var("KNOWLEDGE_PATH")
                .unwrap_or_else(|_| "knowledge_base/diseases.json".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),

            frame_stride: env_parse("FRAME_STRIDE", 5),
            history_window: env_parse("HISTORY_WINDOW", 5),
            rag_top_k: env_parse("RAG_TOP_K", 4),
            rag_min_score: env_parse("RAG_MIN_SCORE", 0.25),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.detection_conf_threshold <= 0.0 || self.detection_conf_threshold > 1.0 {
            return Err("Detection confidence threshold must be in (0, 1]".to_string());
        }
        if self.detection_iou_threshold <= 0.0 || self.detection_iou_threshold > 1.0 {
            return Err("Detection IoU threshold must be in (0, 1]".to_string());
        }
        if self.frame_stride == 0 {
            return Err("Frame stride must be at least 1".to_string());
        }
        if self.rag_top_k == 0 {
            return Err("RAG top-k must be at least 1".to_string());
        }
        if self.detection_class_names.is_empty() || self.classification_class_names.is_empty() {
            return Err("Class name lists must not be empty".to_string());
        }
        if let Some(base) = &self.openai_api_base {
            if url::Url::parse(base).is_err() {
                return Err(format!("Invalid OPENAI_API_BASE URL: {}", base));
            }
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}
