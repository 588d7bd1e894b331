use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Validated application configuration.
///
/// Loaded from a single JSON document. Unknown keys are rejected at load
/// time; every field has a default so partial documents (and `Default` in
/// tests) work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    pub guardrails: GuardrailsConfig,
    pub similarity: SimilarityConfig,
    pub rag: RagConfig,
    pub slm: SlmConfig,
    pub ollama_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct GuardrailsConfig {
    pub reject_queries_containing: Vec<String>,
    pub max_query_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SimilarityConfig {
    pub dataset_path: String,
    pub threshold: f32,
    pub top_k: usize,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RagConfig {
    pub knowledge_base_path: String,
    pub similarity_threshold: f32,
    pub max_context_chunks: usize,
    pub embedding_model: String,
    pub trigger_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SlmConfig {
    pub model_name: String,
    pub weights_path: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub use_finetuned: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            guardrails: GuardrailsConfig::default(),
            similarity: SimilarityConfig::default(),
            rag: RagConfig::default(),
            slm: SlmConfig::default(),
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
        }
    }
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            reject_queries_containing: [
                "password",
                "pin number",
                "cvv",
                "otp",
                "card number",
                "account number",
                "aadhaar",
                "net banking credential",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_query_length: 512,
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            dataset_path: "data/bfsi_corpus.json".to_string(),
            threshold: 0.85,
            top_k: 3,
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            knowledge_base_path: "data/knowledge".to_string(),
            similarity_threshold: 0.7,
            max_context_chunks: 4,
            embedding_model: "nomic-embed-text".to_string(),
            trigger_keywords: [
                "interest rate",
                "interest calculation",
                "emi formula",
                "emi breakdown",
                "principal",
                "interest component",
                "penalty",
                "penalties",
                "late payment charge",
                "foreclosure charge",
                "prepayment charge",
                "processing fee",
                "policy",
                "regulatory",
                "compliant",
                "kyc",
                "grievance",
                "compound interest",
                "fixed vs floating",
                "repo rate",
                "ltv",
                "tax deduction",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for SlmConfig {
    fn default() -> Self {
        Self {
            model_name: "tinyllama".to_string(),
            weights_path: String::new(),
            max_new_tokens: 256,
            temperature: 0.3,
            use_finetuned: false,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a JSON document.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            let code = if e.kind() == std::io::ErrorKind::NotFound {
                "CONFIG_NOT_FOUND"
            } else {
                "CONFIG_INVALID"
            };
            AppError::new(code, "Failed to read configuration file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let cfg: AppConfig = serde_json::from_str(&raw).map_err(|e| {
            AppError::new("CONFIG_INVALID", "Failed to decode configuration")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range checks beyond what serde enforces structurally.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.guardrails.max_query_length == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "guardrails.max_query_length must be at least 1",
            ));
        }
        if !(-1.0..=1.0).contains(&self.similarity.threshold) {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "similarity.threshold must lie in [-1, 1]",
            ));
        }
        if !(-1.0..=1.0).contains(&self.rag.similarity_threshold) {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "rag.similarity_threshold must lie in [-1, 1]",
            ));
        }
        if self.rag.max_context_chunks == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "rag.max_context_chunks must be at least 1",
            ));
        }
        if self.slm.temperature < 0.0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "slm.temperature must not be negative",
            ));
        }
        Ok(())
    }
}
