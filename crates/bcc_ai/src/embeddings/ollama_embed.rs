use bcc_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl Embedder for OllamaEmbedder {
    fn encode(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let url = format!("{}/api/embeddings", self.client.base_url());
        let mut out: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for text in texts {
            // Keep requests bounded; chunking keeps sizes reasonable but guard anyway.
            let mut cut = text.len().min(12_000);
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            let prompt = &text[..cut];

            let req = EmbeddingsRequest { model, prompt };
            let resp = ureq::post(&url)
                .timeout(std::time::Duration::from_secs(10))
                .send_json(serde_json::to_value(req).map_err(|e| {
                    AppError::new("AI_EMBEDDINGS_FAILED", "Failed to encode embeddings request")
                        .with_details(e.to_string())
                })?);

            let embedding = match resp {
                Ok(r) if r.status() == 200 => {
                    let v: EmbeddingsResponse = r.into_json().map_err(|e| {
                        AppError::new(
                            "AI_EMBEDDINGS_FAILED",
                            "Failed to decode embeddings response",
                        )
                        .with_details(e.to_string())
                    })?;
                    if v.embedding.is_empty() {
                        return Err(AppError::new(
                            "AI_EMBEDDINGS_FAILED",
                            "Embeddings response was empty",
                        ));
                    }
                    v.embedding
                }
                Ok(r) => {
                    return Err(
                        AppError::new("AI_EMBEDDINGS_FAILED", "Embeddings request failed")
                            .with_details(format!("status={}", r.status())),
                    )
                }
                Err(e) => {
                    return Err(AppError::new(
                        "AI_EMBEDDINGS_FAILED",
                        "Failed to call embeddings endpoint",
                    )
                    .with_details(e.to_string())
                    .with_retryable(true))
                }
            };

            if let Some(first) = out.first() {
                if first.len() != embedding.len() {
                    return Err(AppError::new(
                        "AI_EMBEDDINGS_FAILED",
                        "Embedding dimensions are inconsistent across inputs",
                    )
                    .with_details(format!(
                        "expected={}; got={}",
                        first.len(),
                        embedding.len()
                    )));
                }
            }
            out.push(embedding);
        }

        Ok(out)
    }
}
