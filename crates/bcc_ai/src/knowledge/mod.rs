use std::fs;
use std::path::Path;

use bcc_core::config::RagConfig;
use bcc_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::embeddings::{encode_one, Embedder};
use crate::similarity::{clamp_score, cosine_similarity, l2_norm};

mod chunking;

pub use chunking::chunk_document;

/// One contiguous passage derived from a reference document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeChunk {
    pub source: String,
    pub text: String,
}

/// A chunk with its similarity to a specific query. Result of a single
/// retrieval call, not persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub source: String,
    pub text: String,
    pub score: f32,
}

/// Tier-3 support: chunked, embedded knowledge documents.
///
/// Built once at startup; read only afterwards. A missing or empty
/// knowledge directory produces an empty index and empty retrieval
/// results, never an error.
pub struct KnowledgeIndex {
    chunks: Vec<KnowledgeChunk>,
    embeddings: Vec<Vec<f32>>,
    norms: Vec<f32>,
    similarity_threshold: f32,
    max_context_chunks: usize,
    model: String,
}

impl KnowledgeIndex {
    pub fn build(config: &RagConfig, embedder: &dyn Embedder) -> Result<Self, AppError> {
        let chunks = load_chunks(Path::new(&config.knowledge_base_path))?;
        if chunks.is_empty() {
            tracing::warn!(
                knowledge_base_path = %config.knowledge_base_path,
                "knowledge base is empty; grounded generation will run without context"
            );
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.encode(&config.embedding_model, &texts)?
        };
        if embeddings.len() != chunks.len() {
            return Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Chunk embedding count does not match chunk count",
            )
            .with_details(format!(
                "chunks={}; embeddings={}",
                chunks.len(),
                embeddings.len()
            )));
        }
        let norms = embeddings.iter().map(|v| l2_norm(v)).collect();

        Ok(Self {
            chunks,
            embeddings,
            norms,
            similarity_threshold: config.similarity_threshold,
            max_context_chunks: config.max_context_chunks.max(1),
            model: config.embedding_model.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Rank all chunks by descending similarity, keep at most
    /// `max_context_chunks`, then drop anything below the similarity
    /// threshold. The threshold is applied after ranking, so a qualifying
    /// chunk can still be displaced by higher-scoring ones.
    pub fn retrieve(
        &self,
        embedder: &dyn Embedder,
        query: &str,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = encode_one(embedder, &self.model, query)?;
        let query_norm = l2_norm(&query_vec);

        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .zip(self.norms.iter())
            .enumerate()
            .map(|(idx, (vec, norm))| {
                let score = cosine_similarity(&query_vec, vec, query_norm, *norm);
                (idx, clamp_score(score))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(self.max_context_chunks);

        Ok(scored
            .into_iter()
            .filter(|(_, score)| *score >= self.similarity_threshold)
            .map(|(idx, score)| {
                let chunk = &self.chunks[idx];
                RetrievedChunk {
                    source: chunk.source.clone(),
                    text: chunk.text.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Concatenated context for grounded generation: retained chunk texts
    /// in retrieval order, separated by a blank line. Empty when nothing
    /// clears the threshold.
    pub fn context(&self, embedder: &dyn Embedder, query: &str) -> Result<String, AppError> {
        let retrieved = self.retrieve(embedder, query)?;
        Ok(retrieved
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Read and chunk every `.md` document under `dir`, sorted by file name so
/// chunk ordering is deterministic. A missing directory is an empty
/// knowledge base.
fn load_chunks(dir: &Path) -> Result<Vec<KnowledgeChunk>, AppError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<_> = fs::read_dir(dir)
        .map_err(|e| {
            AppError::new("KNOWLEDGE_READ_FAILED", "Failed to list knowledge directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("md"))
        .collect();
    paths.sort();

    let mut chunks = Vec::new();
    for path in paths {
        let content = fs::read_to_string(&path).map_err(|e| {
            AppError::new("KNOWLEDGE_READ_FAILED", "Failed to read knowledge document")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for text in chunk_document(&content) {
            chunks.push(KnowledgeChunk {
                source: source.clone(),
                text,
            });
        }
    }
    Ok(chunks)
}
