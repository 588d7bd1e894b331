use std::path::Path;

use bcc_core::config::SimilarityConfig;
use bcc_core::corpus::{self, CorpusEntry};
use bcc_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::embeddings::{encode_one, Embedder};
use crate::similarity::{clamp_score, cosine_similarity, l2_norm};

/// Tier-1 search outcome. `output` is set only when the best clamped score
/// reaches the configured threshold; it is then byte-identical to the
/// stored corpus value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub output: Option<String>,
    pub score: f32,
}

impl MatchResult {
    pub fn miss(score: f32) -> Self {
        Self {
            output: None,
            score,
        }
    }
}

/// Full detail for one corpus candidate. Diagnostic only; never affects
/// routing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchDetail {
    pub index: usize,
    pub score: f32,
    pub instruction: String,
    pub input: Option<String>,
    pub output: String,
}

/// Tier 1: exact-match resolver over the curated corpus.
///
/// The corpus and its embedding matrix are built once at startup and read
/// only afterwards; entries and embeddings stay index-aligned.
#[derive(Debug)]
pub struct DatasetMatcher {
    entries: Vec<CorpusEntry>,
    embeddings: Vec<Vec<f32>>,
    norms: Vec<f32>,
    threshold: f32,
    top_k: usize,
    model: String,
}

impl DatasetMatcher {
    /// Load the corpus and embed every entry's search text. One embedding
    /// call per process lifetime, not per query.
    pub fn build(config: &SimilarityConfig, embedder: &dyn Embedder) -> Result<Self, AppError> {
        let entries = corpus::load_corpus(Path::new(&config.dataset_path))?;
        if entries.is_empty() {
            tracing::warn!(
                dataset_path = %config.dataset_path,
                "corpus is empty; tier 1 will report a graceful miss for every query"
            );
        }

        let texts: Vec<String> = entries.iter().map(|e| e.search_text()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.encode(&config.embedding_model, &texts)?
        };
        if embeddings.len() != entries.len() {
            return Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Corpus embedding count does not match entry count",
            )
            .with_details(format!(
                "entries={}; embeddings={}",
                entries.len(),
                embeddings.len()
            )));
        }
        let norms = embeddings.iter().map(|v| l2_norm(v)).collect();

        Ok(Self {
            entries,
            embeddings,
            norms,
            threshold: config.threshold,
            top_k: config.top_k.max(1),
            model: config.embedding_model.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Search the corpus for a strong match.
    ///
    /// On a hit the stored output is returned unmodified. On a miss the
    /// best (clamped) score is still reported for observability. An empty
    /// corpus is a graceful miss with score 0.0, never an error.
    pub fn search(&self, embedder: &dyn Embedder, query: &str) -> Result<MatchResult, AppError> {
        if self.entries.is_empty() {
            return Ok(MatchResult::miss(0.0));
        }

        let query_vec = encode_one(embedder, &self.model, query)?;
        let (best_idx, best_score) = self.best_index(&query_vec);
        let best_score = clamp_score(best_score);

        if best_score >= self.threshold {
            return Ok(MatchResult {
                output: Some(self.entries[best_idx].output.clone()),
                score: best_score,
            });
        }
        Ok(MatchResult::miss(best_score))
    }

    /// Full detail for the strongest candidates, strongest first, at most
    /// `top_k`. Diagnostic operation for observability.
    pub fn top_matches(
        &self,
        embedder: &dyn Embedder,
        query: &str,
    ) -> Result<Vec<MatchDetail>, AppError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = encode_one(embedder, &self.model, query)?;
        let mut scored = self.score_all(&query_vec);
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(self.top_k);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| {
                let entry = &self.entries[idx];
                MatchDetail {
                    index: idx,
                    score: clamp_score(score),
                    instruction: entry.instruction.clone(),
                    input: entry.input.clone(),
                    output: entry.output.clone(),
                }
            })
            .collect())
    }

    fn score_all(&self, query_vec: &[f32]) -> Vec<(usize, f32)> {
        let query_norm = l2_norm(query_vec);
        self.embeddings
            .iter()
            .zip(self.norms.iter())
            .enumerate()
            .map(|(idx, (vec, norm))| {
                (idx, cosine_similarity(query_vec, vec, query_norm, *norm))
            })
            .collect()
    }

    /// Maximum-scoring index; on ties the lowest corpus index wins, so the
    /// first entry inserted takes precedence.
    fn best_index(&self, query_vec: &[f32]) -> (usize, f32) {
        let mut best = (0usize, f32::NEG_INFINITY);
        for (idx, score) in self.score_all(query_vec) {
            if score > best.1 {
                best = (idx, score);
            }
        }
        best
    }
}
