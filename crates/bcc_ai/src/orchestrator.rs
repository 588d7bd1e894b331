use bcc_core::config::AppConfig;
use bcc_core::error::AppError;
use bcc_core::guardrails::Guardrails;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::ComplexityClassifier;
use crate::dataset::{DatasetMatcher, MatchResult};
use crate::embeddings::Embedder;
use crate::generate::GenerationGateway;
use crate::knowledge::KnowledgeIndex;
use crate::llm::Llm;

/// Safe response used when the generative backend fails at request time.
/// Availability is a hard requirement; a provider failure must never crash
/// the serving loop.
pub const SAFE_FALLBACK: &str = "We are unable to generate a response right now. \
Please try again shortly, or reach us through your branch or other official channels.";

/// Which tier served the response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    GuardrailReject,
    Dataset,
    Slm,
    Rag,
}

impl SourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::GuardrailReject => "guardrail_reject",
            SourceTier::Dataset => "dataset",
            SourceTier::Slm => "slm",
            SourceTier::Rag => "rag",
        }
    }
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMetadata {
    pub tier: Option<String>,
    pub similarity_score: Option<f32>,
}

/// The sole output type of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    pub response: String,
    pub source: SourceTier,
    pub metadata: ResponseMetadata,
}

impl ResponseEnvelope {
    fn new(response: String, source: SourceTier, similarity_score: Option<f32>) -> Self {
        let tier = match source {
            SourceTier::GuardrailReject => None,
            other => Some(other.as_str().to_string()),
        };
        Self {
            response,
            source,
            metadata: ResponseMetadata {
                tier,
                similarity_score,
            },
        }
    }
}

/// Priority state machine over the tiers.
///
/// Strict, sequential order: guardrail check, exact match, complexity
/// classification, then grounded or direct generation. A tier-1 hit is
/// authoritative and bypasses generation unconditionally.
///
/// All heavy resources (corpus, embedding matrices, knowledge index) are
/// built in `new`, so a failed startup never yields a value that could
/// serve. `process` takes `&self` and mutates nothing; a built
/// orchestrator is safe to share across threads behind an `Arc`.
pub struct Orchestrator {
    guardrails: Guardrails,
    matcher: DatasetMatcher,
    classifier: ComplexityClassifier,
    knowledge: KnowledgeIndex,
    gateway: GenerationGateway,
    embedder: Box<dyn Embedder + Send + Sync>,
    llm: Box<dyn Llm + Send + Sync>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator").finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Controlled startup phase: validate configuration, load and embed the
    /// corpus, build and embed the knowledge index. Any failure here is
    /// fatal and must stop the process before serving begins.
    pub fn new(
        config: AppConfig,
        embedder: Box<dyn Embedder + Send + Sync>,
        llm: Box<dyn Llm + Send + Sync>,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let guardrails = Guardrails::new(&config.guardrails)?;
        let matcher = DatasetMatcher::build(&config.similarity, embedder.as_ref())?;
        let knowledge = KnowledgeIndex::build(&config.rag, embedder.as_ref())?;
        let classifier = ComplexityClassifier::new(&config.rag.trigger_keywords);
        let gateway = GenerationGateway::new(config.slm.clone());

        tracing::info!(
            corpus_entries = matcher.len(),
            knowledge_chunks = knowledge.len(),
            "orchestrator initialized"
        );

        Ok(Self {
            guardrails,
            matcher,
            classifier,
            knowledge,
            gateway,
            embedder,
            llm,
        })
    }

    /// Run one query through the full pipeline. Never returns an error and
    /// never panics: request-time provider failures degrade to safe
    /// fallbacks and are isolated from subsequent queries.
    pub fn process(&self, query: &str) -> ResponseEnvelope {
        // Guardrails: absolute enforcement, terminal on rejection.
        let verdict = self.guardrails.check(query);
        if let Some(reason) = verdict.rejection_reason {
            tracing::info!(
                query = %self.guardrails.sanitize_for_logging(query),
                "query rejected by guardrails"
            );
            return ResponseEnvelope::new(reason, SourceTier::GuardrailReject, None);
        }

        // Tier 1: exact match against the curated corpus. An embedding
        // failure here degrades to a miss so the query can still be served.
        let matched = match self.matcher.search(self.embedder.as_ref(), query) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    query = %self.guardrails.sanitize_for_logging(query),
                    "tier-1 search failed; continuing without a dataset match"
                );
                MatchResult::miss(0.0)
            }
        };
        let score = Some(matched.score);
        if let Some(output) = matched.output {
            // Stored output returned verbatim; generation is bypassed.
            return ResponseEnvelope::new(output, SourceTier::Dataset, score);
        }

        // Tier 2 vs tier 3: the classifier alone selects the path.
        if self.classifier.is_complex(query) {
            let context = match self.knowledge.context(self.embedder.as_ref(), query) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        query = %self.guardrails.sanitize_for_logging(query),
                        "knowledge retrieval failed; generating without context"
                    );
                    String::new()
                }
            };
            let response = self
                .gateway
                .generate_grounded(self.llm.as_ref(), query, &context)
                .unwrap_or_else(|e| self.fallback(query, e));
            ResponseEnvelope::new(response, SourceTier::Rag, score)
        } else {
            let response = self
                .gateway
                .generate(self.llm.as_ref(), query)
                .unwrap_or_else(|e| self.fallback(query, e));
            ResponseEnvelope::new(response, SourceTier::Slm, score)
        }
    }

    fn fallback(&self, query: &str, error: AppError) -> String {
        tracing::error!(
            error = %error,
            query = %self.guardrails.sanitize_for_logging(query),
            "generation failed; returning safe fallback response"
        );
        SAFE_FALLBACK.to_string()
    }
}
