//! Tiered response engine for a BFSI contact-center assistant.
//!
//! Queries pass through guardrails, then an exact-match search over a
//! curated corpus, and only when that misses are they routed to direct or
//! retrieval-grounded generation. The priority order is strict: never
//! skip, never reorder, never paraphrase an exact match.

pub mod classify;
pub mod dataset;
pub mod embeddings;
pub mod generate;
pub mod knowledge;
pub mod llm;
pub mod ollama;
pub mod orchestrator;
pub mod similarity;
