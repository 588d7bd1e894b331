use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bcc_ai::embeddings::Embedder;
use bcc_ai::generate::prompts::CAUTION_NOTE;
use bcc_ai::llm::Llm;
use bcc_ai::orchestrator::{Orchestrator, SourceTier, SAFE_FALLBACK};
use bcc_core::config::AppConfig;
use bcc_core::error::AppError;
use bcc_core::guardrails::SENSITIVE_REJECTION;
use pretty_assertions::assert_eq;

/// Deterministic stub: one dimension per ASCII letter, value = occurrence
/// count. Counts encode calls so tests can assert embedding behavior.
#[derive(Clone)]
struct LetterCountEmbedder {
    calls: Arc<AtomicUsize>,
}

impl LetterCountEmbedder {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Embedder for LetterCountEmbedder {
    fn encode(&self, _model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for ch in t.to_lowercase().chars() {
                    if ch.is_ascii_lowercase() {
                        v[(ch as u8 - b'a') as usize] += 1.0;
                    }
                }
                v
            })
            .collect())
    }
}

/// Stub generative model: records prompts, counts calls, optionally fails.
#[derive(Clone)]
struct StubLlm {
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl StubLlm {
    fn new(fail: bool) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            fail,
        }
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().expect("lock").last().cloned()
    }
}

impl Llm for StubLlm {
    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _max_new_tokens: u32,
        _temperature: f32,
    ) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("lock").push(prompt.to_string());
        if self.fail {
            return Err(AppError::new("AI_GENERATION_FAILED", "stub failure")
                .with_retryable(true));
        }
        Ok(format!("{prompt}### Response:\ngenerated reply"))
    }
}

fn write_corpus(dir: &Path, json: &str) -> String {
    let path = dir.join("corpus.json");
    fs::write(&path, json).expect("write corpus");
    path.to_string_lossy().into_owned()
}

fn test_config(dir: &Path, corpus_json: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.similarity.dataset_path = write_corpus(dir, corpus_json);
    let kb = dir.join("knowledge");
    fs::create_dir_all(&kb).expect("mkdir knowledge");
    cfg.rag.knowledge_base_path = kb.to_string_lossy().into_owned();
    cfg
}

fn build(
    cfg: AppConfig,
    embedder: &LetterCountEmbedder,
    llm: &StubLlm,
) -> Orchestrator {
    Orchestrator::new(cfg, Box::new(embedder.clone()), Box::new(llm.clone()))
        .expect("orchestrator")
}

#[test]
fn dataset_hit_is_terminal_and_generation_is_never_invoked() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(
        dir.path(),
        r#"[
            { "instruction": "How do I check my loan eligibility?",
              "output": "Visit your nearest branch with income proof and ID." }
        ]"#,
    );

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);

    let envelope = orch.process("How do I check my loan eligibility?");
    assert_eq!(envelope.source, SourceTier::Dataset);
    assert_eq!(
        envelope.response,
        "Visit your nearest branch with income proof and ID."
    );
    assert_eq!(envelope.metadata.tier.as_deref(), Some("dataset"));
    assert!(envelope.metadata.similarity_score.expect("score") > 0.999);
    // Priority law: the generative model must never run on a tier-1 hit.
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn exact_match_outranks_the_complexity_classifier() {
    let dir = tempfile::tempdir().expect("tempdir");
    // The instruction contains a RAG trigger term; tier 1 must still win.
    let cfg = test_config(
        dir.path(),
        r#"[
            { "instruction": "What is the interest rate formula for loans?",
              "output": "EMI = P x R x (1+R)^N / ((1+R)^N - 1)." }
        ]"#,
    );

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);

    let envelope = orch.process("What is the interest rate formula for loans?");
    assert_eq!(envelope.source, SourceTier::Dataset);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn guardrail_rejection_touches_no_other_tier() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path(), "[]");

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);
    let calls_after_startup = embedder.calls.load(Ordering::SeqCst);

    let envelope = orch.process("please reset my password now");
    assert_eq!(envelope.source, SourceTier::GuardrailReject);
    assert_eq!(envelope.response, SENSITIVE_REJECTION);
    assert_eq!(envelope.metadata.tier, None);
    assert_eq!(envelope.metadata.similarity_score, None);
    // No retrieval or generation work happened.
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_startup);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn card_number_query_is_rejected_before_any_retrieval() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Default guardrail keywords include "card number".
    let cfg = test_config(dir.path(), "[]");

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);

    let envelope =
        orch.process("My card number is 4111 1111 1111 1111, what is my balance?");
    assert_eq!(envelope.source, SourceTier::GuardrailReject);
    assert_eq!(envelope.response, SENSITIVE_REJECTION);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn over_length_query_is_rejected_at_the_boundary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(dir.path(), "[]");
    cfg.guardrails.max_query_length = 20;

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);

    let at_limit = "q".repeat(20);
    assert_ne!(orch.process(&at_limit).source, SourceTier::GuardrailReject);

    let over = "q".repeat(21);
    assert_eq!(orch.process(&over).source, SourceTier::GuardrailReject);
}

#[test]
fn trigger_term_routes_to_rag_with_caution_when_no_context_qualifies() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Empty corpus and empty knowledge base.
    let cfg = test_config(dir.path(), "[]");

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);

    let envelope = orch.process("What is the interest rate formula for loans?");
    assert_eq!(envelope.source, SourceTier::Rag);
    assert_eq!(envelope.metadata.tier.as_deref(), Some("rag"));
    assert_eq!(envelope.metadata.similarity_score, Some(0.0));
    assert_eq!(envelope.response, "generated reply");

    let prompt = llm.last_prompt().expect("prompt");
    assert!(prompt.contains(CAUTION_NOTE));
}

#[test]
fn qualifying_context_is_injected_into_the_grounded_prompt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path(), "[]");
    // A chunk identical to the query text guarantees a qualifying score.
    fs::write(
        Path::new(&cfg.rag.knowledge_base_path).join("rates.md"),
        "What is the interest rate formula for loans?",
    )
    .expect("write kb");

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);

    let envelope = orch.process("What is the interest rate formula for loans?");
    assert_eq!(envelope.source, SourceTier::Rag);

    let prompt = llm.last_prompt().expect("prompt");
    assert!(prompt.contains("verified policy/knowledge"));
    assert!(prompt.contains("What is the interest rate formula for loans?"));
    assert!(!prompt.contains(CAUTION_NOTE));
}

#[test]
fn plain_queries_take_the_direct_generation_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path(), "[]");

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);

    let envelope = orch.process("hello, can you help me today?");
    assert_eq!(envelope.source, SourceTier::Slm);
    assert_eq!(envelope.metadata.tier.as_deref(), Some("slm"));
    assert_eq!(envelope.response, "generated reply");
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

    let prompt = llm.last_prompt().expect("prompt");
    assert!(prompt.contains("hello, can you help me today?"));
}

#[test]
fn generation_failure_degrades_to_the_safe_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(dir.path(), "[]");

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(true);
    let orch = build(cfg, &embedder, &llm);

    let envelope = orch.process("hello, can you help me today?");
    assert_eq!(envelope.source, SourceTier::Slm);
    assert_eq!(envelope.response, SAFE_FALLBACK);

    // A failing query never poisons the pipeline for the next one.
    let envelope = orch.process("what is the penalty for late payment?");
    assert_eq!(envelope.source, SourceTier::Rag);
    assert_eq!(envelope.response, SAFE_FALLBACK);
}

#[test]
fn startup_fails_when_the_dataset_is_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = AppConfig::default();
    cfg.similarity.dataset_path = dir
        .path()
        .join("absent.json")
        .to_string_lossy()
        .into_owned();

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let err = Orchestrator::new(cfg, Box::new(embedder), Box::new(llm))
        .expect_err("should fail at startup");
    assert_eq!(err.code, "DATASET_NOT_FOUND");
}

#[test]
fn processing_is_idempotent_for_identical_queries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = test_config(
        dir.path(),
        r#"[ { "instruction": "How do I close my account?", "output": "Visit a branch." } ]"#,
    );

    let embedder = LetterCountEmbedder::new();
    let llm = StubLlm::new(false);
    let orch = build(cfg, &embedder, &llm);

    let first = orch.process("How do I close my account?");
    let second = orch.process("How do I close my account?");
    assert_eq!(first, second);
}
