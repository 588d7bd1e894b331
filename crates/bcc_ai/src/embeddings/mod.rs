use bcc_core::error::AppError;

/// Maps text to fixed-length numeric vectors. Deterministic for a fixed
/// model and input; every returned vector has the same length.
pub trait Embedder {
    fn encode(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;
}

pub mod ollama_embed;

/// Embed a single text. Convenience wrapper for the per-query path.
pub fn encode_one(
    embedder: &dyn Embedder,
    model: &str,
    text: &str,
) -> Result<Vec<f32>, AppError> {
    let texts = [text.to_string()];
    let mut vectors = embedder.encode(model, &texts)?;
    vectors.pop().ok_or_else(|| {
        AppError::new("AI_EMBEDDINGS_FAILED", "Embedder returned no vector for query")
    })
}
