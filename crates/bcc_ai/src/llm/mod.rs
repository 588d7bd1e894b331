use bcc_core::error::AppError;

/// External generative model. Called synchronously; potentially
/// high-latency.
pub trait Llm {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        max_new_tokens: u32,
        temperature: f32,
    ) -> Result<String, AppError>;
}

pub mod ollama_llm;
