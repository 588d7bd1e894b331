use bcc_core::config::SlmConfig;
use bcc_core::error::AppError;

use crate::llm::Llm;

pub mod prompts;

/// Tiers 2/3: formats prompts and invokes the external generative model.
/// No retry or backoff; failures surface to the orchestrator.
#[derive(Debug, Clone)]
pub struct GenerationGateway {
    config: SlmConfig,
}

impl GenerationGateway {
    pub fn new(config: SlmConfig) -> Self {
        Self { config }
    }

    /// Fine-tuned weights take precedence when configured; otherwise the
    /// base model.
    fn model_id(&self) -> &str {
        if self.config.use_finetuned && !self.config.weights_path.is_empty() {
            &self.config.weights_path
        } else {
            &self.config.model_name
        }
    }

    /// Tier 2: direct generation.
    pub fn generate(&self, llm: &dyn Llm, query: &str) -> Result<String, AppError> {
        self.run(llm, &prompts::base_prompt(query))
    }

    /// Tier 3: grounded generation. With context, the prompt presents it as
    /// verified policy/knowledge; without context, a caution clause is
    /// appended instead of aborting.
    pub fn generate_grounded(
        &self,
        llm: &dyn Llm,
        query: &str,
        context: &str,
    ) -> Result<String, AppError> {
        let input = if context.is_empty() {
            prompts::cautious_input(query)
        } else {
            prompts::grounded_input(query, context)
        };
        self.run(llm, &prompts::base_prompt(&input))
    }

    fn run(&self, llm: &dyn Llm, prompt: &str) -> Result<String, AppError> {
        let raw = llm.generate(
            self.model_id(),
            prompt,
            self.config.max_new_tokens,
            self.config.temperature,
        )?;
        Ok(prompts::extract_response(&raw, prompt))
    }
}
