use bcc_core::error::AppError;

/// Handle to a local Ollama backend serving both the embedding model and the
/// generative model. Strictly limited to `127.0.0.1`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let local = base_url == "http://127.0.0.1"
            || (base_url.starts_with("http://127.0.0.1:")
                && base_url["http://127.0.0.1:".len()..]
                    .parse::<u16>()
                    .is_ok_and(|p| p > 0));
        if !local {
            return Err(AppError::new(
                "AI_REMOTE_NOT_ALLOWED",
                "Model backend base URL must be localhost (127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}")));
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the backend. Run during startup so a dead backend is caught
    /// before serving begins.
    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url)
            .timeout(std::time::Duration::from_millis(800))
            .call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new("AI_BACKEND_UNHEALTHY", "Model backend health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(AppError::new(
                "AI_BACKEND_UNREACHABLE",
                "Failed to reach model backend on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}
