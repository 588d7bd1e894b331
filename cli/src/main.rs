use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use bcc_ai::embeddings::ollama_embed::OllamaEmbedder;
use bcc_ai::llm::ollama_llm::OllamaLlm;
use bcc_ai::ollama::OllamaClient;
use bcc_ai::orchestrator::Orchestrator;
use bcc_core::config::AppConfig;
use bcc_core::error::AppError;
use tracing_subscriber::EnvFilter;

const RESPONSE_PREVIEW_CHARS: usize = 500;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("startup failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Controlled startup: load config, verify the backend, build the
/// orchestrator. Any error here aborts before serving begins.
fn run() -> Result<(), AppError> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/settings.json"));
    let config = AppConfig::load(&config_path)?;
    tracing::info!(config = %config_path.display(), "configuration loaded");

    let client = OllamaClient::new(&config.ollama_base_url)?;
    client.health_check()?;
    tracing::info!(base_url = %config.ollama_base_url, "model backend is healthy");

    let embedder = OllamaEmbedder::new(client.clone());
    let llm = OllamaLlm::new(client);
    let orchestrator = Orchestrator::new(config, Box::new(embedder), Box::new(llm))?;

    serve(&orchestrator);
    Ok(())
}

/// Line-oriented request/response loop.
fn serve(orchestrator: &Orchestrator) {
    println!("BFSI Contact Center Assistant - Interactive Mode");
    println!("Type your query (or 'quit' to exit):");
    println!();

    let stdin = io::stdin();
    loop {
        print!("You: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }

        let envelope = orchestrator.process(query);
        match envelope.metadata.similarity_score {
            Some(score) => println!(
                "[{}] tier={} score={score:.3}",
                envelope.source,
                envelope.metadata.tier.as_deref().unwrap_or("-"),
            ),
            None => println!(
                "[{}] tier={}",
                envelope.source,
                envelope.metadata.tier.as_deref().unwrap_or("-"),
            ),
        }

        let preview: String = envelope
            .response
            .chars()
            .take(RESPONSE_PREVIEW_CHARS)
            .collect();
        println!("{preview}");
        if envelope.response.chars().count() > RESPONSE_PREVIEW_CHARS {
            println!("...");
        }
        println!();
    }
}
