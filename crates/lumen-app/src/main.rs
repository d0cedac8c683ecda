//! Lumen application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Pick the reasoning backend (HTTP service, or the mock when offline)
//! 3. Build the chat session and ingestion adapter
//! 4. Render conversation events while reading questions from stdin

mod cli;
mod render;
mod repl;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lumen_backend::{HttpBackend, MockBackend, ReasoningBackend};
use lumen_chat::{ChatSession, IngestionAdapter};
use lumen_core::{LumenConfig, LumenError};

use cli::CliArgs;
use repl::Exit;

/// Load the config file before tracing is up; a missing file means defaults.
fn load_config(path: &Path) -> (LumenConfig, Option<LumenError>) {
    if !path.exists() {
        return (LumenConfig::default(), None);
    }
    match LumenConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (LumenConfig::default(), Some(e)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let (mut config, config_error) = load_config(&config_file);

    // Tracing. Stdout belongs to the conversation.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Lumen v{}", env!("CARGO_PKG_VERSION"));
    match config_error {
        Some(e) => tracing::warn!(path = %config_file.display(), error = %e, "Failed to load config, using defaults"),
        None => tracing::info!(path = %config_file.display(), "Configuration resolved"),
    }

    config.backend.base_url = args.resolve_base_url(&config.backend.base_url);
    config.backend.offline = args.resolve_offline(config.backend.offline);

    // Backend.
    let backend: Arc<dyn ReasoningBackend> = if config.backend.offline {
        tracing::info!("Offline mode: answering from the built-in mock backend");
        Arc::new(MockBackend::new())
    } else {
        let http = HttpBackend::from_config(&config.backend)?;
        tracing::info!(base_url = %http.base_url(), timeout_secs = config.backend.timeout_secs, "Reasoning service configured");
        Arc::new(http)
    };

    // Session.
    let session = ChatSession::from_config(&config.chat, backend);
    let adapter = IngestionAdapter::from_config(session.clone(), &config.chat);

    render::print_history(&session.messages());
    let renderer = tokio::spawn(render::run(session.subscribe()));

    let mut last = None;
    if let Some(ref path) = args.upload {
        match adapter.ingest_path(path).await {
            Ok(pending) => last = Some(pending),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Startup upload not submitted"),
        }
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    match repl::run(stdin, &session, &adapter, last).await? {
        Exit::Quit => {
            tracing::info!("Goodbye");
            renderer.abort();
        }
        Exit::EndOfInput(pending) => {
            if let Some(pending) = pending {
                tracing::debug!(request_id = %pending.id, "Waiting for the last request");
                pending.wait().await?;
            }
            // The renderer drains once the last session handle is gone.
            drop(adapter);
            drop(session);
            renderer.await?;
        }
    }

    Ok(())
}
