//! ITT Chatbot API server
//!
//! Answers questions about the Instituto Tadao Takahashi bylaws over HTTP and
//! keeps the knowledge index in sync with the source documents.

mod error;
mod handlers;
mod state;

#[cfg(test)]
mod tests;

use anyhow::Context;
use clap::Parser;
use itt_core::{config::AppConfig, logging};
use state::AppState;
use std::path::PathBuf;

/// ITT Chatbot API server
#[derive(Parser, Debug)]
#[command(name = "itt-server")]
#[command(about = "Question answering over the ITT bylaws", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to config file
    #[arg(short, long, env = "ITT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Refresh the knowledge index in the background after startup
    #[arg(long)]
    sync_on_start: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config)?.with_overrides(
        cli.host,
        cli.port,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
        cli.sync_on_start,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;
    tracing::info!("ITT Chatbot API starting");
    if let Some(file) = &config.config_file {
        tracing::debug!("Loaded configuration from {:?}", file);
    }

    config.validate()?;
    let state = AppState::from_config(&config).context("Failed to initialize services")?;

    if config.server.sync_on_start {
        let refresher = state.refresher.clone();
        tokio::spawn(async move {
            match refresher.refresh().await {
                Ok(report) => tracing::info!("Startup sync: {}", report.message),
                Err(e) => tracing::error!("Startup sync failed: {}", e),
            }
        });
    }

    let app = handlers::router(state, &config.server.allowed_origins())?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
