//! Raidclaim Server
//!
//! Receipt extraction gateway. Accepts a receipt photo over HTTP, asks a
//! chain of vision LLM providers to read it, and returns the first usable
//! answer as plain text or structured fields.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! raidclaim-server
//!
//! # Start with custom config
//! raidclaim-server --config /path/to/config.toml
//!
//! # Start with environment overrides
//! RAIDCLAIM__SERVER__PORT=8080 raidclaim-server
//! ```
//!
//! Provider keys come from `OPENAI_API_KEY`, `GEMINI_API_KEY`,
//! `GROQ_API_KEY`, `OPENROUTER_API_KEY` and `HUGGINGFACE_API_KEY`.

mod config;

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use raidclaim_api::{create_router, AppState};
use raidclaim_vision::{Gateway, GatewayConfig};

use crate::config::ServerConfig;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Raidclaim Server - receipt extraction over vision LLM providers
#[derive(Parser, Debug)]
#[command(name = "raidclaim-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "RAIDCLAIM_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "RAIDCLAIM_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "RAIDCLAIM_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RAIDCLAIM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "RAIDCLAIM_LOG_FORMAT")]
    log_format: Option<String>,
}

impl Args {
    /// CLI values win over file and environment configuration
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut server_config);

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting raidclaim server"
    );

    let gateway_config = GatewayConfig::from_env().with_chains(server_config.chains.clone());
    validate_config(&server_config, &gateway_config)?;

    let state = Arc::new(AppState::new(Gateway::new(gateway_config)));
    let app = create_router(state, server_config.api_config());

    let addr = server_config.server.socket_addr()?;

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    serve_until_drained(
        listener,
        app,
        shutdown_signal(),
        server_config.server.shutdown_timeout(),
    )
    .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

/// Validate configuration
fn validate_config(config: &ServerConfig, gateway: &GatewayConfig) -> anyhow::Result<()> {
    config.chains.validate()?;

    if !config.api.api_prefix.starts_with('/') {
        anyhow::bail!(
            "api prefix must start with '/', got {:?}",
            config.api.api_prefix
        );
    }

    if config.server.request_timeout_secs == 0 {
        anyhow::bail!("request timeout must be greater than zero");
    }

    // Keys are resolved per request, so a missing one is not fatal here
    for provider in gateway.missing_credentials() {
        tracing::warn!(
            provider = %provider,
            env_var = raidclaim_vision::api_key_var(provider),
            "No API key configured"
        );
    }

    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Serve until `signal` resolves, then stop accepting and drain.
///
/// In-flight requests get at most `drain_timeout` to finish after the
/// signal; anything still running then is dropped.
async fn serve_until_drained<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    drain_timeout: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let signalled = Arc::new(Notify::new());

    let server = axum::serve(listener, app)
        .with_graceful_shutdown({
            let signalled = signalled.clone();
            async move {
                signal.await;
                signalled.notify_one();
            }
        })
        .into_future();

    let deadline = async {
        signalled.notified().await;
        tracing::info!(
            timeout_secs = drain_timeout.as_secs(),
            "Waiting for in-flight requests to complete..."
        );
        tokio::time::sleep(drain_timeout).await;
    };

    tokio::select! {
        result = server => result?,
        _ = deadline => {
            tracing::warn!(
                timeout_secs = drain_timeout.as_secs(),
                "Shutdown timeout elapsed, dropping in-flight requests"
            );
        }
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
