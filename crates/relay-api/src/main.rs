//! Relay entry point.
//!
//! Binary name: `relay`
//!
//! Parses CLI arguments, loads configuration and secrets, wires the
//! orchestrator to the completion engine and the LINE platform, then serves
//! the webhook until SIGINT/SIGTERM.

mod cli;
mod http;
mod state;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use cli::Cli;
use relay_infra::config::{Credentials, load_config};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    relay_observe::init_tracing(cli.log_format, cli.log_filter(), cli.otel)
        .map_err(|e| anyhow::anyhow!(e))?;

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!("relay exited with error: {e:#}");
    }

    relay_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (config_path, explicit) = cli.config_path();
    let mut config = load_config(&config_path, explicit)
        .await
        .context("loading configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let credentials = Credentials::from_env().context("reading credentials")?;
    let state = AppState::build(&config, credentials)?;
    let router = http::router::build_router(state, &config.server.webhook_path);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(
        %addr,
        webhook_path = %config.server.webhook_path,
        model = %config.completion.model,
        "relay listening"
    );

    let shutdown = CancellationToken::new();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown({
            let token = shutdown.clone();
            async move { token.cancelled().await }
        })
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = &mut server => {
            result?;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    tracing::info!(
        grace_secs = grace.as_secs(),
        "shutdown signal received, draining in-flight requests"
    );
    shutdown.cancel();

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => {
            result?;
            tracing::info!("relay stopped");
        }
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "in-flight requests did not drain in time, exiting"
            );
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
