#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use arcanum_server::handler::routes;
use arcanum_server::middleware::{RouterClientIpExt, RouterObservabilityExt, RouterRecoveryExt};
use arcanum_server::service::{ServiceConfig, ServiceState, SessionSweeper};
use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::config::{Cli, MiddlewareConfig};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "arcanum_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "arcanum_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "arcanum_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting arcanum server"
    );

    cli.log();
    cli.validate()?;

    let state = create_service_state(&cli.service).await?;

    let sweeper_token = CancellationToken::new();
    let sweeper = SessionSweeper::new(
        state.gateway.clone(),
        cli.service.session_purge_interval(),
        sweeper_token.clone(),
    )
    .spawn();

    let router = create_router(state, &cli.middleware);
    let served = server::serve(router, cli.server).await;

    sweeper_token.cancel();
    if let Err(error) = sweeper.await {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "session sweeper did not stop cleanly"
        );
    }

    served.context("http server failed")?;
    Ok(())
}

/// Connects the stores and builds the service state.
async fn create_service_state(config: &ServiceConfig) -> anyhow::Result<ServiceState> {
    ServiceState::from_config(config)
        .await
        .context("failed to create service state")
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Observability - request IDs and tracing spans
/// 3. Client address source for the rate limiter
/// 4. Routes (innermost) - actual request handlers
fn create_router(state: ServiceState, middleware: &MiddlewareConfig) -> Router {
    routes(state)
        .with_client_ip(&middleware.client_ip)
        .with_observability()
        .with_recovery(&middleware.recovery)
}
