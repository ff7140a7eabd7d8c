//! Plain HTTP listener.

use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::lifecycle::serve_with_shutdown;
use super::shutdown::shutdown_signal;
use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::ServerConfig;

/// Binds the configured address and serves `app` until a shutdown signal.
///
/// Connection info is attached to every request so the client address can
/// be resolved from the TCP peer.
pub async fn serve_http(app: Router, server_config: ServerConfig) -> io::Result<()> {
    let server_addr = server_config.server_addr();

    let listener = TcpListener::bind(server_addr).await.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            error = %err,
            "failed to bind to address"
        );
        err
    })?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_addr,
        "server is ready and listening for connections"
    );

    let draining = Arc::new(Notify::new());
    let graceful_shutdown = {
        let draining = draining.clone();
        async move {
            shutdown_signal().await;
            draining.notify_one();
        }
    };

    serve_with_shutdown(&server_config, &draining, || {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(graceful_shutdown)
        .into_future()
    })
    .await
}
