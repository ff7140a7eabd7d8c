//! Server lifecycle: drain deadline, uptime and failure reporting.

use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Runs the server future until it finishes or the drain deadline passes.
///
/// `draining` is notified once the shutdown signal has been received; the
/// server then has `shutdown_timeout` to finish in-flight requests before
/// the remaining connections are dropped.
pub async fn serve_with_shutdown<F>(
    server_config: &ServerConfig,
    draining: &Notify,
    serve_fn: impl FnOnce() -> F,
) -> io::Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    let start_time = Instant::now();

    if server_config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "server bound to all interfaces, ensure firewall is configured"
        );
    }

    let drain_deadline = drain_deadline(draining, server_config.shutdown_timeout());
    let result = tokio::select! {
        result = serve_fn() => result,
        () = drain_deadline => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = server_config.shutdown_timeout,
                "graceful shutdown timed out, dropping open connections"
            );
            Ok(())
        }
    };

    handle_result(result, start_time)
}

async fn drain_deadline(draining: &Notify, timeout: Duration) {
    draining.notified().await;
    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        timeout_secs = timeout.as_secs(),
        "graceful shutdown initiated"
    );
    tokio::time::sleep(timeout).await;
}

fn handle_result(result: io::Result<()>, start_time: Instant) -> io::Result<()> {
    let uptime = start_time.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = uptime.as_secs(),
                "shutdown completed"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                kind = ?err.kind(),
                uptime_secs = uptime.as_secs(),
                "fatal server error"
            );

            if let Some(suggestion) = error_suggestion(&err) {
                tracing::info!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    suggestion,
                    "recovery suggestion"
                );
            }

            Err(err)
        }
    }
}

/// Provides a human-readable suggestion for resolving an IO error.
fn error_suggestion(err: &io::Error) -> Option<&'static str> {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            Some("Try using a port above 1024 or run with appropriate privileges")
        }
        io::ErrorKind::AddrInUse => {
            Some("The port is already in use. Try a different port or stop the conflicting service")
        }
        io::ErrorKind::AddrNotAvailable => {
            Some("The address is not available. Check network interface configuration")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_exit_is_ok() {
        let config = ServerConfig::default();
        let draining = Notify::new();

        let result = serve_with_shutdown(&config, &draining, || async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn server_error_is_returned() {
        let config = ServerConfig::default();
        let draining = Notify::new();

        let result = serve_with_shutdown(&config, &draining, || async {
            Err(io::Error::new(io::ErrorKind::AddrInUse, "in use"))
        })
        .await;
        assert_eq!(result.map_err(|e| e.kind()), Err(io::ErrorKind::AddrInUse));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_drain_is_cut_off() {
        let config = ServerConfig {
            shutdown_timeout: 5,
            ..ServerConfig::default()
        };
        let draining = Notify::new();
        draining.notify_one();

        let started = tokio::time::Instant::now();
        let result =
            serve_with_shutdown(&config, &draining, std::future::pending::<io::Result<()>>).await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn suggestions_for_bind_failures() {
        let err = io::Error::new(io::ErrorKind::AddrInUse, "in use");
        assert!(error_suggestion(&err).is_some());
        assert!(error_suggestion(&io::Error::other("other")).is_none());
    }
}
