//! Periodic removal of expired refresh sessions.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_SESSION_SWEEPER;
use crate::service::AuthGateway;

/// Background task purging lapsed sessions on a fixed interval.
///
/// Lookups already treat expired sessions as absent; the sweeper only
/// reclaims their storage. Stops when the cancellation token fires.
pub struct SessionSweeper {
    gateway: AuthGateway,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl SessionSweeper {
    pub fn new(gateway: AuthGateway, interval: Duration, cancel_token: CancellationToken) -> Self {
        Self {
            gateway,
            interval,
            cancel_token,
        }
    }

    /// Spawns the sweeper as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        tracing::info!(
            target: TRACING_TARGET_SESSION_SWEEPER,
            interval_secs = self.interval.as_secs(),
            "starting session sweeper"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET_SESSION_SWEEPER,
                        "shutdown requested, stopping session sweeper"
                    );
                    break;
                }

                _ = ticker.tick() => self.sweep().await,
            }
        }
    }

    async fn sweep(&self) {
        if let Err(error) = self.gateway.purge_expired_sessions().await {
            tracing::error!(
                target: TRACING_TARGET_SESSION_SWEEPER,
                error = %error,
                "failed to purge expired sessions"
            );
        }
    }
}
