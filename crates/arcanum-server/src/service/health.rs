//! Readiness checks of the backing stores.

use std::sync::Arc;
use std::time::Duration;

use crate::TRACING_TARGET_HEALTH;
use crate::service::counter::CounterStore;
use crate::service::store::AccountStore;

/// Reachability of each backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub database: bool,
    pub counter_store: bool,
}

impl HealthReport {
    /// Returns whether every dependency answered.
    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.database && self.counter_store
    }
}

/// Pings the account store and the counter store concurrently.
#[derive(Clone)]
pub struct HealthCheck {
    accounts: Arc<dyn AccountStore>,
    counters: Arc<dyn CounterStore>,
    timeout: Duration,
}

impl HealthCheck {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        counters: Arc<dyn CounterStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            counters,
            timeout,
        }
    }

    /// Checks both stores, each bounded by the check timeout.
    pub async fn check(&self) -> HealthReport {
        let database = tokio::time::timeout(self.timeout, self.accounts.ping());
        let counter_store = tokio::time::timeout(self.timeout, self.counters.ping());
        let (database, counter_store) = tokio::join!(database, counter_store);

        let report = HealthReport {
            database: matches!(database, Ok(Ok(()))),
            counter_store: matches!(counter_store, Ok(Ok(()))),
        };

        if !report.is_healthy() {
            tracing::warn!(
                target: TRACING_TARGET_HEALTH,
                database = report.database,
                counter_store = report.counter_store,
                "health check failed"
            );
        }

        report
    }
}

impl std::fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCheck")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
