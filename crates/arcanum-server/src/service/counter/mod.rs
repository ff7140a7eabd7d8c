//! Shared counters backing the rate limiter.

mod memory;
mod nats;

use std::time::Duration;

use async_trait::async_trait;

pub use self::memory::MemoryCounterStore;
pub use self::nats::NatsCounterStore;
use crate::BoxedError;

/// Failure of the backing counter store.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    /// The store did not answer within the deadline.
    #[error("counter store timed out after {0:?}")]
    Timeout(Duration),

    /// The store is unreachable or rejected the operation.
    #[error("counter store unavailable: {0}")]
    Unavailable(#[source] BoxedError),

    /// The store would expire keys before the requested window closes.
    #[error("counter window of {window:?} exceeds the store's key ttl of {ttl:?}")]
    WindowTooLong { window: Duration, ttl: Duration },
}

/// Atomic per-key counters with expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increments `key` and returns the new count.
    ///
    /// The first increment creates the key with count 1. The key may be
    /// discarded once `window` has passed since its creation.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, CounterError>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), CounterError>;
}
