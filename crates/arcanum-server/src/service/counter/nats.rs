use std::time::Duration;

use arcanum_nats::kv::{KvCounter, RateLimitBucket};
use arcanum_nats::NatsClient;
use async_trait::async_trait;

use super::{CounterError, CounterStore};

/// Counter store on a NATS JetStream key-value bucket.
///
/// Shared by every instance connected to the same NATS deployment. Keys
/// expire through the bucket's `max_age`, which is set to the window on
/// open. An increment asking for a longer window than that is refused,
/// since its key could vanish before the window closes.
#[derive(Clone)]
pub struct NatsCounterStore {
    client: NatsClient,
    counter: KvCounter,
}

impl NatsCounterStore {
    /// Opens the rate-limit bucket with the given key lifetime, creating or
    /// updating it as needed.
    pub async fn new(client: NatsClient, window: Duration) -> arcanum_nats::Result<Self> {
        let counter = client.kv_counter::<RateLimitBucket>(window).await?;
        Ok(Self { client, counter })
    }
}

#[async_trait]
impl CounterStore for NatsCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, CounterError> {
        check_window(self.counter.ttl(), window)?;
        self.counter.increment(key).await.map_err(unavailable)
    }

    async fn ping(&self) -> Result<(), CounterError> {
        self.client.ping().await.map(|_| ()).map_err(unavailable)
    }
}

fn check_window(ttl: Duration, window: Duration) -> Result<(), CounterError> {
    if window > ttl {
        return Err(CounterError::WindowTooLong { window, ttl });
    }

    Ok(())
}

fn unavailable(error: arcanum_nats::Error) -> CounterError {
    match error {
        arcanum_nats::Error::Timeout { timeout } => CounterError::Timeout(timeout),
        other => CounterError::Unavailable(Box::new(other)),
    }
}
