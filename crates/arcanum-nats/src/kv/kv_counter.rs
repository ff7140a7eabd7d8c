//! Atomic counters on a JetStream key-value bucket.

use std::fmt;
use std::time::Duration;

use async_nats::jetstream::{self, kv};
use sha2::{Digest, Sha256};

use super::KvBucket;
use crate::{Error, Result, TRACING_TARGET_KV};

/// Upper bound on compare-and-swap rounds for one increment.
const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Counter store on a JetStream key-value bucket.
///
/// Every increment is a single compare-and-swap against the key's revision:
/// `create` for the first hit and `update(.., revision)` afterwards. A writer
/// that loses the race re-reads and tries again, so no increment is lost and
/// no two callers observe the same count.
#[derive(Clone)]
pub struct KvCounter {
    store: kv::Store,
    bucket: &'static str,
    ttl: Duration,
    max_attempts: u32,
}

impl KvCounter {
    /// Opens bucket `B` with `max_age = ttl`.
    ///
    /// A missing bucket is created. An existing bucket whose `max_age`
    /// differs from `ttl` is updated in place.
    pub(crate) async fn new<B: KvBucket>(
        jetstream: &jetstream::Context,
        ttl: Duration,
    ) -> Result<Self> {
        if ttl.is_zero() {
            return Err(Error::invalid_config("counter ttl must be greater than 0"));
        }

        let store = match jetstream.get_key_value(B::NAME).await {
            Ok(store) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    "using existing KV bucket"
                );
                Self::reconcile_max_age(jetstream, &store, B::NAME, ttl).await?;
                store
            }
            Err(_) => {
                tracing::info!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    ttl_secs = ttl.as_secs(),
                    "creating KV bucket"
                );
                let config = kv::Config {
                    bucket: B::NAME.to_owned(),
                    description: B::DESCRIPTION.to_owned(),
                    max_age: ttl,
                    history: 1,
                    ..Default::default()
                };
                jetstream
                    .create_key_value(config)
                    .await
                    .map_err(|err| Error::operation("kv_create", err.to_string()))?
            }
        };

        Ok(Self {
            store,
            bucket: B::NAME,
            ttl,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Rewrites the bucket's `max_age` when it was created with another ttl.
    async fn reconcile_max_age(
        jetstream: &jetstream::Context,
        store: &kv::Store,
        bucket: &str,
        ttl: Duration,
    ) -> Result<()> {
        let status = store
            .status()
            .await
            .map_err(|err| Error::operation("kv_status", err.to_string()))?;

        let current = status.max_age();
        let Some(max_age) = max_age_update(current, ttl) else {
            return Ok(());
        };

        tracing::warn!(
            target: TRACING_TARGET_KV,
            bucket = %bucket,
            current_secs = current.as_secs(),
            ttl_secs = max_age.as_secs(),
            "KV bucket max_age differs from the configured ttl, updating"
        );

        let mut config = status.info.config.clone();
        config.max_age = max_age;
        jetstream
            .update_stream(&config)
            .await
            .map_err(|err| Error::operation("kv_update_bucket", err.to_string()))?;

        Ok(())
    }

    /// How long the bucket keeps a key after its last write.
    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Atomically increments `key` and returns the new count.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn increment(&self, key: &str) -> Result<u64> {
        let subject = Self::subject(key);

        for attempt in 1..=self.max_attempts {
            let entry = self
                .store
                .entry(&subject)
                .await
                .map_err(|err| Error::operation("kv_entry", err.to_string()))?;

            let outcome = match entry {
                Some(entry) if matches!(entry.operation, kv::Operation::Put) => {
                    let count = self.decode(&subject, &entry.value)?;
                    let next = count.saturating_add(1);
                    match self
                        .store
                        .update(&subject, Self::encode(next).into(), entry.revision)
                        .await
                    {
                        Ok(_) => Some(next),
                        Err(err) if matches!(err.kind(), kv::UpdateErrorKind::WrongLastRevision) => {
                            None
                        }
                        Err(err) => return Err(Error::operation("kv_update", err.to_string())),
                    }
                }
                // Absent, or removed by a delete marker: start from one.
                _ => match self.store.create(&subject, Self::encode(1).into()).await {
                    Ok(_) => Some(1),
                    Err(err) if matches!(err.kind(), kv::CreateErrorKind::AlreadyExists) => None,
                    Err(err) => return Err(Error::operation("kv_create_key", err.to_string())),
                },
            };

            if let Some(count) = outcome {
                tracing::trace!(
                    target: TRACING_TARGET_KV,
                    bucket = %self.bucket,
                    count,
                    attempt,
                    "counter incremented"
                );
                return Ok(count);
            }
        }

        tracing::warn!(
            target: TRACING_TARGET_KV,
            bucket = %self.bucket,
            attempts = self.max_attempts,
            "counter increment gave up under contention"
        );

        Err(Error::KvContention {
            key: key.to_owned(),
            attempts: self.max_attempts,
        })
    }

    /// Maps an arbitrary logical key onto the KV key alphabet.
    ///
    /// Identifiers such as IPv6 addresses contain characters NATS rejects,
    /// so keys are stored under their SHA-256 digest.
    fn subject(key: &str) -> String {
        format!("c.{}", hex::encode(Sha256::digest(key.as_bytes())))
    }

    fn encode(count: u64) -> Vec<u8> {
        count.to_string().into_bytes()
    }

    fn decode(&self, subject: &str, value: &[u8]) -> Result<u64> {
        std::str::from_utf8(value)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| Error::KvCorruptValue {
                bucket: self.bucket.to_owned(),
                key: subject.to_owned(),
            })
    }
}

/// Returns the `max_age` to apply when an existing bucket's differs from `ttl`.
///
/// A `max_age` of zero means the bucket never expires keys.
fn max_age_update(current: Duration, ttl: Duration) -> Option<Duration> {
    (current != ttl).then_some(ttl)
}

impl fmt::Debug for KvCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvCounter")
            .field("bucket", &self.bucket)
            .field("ttl", &self.ttl)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::RateLimitBucket;
    use crate::{NatsClient, NatsConfig};

    #[test]
    fn subject_uses_valid_alphabet() {
        let subject = KvCounter::subject("ip:2001:db8::1.29000000");
        assert!(subject.starts_with("c."));
        assert_eq!(subject.len(), 2 + 64);
        assert!(
            subject
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
        );
        assert_ne!(subject, KvCounter::subject("ip:2001:db8::1.29000001"));
    }

    #[test]
    fn matching_max_age_is_kept() {
        let window = Duration::from_secs(60);
        assert_eq!(max_age_update(window, window), None);
    }

    #[test]
    fn differing_max_age_is_replaced_by_ttl() {
        let window = Duration::from_secs(60);
        assert_eq!(max_age_update(Duration::from_secs(30), window), Some(window));
        assert_eq!(max_age_update(Duration::from_secs(3_600), window), Some(window));
        // Zero is "never expire" in JetStream.
        assert_eq!(max_age_update(Duration::ZERO, window), Some(window));
    }

    #[test]
    fn encode_is_decimal() {
        assert_eq!(KvCounter::encode(42), b"42".to_vec());
    }

    /// Runs only when `NATS_URL` points at a JetStream-enabled server.
    #[tokio::test]
    async fn concurrent_increments_are_not_lost() -> anyhow::Result<()> {
        let Ok(url) = std::env::var("NATS_URL") else {
            return Ok(());
        };

        let client = NatsClient::connect(NatsConfig::new(url)).await?;
        let counter = client
            .kv_counter::<RateLimitBucket>(Duration::from_secs(60))
            .await?;
        let key = format!("test:{}", std::process::id());

        let increments = (0..20).map(|_| counter.increment(&key));
        let mut counts = futures::future::try_join_all(increments).await?;
        counts.sort_unstable();

        let expected: Vec<u64> = (1..=20).collect();
        assert_eq!(counts, expected);
        Ok(())
    }

    /// Runs only when `NATS_URL` points at a JetStream-enabled server.
    #[tokio::test]
    async fn reopening_with_another_ttl_updates_the_bucket() -> anyhow::Result<()> {
        let Ok(url) = std::env::var("NATS_URL") else {
            return Ok(());
        };

        let client = NatsClient::connect(NatsConfig::new(url)).await?;
        client
            .kv_counter::<RateLimitBucket>(Duration::from_secs(60))
            .await?;
        let counter = client
            .kv_counter::<RateLimitBucket>(Duration::from_secs(120))
            .await?;

        let status = counter.store.status().await?;
        assert_eq!(status.max_age(), Duration::from_secs(120));
        assert_eq!(counter.ttl(), Duration::from_secs(120));
        Ok(())
    }
}
