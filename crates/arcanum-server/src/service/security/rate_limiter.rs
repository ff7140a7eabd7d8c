//! Fixed-window rate limiter over a shared counter store.
//!
//! Each identifier gets one counter per time-aligned window, keyed
//! `{identifier}.{window_index}`. The increment itself is the check, so a
//! burst of concurrent requests can never admit more than the limit.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

#[cfg(any(test, feature = "config"))]
use clap::{Args, ValueEnum};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::service::counter::{CounterError, CounterStore};
use crate::{Error, Result, TRACING_TARGET_RATE_LIMITER};

/// What to do when the counter store cannot be reached.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[cfg_attr(any(test, feature = "config"), derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FailurePolicy {
    /// Reject the request with an internal error.
    #[default]
    Closed,
    /// Admit the request and log a warning.
    Open,
}

/// Request ceiling, window length and failure policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
pub struct RateLimitConfig {
    /// Maximum requests per identifier within one window.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "RATE_LIMIT_REQUESTS", default_value_t = 100)
    )]
    pub rate_limit_requests: u32,

    /// Window length in seconds.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)
    )]
    pub rate_limit_window_secs: u64,

    /// Behaviour when the counter store is unavailable.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            long,
            env = "RATE_LIMIT_FAILURE_POLICY",
            value_enum,
            default_value_t = FailurePolicy::Closed
        )
    )]
    #[serde(default)]
    pub rate_limit_failure_policy: FailurePolicy,
}

impl RateLimitConfig {
    /// Creates a fail-closed configuration.
    pub fn new(requests: u32, window_secs: u64) -> Self {
        Self {
            rate_limit_requests: requests,
            rate_limit_window_secs: window_secs,
            rate_limit_failure_policy: FailurePolicy::Closed,
        }
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.rate_limit_failure_policy = policy;
        self
    }

    /// Returns the window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Validates the limit and window.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit_requests == 0 {
            return Err(Error::config("RATE_LIMIT_REQUESTS must be greater than 0"));
        }

        if !(1..=86_400).contains(&self.rate_limit_window_secs) {
            return Err(Error::config(
                "RATE_LIMIT_WINDOW_SECS must be between 1 and 86400",
            ));
        }

        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(100, 60)
    }
}

/// Who a request is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// An authenticated account.
    Account(Uuid),
    /// An anonymous client address.
    Ip(IpAddr),
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account:{id}"),
            Self::Ip(addr) => write!(f, "ip:{addr}"),
        }
    }
}

/// Outcome of [`RateLimiter::check_and_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request fits in the current window.
    Allowed { limit: u32, remaining: u32 },
    /// The window is exhausted.
    Limited { limit: u32, retry_after_secs: u64 },
}

impl RateLimitDecision {
    /// Returns whether the request may proceed.
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Counter store failure under [`FailurePolicy::Closed`].
#[derive(Debug, thiserror::Error)]
#[error("rate limit check failed: {0}")]
pub struct RateLimitError(#[from] pub CounterError);

/// Fixed-window rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limit: u32,
    window_secs: u64,
    policy: FailurePolicy,
    store_timeout: Duration,
}

impl RateLimiter {
    /// Creates a limiter over the given counter store.
    pub fn new(
        store: Arc<dyn CounterStore>,
        config: &RateLimitConfig,
        store_timeout: Duration,
    ) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            target: TRACING_TARGET_RATE_LIMITER,
            limit = config.rate_limit_requests,
            window_secs = config.rate_limit_window_secs,
            failure_policy = %config.rate_limit_failure_policy,
            "rate limiter initialized"
        );

        Ok(Self {
            store,
            limit: config.rate_limit_requests,
            window_secs: config.rate_limit_window_secs,
            policy: config.rate_limit_failure_policy,
            store_timeout,
        })
    }

    /// Requests admitted per window.
    #[inline]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Counts one request for `key` and decides whether it may proceed.
    pub async fn check_and_consume(
        &self,
        key: &RateLimitKey,
    ) -> Result<RateLimitDecision, RateLimitError> {
        self.check_and_consume_at(key, Timestamp::now()).await
    }

    /// Same as [`check_and_consume`](Self::check_and_consume) at an explicit instant.
    pub async fn check_and_consume_at(
        &self,
        key: &RateLimitKey,
        now: Timestamp,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let now_secs = now.as_second();
        let window = i64::try_from(self.window_secs).unwrap_or(i64::MAX);
        let window_index = now_secs.div_euclid(window);
        let window_end = window_index.saturating_add(1).saturating_mul(window);
        let counter_key = format!("{key}.{window_index}");

        let count = match self.increment(&counter_key).await {
            Ok(count) => count,
            Err(error) => return self.on_store_failure(key, error),
        };

        if count <= u64::from(self.limit) {
            let remaining = u32::try_from(u64::from(self.limit) - count).unwrap_or(0);
            return Ok(RateLimitDecision::Allowed {
                limit: self.limit,
                remaining,
            });
        }

        let retry_after_secs = u64::try_from(window_end - now_secs).unwrap_or(1).max(1);
        tracing::warn!(
            target: TRACING_TARGET_RATE_LIMITER,
            key = %key,
            count,
            limit = self.limit,
            retry_after_secs,
            "rate limit exceeded"
        );

        Ok(RateLimitDecision::Limited {
            limit: self.limit,
            retry_after_secs,
        })
    }

    async fn increment(&self, counter_key: &str) -> Result<u64, CounterError> {
        let window = Duration::from_secs(self.window_secs);
        tokio::time::timeout(self.store_timeout, self.store.increment(counter_key, window))
            .await
            .map_err(|_| CounterError::Timeout(self.store_timeout))?
    }

    fn on_store_failure(
        &self,
        key: &RateLimitKey,
        error: CounterError,
    ) -> Result<RateLimitDecision, RateLimitError> {
        match self.policy {
            FailurePolicy::Closed => {
                tracing::error!(
                    target: TRACING_TARGET_RATE_LIMITER,
                    key = %key,
                    error = %error,
                    "counter store unavailable, rejecting request"
                );
                Err(RateLimitError(error))
            }
            FailurePolicy::Open => {
                tracing::warn!(
                    target: TRACING_TARGET_RATE_LIMITER,
                    key = %key,
                    error = %error,
                    "counter store unavailable, admitting request unchecked"
                );
                Ok(RateLimitDecision::Allowed {
                    limit: self.limit,
                    remaining: self.limit,
                })
            }
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window_secs", &self.window_secs)
            .field("policy", &self.policy)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::service::counter::MemoryCounterStore;

    /// Start of a 60-second window.
    const WINDOW_START: i64 = 1_700_000_040;

    struct FailingStore;

    #[async_trait]
    impl CounterStore for FailingStore {
        async fn increment(&self, _key: &str, _window: Duration) -> Result<u64, CounterError> {
            Err(CounterError::Unavailable("connection refused".into()))
        }

        async fn ping(&self) -> Result<(), CounterError> {
            Err(CounterError::Unavailable("connection refused".into()))
        }
    }

    struct StalledStore;

    #[async_trait]
    impl CounterStore for StalledStore {
        async fn increment(&self, _key: &str, _window: Duration) -> Result<u64, CounterError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(1)
        }

        async fn ping(&self) -> Result<(), CounterError> {
            Ok(())
        }
    }

    fn limiter(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> anyhow::Result<RateLimiter> {
        Ok(RateLimiter::new(store, &config, Duration::from_millis(100))?)
    }

    fn at(second: i64) -> anyhow::Result<Timestamp> {
        Ok(Timestamp::from_second(second)?)
    }

    #[tokio::test]
    async fn window_boundary() -> anyhow::Result<()> {
        let limiter = limiter(Arc::new(MemoryCounterStore::new()), RateLimitConfig::new(5, 60))?;
        let key = RateLimitKey::Ip("203.0.113.7".parse()?);
        let now = at(WINDOW_START + 10)?;

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check_and_consume_at(&key, now).await?;
            assert_eq!(
                decision,
                RateLimitDecision::Allowed {
                    limit: 5,
                    remaining: expected_remaining
                }
            );
        }

        let decision = limiter.check_and_consume_at(&key, now).await?;
        assert_eq!(
            decision,
            RateLimitDecision::Limited {
                limit: 5,
                retry_after_secs: 50
            }
        );

        let next_window = at(WINDOW_START + 60)?;
        assert!(limiter.check_and_consume_at(&key, next_window).await?.is_allowed());

        Ok(())
    }

    #[tokio::test]
    async fn retry_after_is_at_least_one_second() -> anyhow::Result<()> {
        let limiter = limiter(Arc::new(MemoryCounterStore::new()), RateLimitConfig::new(1, 60))?;
        let key = RateLimitKey::Account(Uuid::new_v4());
        let now = at(WINDOW_START + 59)?;

        assert!(limiter.check_and_consume_at(&key, now).await?.is_allowed());
        assert_eq!(
            limiter.check_and_consume_at(&key, now).await?,
            RateLimitDecision::Limited {
                limit: 1,
                retry_after_secs: 1
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn identifiers_are_counted_separately() -> anyhow::Result<()> {
        let limiter = limiter(Arc::new(MemoryCounterStore::new()), RateLimitConfig::new(1, 60))?;
        let now = at(WINDOW_START)?;
        let account = RateLimitKey::Account(Uuid::new_v4());
        let address = RateLimitKey::Ip("198.51.100.1".parse()?);

        assert!(limiter.check_and_consume_at(&account, now).await?.is_allowed());
        assert!(limiter.check_and_consume_at(&address, now).await?.is_allowed());
        assert!(!limiter.check_and_consume_at(&account, now).await?.is_allowed());

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_burst_admits_exactly_the_limit() -> anyhow::Result<()> {
        let limiter = limiter(Arc::new(MemoryCounterStore::new()), RateLimitConfig::new(5, 60))?;
        let key = RateLimitKey::Ip("192.0.2.10".parse()?);
        let now = at(WINDOW_START + 1)?;

        let tasks: Vec<_> = (0..40)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.check_and_consume_at(&key, now).await })
            })
            .collect();

        let mut allowed = 0;
        for task in tasks {
            if task.await??.is_allowed() {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 5);
        Ok(())
    }

    #[tokio::test]
    async fn fail_closed_rejects() -> anyhow::Result<()> {
        let limiter = limiter(Arc::new(FailingStore), RateLimitConfig::new(5, 60))?;
        let key = RateLimitKey::Ip("192.0.2.1".parse()?);

        assert!(limiter.check_and_consume(&key).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn fail_open_admits() -> anyhow::Result<()> {
        let config = RateLimitConfig::new(5, 60).with_failure_policy(FailurePolicy::Open);
        let limiter = limiter(Arc::new(FailingStore), config)?;
        let key = RateLimitKey::Ip("192.0.2.1".parse()?);

        assert!(limiter.check_and_consume(&key).await?.is_allowed());
        Ok(())
    }

    #[tokio::test]
    async fn stalled_store_times_out() -> anyhow::Result<()> {
        let limiter = limiter(Arc::new(StalledStore), RateLimitConfig::new(5, 60))?;
        let key = RateLimitKey::Ip("192.0.2.1".parse()?);

        let result = limiter.check_and_consume(&key).await;
        assert!(matches!(result, Err(RateLimitError(CounterError::Timeout(_)))));
        Ok(())
    }

    #[test]
    fn key_format() -> anyhow::Result<()> {
        let id = Uuid::nil();
        assert_eq!(
            RateLimitKey::Account(id).to_string(),
            "account:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(RateLimitKey::Ip("10.0.0.1".parse()?).to_string(), "ip:10.0.0.1");
        Ok(())
    }

    #[test]
    fn config_validation() {
        assert!(RateLimitConfig::new(0, 60).validate().is_err());
        assert!(RateLimitConfig::new(5, 0).validate().is_err());
        assert!(RateLimitConfig::default().validate().is_ok());
    }
}
