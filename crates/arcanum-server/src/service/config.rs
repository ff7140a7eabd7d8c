use std::sync::Arc;
use std::time::Duration;

use arcanum_nats::{NatsClient, NatsConfig};
use arcanum_postgres::{PgClient, PgClientMigrationExt, PgConfig};
#[cfg(any(test, feature = "config"))]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::service::counter::NatsCounterStore;
use crate::service::security::{RateLimitConfig, TokenConfig};
use crate::{Error, Result, TRACING_TARGET_SERVICE};

/// Default deadline for a single store call.
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Default pause between expired-session purges.
const DEFAULT_SESSION_PURGE_INTERVAL_SECS: u64 = 3_600;

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Postgres connection and pool settings.
    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    pub postgres_config: PgConfig,

    /// NATS connection settings.
    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    pub nats_config: NatsConfig,

    /// Token secrets and lifetimes.
    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    pub token_config: TokenConfig,

    /// Rate limit ceiling, window and failure policy.
    #[cfg_attr(any(test, feature = "config"), command(flatten))]
    pub rate_limit_config: RateLimitConfig,

    /// Deadline in milliseconds for each store call.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "STORE_TIMEOUT_MS", default_value_t = DEFAULT_STORE_TIMEOUT_MS)
    )]
    #[serde(default = "ServiceConfig::default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Seconds between purges of expired refresh sessions.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            long,
            env = "SESSION_PURGE_INTERVAL_SECS",
            default_value_t = DEFAULT_SESSION_PURGE_INTERVAL_SECS
        )
    )]
    #[serde(default = "ServiceConfig::default_session_purge_interval_secs")]
    pub session_purge_interval_secs: u64,
}

/// Serializable view without secrets, for startup logs.
#[derive(Debug, Serialize)]
pub struct ServiceConfigSummary<'a> {
    pub database_url: String,
    pub nats_url: &'a str,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub store_timeout_ms: u64,
    pub session_purge_interval_secs: u64,
}

impl ServiceConfig {
    fn default_store_timeout_ms() -> u64 {
        DEFAULT_STORE_TIMEOUT_MS
    }

    fn default_session_purge_interval_secs() -> u64 {
        DEFAULT_SESSION_PURGE_INTERVAL_SECS
    }

    /// Creates a configuration from its parts with the default store deadline.
    pub fn new(
        postgres_config: PgConfig,
        nats_config: NatsConfig,
        token_config: TokenConfig,
        rate_limit_config: RateLimitConfig,
    ) -> Self {
        Self {
            postgres_config,
            nats_config,
            token_config,
            rate_limit_config,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            session_purge_interval_secs: DEFAULT_SESSION_PURGE_INTERVAL_SECS,
        }
    }

    /// Deadline applied to every store call.
    #[inline]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Pause between expired-session purges.
    #[inline]
    pub fn session_purge_interval(&self) -> Duration {
        Duration::from_secs(self.session_purge_interval_secs)
    }

    /// Validates every section once, before anything connects.
    pub fn validate(&self) -> Result<()> {
        self.postgres_config
            .validate()
            .map_err(|e| Error::config("invalid postgres configuration").with_source(e))?;
        self.nats_config
            .validate()
            .map_err(|e| Error::config("invalid nats configuration").with_source(e))?;
        self.token_config.validate()?;
        self.rate_limit_config.validate()?;

        if self.store_timeout_ms == 0 {
            return Err(Error::config("STORE_TIMEOUT_MS must be greater than 0"));
        }

        if self.session_purge_interval_secs == 0 {
            return Err(Error::config(
                "SESSION_PURGE_INTERVAL_SECS must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Returns a secret-free summary for logging.
    pub fn summary(&self) -> ServiceConfigSummary<'_> {
        ServiceConfigSummary {
            database_url: self.postgres_config.database_url_masked(),
            nats_url: &self.nats_config.nats_url,
            access_ttl_secs: self.token_config.jwt_expiration_secs,
            refresh_ttl_secs: self.token_config.refresh_token_expiration_secs,
            rate_limit_requests: self.rate_limit_config.rate_limit_requests,
            rate_limit_window_secs: self.rate_limit_config.rate_limit_window_secs,
            store_timeout_ms: self.store_timeout_ms,
            session_purge_interval_secs: self.session_purge_interval_secs,
        }
    }

    /// Connects to Postgres and applies pending migrations.
    pub async fn connect_postgres(&self) -> Result<PgClient> {
        let pg_client = PgClient::new(self.postgres_config.clone()).map_err(|e| {
            Error::external("postgres", "failed to create database client").with_source(e)
        })?;

        let migrations = pg_client.run_pending_migrations().await.map_err(|e| {
            Error::external("postgres", "failed to apply database migrations").with_source(e)
        })?;

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            applied = migrations.applied_any(),
            "database ready"
        );

        Ok(pg_client)
    }

    /// Connects to NATS.
    pub async fn connect_nats(&self) -> Result<NatsClient> {
        NatsClient::connect(self.nats_config.clone())
            .await
            .map_err(|e| Error::external("nats", "failed to connect to nats").with_source(e))
    }

    /// Opens the shared rate-limit counter bucket.
    pub async fn open_counter_store(&self, nats: NatsClient) -> Result<Arc<NatsCounterStore>> {
        let store = NatsCounterStore::new(nats, self.rate_limit_config.window())
            .await
            .map_err(|e| {
                Error::external("nats", "failed to open rate limit bucket").with_source(e)
            })?;

        Ok(Arc::new(store))
    }
}
