//! Application state and dependency injection.

mod config;
pub mod counter;
mod gateway;
mod health;
pub mod security;
mod session_sweeper;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

pub use crate::service::config::{ServiceConfig, ServiceConfigSummary};
use crate::service::counter::{CounterStore, MemoryCounterStore};
pub use crate::service::gateway::{
    AuthError, AuthGateway, AuthResult, AuthSession, MIN_PASSWORD_BYTES, authorize_premium,
};
pub use crate::service::health::{HealthCheck, HealthReport};
pub use crate::service::security::{
    Claims, FailurePolicy, PasswordHasher, RateLimitConfig, RateLimiter, TokenConfig, TokenIssuer,
};
pub use crate::service::session_sweeper::SessionSweeper;
use crate::service::store::{AccountStore, MemoryStore, PgStore, SessionStore};
pub use crate::{Error, Result};
use crate::TRACING_TARGET_SERVICE;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection). Everything in
/// here is immutable after construction and cheap to clone.
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    pub gateway: AuthGateway,
    pub token_issuer: TokenIssuer,
    pub rate_limiter: RateLimiter,
    pub health: HealthCheck,
}

/// Collaborators shared by the services in [`ServiceState`].
struct Backends {
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
    counters: Arc<dyn CounterStore>,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Validates the configuration, connects to Postgres (applying
    /// migrations) and NATS, and opens the rate-limit bucket.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let postgres = config.connect_postgres().await?;
        let nats = config.connect_nats().await?;
        let counters = config.open_counter_store(nats).await?;

        let store = Arc::new(PgStore::new(postgres));
        let backends = Backends {
            accounts: store.clone(),
            sessions: store,
            counters,
        };

        Self::assemble(
            backends,
            production_hasher()?,
            &config.token_config,
            &config.rate_limit_config,
            config.store_timeout(),
        )
    }

    /// Initializes state backed entirely by process memory.
    ///
    /// Nothing is shared between instances or survives a restart; meant for
    /// local development and tests.
    pub fn in_memory(
        token_config: &TokenConfig,
        rate_limit_config: &RateLimitConfig,
    ) -> Result<Self> {
        tracing::warn!(
            target: TRACING_TARGET_SERVICE,
            "using in-memory stores, state is not persisted"
        );

        let store = Arc::new(MemoryStore::new());
        let backends = Backends {
            accounts: store.clone(),
            sessions: store,
            counters: Arc::new(MemoryCounterStore::new()),
        };

        Self::assemble(
            backends,
            production_hasher()?,
            token_config,
            rate_limit_config,
            Duration::from_secs(5),
        )
    }

    /// In-memory state with a cheap hasher, returning the store for inspection.
    #[cfg(test)]
    pub(crate) fn for_tests(rate_limit_config: &RateLimitConfig) -> Result<(Self, MemoryStore)> {
        Self::for_tests_with_counters(rate_limit_config, Arc::new(MemoryCounterStore::new()))
    }

    /// Like [`for_tests`](Self::for_tests), over the given counter store.
    #[cfg(test)]
    pub(crate) fn for_tests_with_counters(
        rate_limit_config: &RateLimitConfig,
        counters: Arc<dyn CounterStore>,
    ) -> Result<(Self, MemoryStore)> {
        let store = MemoryStore::new();
        let backends = Backends {
            accounts: Arc::new(store.clone()),
            sessions: Arc::new(store.clone()),
            counters,
        };

        let token_config = TokenConfig::new(
            "access-secret-for-tests-0123456789abcdef",
            "refresh-secret-for-tests-0123456789abcdef",
        );

        let state = Self::assemble(
            backends,
            PasswordHasher::with_cost(4).map_err(hasher_error)?,
            &token_config,
            rate_limit_config,
            Duration::from_secs(5),
        )?;

        Ok((state, store))
    }

    fn assemble(
        backends: Backends,
        hasher: PasswordHasher,
        token_config: &TokenConfig,
        rate_limit_config: &RateLimitConfig,
        store_timeout: Duration,
    ) -> Result<Self> {
        let token_issuer = TokenIssuer::new(token_config)?;
        let rate_limiter =
            RateLimiter::new(backends.counters.clone(), rate_limit_config, store_timeout)?;
        let health = HealthCheck::new(
            backends.accounts.clone(),
            backends.counters,
            store_timeout,
        );
        let gateway = AuthGateway::new(
            backends.accounts,
            backends.sessions,
            hasher,
            token_issuer.clone(),
            store_timeout,
        );

        Ok(Self {
            gateway,
            token_issuer,
            rate_limiter,
            health,
        })
    }
}

fn production_hasher() -> Result<PasswordHasher> {
    PasswordHasher::new().map_err(hasher_error)
}

fn hasher_error(error: security::HashingError) -> Error {
    Error::internal("password hasher", error.to_string()).with_source(error)
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(gateway: AuthGateway);
impl_di!(token_issuer: TokenIssuer);
impl_di!(rate_limiter: RateLimiter);
impl_di!(health: HealthCheck);
