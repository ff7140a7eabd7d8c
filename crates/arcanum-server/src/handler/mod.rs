//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use arcanum_server::handler::routes;
//! use arcanum_server::middleware::{RouterObservabilityExt, RouterRecoveryExt};
//! use arcanum_server::service::{ServiceConfig, ServiceState};
//!
//! let state = ServiceState::from_config(&config).await?;
//! let router = routes(state)
//!     .with_observability()
//!     .with_default_recovery();
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod authentication;
mod error;
mod monitors;
pub mod request;
pub mod response;
mod users;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
use crate::middleware::rate_limit;
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with every route, bound to the given state.
///
/// Every route except `/health` is rate limited before any authentication.
/// The router expects an `axum_client_ip::ClientIpSource` extension, see
/// [`RouterClientIpExt`](crate::middleware::RouterClientIpExt).
pub fn routes(state: ServiceState) -> Router {
    Router::new()
        .merge(authentication::routes(state.clone()))
        .merge(users::routes(state.clone()))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
        .merge(monitors::routes())
        .fallback(fallback)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::Extension;
    use axum::extract::ConnectInfo;
    use axum_test::TestServer;
    use serde_json::json;

    use super::response::AuthTokens;
    use super::routes;
    use crate::middleware::{ClientIpConfig, RouterClientIpExt, RouterRecoveryExt};
    use crate::service::counter::{CounterError, CounterStore, MemoryCounterStore};
    use crate::service::store::MemoryStore;
    use crate::service::{RateLimitConfig, ServiceState};

    pub const PASSWORD: &str = "correct horse battery";

    /// Test server over in-memory stores, with the store kept for inspection.
    pub struct TestApp {
        pub server: TestServer,
        pub store: MemoryStore,
    }

    /// Returns a [`TestApp`] with a limit high enough never to trigger.
    pub fn create_test_app() -> anyhow::Result<TestApp> {
        create_test_app_with_rate_limit(RateLimitConfig::new(10_000, 60))
    }

    /// Returns a [`TestApp`] with the given rate limit.
    pub fn create_test_app_with_rate_limit(config: RateLimitConfig) -> anyhow::Result<TestApp> {
        create_test_app_with_counters(config, Arc::new(MemoryCounterStore::new()))
    }

    /// Returns a [`TestApp`] whose rate limiter counts in the given store.
    pub fn create_test_app_with_counters(
        config: RateLimitConfig,
        counters: Arc<dyn CounterStore>,
    ) -> anyhow::Result<TestApp> {
        let (state, store) = ServiceState::for_tests_with_counters(&config, counters)?;
        let peer = SocketAddr::from(([203, 0, 113, 7], 40_000));

        let app = routes(state)
            .with_client_ip(&ClientIpConfig::default())
            .layer(Extension(ConnectInfo(peer)))
            .with_default_recovery();

        Ok(TestApp {
            server: TestServer::new(app)?,
            store,
        })
    }

    /// A counter store that never answers successfully.
    pub struct UnreachableCounterStore;

    #[async_trait]
    impl CounterStore for UnreachableCounterStore {
        async fn increment(&self, _: &str, _: Duration) -> Result<u64, CounterError> {
            Err(CounterError::Unavailable("connection refused".into()))
        }

        async fn ping(&self) -> Result<(), CounterError> {
            Err(CounterError::Unavailable("connection refused".into()))
        }
    }

    /// Registers an account and returns the issued tokens.
    pub async fn register(server: &TestServer, email: &str) -> AuthTokens {
        server
            .post("/auth/register")
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "name": "Test Account",
            }))
            .await
            .json::<AuthTokens>()
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() -> anyhow::Result<()> {
        let app = create_test_app()?;

        let response = app.server.get("/does/not/exist").await;
        response.assert_status_not_found();

        let body: serde_json::Value = response.json();
        assert_eq!(body["name"], "not_found");
        Ok(())
    }
}
