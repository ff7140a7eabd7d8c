//! Recovery middleware for handler panics, timeouts and layer errors.
//!
//! Whatever goes wrong below this layer, the client still receives the JSON
//! error body every other failure uses.

use std::any::Any;
use std::future::ready;
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::response::{IntoResponse, Response};
#[cfg(any(test, feature = "config"))]
use clap::Args;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::handler::{Error, ErrorKind};
use crate::{TRACING_TARGET_RECOVERY_ERROR, TRACING_TARGET_RECOVERY_PANIC};

type ResponseFut = BoxFuture<'static, Response>;
type Panic = Box<dyn Any + Send + 'static>;

/// Request deadline enforced by the recovery layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct RecoveryConfig {
    /// Seconds a request may run before it is answered with a 500 timeout error.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30)
    )]
    #[serde(default = "RecoveryConfig::default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: Self::default_request_timeout(),
        }
    }
}

impl RecoveryConfig {
    fn default_request_timeout() -> u64 {
        30
    }

    /// Creates a configuration with the given request timeout in seconds.
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            request_timeout: secs,
        }
    }

    /// Returns the request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Extension trait for `axum::`[`Router`] to apply recovery middleware.
pub trait RouterRecoveryExt<S> {
    /// Layers timeout, panic and error recovery with the provided configuration.
    fn with_recovery(self, config: &RecoveryConfig) -> Self;

    /// Layers recovery middleware with the default 30-second timeout.
    fn with_default_recovery(self) -> Self;
}

impl<S> RouterRecoveryExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_recovery(self, config: &RecoveryConfig) -> Self {
        let middlewares = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(CatchPanicLayer::custom(catch_panic))
            .layer(TimeoutLayer::new(config.request_timeout()));

        self.layer(middlewares)
    }

    fn with_default_recovery(self) -> Self {
        self.with_recovery(&RecoveryConfig::default())
    }
}

fn handle_error(err: tower::BoxError) -> ResponseFut {
    use axum_client_ip::Rejection as IpRejection;
    use tower::timeout::error::Elapsed;

    let error = if err.is::<Elapsed>() {
        tracing::error!(
            target: TRACING_TARGET_RECOVERY_ERROR,
            error = %err,
            "request timeout exceeded"
        );

        ErrorKind::InternalServerError
            .with_message("Request timeout")
            .with_context("The request took too long to process and was terminated")
    } else if err.is::<IpRejection>() {
        tracing::error!(
            target: TRACING_TARGET_RECOVERY_ERROR,
            error = %err,
            "failed to extract client IP address"
        );

        ErrorKind::InternalServerError
            .with_message("IP address extraction failed")
            .with_context("Could not determine client IP address")
    } else {
        tracing::error!(
            target: TRACING_TARGET_RECOVERY_ERROR,
            error = %err,
            "unknown middleware error"
        );

        ErrorKind::InternalServerError.with_message("An unexpected error occurred")
    };

    ready(error.into_response()).boxed()
}

fn catch_panic(err: Panic) -> Response {
    if let Some(error) = err.downcast_ref::<Error>() {
        tracing::error!(
            target: TRACING_TARGET_RECOVERY_PANIC,
            error = %error,
            "service panic"
        );
        return error.clone().into_response();
    }

    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type");

    tracing::error!(
        target: TRACING_TARGET_RECOVERY_PANIC,
        message = %message,
        "service panic"
    );

    ErrorKind::InternalServerError
        .with_message("An unexpected panic occurred")
        .into_response()
}
