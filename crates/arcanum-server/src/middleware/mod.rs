//! Middleware for `axum::Router` and HTTP request processing.
//!
//! - Authentication and premium entitlement guards
//! - Per-identifier rate limiting for the authentication routes
//! - Observability (tracing, request ids, redacted headers)
//! - Recovery (panics, timeouts, layer errors)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use arcanum_server::middleware::{RouterObservabilityExt, RouterRecoveryExt};
//!
//! let app = routes(state)
//!     .with_observability()
//!     .with_default_recovery();
//! ```

mod auth;
mod client_ip;
mod observability;
mod rate_limiting;
mod recovery;

pub use auth::{require_authentication, require_premium};
pub use client_ip::{ClientIpConfig, IpSource, RouterClientIpExt};
pub use observability::{REQUEST_ID_HEADER, RouterObservabilityExt};
pub use rate_limiting::rate_limit;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
