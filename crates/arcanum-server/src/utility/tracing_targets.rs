//! Centralized tracing target constants for structured logging.
//!
//! Every `tracing` call in the crate names one of these targets, so output
//! can be filtered per subsystem (`RUST_LOG=arcanum_server::rate_limiter=debug`).

/// Access-token extraction and verification at the request boundary.
pub const TRACING_TARGET_AUTHENTICATION: &str = "arcanum_server::authentication";

/// Entitlement checks such as the premium gate.
pub const TRACING_TARGET_AUTHORIZATION: &str = "arcanum_server::authorization";

/// Register, login, refresh and logout orchestration.
pub const TRACING_TARGET_GATEWAY: &str = "arcanum_server::gateway";

/// Password hashing and verification operations.
pub const TRACING_TARGET_PASSWORD_HASHER: &str = "arcanum_server::password_hasher";

/// Token minting and verification.
pub const TRACING_TARGET_TOKEN_ISSUER: &str = "arcanum_server::token_issuer";

/// Fixed-window rate limiting and counter store access.
pub const TRACING_TARGET_RATE_LIMITER: &str = "arcanum_server::rate_limiter";

/// Account and session store operations.
pub const TRACING_TARGET_STORE: &str = "arcanum_server::store";

/// Background purge of expired refresh sessions.
pub const TRACING_TARGET_SESSION_SWEEPER: &str = "arcanum_server::session_sweeper";

/// Dependency health checks.
pub const TRACING_TARGET_HEALTH: &str = "arcanum_server::health";

/// Error recovery including middleware errors and request failures.
pub const TRACING_TARGET_RECOVERY_ERROR: &str = "arcanum_server::recovery::error";

/// Panic recovery including handler panics.
pub const TRACING_TARGET_RECOVERY_PANIC: &str = "arcanum_server::recovery::panic";

/// Service construction and external connections.
pub const TRACING_TARGET_SERVICE: &str = "arcanum_server::service";
