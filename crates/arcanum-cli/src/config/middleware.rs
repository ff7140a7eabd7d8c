//! Middleware configuration for the HTTP server.
//!
//! ```bash
//! # Allow slower requests and trust the proxy's X-Real-Ip header
//! arcanum --request-timeout 60 --client-ip-source x-real-ip
//! ```

use anyhow::{Result as AnyhowResult, anyhow};
use arcanum_server::middleware::{ClientIpConfig, RecoveryConfig};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Request recovery and client address settings.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request timeout and panic recovery.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,

    /// Where client addresses come from for anonymous rate limiting.
    #[clap(flatten)]
    pub client_ip: ClientIpConfig,
}

impl MiddlewareConfig {
    /// Checks the request timeout range (1-300 seconds).
    pub fn validate(&self) -> AnyhowResult<()> {
        let timeout = self.recovery.request_timeout;
        if timeout == 0 || timeout > 300 {
            return Err(anyhow!(
                "Request timeout {timeout} seconds is invalid. Must be between 1 and 300 seconds."
            ));
        }

        Ok(())
    }

    /// Logs middleware configuration at info level.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            request_timeout_secs = self.recovery.request_timeout,
            client_ip_source = %self.client_ip.client_ip_source,
            "middleware configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_timeout_bounds() {
        let mut config = MiddlewareConfig::default();
        assert!(config.validate().is_ok());

        config.recovery = RecoveryConfig::with_timeout_secs(0);
        assert!(config.validate().is_err());

        config.recovery = RecoveryConfig::with_timeout_secs(301);
        assert!(config.validate().is_err());
    }
}
