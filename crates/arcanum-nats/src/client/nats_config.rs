//! NATS connection configuration.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_NAME: &str = "arcanum";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 500;
const MAX_RECONNECT_DELAY_MS: u64 = 30_000;
const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

/// Configuration for the NATS connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct NatsConfig {
    /// NATS server URL (comma-separated for clustering).
    #[cfg_attr(feature = "config", arg(long = "nats-url", env = "NATS_URL"))]
    pub nats_url: String,

    /// Authentication token.
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    pub nats_token: Option<String>,

    /// Client connection name shown in server monitoring.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "nats-client-name",
            env = "NATS_CLIENT_NAME",
            default_value = DEFAULT_NAME
        )
    )]
    pub nats_client_name: String,

    /// Connection timeout in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "nats-connect-timeout-secs",
            env = "NATS_CONNECT_TIMEOUT_SECS",
            default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
        )
    )]
    pub nats_connect_timeout_secs: u64,
}

impl NatsConfig {
    /// Creates a configuration for the given server URL(s).
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            nats_url: server_url.into(),
            nats_token: None,
            nats_client_name: DEFAULT_NAME.to_owned(),
            nats_connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    /// Returns the server URLs (splits comma-separated URLs).
    pub fn servers(&self) -> Vec<&str> {
        self.nats_url.split(',').map(str::trim).collect()
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.nats_connect_timeout_secs)
    }

    #[inline]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(DEFAULT_PING_INTERVAL_SECS)
    }

    /// Exponential reconnect backoff, capped at 30 seconds.
    pub fn reconnect_delay(attempts: usize) -> Duration {
        let exponent = attempts.min(16) as u32;
        let delay = DEFAULT_RECONNECT_DELAY_MS.saturating_mul(2_u64.saturating_pow(exponent));
        Duration::from_millis(delay.min(MAX_RECONNECT_DELAY_MS))
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.nats_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.nats_client_name = name.into();
        self
    }

    #[must_use]
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.nats_connect_timeout_secs = secs;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        for server in self.servers() {
            if server.is_empty() {
                return Err(Error::invalid_config("NATS server URL cannot be empty"));
            }
            if !server.starts_with("nats://") && !server.starts_with("tls://") {
                return Err(Error::invalid_config(format!(
                    "invalid NATS server URL: {server}"
                )));
            }
        }

        if self.nats_token.as_deref().is_some_and(str::is_empty) {
            return Err(Error::invalid_config("NATS token cannot be empty when set"));
        }

        if self.nats_connect_timeout_secs == 0 {
            return Err(Error::invalid_config(
                "NATS connect timeout must be at least 1 second",
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for NatsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatsConfig")
            .field("nats_url", &self.nats_url)
            .field("nats_token", &self.nats_token.as_ref().map(|_| "***"))
            .field("nats_client_name", &self.nats_client_name)
            .field("nats_connect_timeout_secs", &self.nats_connect_timeout_secs)
            .finish()
    }
}
