//! NATS client wrapper.
//!
//! The underlying `async-nats` client multiplexes every operation over one
//! TCP connection and reconnects on its own; cloning [`NatsClient`] shares it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_nats::{Client, ConnectOptions, jetstream};
use tokio::time::timeout;

use super::nats_config::NatsConfig;
use crate::kv::{KvBucket, KvCounter};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Cheaply cloneable NATS connection with a JetStream context.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<NatsClientInner>,
}

#[derive(Debug)]
struct NatsClientInner {
    client: Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Connects within the configured timeout.
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            servers = ?config.servers(),
            client_name = %config.nats_client_name,
            "connecting to NATS"
        );

        let mut connect_opts = ConnectOptions::new()
            .name(&config.nats_client_name)
            .ping_interval(config.ping_interval())
            .connection_timeout(config.connect_timeout())
            .reconnect_delay_callback(NatsConfig::reconnect_delay);

        if let Some(token) = &config.nats_token {
            connect_opts = connect_opts.token(token.clone());
        }

        let connect_timeout = config.connect_timeout();
        let client = timeout(
            connect_timeout,
            async_nats::connect_with_options(config.nats_url.as_str(), connect_opts),
        )
        .await
        .map_err(|_| Error::timeout(connect_timeout))?
        .map_err(|err| Error::Connection(Box::new(err)))?;

        let jetstream = jetstream::new(client.clone());

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_host = %server_info.host,
            server_version = %server_info.version,
            "connected to NATS"
        );

        Ok(Self {
            inner: Arc::new(NatsClientInner {
                client,
                jetstream,
                config,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &NatsConfig {
        &self.inner.config
    }

    /// Round-trips to the server, returning the latency.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();

        timeout(PING_TIMEOUT, self.inner.client.flush())
            .await
            .map_err(|_| Error::timeout(PING_TIMEOUT))?
            .map_err(|err| Error::Connection(Box::new(err)))?;

        let elapsed = start.elapsed();
        tracing::trace!(
            target: TRACING_TARGET_CLIENT,
            duration_ms = elapsed.as_millis(),
            "NATS ping successful"
        );
        Ok(elapsed)
    }

    /// Returns whether the connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.inner.client.connection_state(),
            async_nats::connection::State::Connected
        )
    }

    /// Opens (or creates) the counter bucket `B`, whose entries expire after `ttl`.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn kv_counter<B: KvBucket>(&self, ttl: Duration) -> Result<KvCounter> {
        KvCounter::new::<B>(&self.inner.jetstream, ttl).await
    }
}
