use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use deadpool::managed::{Hook, Pool};
use derive_more::{Deref, DerefMut};
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
use diesel_async::scoped_futures::ScopedBoxFuture;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::custom_hooks;
use crate::{
    ConnectionPool, PgConfig, PgError, PgResult, PooledConnection, TRACING_TARGET_CLIENT,
    TRACING_TARGET_CONNECTION,
};

/// Snapshot of the connection pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgPoolStatus {
    /// Maximum number of connections in the pool.
    pub max_size: usize,
    /// Current number of connections in the pool.
    pub size: usize,
    /// Number of idle connections ready for use.
    pub available: usize,
    /// Number of tasks waiting for a connection.
    pub waiting: usize,
}

impl PgPoolStatus {
    /// Returns the fraction of the pool currently checked out (0.0 to 1.0).
    #[inline]
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            return 0.0;
        }

        self.size.saturating_sub(self.available) as f64 / self.max_size as f64
    }

    /// Returns whether callers are queueing or the pool is nearly saturated.
    #[inline]
    pub fn is_under_pressure(&self) -> bool {
        self.waiting > 0 || self.utilization() > 0.8
    }
}

/// Pooled PostgreSQL client shared by every request handler.
///
/// Cloning is cheap: all clones share one pool.
#[derive(Clone)]
pub struct PgClient {
    inner: Arc<PgClientInner>,
}

struct PgClientInner {
    pool: ConnectionPool,
    config: PgConfig,
}

impl PgClient {
    /// Builds the connection pool without touching the database.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Config`] if the configuration is invalid and
    /// [`PgError::Unexpected`] if the pool cannot be built.
    #[tracing::instrument(
        skip(config),
        target = TRACING_TARGET_CLIENT,
        fields(database_url = %config.database_url_masked())
    )]
    pub fn new(config: PgConfig) -> PgResult<Self> {
        config.validate()?;

        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(custom_hooks::setup_callback);
        let manager =
            AsyncDieselConnectionManager::new_with_config(&config.postgres_url, manager_config);

        let pool = Pool::builder(manager)
            .max_size(config.postgres_max_connections as usize)
            .wait_timeout(Some(config.connection_timeout()))
            .create_timeout(Some(config.connection_timeout()))
            .recycle_timeout(Some(config.idle_timeout()))
            .runtime(deadpool::Runtime::Tokio1)
            .post_create(Hook::sync_fn(custom_hooks::post_create))
            .pre_recycle(Hook::sync_fn(custom_hooks::pre_recycle))
            .post_recycle(Hook::sync_fn(custom_hooks::post_recycle))
            .build()
            .map_err(|err| {
                tracing::error!(
                    target: TRACING_TARGET_CLIENT,
                    error = %err,
                    "failed to build connection pool"
                );
                PgError::Unexpected(format!("failed to build connection pool: {err}").into())
            })?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            max_connections = config.postgres_max_connections,
            "database client initialized"
        );

        Ok(Self {
            inner: Arc::new(PgClientInner { pool, config }),
        })
    }

    /// Builds the pool and verifies that a round trip to the database succeeds.
    pub async fn new_with_test(config: PgConfig) -> PgResult<Self> {
        let this = Self::new(config)?;
        this.ping().await?;
        Ok(this)
    }

    /// Runs `SELECT 1` on a pooled connection.
    pub async fn ping(&self) -> PgResult<()> {
        #[derive(diesel::QueryableByName)]
        struct Check {
            #[diesel(sql_type = diesel::sql_types::Integer)]
            #[allow(dead_code)]
            result: i32,
        }

        let mut conn = self.get_pooled_connection().await?;
        let _: Check = diesel::sql_query("SELECT 1 AS result")
            .get_result(&mut *conn)
            .await
            .map_err(|err| {
                tracing::warn!(
                    target: TRACING_TARGET_CONNECTION,
                    error = %err,
                    "database ping failed"
                );
                PgError::from(err)
            })?;

        Ok(())
    }

    /// Checks out a connection, waiting up to the configured timeout.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn get_connection(&self) -> PgResult<PgConn> {
        let start = Instant::now();
        let conn = self.inner.pool.get().await.map_err(|err| {
            tracing::error!(
                target: TRACING_TARGET_CONNECTION,
                error = %err,
                elapsed = ?start.elapsed(),
                "failed to acquire connection from pool"
            );
            PgError::from(err)
        })?;

        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(100) {
            tracing::warn!(
                target: TRACING_TARGET_CONNECTION,
                elapsed = ?elapsed,
                "connection acquisition took longer than expected"
            );
        }

        Ok(PgConn::new(conn))
    }

    /// Checks out the raw pooled connection, used by the migration runner.
    pub(crate) async fn get_pooled_connection(&self) -> PgResult<PooledConnection> {
        self.inner.pool.get().await.map_err(PgError::from)
    }

    /// Returns current pool statistics.
    #[inline]
    pub fn pool_status(&self) -> PgPoolStatus {
        let status = self.inner.pool.status();
        PgPoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
            waiting: status.waiting,
        }
    }

    /// Returns the configuration the pool was built from.
    #[inline]
    pub fn config(&self) -> &PgConfig {
        &self.inner.config
    }
}

impl fmt::Debug for PgClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.pool_status();
        f.debug_struct("PgClient")
            .field("database_url", &self.inner.config.database_url_masked())
            .field("max_connections", &self.inner.config.postgres_max_connections)
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .field("pool_waiting", &status.waiting)
            .finish()
    }
}

/// A connection checked out of the pool.
///
/// Repository traits in [`crate::query`] are implemented for the underlying
/// [`PgConnection`], reachable through [`Deref`]. Dropping the value returns
/// the connection to the pool.
///
/// ```ignore
/// let mut conn = pg_client.get_connection().await?;
/// let account = conn.find_account_by_email("ada@example.com").await?;
/// ```
///
/// [`PgConnection`]: crate::PgConnection
#[derive(Deref, DerefMut)]
pub struct PgConn {
    #[deref]
    #[deref_mut]
    conn: PooledConnection,
}

impl PgConn {
    /// Wraps a pooled connection.
    pub fn new(conn: PooledConnection) -> Self {
        Self { conn }
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    pub async fn transaction<'a, T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: for<'r> FnOnce(&'r mut PooledConnection) -> ScopedBoxFuture<'a, 'r, Result<T, E>>
            + Send
            + 'a,
        T: Send + 'a,
        E: From<diesel::result::Error> + Send + 'a,
    {
        self.conn.transaction(f).await
    }
}

impl fmt::Debug for PgConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConn").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_status_utilization() {
        let status = PgPoolStatus {
            max_size: 10,
            size: 6,
            available: 2,
            waiting: 0,
        };
        assert!((status.utilization() - 0.4).abs() < f64::EPSILON);
        assert!(!status.is_under_pressure());

        let waiting = PgPoolStatus { waiting: 1, ..status };
        assert!(waiting.is_under_pressure());

        let empty = PgPoolStatus {
            max_size: 0,
            size: 0,
            available: 0,
            waiting: 0,
        };
        assert_eq!(empty.utilization(), 0.0);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = PgConfig::new("postgresql://localhost/arcanum").with_max_connections(64);
        assert!(matches!(PgClient::new(config), Err(PgError::Config(_))));
    }
}
