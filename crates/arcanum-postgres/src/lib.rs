#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Embeds all migrations into the final binary.
pub(crate) const MIGRATIONS: diesel_migrations::EmbeddedMigrations =
    diesel_migrations::embed_migrations!("./migrations");

// Tracing target constants for consistent logging.

/// Tracing target for client-related operations.
pub const TRACING_TARGET_CLIENT: &str = "arcanum_postgres::client";

/// Tracing target for database query operations.
pub const TRACING_TARGET_QUERY: &str = "arcanum_postgres::query";

/// Tracing target for database migration operations.
pub const TRACING_TARGET_MIGRATION: &str = "arcanum_postgres::migration";

/// Tracing target for connection pool operations.
pub const TRACING_TARGET_CONNECTION: &str = "arcanum_postgres::connection";

mod client;
pub mod model;
pub mod query;
mod schema;
pub mod types;

use std::borrow::Cow;

use deadpool::managed::TimeoutType;
use diesel::ConnectionError;
use diesel::result::{DatabaseErrorKind, Error};
pub use diesel_async::AsyncPgConnection as PgConnection;

pub use crate::client::{
    ConnectionPool, MigrationResult, PgClient, PgClientMigrationExt, PgConfig, PgConn,
    PgPoolStatus, PooledConnection, run_pending_migrations,
};
use crate::types::ConstraintViolation;

pub mod error {
    //! Error types and utilities for database operations.
    //!
    //! See [`PgError`] for the main error type used throughout this crate.
    //!
    //! [`PgError`]: crate::PgError

    /// Type-erased error type for dynamic error handling.
    pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

    use std::borrow::Cow;

    pub use deadpool::managed::TimeoutType;
    pub use diesel::result::{
        ConnectionError as DieselConnectionError, DatabaseErrorInformation, DatabaseErrorKind,
        Error as DieselError,
    };
    pub use diesel_async::pooled_connection::PoolError as DieselPoolError;
    pub use diesel_async::pooled_connection::deadpool::PoolError as DeadpoolError;

    /// Provides an actionable hint for an error type.
    pub trait ErrorHint {
        /// Returns an additional hint for an error type.
        fn hint(&self) -> Cow<'static, str>;
    }

    impl ErrorHint for TimeoutType {
        fn hint(&self) -> Cow<'static, str> {
            match self {
                TimeoutType::Wait => Cow::Borrowed(
                    "Connection pool is exhausted, consider increasing pool size",
                ),
                TimeoutType::Create => Cow::Borrowed(
                    "Unable to establish new database connection, check connection string and database availability",
                ),
                TimeoutType::Recycle => Cow::Borrowed(
                    "Failed to recycle database connection, connection may be in invalid state",
                ),
            }
        }
    }
}

/// Error type for all PostgreSQL database operations.
#[derive(Debug, thiserror::Error)]
#[must_use = "database errors should be handled appropriately"]
pub enum PgError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection creation, pool wait or recycle timed out.
    #[error("Database operation timed out")]
    Timeout(TimeoutType),

    /// Failed to establish or maintain a database connection.
    #[error("Database connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Applying schema migrations failed.
    #[error("Database migration error: {0}")]
    Migration(error::BoxError),

    /// Query execution failed, including constraint violations.
    #[error("Database query error: {0}")]
    Query(#[from] Error),

    /// Anything not covered by the other variants.
    #[error("Unexpected error: {0}")]
    Unexpected(Cow<'static, str>),
}

impl PgError {
    /// Returns the name of the violated constraint, if any.
    pub fn constraint(&self) -> Option<&str> {
        let PgError::Query(err) = self else {
            return None;
        };

        let Error::DatabaseError(_, err) = err else {
            return None;
        };

        err.constraint_name()
    }

    /// Returns a structured constraint violation if this error represents a known one.
    pub fn constraint_violation(&self) -> Option<ConstraintViolation> {
        self.constraint().and_then(ConstraintViolation::new)
    }

    /// Returns whether this error is a unique key violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            PgError::Query(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
        )
    }

    /// Returns whether this error indicates a transient failure that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PgError::Timeout(_) | PgError::Connection(ConnectionError::BadConnection(_))
        )
    }
}

impl From<error::DeadpoolError> for PgError {
    fn from(value: error::DeadpoolError) -> Self {
        use error::{DeadpoolError, DieselPoolError};

        match value {
            DeadpoolError::Timeout(timeout) => Self::Timeout(timeout),
            DeadpoolError::Backend(DieselPoolError::QueryError(error)) => Self::Query(error),
            DeadpoolError::Backend(DieselPoolError::ConnectionError(error)) => {
                Self::Connection(error)
            }
            DeadpoolError::PostCreateHook(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_CONNECTION,
                    error = %err,
                    "unexpected post-create hook error"
                );
                Self::Unexpected(err.to_string().into())
            }
            DeadpoolError::NoRuntimeSpecified => {
                tracing::error!(
                    target: TRACING_TARGET_CONNECTION,
                    "no tokio runtime specified for connection pool"
                );
                Self::Unexpected("No runtime specified".into())
            }
            DeadpoolError::Closed => Self::Connection(ConnectionError::InvalidConnectionUrl(
                "Connection pool is closed".into(),
            )),
        }
    }
}

/// Specialized [`Result`] type for database operations.
pub type PgResult<T, E = PgError> = Result<T, E>;
