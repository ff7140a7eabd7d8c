//! Service construction errors.
//!
//! These errors surface while the process starts up: invalid configuration,
//! unreachable Postgres or NATS, failed migrations. Request-time failures use
//! [`AuthError`] and the HTTP [`handler::Error`] instead.
//!
//! [`AuthError`]: crate::service::AuthError
//! [`handler::Error`]: crate::handler::Error

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for service layer operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kind enumeration for categorizing service layer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Configuration-related errors.
    Config,
    /// External service communication errors.
    External,
    /// Internal service logic errors.
    Internal,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::External => "external_service",
            Self::Internal => "internal_service",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service layer error with a kind, a message and an optional source.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    #[inline]
    fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches a source error to this error.
    #[inline]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creates a new configuration error.
    #[inline]
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Creates a new external service error.
    #[inline]
    pub fn external(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let full_message = format!("{}: {}", service.into(), message.into());
        Self::new(ErrorKind::External, full_message)
    }

    /// Creates a new internal service error.
    #[inline]
    pub fn internal(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let full_message = format!("{}: {}", service.into(), message.into());
        Self::new(ErrorKind::Internal, full_message)
    }
}

impl From<arcanum_nats::Error> for Error {
    fn from(err: arcanum_nats::Error) -> Self {
        Error::external("nats", err.to_string()).with_source(err)
    }
}

impl From<arcanum_postgres::PgError> for Error {
    fn from(err: arcanum_postgres::PgError) -> Self {
        Error::external("postgres", err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_creation() {
        let error = Error::config("invalid configuration");
        assert_eq!(error.kind(), ErrorKind::Config);
        assert_eq!(error.message(), "invalid configuration");
    }

    #[test]
    fn error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = Error::external("postgres", "cannot connect").with_source(source);

        assert!(StdError::source(&error).is_some());
        assert_eq!(error.kind(), ErrorKind::External);
        assert!(error.to_string().contains("postgres: cannot connect"));
    }

    #[test]
    fn nats_error_is_external() {
        let error: Error = arcanum_nats::Error::invalid_config("empty url").into();
        assert_eq!(error.kind(), ErrorKind::External);
        assert!(error.to_string().contains("nats"));
    }

    #[test]
    fn error_kind_as_str() {
        assert_eq!(ErrorKind::Config.as_str(), "config");
        assert_eq!(ErrorKind::External.as_str(), "external_service");
        assert_eq!(ErrorKind::Internal.as_str(), "internal_service");
    }
}
