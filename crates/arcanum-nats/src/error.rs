//! Error types for NATS operations.

use std::time::Duration;

/// Result type for all NATS operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for NATS operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client or connection failure.
    #[error("NATS connection error: {0}")]
    Connection(#[from] async_nats::Error),

    /// The operation did not complete in time.
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Every compare-and-swap attempt lost to a concurrent writer.
    #[error("Counter '{key}' is contended: gave up after {attempts} attempts")]
    KvContention { key: String, attempts: u32 },

    /// A stored value could not be interpreted.
    #[error("Corrupt value for key '{key}' in bucket '{bucket}'")]
    KvCorruptValue { bucket: String, key: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A JetStream operation failed.
    #[error("NATS operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Creates an operation error with context.
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Creates a timeout error with the given duration.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Returns whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Timeout { .. } | Error::KvContention { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Error::timeout(Duration::from_secs(1)).is_transient());
        assert!(
            Error::KvContention {
                key: "k".to_owned(),
                attempts: 3
            }
            .is_transient()
        );
        assert!(!Error::invalid_config("missing url").is_transient());
        assert!(!Error::operation("kv_create", "denied").is_transient());
    }
}
