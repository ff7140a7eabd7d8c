//! Failure taxonomy of the authentication core.

use std::borrow::Cow;

use crate::TRACING_TARGET_GATEWAY;
use crate::service::store::StoreError;

/// Result type for [`AuthGateway`] operations.
///
/// [`AuthGateway`]: crate::service::AuthGateway
pub type AuthResult<T, E = AuthError> = Result<T, E>;

/// Typed failure surfaced by the authentication core.
///
/// Messages of `Internal` are for logs; the HTTP boundary replaces them with
/// a generic one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Malformed input.
    #[error("{0}")]
    Validation(Cow<'static, str>),

    /// Unknown email or wrong password. The two are deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Bad signature, wrong namespace, or a revoked or unknown session.
    #[error("Invalid or expired refresh token")]
    InvalidToken,

    /// The token or its persisted session has expired.
    #[error("Refresh token has expired")]
    Expired,

    /// Authenticated, but not entitled.
    #[error("{0}")]
    Forbidden(Cow<'static, str>),

    /// A unique key already exists.
    #[error("{0}")]
    Conflict(Cow<'static, str>),

    /// A resource outside the auth flow does not exist.
    #[error("{0}")]
    NotFound(Cow<'static, str>),

    /// The caller exhausted its request budget for the current window.
    #[error("Rate limit exceeded")]
    RateLimited { limit: u32, retry_after_secs: u64 },

    /// A collaborator failed or timed out.
    #[error("{0}")]
    Internal(Cow<'static, str>),
}

impl AuthError {
    #[inline]
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation(message.into())
    }

    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns whether this failure should be reported as a server fault.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { constraint } => {
                tracing::debug!(
                    target: TRACING_TARGET_GATEWAY,
                    constraint = %constraint,
                    "unique constraint violated"
                );
                Self::Conflict("Resource already exists".into())
            }
            StoreError::NotFound => Self::NotFound("Resource not found".into()),
            StoreError::Timeout(elapsed) => {
                tracing::error!(
                    target: TRACING_TARGET_GATEWAY,
                    timeout = ?elapsed,
                    "store operation timed out"
                );
                Self::internal("store operation timed out")
            }
            StoreError::Backend(source) => {
                tracing::error!(
                    target: TRACING_TARGET_GATEWAY,
                    error = %source,
                    "store operation failed"
                );
                Self::internal("store unavailable")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn store_failures_become_internal() {
        let timeout = AuthError::from(StoreError::Timeout(Duration::from_secs(5)));
        assert!(timeout.is_internal());

        let backend = AuthError::from(StoreError::Backend("connection reset".into()));
        assert!(backend.is_internal());
        assert!(!backend.to_string().contains("connection reset"));
    }

    #[test]
    fn conflict_hides_constraint_name() {
        let error = AuthError::from(StoreError::Conflict {
            constraint: "accounts_email_unique".to_owned(),
        });
        assert!(matches!(error, AuthError::Conflict(_)));
        assert!(!error.to_string().contains("accounts_email_unique"));
    }

    #[test]
    fn credentials_message_is_generic() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }
}
