//! Conversion of core authentication failures into HTTP errors.

use super::http_error::{Error as HttpError, ErrorKind};
use crate::TRACING_TARGET_AUTHENTICATION;
use crate::service::AuthError;

impl From<AuthError> for HttpError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Validation(message) => ErrorKind::BadRequest.with_message(message),
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::Expired => {
                ErrorKind::Unauthorized.with_message(error.to_string())
            }
            AuthError::Forbidden(message) => ErrorKind::Forbidden.with_message(message),
            AuthError::Conflict(message) => ErrorKind::Conflict.with_message(message),
            AuthError::NotFound(message) => ErrorKind::NotFound.with_message(message),
            AuthError::RateLimited {
                limit,
                retry_after_secs,
            } => ErrorKind::TooManyRequests
                .with_message(error.to_string())
                .with_context(format!("Maximum {limit} requests per window allowed"))
                .with_retry_after(retry_after_secs),
            AuthError::Internal(message) => {
                tracing::error!(
                    target: TRACING_TARGET_AUTHENTICATION,
                    error = %message,
                    "request failed on an internal error"
                );
                ErrorKind::InternalServerError.into_error()
            }
        }
    }
}
