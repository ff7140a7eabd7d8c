//! The HTTP-facing error: a status-selecting kind plus optional body overrides.

use std::borrow::Cow;
use std::fmt;

use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};

use crate::handler::response::ErrorResponse;

/// Error returned by handlers, extractors and middleware.
///
/// The [`ErrorKind`] picks the status and the default body; `message`,
/// `context` and `resource` replace parts of it. `retry_after` is sent as
/// the `Retry-After` header.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless turned into a response"]
pub struct Error {
    kind: ErrorKind,
    message: Option<Cow<'static, str>>,
    context: Option<Cow<'static, str>>,
    resource: Option<Cow<'static, str>>,
    retry_after: Option<u64>,
}

impl Error {
    /// Replaces the default user-facing message.
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds detail about what went wrong.
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Names the resource the error relates to.
    pub fn with_resource(mut self, resource: impl Into<Cow<'static, str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Tells the client how many seconds to wait before retrying.
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[inline]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.kind.response();
        let message = self.message.as_deref().unwrap_or(&body.message);
        write!(f, "{} ({}): {message}", body.name, body.status)?;

        if let Some(context) = &self.context {
            write!(f, " - {context}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let mut body = self.kind.response();
        if let Some(message) = self.message {
            body = body.with_message(message);
        }
        if let Some(resource) = self.resource {
            body = body.with_resource(resource);
        }
        if let Some(context) = self.context {
            body = body.with_context(context);
        }

        let mut response = body.into_response();
        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }

        response
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            context: None,
            resource: None,
            retry_after: None,
        }
    }
}

/// Result of an HTTP handler.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Response categories the server produces.
#[must_use = "error kinds do nothing unless turned into errors"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    /// No bearer token was presented.
    MissingAuthToken,
    /// The `Authorization` header or the token itself is unparsable.
    MalformedAuthToken,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    TooManyRequests,
    InternalServerError,
}

impl ErrorKind {
    #[inline]
    pub fn into_error(self) -> Error {
        Error::from(self)
    }

    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Error {
        self.into_error().with_message(message)
    }

    #[inline]
    pub fn with_context(self, context: impl Into<Cow<'static, str>>) -> Error {
        self.into_error().with_context(context)
    }

    #[inline]
    pub fn with_resource(self, resource: impl Into<Cow<'static, str>>) -> Error {
        self.into_error().with_resource(resource)
    }

    /// Default body and status of this kind.
    pub fn response(self) -> ErrorResponse<'static> {
        match self {
            Self::BadRequest => ErrorResponse::BAD_REQUEST,
            Self::MissingAuthToken => ErrorResponse::MISSING_AUTH_TOKEN,
            Self::MalformedAuthToken => ErrorResponse::MALFORMED_AUTH_TOKEN,
            Self::Unauthorized => ErrorResponse::UNAUTHORIZED,
            Self::Forbidden => ErrorResponse::FORBIDDEN,
            Self::NotFound => ErrorResponse::NOT_FOUND,
            Self::Conflict => ErrorResponse::CONFLICT,
            Self::TooManyRequests => ErrorResponse::TOO_MANY_REQUESTS,
            Self::InternalServerError => ErrorResponse::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorKind {
    #[inline]
    fn into_response(self) -> Response {
        self.response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn overrides_replace_default_body() {
        let error = ErrorKind::NotFound
            .with_message("User not found")
            .with_context("ID: 123");

        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.message(), Some("User not found"));
        assert_eq!(error.context(), Some("ID: 123"));

        let display = error.to_string();
        assert!(display.starts_with("not_found (404 Not Found): User not found"));
        assert!(display.ends_with(" - ID: 123"));
    }

    #[test]
    fn retry_after_sets_header() {
        let response = ErrorKind::TooManyRequests
            .with_message("Rate limit exceeded")
            .with_retry_after(42)
            .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from_static("42"))
        );
    }

    #[test]
    fn no_retry_after_header_by_default() {
        let response = ErrorKind::Unauthorized.into_error().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
