use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// JSON body of every error response.
///
/// `name` is a stable machine-readable identifier, `message` is safe to show
/// to end users. Storage and library error text never reaches this type.
#[must_use = "error responses do nothing unless serialized"]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse<'a> {
    /// The error name/type identifier.
    pub name: Cow<'a, str>,
    /// User-friendly error message safe for client display.
    pub message: Cow<'a, str>,
    /// The resource that the error relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Cow<'a, str>>,
    /// Additional detail about what went wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Cow<'a, str>>,
    /// HTTP status code (not serialized in JSON).
    #[serde(skip)]
    pub status: StatusCode,
}

impl<'a> ErrorResponse<'a> {
    // 4xx Client Errors
    pub const BAD_REQUEST: Self = Self::new(
        "bad_request",
        "The request could not be processed due to invalid data",
        StatusCode::BAD_REQUEST,
    );
    pub const CONFLICT: Self = Self::new(
        "conflict",
        "The request conflicts with the current state of the resource",
        StatusCode::CONFLICT,
    );
    pub const FORBIDDEN: Self = Self::new(
        "forbidden",
        "You don't have permission to access this resource",
        StatusCode::FORBIDDEN,
    );
    pub const MALFORMED_AUTH_TOKEN: Self = Self::new(
        "malformed_auth_token",
        "The authentication token format is invalid",
        StatusCode::UNAUTHORIZED,
    );
    pub const MISSING_AUTH_TOKEN: Self = Self::new(
        "missing_auth_token",
        "Authentication is required to access this resource",
        StatusCode::UNAUTHORIZED,
    );
    pub const NOT_FOUND: Self = Self::new(
        "not_found",
        "The requested resource was not found",
        StatusCode::NOT_FOUND,
    );
    pub const TOO_MANY_REQUESTS: Self = Self::new(
        "too_many_requests",
        "Too many requests. Please slow down and try again later",
        StatusCode::TOO_MANY_REQUESTS,
    );
    pub const UNAUTHORIZED: Self = Self::new(
        "unauthorized",
        "Invalid or expired authentication credentials",
        StatusCode::UNAUTHORIZED,
    );
    // 5xx Server Errors
    pub const INTERNAL_SERVER_ERROR: Self = Self::new(
        "internal_server_error",
        "An internal server error occurred. Please try again later",
        StatusCode::INTERNAL_SERVER_ERROR,
    );

    /// Creates a new error response.
    #[inline]
    pub const fn new(name: &'a str, message: &'a str, status: StatusCode) -> Self {
        Self {
            name: Cow::Borrowed(name),
            message: Cow::Borrowed(message),
            resource: None,
            context: None,
            status,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<Cow<'a, str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Replaces the default message with a specific one.
    pub fn with_message(mut self, message: impl Into<Cow<'a, str>>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<Cow<'a, str>>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl IntoResponse for ErrorResponse<'_> {
    #[inline]
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_overrides_without_status() -> anyhow::Result<()> {
        let response = ErrorResponse::CONFLICT
            .with_resource("account")
            .with_message("User with this email already exists");

        let json = serde_json::to_value(&response)?;
        assert_eq!(json["name"], "conflict");
        assert_eq!(json["message"], "User with this email already exists");
        assert_eq!(json["resource"], "account");
        assert!(json.get("context").is_none());
        assert!(json.get("status").is_none());

        Ok(())
    }

    #[test]
    fn rate_limit_body_carries_context() -> anyhow::Result<()> {
        let response = ErrorResponse::TOO_MANY_REQUESTS
            .with_message("Rate limit exceeded")
            .with_context("Maximum 100 requests per window allowed");

        let json = serde_json::to_value(&response)?;
        assert_eq!(json["name"], "too_many_requests");
        assert_eq!(json["context"], "Maximum 100 requests per window allowed");
        assert!(json.get("resource").is_none());

        Ok(())
    }
}
