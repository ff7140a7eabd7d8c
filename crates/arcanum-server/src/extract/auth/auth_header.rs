//! Bearer token extraction from the `Authorization` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejectionReason;

use crate::handler::{Error, ErrorKind};

/// Raw bearer token of the request, not yet verified.
///
/// Use [`AuthState`] for a verified identity.
///
/// [`AuthState`]: crate::extract::AuthState
#[must_use]
#[derive(Clone)]
pub struct AuthHeader {
    token: String,
}

impl AuthHeader {
    #[inline]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the token string.
    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeader").finish_non_exhaustive()
    }
}

impl<S> FromRequestParts<S> for AuthHeader
where
    S: Sync + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth_header) = parts.extensions.get::<Self>() {
            return Ok(auth_header.clone());
        }

        type AuthBearerHeader = TypedHeader<Authorization<Bearer>>;
        match AuthBearerHeader::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                let auth_header = Self::new(bearer.token());
                parts.extensions.insert(auth_header.clone());
                Ok(auth_header)
            }
            Err(rejection) => {
                let error = match rejection.reason() {
                    TypedHeaderRejectionReason::Missing => ErrorKind::MissingAuthToken
                        .with_message("Authentication required")
                        .with_context("Missing Authorization header with Bearer token")
                        .with_resource("authentication"),
                    TypedHeaderRejectionReason::Error(_) => ErrorKind::MalformedAuthToken
                        .with_message("Invalid authorization header format")
                        .with_context("Authorization header must contain a valid Bearer token")
                        .with_resource("authentication"),
                    _ => ErrorKind::InternalServerError
                        .with_message("Authentication processing failed")
                        .with_resource("authentication"),
                };
                Err(error)
            }
        }
    }
}
