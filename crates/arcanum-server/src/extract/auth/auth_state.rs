//! Verified identity of the caller.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use derive_more::Deref;
use uuid::Uuid;

use super::AuthHeader;
use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind};
use crate::service::{Claims, TokenIssuer};
use crate::service::security::{TokenError, TokenNamespace};

/// Request-scoped identity produced by access token verification.
///
/// Handlers and middleware read identity from here, never from raw headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub email: String,
    pub is_premium: bool,
    claims: Claims,
}

impl AuthContext {
    /// Builds the context from verified access token claims.
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            account_id: claims.sub,
            email: claims.email.clone().unwrap_or_default(),
            is_premium: claims.is_premium,
            claims,
        }
    }

    /// Returns the claims the context was built from.
    #[inline]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

/// Extractor for an authenticated caller.
///
/// Verifies the bearer token in the access namespace and caches the result
/// in the request extensions, so later extractors and handlers reuse it.
#[must_use]
#[derive(Debug, Clone, Deref)]
pub struct AuthState(pub AuthContext);

impl AuthState {
    /// Verifies `token` as an access token.
    pub fn verify(issuer: &TokenIssuer, token: &str) -> Result<Self, Error> {
        let claims = issuer
            .verify(token, TokenNamespace::Access)
            .map_err(|e| {
                tracing::debug!(
                    target: TRACING_TARGET_AUTHENTICATION,
                    reason = %e,
                    "access token rejected"
                );

                match e {
                    TokenError::Expired => ErrorKind::Unauthorized
                        .with_message("Token has expired")
                        .with_resource("authentication"),
                    TokenError::Malformed => ErrorKind::MalformedAuthToken
                        .with_message("Invalid or expired token")
                        .with_resource("authentication"),
                    _ => ErrorKind::Unauthorized
                        .with_message("Invalid or expired token")
                        .with_resource("authentication"),
                }
            })?;

        Ok(Self(AuthContext::from_claims(claims)))
    }

    /// Returns the inner context.
    #[inline]
    pub fn into_inner(self) -> AuthContext {
        self.0
    }
}

impl<S> FromRequestParts<S> for AuthState
where
    S: Sync + Send,
    TokenIssuer: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth_state) = parts.extensions.get::<Self>() {
            return Ok(auth_state.clone());
        }

        let auth_header = AuthHeader::from_request_parts(parts, state).await?;
        let issuer = TokenIssuer::from_ref(state);
        let auth_state = Self::verify(&issuer, auth_header.token())?;

        tracing::trace!(
            target: TRACING_TARGET_AUTHENTICATION,
            account_id = %auth_state.account_id,
            "request authenticated"
        );

        parts.extensions.insert(auth_state.clone());
        Ok(auth_state)
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;
    use crate::service::TokenConfig;

    fn issuer() -> anyhow::Result<TokenIssuer> {
        Ok(TokenIssuer::new(&TokenConfig::new(
            "access-secret-for-tests-0123456789abcdef",
            "refresh-secret-for-tests-0123456789abcdef",
        ))?)
    }

    #[test]
    fn access_token_yields_context() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let subject = Uuid::new_v4();
        let signed = issuer.mint_access(subject, "a@b.com", true, issuer.access_ttl())?;

        let state = AuthState::verify(&issuer, &signed.token)?;
        assert_eq!(state.account_id, subject);
        assert_eq!(state.email, "a@b.com");
        assert!(state.is_premium);
        Ok(())
    }

    #[test]
    fn refresh_token_is_rejected() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let signed = issuer.mint_refresh(Uuid::new_v4(), issuer.refresh_ttl())?;

        let error = AuthState::verify(&issuer, &signed.token).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let signed =
            issuer.mint_access(Uuid::new_v4(), "a@b.com", false, SignedDuration::from_secs(-1))?;

        let error = AuthState::verify(&issuer, &signed.token).unwrap_err();
        assert_eq!(error.message(), Some("Token has expired"));
        Ok(())
    }
}
