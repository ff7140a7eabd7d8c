//! Per-identifier rate limiting middleware.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_client_ip::ClientIp;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};

use crate::TRACING_TARGET_RATE_LIMITER;
use crate::extract::AuthState;
use crate::handler::{Error, ErrorKind};
use crate::service::{AuthError, TokenIssuer};
use crate::service::security::{RateLimitDecision, RateLimitKey, RateLimiter};

/// Rate limits requests by account, or by client address for anonymous callers.
///
/// A request presenting a valid access token is counted against its account,
/// so clients sharing an address do not starve each other. Anything else,
/// including an invalid or expired token, is counted against the address.
/// The verified identity is stored in the request extensions for the
/// extractors further down.
///
/// Applied to every route except `/health`, ahead of any authentication.
///
/// # Example
///
/// ```rust,ignore
/// use axum::middleware::from_fn_with_state;
/// use arcanum_server::middleware::rate_limit;
///
/// let router = router.layer(from_fn_with_state(state.clone(), rate_limit));
/// ```
pub async fn rate_limit(
    ClientIp(ip_address): ClientIp,
    State(rate_limiter): State<RateLimiter>,
    State(token_issuer): State<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_state = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .and_then(|Authorization(bearer)| AuthState::verify(&token_issuer, bearer.token()).ok());

    let key = match auth_state {
        Some(auth_state) => {
            let key = RateLimitKey::Account(auth_state.account_id);
            request.extensions_mut().insert(auth_state);
            key
        }
        None => RateLimitKey::Ip(ip_address),
    };

    match rate_limiter.check_and_consume(&key).await {
        Ok(RateLimitDecision::Allowed { remaining, .. }) => {
            tracing::trace!(
                target: TRACING_TARGET_RATE_LIMITER,
                key = %key,
                remaining,
                "request admitted"
            );
            next.run(request).await
        }
        Ok(RateLimitDecision::Limited {
            limit,
            retry_after_secs,
        }) => Error::from(AuthError::RateLimited {
            limit,
            retry_after_secs,
        })
        .into_response(),
        Err(_) => ErrorKind::InternalServerError
            .with_message("Rate limit check failed")
            .into_response(),
    }
}
