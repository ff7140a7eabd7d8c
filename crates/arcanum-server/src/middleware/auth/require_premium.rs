use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::TRACING_TARGET_AUTHORIZATION;
use crate::extract::AuthState;
use crate::handler::Error;
use crate::service::authorize_premium;

/// Requires the authenticated account to hold a premium entitlement.
///
/// The entitlement is read from the access token claims, so a purchase made
/// after the token was minted shows up only after the next refresh.
///
/// #### Notes
///
/// - [`AuthState`] can't be extracted from requests without a *verified* access token.
/// - See [`require_authentication`](super::require_authentication) for more information.
pub async fn require_premium(
    AuthState(auth_context): AuthState,
    request: Request,
    next: Next,
) -> Response {
    if let Err(error) = authorize_premium(auth_context.claims()) {
        tracing::debug!(
            target: TRACING_TARGET_AUTHORIZATION,
            account_id = %auth_context.account_id,
            "premium entitlement missing"
        );

        return Error::from(error).into_response();
    }

    next.run(request).await
}
