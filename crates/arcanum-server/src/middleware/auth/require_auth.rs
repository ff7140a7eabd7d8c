use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::extract::AuthState;

/// Requires a valid access token to proceed with the request.
///
/// #### Notes
///
/// - [`AuthHeader`](crate::extract::AuthHeader) can't be extracted from requests without `Authorization` header.
/// - [`AuthState`] can't be extracted from requests without a *verified* access token.
///
/// #### Examples
///
/// ```rust,ignore
/// use axum::middleware::from_fn_with_state;
/// use arcanum_server::middleware::require_authentication;
///
/// let router = router.route_layer(from_fn_with_state(state, require_authentication));
/// ```
pub async fn require_authentication(
    AuthState(_): AuthState,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}
