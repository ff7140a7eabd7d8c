//! The authenticated account's own profile.

use axum::Router;
use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use jiff::Timestamp;

use super::request::UpdateProfile;
use super::response::{Account, PremiumStatus};
use crate::extract::{AuthState, Json, ValidateJson};
use crate::handler::Result;
use crate::middleware::{require_authentication, require_premium};
use crate::service::{AuthGateway, ServiceState};

/// Returns the account of the caller.
#[tracing::instrument(skip_all, fields(account_id = %auth_state.account_id))]
async fn get_own_account(
    State(gateway): State<AuthGateway>,
    auth_state: AuthState,
) -> Result<Json<Account>> {
    let account = gateway.account(auth_state.account_id).await?;
    Ok(Json(Account::from_model(account)))
}

/// Changes the display name of the caller.
#[tracing::instrument(skip_all, fields(account_id = %auth_state.account_id))]
async fn update_own_account(
    State(gateway): State<AuthGateway>,
    auth_state: AuthState,
    ValidateJson(request): ValidateJson<UpdateProfile>,
) -> Result<Json<Account>> {
    let account = gateway
        .update_profile(auth_state.account_id, &request.name)
        .await?;
    Ok(Json(Account::from_model(account)))
}

/// Reports the premium entitlement, reachable only with one.
#[tracing::instrument(skip_all, fields(account_id = %auth_state.account_id))]
async fn get_premium_status(
    State(gateway): State<AuthGateway>,
    auth_state: AuthState,
) -> Result<Json<PremiumStatus>> {
    let account = gateway.account(auth_state.account_id).await?;

    Ok(Json(PremiumStatus {
        is_premium: account.has_active_premium(Timestamp::now()),
        premium_expires_at: account.premium_expires_at,
    }))
}

/// Returns the `/users` routes. Every route requires authentication.
pub fn routes(state: ServiceState) -> Router<ServiceState> {
    let premium_router = Router::new()
        .route("/users/me/premium", get(get_premium_status))
        .route_layer(from_fn_with_state(state.clone(), require_premium));

    Router::new()
        .route("/users/me", get(get_own_account).put(update_own_account))
        .merge(premium_router)
        .route_layer(from_fn_with_state(state, require_authentication))
}
