//! Registration, login, token refresh and logout.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::post;

use super::request::{Login, RefreshToken, Register};
use super::response::{AccessToken, AuthTokens, Message, RevokedSessions};
use crate::extract::{AuthState, Json, ValidateJson};
use crate::handler::Result;
use crate::middleware::require_authentication;
use crate::service::{AuthGateway, ServiceState};

/// Creates an account and returns its first token pair.
#[tracing::instrument(skip_all)]
async fn register(
    State(gateway): State<AuthGateway>,
    ValidateJson(request): ValidateJson<Register>,
) -> Result<(StatusCode, Json<AuthTokens>)> {
    let session = gateway
        .register(&request.email, &request.password, &request.name)
        .await?;

    Ok((StatusCode::CREATED, Json(AuthTokens::from_session(session))))
}

/// Exchanges credentials for a token pair.
#[tracing::instrument(skip_all)]
async fn login(
    State(gateway): State<AuthGateway>,
    ValidateJson(request): ValidateJson<Login>,
) -> Result<Json<AuthTokens>> {
    let session = gateway.login(&request.email, &request.password).await?;
    Ok(Json(AuthTokens::from_session(session)))
}

/// Exchanges a live refresh token for a new access token.
#[tracing::instrument(skip_all)]
async fn refresh(
    State(gateway): State<AuthGateway>,
    ValidateJson(request): ValidateJson<RefreshToken>,
) -> Result<Json<AccessToken>> {
    let access_token = gateway.refresh(&request.refresh_token).await?;
    Ok(Json(AccessToken { access_token }))
}

/// Ends the session of the given refresh token. Unknown tokens succeed too.
#[tracing::instrument(skip_all)]
async fn logout(
    State(gateway): State<AuthGateway>,
    ValidateJson(request): ValidateJson<RefreshToken>,
) -> Result<Json<Message>> {
    gateway.logout(&request.refresh_token).await?;
    Ok(Json(Message::new("Logged out successfully")))
}

/// Ends every session of the authenticated account.
#[tracing::instrument(skip_all, fields(account_id = %auth_state.account_id))]
async fn logout_all(
    State(gateway): State<AuthGateway>,
    auth_state: AuthState,
) -> Result<Json<RevokedSessions>> {
    let revoked_sessions = gateway.revoke_all(auth_state.account_id).await?;

    Ok(Json(RevokedSessions {
        message: "Logged out from all sessions".to_owned(),
        revoked_sessions,
    }))
}

/// Returns the `/auth` routes.
pub fn routes(state: ServiceState) -> Router<ServiceState> {
    let private_router = Router::new()
        .route("/auth/logout-all", post(logout_all))
        .route_layer(from_fn_with_state(state.clone(), require_authentication));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .merge(private_router)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{StatusCode, header};
    use serde_json::json;

    use crate::handler::response::{AccessToken, AuthTokens, Message, RevokedSessions};
    use crate::handler::test::{
        PASSWORD, UnreachableCounterStore, create_test_app, create_test_app_with_counters,
        create_test_app_with_rate_limit, register,
    };
    use crate::service::{FailurePolicy, RateLimitConfig};

    #[tokio::test]
    async fn full_session_lifecycle() -> anyhow::Result<()> {
        let app = create_test_app()?;
        let server = &app.server;

        let response = server
            .post("/auth/register")
            .json(&json!({
                "email": "Seeker@Example.com",
                "password": PASSWORD,
                "name": "Seeker",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: serde_json::Value = response.json();
        assert_eq!(body["account"]["email"], "seeker@example.com");
        assert!(body["account"].get("password").is_none());
        assert!(body["account"].get("passwordHash").is_none());

        let response = server
            .post("/auth/login")
            .json(&json!({ "email": "seeker@example.com", "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        let tokens: AuthTokens = response.json();

        let response = server
            .post("/auth/refresh")
            .json(&json!({ "refreshToken": tokens.refresh_token }))
            .await;
        response.assert_status_ok();
        let refreshed: AccessToken = response.json();
        assert!(!refreshed.access_token.is_empty());

        let response = server
            .post("/auth/logout")
            .json(&json!({ "refreshToken": tokens.refresh_token }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Message>().message, "Logged out successfully");

        let response = server
            .post("/auth/refresh")
            .json(&json!({ "refreshToken": tokens.refresh_token }))
            .await;
        response.assert_status_unauthorized();

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() -> anyhow::Result<()> {
        let app = create_test_app()?;
        let request = json!({
            "email": "twin@example.com",
            "password": PASSWORD,
            "name": "Twin",
        });

        let first = app.server.post("/auth/register").json(&request).await;
        first.assert_status(StatusCode::CREATED);

        let second = app.server.post("/auth/register").json(&request).await;
        second.assert_status(StatusCode::CONFLICT);

        let body: serde_json::Value = second.json();
        assert_eq!(body["name"], "conflict");
        assert_eq!(body["message"], "User with this email already exists");

        Ok(())
    }

    #[tokio::test]
    async fn invalid_registration_is_rejected() -> anyhow::Result<()> {
        let app = create_test_app()?;

        let response = app
            .server
            .post("/auth/register")
            .json(&json!({
                "email": "not-an-email",
                "password": "short",
                "name": "",
            }))
            .await;
        response.assert_status_bad_request();

        let response = app
            .server
            .post("/auth/register")
            .text("{ not json")
            .content_type("application/json")
            .await;
        response.assert_status_bad_request();

        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_alike() -> anyhow::Result<()> {
        let app = create_test_app()?;
        register(&app.server, "known@example.com").await;

        let wrong_password = app
            .server
            .post("/auth/login")
            .json(&json!({ "email": "known@example.com", "password": "not the password" }))
            .await;
        let unknown_email = app
            .server
            .post("/auth/login")
            .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
            .await;

        wrong_password.assert_status_unauthorized();
        unknown_email.assert_status_unauthorized();
        assert_eq!(wrong_password.text(), unknown_email.text());

        Ok(())
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() -> anyhow::Result<()> {
        let app = create_test_app()?;
        let tokens = register(&app.server, "mixup@example.com").await;

        let response = app
            .server
            .post("/auth/refresh")
            .json(&json!({ "refreshToken": tokens.access_token }))
            .await;
        response.assert_status_unauthorized();

        Ok(())
    }

    #[tokio::test]
    async fn logout_is_idempotent() -> anyhow::Result<()> {
        let app = create_test_app()?;

        for _ in 0..2 {
            let response = app
                .server
                .post("/auth/logout")
                .json(&json!({ "refreshToken": "never-issued" }))
                .await;
            response.assert_status_ok();
        }

        let response = app
            .server
            .post("/auth/logout")
            .json(&json!({ "refreshToken": "" }))
            .await;
        response.assert_status_bad_request();

        Ok(())
    }

    #[tokio::test]
    async fn logout_all_revokes_every_session() -> anyhow::Result<()> {
        let app = create_test_app()?;
        let tokens = register(&app.server, "many@example.com").await;
        app.server
            .post("/auth/login")
            .json(&json!({ "email": "many@example.com", "password": PASSWORD }))
            .await
            .assert_status_ok();

        let response = app.server.post("/auth/logout-all").await;
        response.assert_status_unauthorized();

        let response = app
            .server
            .post("/auth/logout-all")
            .authorization_bearer(&tokens.access_token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<RevokedSessions>().revoked_sessions, 2);
        assert_eq!(app.store.session_count().await, 0);

        let response = app
            .server
            .post("/auth/refresh")
            .json(&json!({ "refreshToken": tokens.refresh_token }))
            .await;
        response.assert_status_unauthorized();

        Ok(())
    }

    #[tokio::test]
    async fn anonymous_requests_are_rate_limited_by_address() -> anyhow::Result<()> {
        let app = create_test_app_with_rate_limit(RateLimitConfig::new(3, 60))?;
        let request = json!({ "email": "nobody@example.com", "password": PASSWORD });

        for _ in 0..3 {
            let response = app.server.post("/auth/login").json(&request).await;
            response.assert_status_unauthorized();
        }

        let response = app.server.post("/auth/login").json(&request).await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);

        let retry_after: u64 = response.header(header::RETRY_AFTER).to_str()?.parse()?;
        assert!((1..=60).contains(&retry_after));

        let body: serde_json::Value = response.json();
        assert_eq!(body["name"], "too_many_requests");

        Ok(())
    }

    #[tokio::test]
    async fn authenticated_requests_are_counted_per_account() -> anyhow::Result<()> {
        let app = create_test_app_with_rate_limit(RateLimitConfig::new(2, 60))?;
        let tokens = register(&app.server, "counted@example.com").await;

        // The anonymous address has one request left; the account has a fresh budget.
        for _ in 0..2 {
            let response = app
                .server
                .post("/auth/logout-all")
                .authorization_bearer(&tokens.access_token)
                .await;
            response.assert_status_ok();
        }

        let response = app
            .server
            .post("/auth/logout-all")
            .authorization_bearer(&tokens.access_token)
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);

        let response = app
            .server
            .post("/auth/logout")
            .json(&json!({ "refreshToken": "anything" }))
            .await;
        response.assert_status_ok();

        Ok(())
    }

    #[tokio::test]
    async fn unreachable_counter_store_fails_closed() -> anyhow::Result<()> {
        let app = create_test_app_with_counters(
            RateLimitConfig::new(100, 60),
            Arc::new(UnreachableCounterStore),
        )?;

        let response = app
            .server
            .post("/auth/login")
            .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = response.json();
        assert_eq!(body["name"], "internal_server_error");
        assert_eq!(body["message"], "Rate limit check failed");

        Ok(())
    }

    #[tokio::test]
    async fn unreachable_counter_store_fails_open_when_configured() -> anyhow::Result<()> {
        let config = RateLimitConfig::new(100, 60).with_failure_policy(FailurePolicy::Open);
        let app = create_test_app_with_counters(config, Arc::new(UnreachableCounterStore))?;

        let response = app
            .server
            .post("/auth/login")
            .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
            .await;
        response.assert_status_unauthorized();

        Ok(())
    }
}
