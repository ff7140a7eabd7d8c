//! Dependency health reporting.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;

use super::response::HealthStatus;
use crate::TRACING_TARGET_HEALTH;
use crate::extract::Json;
use crate::service::{HealthCheck, ServiceState};

/// Checks the account store and the counter store.
///
/// Answers 200 when both respond and 503 otherwise, with the same body shape.
#[tracing::instrument(skip_all)]
async fn health_status(State(health): State<HealthCheck>) -> (StatusCode, Json<HealthStatus>) {
    let report = health.check().await;
    let status_code = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(
        target: TRACING_TARGET_HEALTH,
        database = report.database,
        counter_store = report.counter_store,
        status_code = status_code.as_u16(),
        "health status response prepared"
    );

    (status_code, Json(HealthStatus::from_report(report)))
}

pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use crate::handler::response::{HealthStatus, ServiceStatus};
    use crate::handler::test::{UnreachableCounterStore, create_test_app, create_test_app_with_counters};
    use crate::service::RateLimitConfig;

    #[tokio::test]
    async fn in_memory_backends_are_healthy() -> anyhow::Result<()> {
        let app = create_test_app()?;

        let response = app.server.get("/health").await;
        response.assert_status_ok();

        let body: HealthStatus = response.json();
        assert_eq!(body.status, ServiceStatus::Healthy);
        assert!(body.services.database);
        assert!(body.services.counter_store);

        let raw: serde_json::Value = response.json();
        assert_eq!(raw["status"], "healthy");

        Ok(())
    }

    #[tokio::test]
    async fn unreachable_counter_store_is_unavailable() -> anyhow::Result<()> {
        let app = create_test_app_with_counters(
            RateLimitConfig::default(),
            Arc::new(UnreachableCounterStore),
        )?;

        let response = app.server.get("/health").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let body: HealthStatus = response.json();
        assert_eq!(body.status, ServiceStatus::Unhealthy);
        assert!(body.services.database);
        assert!(!body.services.counter_store);

        Ok(())
    }
}
