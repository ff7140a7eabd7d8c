//! Request tracing with request ids and redacted credentials.

use axum::Router;
use axum::http::header;
use axum::http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Extension trait for `axum::`[`Router`] to apply observability middleware.
pub trait RouterObservabilityExt<S> {
    /// Layers observability middleware for request tracing and logging.
    ///
    /// Generates a UUID request id unless the client sent one, opens a
    /// tracing span per request, echoes the id on the response and marks
    /// `Authorization` and `Cookie` as sensitive so they never reach logs.
    fn with_observability(self) -> Self;
}

impl<S> RouterObservabilityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_observability(self) -> Self {
        self.layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(SetSensitiveRequestHeadersLayer::new([
                header::AUTHORIZATION,
                header::COOKIE,
            ]))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::get;
    use axum_test::TestServer;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .with_observability()
    }

    #[tokio::test]
    async fn request_id_is_generated() -> anyhow::Result<()> {
        let server = TestServer::new(app())?;

        let response = server.get("/").await;
        let request_id = response.header(REQUEST_ID_HEADER);
        assert!(!request_id.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn request_id_is_propagated() -> anyhow::Result<()> {
        let server = TestServer::new(app())?;

        let response = server
            .get("/")
            .add_header(REQUEST_ID_HEADER, "req-1234")
            .await;
        assert_eq!(response.header(REQUEST_ID_HEADER), "req-1234");

        Ok(())
    }
}
