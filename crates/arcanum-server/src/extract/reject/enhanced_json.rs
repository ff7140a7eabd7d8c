//! JSON extractor and responder with structured rejections.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Json as AxumJson, Request};
use axum::response::{IntoResponse, Response};
use derive_more::{Deref, DerefMut, From};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::handler::{Error, ErrorKind};

/// Longest error detail echoed back to the client.
const MAX_DETAIL_CHARS: usize = 200;

/// Drop-in replacement for [`axum::Json`] whose rejection is a JSON
/// [`Error`] with a 400 status instead of plain text.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    #[inline]
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extractor = <AxumJson<T> as FromRequest<S>>::from_request(req, state).await;
        extractor.map(|x| Self::new(x.0)).map_err(Into::into)
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    #[inline]
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => ErrorKind::BadRequest
                .with_message("Invalid request data format")
                .with_context(truncate_detail(&err.body_text())),
            JsonRejection::JsonSyntaxError(err) => ErrorKind::BadRequest
                .with_message("Invalid JSON syntax in request body")
                .with_context(truncate_detail(&err.body_text())),
            JsonRejection::MissingJsonContentType(_) => ErrorKind::BadRequest
                .with_message("Invalid content type")
                .with_context("Content-Type must be application/json"),
            JsonRejection::BytesRejection(err) => ErrorKind::BadRequest
                .with_message("Failed to read request body")
                .with_context(truncate_detail(&err.body_text())),
            _ => ErrorKind::InternalServerError.with_message("Request processing failed"),
        }
    }
}

/// Keeps serde's detail useful but bounded.
fn truncate_detail(message: &str) -> String {
    let lines = message.lines().take(3).collect::<Vec<_>>();
    lines.join(" ").chars().take(MAX_DETAIL_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_bounded() {
        let long = "x".repeat(1_000);
        assert_eq!(truncate_detail(&long).chars().count(), MAX_DETAIL_CHARS);
        assert_eq!(truncate_detail("a\nb\nc\nd"), "a b c");
    }
}
