//! JSON extractor that also runs `validator` rules.

use std::borrow::Cow;
use std::collections::HashMap;

use axum::extract::{FromRequest, Request};
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use super::Json;
use crate::handler::{Error, ErrorKind};

/// [`Json`] followed by [`Validate::validate`]; any failure is a 400.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct ValidateJson<T>(pub T);

impl<T> ValidateJson<T> {
    #[inline]
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for ValidateJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
        data.validate()?;
        Ok(Self::new(data))
    }
}

fn number_param(params: &HashMap<Cow<'static, str>, serde_json::Value>, key: &str) -> Option<u64> {
    params.get(key).and_then(serde_json::Value::as_u64)
}

fn format_length_error(field: &str, error: &ValidationError) -> String {
    match (
        number_param(&error.params, "min"),
        number_param(&error.params, "max"),
    ) {
        (Some(1), Some(max)) => {
            format!("Field '{field}' is required and must be at most {max} characters")
        }
        (Some(1), None) => format!("Field '{field}' is required"),
        (Some(min), Some(max)) => {
            format!("Field '{field}' must be between {min} and {max} characters long")
        }
        (Some(min), None) => format!("Field '{field}' must be at least {min} characters long"),
        (None, Some(max)) => format!("Field '{field}' must be at most {max} characters long"),
        (None, None) => format!("Field '{field}' has invalid length"),
    }
}

fn format_validation_error(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return format!("Field '{field}': {message}");
    }

    match error.code.as_ref() {
        "length" => format_length_error(field, error),
        "email" => format!("Field '{field}' must be a valid email address"),
        "required" => format!("Field '{field}' is required"),
        code => format!("Field '{field}' failed validation: {code}"),
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors
                    .iter()
                    .map(move |error| format_validation_error(field, error))
            })
            .collect();
        // Field order of the underlying map is unspecified.
        messages.sort();

        let message = match messages.as_slice() {
            [] => "Validation failed".to_owned(),
            [single] => single.clone(),
            multiple => multiple.join(". "),
        };

        tracing::debug!(errors = ?errors.field_errors(), "request validation failed");

        ErrorKind::BadRequest
            .with_message(message)
            .with_resource("request")
    }
}
