//! Request extractors with consistent JSON error responses.
//!
//! - [`AuthHeader`] reads the bearer token from `Authorization`.
//! - [`AuthState`] verifies it as an access token and exposes the
//!   request-scoped [`AuthContext`].
//! - [`Json`] and [`ValidateJson`] replace axum's JSON extractor with
//!   descriptive 400 responses.

pub mod auth;
pub mod reject;

pub use crate::extract::auth::{AuthContext, AuthHeader, AuthState};
pub use crate::extract::reject::{Json, ValidateJson};
