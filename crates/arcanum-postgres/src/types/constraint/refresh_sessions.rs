//! Refresh sessions table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ConstraintCategory;

/// Refresh sessions table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum RefreshSessionConstraints {
    #[strum(serialize = "refresh_sessions_token_identity_length")]
    TokenIdentityLength,

    #[strum(serialize = "refresh_sessions_expires_after_created")]
    ExpiresAfterCreated,

    #[strum(serialize = "refresh_sessions_token_identity_unique")]
    TokenIdentityUnique,
}

impl RefreshSessionConstraints {
    /// Creates a new [`RefreshSessionConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            RefreshSessionConstraints::TokenIdentityLength => ConstraintCategory::Validation,
            RefreshSessionConstraints::ExpiresAfterCreated => ConstraintCategory::Chronological,
            RefreshSessionConstraints::TokenIdentityUnique => ConstraintCategory::Uniqueness,
        }
    }
}

impl From<RefreshSessionConstraints> for String {
    #[inline]
    fn from(val: RefreshSessionConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for RefreshSessionConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
