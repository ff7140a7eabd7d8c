//! Accounts table constraint violations.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ConstraintCategory;

/// Accounts table constraint violations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum AccountConstraints {
    #[strum(serialize = "accounts_email_lowercase")]
    EmailLowercase,
    #[strum(serialize = "accounts_email_length")]
    EmailLength,
    #[strum(serialize = "accounts_display_name_length")]
    DisplayNameLength,

    #[strum(serialize = "accounts_updated_after_created")]
    UpdatedAfterCreated,

    #[strum(serialize = "accounts_email_unique")]
    EmailUnique,
}

impl AccountConstraints {
    /// Creates a new [`AccountConstraints`] from the constraint name.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            AccountConstraints::EmailLowercase
            | AccountConstraints::EmailLength
            | AccountConstraints::DisplayNameLength => ConstraintCategory::Validation,

            AccountConstraints::UpdatedAfterCreated => ConstraintCategory::Chronological,

            AccountConstraints::EmailUnique => ConstraintCategory::Uniqueness,
        }
    }
}

impl From<AccountConstraints> for String {
    #[inline]
    fn from(val: AccountConstraints) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for AccountConstraints {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
