//! Database constraint violations organized by table.

mod accounts;
mod refresh_sessions;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use self::accounts::AccountConstraints;
pub use self::refresh_sessions::RefreshSessionConstraints;

/// Unified constraint violation enum that can represent any known constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConstraintViolation {
    Account(AccountConstraints),
    RefreshSession(RefreshSessionConstraints),
}

/// Categories of database constraint violations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintCategory {
    /// Data validation constraints (format, length, range checks).
    Validation,
    /// Chronological integrity constraints (timestamp relationships).
    Chronological,
    /// Uniqueness constraints (primary keys, unique indexes).
    Uniqueness,
}

impl ConstraintViolation {
    /// Parses a constraint name into a known violation.
    ///
    /// ```
    /// use arcanum_postgres::types::ConstraintViolation;
    ///
    /// assert!(ConstraintViolation::new("accounts_email_unique").is_some());
    /// assert!(ConstraintViolation::new("unknown_constraint").is_none());
    /// ```
    pub fn new(constraint: &str) -> Option<Self> {
        AccountConstraints::new(constraint)
            .map(Self::Account)
            .or_else(|| RefreshSessionConstraints::new(constraint).map(Self::RefreshSession))
    }

    /// Returns the table name associated with this constraint.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConstraintViolation::Account(_) => "accounts",
            ConstraintViolation::RefreshSession(_) => "refresh_sessions",
        }
    }

    /// Returns the category of this constraint violation.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            ConstraintViolation::Account(c) => c.categorize(),
            ConstraintViolation::RefreshSession(c) => c.categorize(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::Account(c) => write!(f, "{c}"),
            ConstraintViolation::RefreshSession(c) => write!(f, "{c}"),
        }
    }
}

impl From<ConstraintViolation> for String {
    #[inline]
    fn from(val: ConstraintViolation) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for ConstraintViolation {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_constraints() {
        assert_eq!(
            ConstraintViolation::new("accounts_email_unique"),
            Some(ConstraintViolation::Account(AccountConstraints::EmailUnique))
        );
        assert_eq!(
            ConstraintViolation::new("refresh_sessions_token_identity_unique"),
            Some(ConstraintViolation::RefreshSession(
                RefreshSessionConstraints::TokenIdentityUnique
            ))
        );
    }

    #[test]
    fn categorize_and_table() {
        let violation = ConstraintViolation::Account(AccountConstraints::EmailUnique);
        assert_eq!(violation.table_name(), "accounts");
        assert_eq!(violation.categorize(), ConstraintCategory::Uniqueness);

        let violation =
            ConstraintViolation::RefreshSession(RefreshSessionConstraints::ExpiresAfterCreated);
        assert_eq!(violation.table_name(), "refresh_sessions");
        assert_eq!(violation.categorize(), ConstraintCategory::Chronological);
    }

    #[test]
    fn display_matches_constraint_name() {
        let violation = ConstraintViolation::Account(AccountConstraints::EmailLowercase);
        assert_eq!(violation.to_string(), "accounts_email_lowercase");
        assert_eq!(
            ConstraintViolation::try_from(violation.to_string()),
            Ok(violation)
        );
    }
}
