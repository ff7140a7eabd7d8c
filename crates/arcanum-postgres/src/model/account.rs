use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::accounts;

/// An account row.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    /// Unique account identifier.
    pub id: Uuid,
    /// Login email, stored trimmed and lowercased.
    pub email: String,
    /// bcrypt digest of the password.
    pub password_hash: String,
    /// Human-readable name (1-100 characters).
    pub display_name: String,
    /// Premium entitlement flag.
    pub is_premium: bool,
    /// When the premium entitlement lapses, if ever.
    pub premium_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Account {
    /// Returns whether the premium entitlement is in effect at `now`.
    ///
    /// The flag alone is not enough: an entitlement with a past expiry has lapsed.
    pub fn has_active_premium(&self, now: jiff::Timestamp) -> bool {
        self.is_premium
            && self
                .premium_expires_at
                .is_none_or(|expires_at| jiff::Timestamp::from(expires_at) > now)
    }
}

/// Data for creating a new account.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
}

/// Partial account update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateAccount {
    pub display_name: Option<String>,
    pub is_premium: Option<bool>,
    /// `Some(None)` clears the expiry.
    pub premium_expires_at: Option<Option<Timestamp>>,
    pub updated_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp as Now};

    use super::*;

    fn account(is_premium: bool, premium_expires_at: Option<Now>) -> Account {
        let now = Now::now();
        Account {
            id: Uuid::now_v7(),
            email: "ada@example.com".to_owned(),
            password_hash: "$2b$12$digest".to_owned(),
            display_name: "Ada".to_owned(),
            is_premium,
            premium_expires_at: premium_expires_at.map(Into::into),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn premium_respects_expiry() {
        let now = Now::now();
        let hour = SignedDuration::from_hours(1);

        assert!(!account(false, None).has_active_premium(now));
        assert!(account(true, None).has_active_premium(now));
        assert!(account(true, Some(now + hour)).has_active_premium(now));
        assert!(!account(true, Some(now - hour)).has_active_premium(now));
    }
}
