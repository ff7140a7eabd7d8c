//! Account and session storage contracts.
//!
//! The gateway only talks to [`AccountStore`] and [`SessionStore`]. Two
//! implementations exist: [`PgStore`] for production and [`MemoryStore`] for
//! tests and single-node development.

mod memory;
mod postgres;
mod token_identity;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;
pub use self::token_identity::TokenIdentity;
use crate::BoxedError;

/// Normalizes an email for storage and lookup: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// An account as seen by the core.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub is_premium: bool,
    pub premium_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Account {
    /// Returns whether the premium entitlement is in effect at `now`.
    pub fn has_active_premium(&self, now: Timestamp) -> bool {
        self.is_premium && self.premium_expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("is_premium", &self.is_premium)
            .field("premium_expires_at", &self.premium_expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Data for creating an account. The email is normalized by the store.
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
}

/// One issued refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token_identity: TokenIdentity,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl SessionRecord {
    /// Returns whether the record has lapsed at `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// Data for persisting a refresh token.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub account_id: Uuid,
    pub token_identity: TokenIdentity,
    pub expires_at: Timestamp,
}

/// Failure of a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key already exists.
    #[error("unique constraint violated: {constraint}")]
    Conflict { constraint: String },

    /// The addressed record does not exist.
    #[error("record not found")]
    NotFound,

    /// The store did not answer within the deadline.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, query or pool failure.
    #[error("store unavailable: {0}")]
    Backend(#[source] BoxedError),
}

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Creates an account; [`StoreError::Conflict`] if the email is taken.
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Changes the display name; [`StoreError::NotFound`] if the account is gone.
    async fn update_display_name(&self, id: Uuid, display_name: &str)
    -> Result<Account, StoreError>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Refresh session persistence, addressed by token identity.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a session; [`StoreError::Conflict`] if the identity exists.
    async fn create_session(&self, session: NewSession) -> Result<SessionRecord, StoreError>;

    /// Finds a session; [`StoreError::NotFound`] if absent.
    async fn find_by_token_identity(
        &self,
        identity: &TokenIdentity,
    ) -> Result<SessionRecord, StoreError>;

    /// Deletes a session; [`StoreError::NotFound`] if it was already gone.
    async fn delete_by_token_identity(&self, identity: &TokenIdentity) -> Result<(), StoreError>;

    /// Deletes every session of an account and returns how many were removed.
    async fn delete_all_by_account(&self, account_id: Uuid) -> Result<usize, StoreError>;

    /// Deletes every session expired at `now` and returns how many were removed.
    async fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    fn account(is_premium: bool, premium_expires_at: Option<Timestamp>) -> Account {
        let now = Timestamp::now();
        Account {
            id: Uuid::new_v4(),
            email: "a@b.com".to_owned(),
            password_hash: "$2b$04$secret".to_owned(),
            display_name: "A".to_owned(),
            is_premium,
            premium_expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn premium_requires_flag_and_future_expiry() {
        let now = Timestamp::now();
        let later = now + SignedDuration::from_hours(1);
        let earlier = now - SignedDuration::from_hours(1);

        assert!(account(true, None).has_active_premium(now));
        assert!(account(true, Some(later)).has_active_premium(now));
        assert!(!account(true, Some(earlier)).has_active_premium(now));
        assert!(!account(false, None).has_active_premium(now));
    }

    #[test]
    fn debug_omits_password_hash() {
        let debug = format!("{:?}", account(false, None));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
