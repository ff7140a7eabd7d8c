//! Account response types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::store;

/// Public view of an account. Never carries the password digest.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique identifier of the account.
    pub id: Uuid,
    /// Normalized email address.
    pub email: String,
    /// Display name of the account holder.
    pub name: String,
    /// Whether the premium entitlement is currently in effect.
    pub is_premium: bool,
    /// When the premium entitlement lapses, if it does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_expires_at: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Account {
    pub fn from_model(account: store::Account) -> Self {
        Self {
            is_premium: account.has_active_premium(Timestamp::now()),
            id: account.id,
            email: account.email,
            name: account.display_name,
            premium_expires_at: account.premium_expires_at,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Premium entitlement of the current account.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumStatus {
    pub is_premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_expires_at: Option<Timestamp>,
}
