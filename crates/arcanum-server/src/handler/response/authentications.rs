//! Authentication response types.

use serde::{Deserialize, Serialize};

use super::Account;
use crate::service::AuthSession;

/// Token pair and account returned by register and login.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub account: Account,
}

impl AuthTokens {
    pub fn from_session(session: AuthSession) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            account: Account::from_model(session.account),
        }
    }
}

/// Fresh access token returned by refresh.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_token: String,
}

/// Plain acknowledgement.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of revoking every session of an account.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokedSessions {
    pub message: String,
    pub revoked_sessions: usize,
}
