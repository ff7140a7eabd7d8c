use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::refresh_sessions;

/// A persisted refresh token, keyed by its one-way identity.
///
/// The row is authoritative: a refresh token is only honored while its row
/// exists and `expires_at` is in the future.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = refresh_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RefreshSession {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Lowercase hex SHA-256 of the refresh token.
    pub token_identity: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// Data for persisting a newly issued refresh token.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = refresh_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewRefreshSession {
    pub account_id: Uuid,
    pub token_identity: String,
    pub expires_at: Timestamp,
}
