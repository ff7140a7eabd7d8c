//! Database models for accounts and refresh sessions.
//!
//! Each table has a queryable row type plus `New*` (insert) and, where the
//! row is mutable, `Update*` (changeset) companions.

mod account;
mod refresh_session;

pub use account::{Account, NewAccount, UpdateAccount};
pub use refresh_session::{NewRefreshSession, RefreshSession};
