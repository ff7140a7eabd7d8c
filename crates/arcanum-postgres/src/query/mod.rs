//! Repository traits implemented for [`PgConnection`].
//!
//! [`PgConnection`]: crate::PgConnection

mod account;
mod refresh_session;

pub use account::AccountRepository;
pub use refresh_session::RefreshSessionRepository;
