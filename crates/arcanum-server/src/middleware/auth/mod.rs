//! Authentication and entitlement guards for routes.

mod require_auth;
mod require_premium;

pub use require_auth::require_authentication;
pub use require_premium::require_premium;
