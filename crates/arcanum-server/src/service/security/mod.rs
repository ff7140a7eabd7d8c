//! Security services: password hashing, token issuance and rate limiting.

mod password_hasher;
mod rate_limiter;
mod token_issuer;

pub use password_hasher::{BCRYPT_COST, HashingError, MAX_PASSWORD_BYTES, PasswordHasher};
pub use rate_limiter::{
    FailurePolicy, RateLimitConfig, RateLimitDecision, RateLimitError, RateLimitKey, RateLimiter,
};
pub use token_issuer::{
    Claims, MIN_SECRET_BYTES, SignedToken, TokenConfig, TokenError, TokenIssuer, TokenNamespace,
};
