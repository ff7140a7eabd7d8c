use std::fmt;

use sha2::{Digest, Sha256};

/// One-way lookup key of a refresh token: lowercase hex SHA-256.
///
/// The store only ever sees this digest, so a leaked session table does not
/// leak usable refresh tokens.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenIdentity(String);

impl TokenIdentity {
    /// Derives the identity of a token.
    pub fn from_token(token: &str) -> Self {
        Self(hex::encode(Sha256::digest(token.as_bytes())))
    }

    /// Wraps a digest read back from storage.
    pub(crate) fn from_stored(digest: String) -> Self {
        Self(digest)
    }

    /// Returns the hex digest.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TokenIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A prefix is enough to correlate log lines.
        write!(f, "TokenIdentity({}..)", self.0.get(..12).unwrap_or(&self.0))
    }
}
