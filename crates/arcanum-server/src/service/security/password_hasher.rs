//! Password hashing and verification using bcrypt.

use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::TRACING_TARGET_PASSWORD_HASHER;

/// Work factor used for every new digest.
pub const BCRYPT_COST: u32 = 12;

/// Longest password bcrypt processes without truncation.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Errors produced by [`PasswordHasher`].
///
/// A wrong password is not an error: [`PasswordHasher::verify`] returns
/// `Ok(false)` for it.
#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    /// The password exceeds what bcrypt can hash without truncation.
    #[error("password is {len} bytes, at most {MAX_PASSWORD_BYTES} are supported")]
    TooLong { len: usize },

    /// The stored digest is not a valid bcrypt string.
    #[error("stored password digest is invalid: {0}")]
    InvalidDigest(#[source] bcrypt::BcryptError),

    /// Digest generation failed.
    #[error("password hashing failed: {0}")]
    Backend(#[source] bcrypt::BcryptError),
}

/// Salted, adaptive password hashing.
///
/// Cloning is cheap; clones share the dummy digest used by
/// [`verify_dummy`](Self::verify_dummy), which is computed once on construction.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_digest: Arc<str>,
    #[cfg(test)]
    verifications: Arc<AtomicUsize>,
}

impl PasswordHasher {
    /// Creates a hasher with the production work factor.
    pub fn new() -> Result<Self, HashingError> {
        Self::with_cost(BCRYPT_COST)
    }

    /// Creates a hasher with the given work factor.
    pub(crate) fn with_cost(cost: u32) -> Result<Self, HashingError> {
        let password = hex::encode(rand::random::<[u8; 24]>());
        let dummy_digest = bcrypt::hash(password, cost).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_PASSWORD_HASHER,
                error = %e,
                cost,
                "failed to prepare dummy digest"
            );
            HashingError::Backend(e)
        })?;

        Ok(Self {
            cost,
            dummy_digest: dummy_digest.into(),
            #[cfg(test)]
            verifications: Arc::default(),
        })
    }

    /// Hashes a password into a self-describing digest with a fresh salt.
    pub fn hash(&self, password: &str) -> Result<String, HashingError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(HashingError::TooLong {
                len: password.len(),
            });
        }

        bcrypt::hash(password, self.cost).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_PASSWORD_HASHER,
                error = %e,
                "password hashing operation failed"
            );
            HashingError::Backend(e)
        })
    }

    /// Verifies a password against a stored digest.
    ///
    /// Returns `Ok(false)` for a non-matching password and
    /// [`HashingError::InvalidDigest`] when the digest cannot be parsed.
    /// Every call runs exactly one bcrypt verification.
    pub fn verify(&self, digest: &str, password: &str) -> Result<bool, HashingError> {
        let matched = self.run_verification(password, digest).map_err(|e| {
            tracing::warn!(
                target: TRACING_TARGET_PASSWORD_HASHER,
                error = %e,
                "invalid password digest format"
            );
            HashingError::InvalidDigest(e)
        })?;

        // An overlong password was never hashed; bcrypt only compared its prefix.
        Ok(matched && password.len() <= MAX_PASSWORD_BYTES)
    }

    /// Spends the cost of one verification without a real digest.
    ///
    /// Used when the account does not exist, so the response time does not
    /// reveal whether an email is registered. Always returns `false`.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = self.run_verification(password, &self.dummy_digest);
        false
    }

    fn run_verification(&self, password: &str, digest: &str) -> bcrypt::BcryptResult<bool> {
        #[cfg(test)]
        self.verifications.fetch_add(1, Ordering::Relaxed);

        bcrypt::verify(password, digest)
    }

    /// Number of bcrypt verifications run by this hasher and its clones.
    #[cfg(test)]
    pub(crate) fn verifications(&self) -> usize {
        self.verifications.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> anyhow::Result<PasswordHasher> {
        Ok(PasswordHasher::with_cost(4)?)
    }

    #[test]
    fn hash_and_verify_password() -> anyhow::Result<()> {
        let hasher = hasher()?;
        let digest = hasher.hash("Passw0rd!")?;

        assert!(digest.starts_with("$2"));
        assert!(hasher.verify(&digest, "Passw0rd!")?);
        assert!(!hasher.verify(&digest, "Passw0rd?")?);

        Ok(())
    }

    #[test]
    fn hash_produces_unique_salts() -> anyhow::Result<()> {
        let hasher = hasher()?;
        let first = hasher.hash("same-password")?;
        let second = hasher.hash("same-password")?;

        assert_ne!(first, second);
        assert!(hasher.verify(&first, "same-password")?);
        assert!(hasher.verify(&second, "same-password")?);

        Ok(())
    }

    #[test]
    fn production_cost_is_embedded() -> anyhow::Result<()> {
        let digest = PasswordHasher::new()?.hash("Passw0rd!")?;
        assert!(digest.contains("$12$"));
        Ok(())
    }

    #[test]
    fn overlong_password_is_rejected() -> anyhow::Result<()> {
        let hasher = hasher()?;
        let password = "a".repeat(MAX_PASSWORD_BYTES + 1);

        assert!(matches!(
            hasher.hash(&password),
            Err(HashingError::TooLong { len }) if len == MAX_PASSWORD_BYTES + 1
        ));
        Ok(())
    }

    #[test]
    fn password_at_limit_is_accepted() -> anyhow::Result<()> {
        let hasher = hasher()?;
        let password = "b".repeat(MAX_PASSWORD_BYTES);
        let digest = hasher.hash(&password)?;

        assert!(hasher.verify(&digest, &password)?);
        let longer = format!("{password}c");
        assert!(!hasher.verify(&digest, &longer)?);

        Ok(())
    }

    #[test]
    fn corrupt_digest_is_an_error() -> anyhow::Result<()> {
        let hasher = hasher()?;
        assert!(matches!(
            hasher.verify("not_a_bcrypt_digest", "Passw0rd!"),
            Err(HashingError::InvalidDigest(_))
        ));
        Ok(())
    }

    #[test]
    fn dummy_verification_never_matches() -> anyhow::Result<()> {
        let hasher = hasher()?;
        assert!(!hasher.verify_dummy("Passw0rd!"));
        assert!(!hasher.verify_dummy(""));
        Ok(())
    }

    #[test]
    fn dummy_digest_is_ready_on_construction() -> anyhow::Result<()> {
        let hasher = hasher()?;
        assert!(hasher.dummy_digest.starts_with("$2"));
        assert!(hasher.dummy_digest.contains("$04$"));
        Ok(())
    }

    #[test]
    fn every_verification_runs_bcrypt_once() -> anyhow::Result<()> {
        let hasher = hasher()?;
        let digest = hasher.hash("Passw0rd!")?;
        let overlong = "x".repeat(MAX_PASSWORD_BYTES + 28);

        assert!(!hasher.verify(&digest, "Passw0rd?")?);
        assert!(!hasher.verify(&digest, &overlong)?);
        assert!(!hasher.verify_dummy(&overlong));
        assert_eq!(hasher.verifications(), 3);
        Ok(())
    }
}
