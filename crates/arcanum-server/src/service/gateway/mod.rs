//! Register, login, refresh and logout orchestration.
//!
//! Sessions move through `Anonymous -> Authenticated -> Refreshed* -> Revoked`.
//! The persisted [`SessionRecord`] is the authority on whether a refresh token
//! is still honored: a valid signature alone is never enough.
//!
//! Refresh tokens are reused, not rotated. Every refresh returns a new access
//! token and leaves the session record untouched until logout or expiry.
//!
//! [`SessionRecord`]: crate::service::store::SessionRecord

mod error;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use uuid::Uuid;

pub use self::error::{AuthError, AuthResult};
use crate::TRACING_TARGET_GATEWAY;
use crate::service::security::{
    Claims, HashingError, MAX_PASSWORD_BYTES, PasswordHasher, TokenError, TokenIssuer,
    TokenNamespace,
};
use crate::service::store::{
    Account, AccountStore, NewAccount, NewSession, SessionStore, StoreError, TokenIdentity,
    normalize_email,
};

/// Shortest accepted password, in bytes.
pub const MIN_PASSWORD_BYTES: usize = 8;

/// Token pair returned by register and login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub account: Account,
}

/// Returns `Ok` only for claims carrying the premium entitlement.
pub fn authorize_premium(claims: &Claims) -> AuthResult<()> {
    if claims.is_premium {
        Ok(())
    } else {
        Err(AuthError::Forbidden("Premium subscription required".into()))
    }
}

struct AuthGatewayInner {
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    store_timeout: Duration,
}

/// Entry point of the authentication core.
///
/// Holds no mutable state of its own; every operation can run in parallel.
#[derive(Clone)]
pub struct AuthGateway {
    inner: Arc<AuthGatewayInner>,
}

impl AuthGateway {
    /// Assembles the gateway from its collaborators.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        store_timeout: Duration,
    ) -> Self {
        let inner = AuthGatewayInner {
            accounts,
            sessions,
            hasher,
            issuer,
            store_timeout,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Creates an account and opens its first session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AuthResult<AuthSession> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::validation("Email is required"));
        }

        if display_name.trim().is_empty() {
            return Err(AuthError::validation("Name is required"));
        }

        if password.len() < MIN_PASSWORD_BYTES {
            return Err(AuthError::validation(format!(
                "Password must be at least {MIN_PASSWORD_BYTES} characters"
            )));
        }

        let password_hash = self.hash_password(password.to_owned()).await?;
        let new_account = NewAccount {
            email,
            password_hash,
            display_name: display_name.to_owned(),
        };

        let account = match self
            .deadline(self.inner.accounts.create_account(new_account))
            .await
        {
            Ok(account) => account,
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(
                    target: TRACING_TARGET_GATEWAY,
                    "registration rejected: email already exists"
                );
                return Err(AuthError::Conflict(
                    "User with this email already exists".into(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            target: TRACING_TARGET_GATEWAY,
            account_id = %account.id,
            "account registered"
        );

        self.open_session(account).await
    }

    /// Verifies credentials and opens a new session.
    ///
    /// An unknown email and a wrong password produce the same error and cost
    /// the same amount of hashing work.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let account = self
            .deadline(self.inner.accounts.find_account_by_email(email))
            .await?;

        let Some(account) = account else {
            let hasher = self.inner.hasher.clone();
            let password = password.to_owned();
            tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
                .await
                .map_err(|e| AuthError::internal(format!("verification task failed: {e}")))?;

            tracing::debug!(target: TRACING_TARGET_GATEWAY, "login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let hasher = self.inner.hasher.clone();
        let digest = account.password_hash.clone();
        let candidate = password.to_owned();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&digest, &candidate))
            .await
            .map_err(|e| AuthError::internal(format!("verification task failed: {e}")))?;

        match verified {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    target: TRACING_TARGET_GATEWAY,
                    account_id = %account.id,
                    "login rejected"
                );
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET_GATEWAY,
                    account_id = %account.id,
                    error = %e,
                    "stored password digest is unusable"
                );
                return Err(AuthError::internal("password verification failed"));
            }
        }

        tracing::info!(
            target: TRACING_TARGET_GATEWAY,
            account_id = %account.id,
            "login succeeded"
        );

        self.open_session(account).await
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// The refresh token itself stays valid and is not reissued.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<String> {
        let claims = self
            .inner
            .issuer
            .verify(refresh_token, TokenNamespace::Refresh)
            .map_err(|e| match e {
                TokenError::Expired => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })?;

        let identity = TokenIdentity::from_token(refresh_token);
        let session = match self
            .deadline(self.inner.sessions.find_by_token_identity(&identity))
            .await
        {
            Ok(session) => session,
            Err(StoreError::NotFound) => {
                tracing::debug!(
                    target: TRACING_TARGET_GATEWAY,
                    account_id = %claims.sub,
                    "refresh rejected: session revoked or unknown"
                );
                return Err(AuthError::InvalidToken);
            }
            Err(err) => return Err(err.into()),
        };

        let now = Timestamp::now();
        if session.is_expired_at(now) {
            tracing::debug!(
                target: TRACING_TARGET_GATEWAY,
                account_id = %session.account_id,
                "refresh rejected: session expired"
            );
            return Err(AuthError::Expired);
        }

        if session.account_id != claims.sub {
            tracing::warn!(
                target: TRACING_TARGET_GATEWAY,
                account_id = %session.account_id,
                subject = %claims.sub,
                "refresh token subject does not match its session"
            );
            return Err(AuthError::InvalidToken);
        }

        let account = self
            .deadline(self.inner.accounts.find_account_by_id(session.account_id))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let access = self
            .inner
            .issuer
            .mint_access(
                account.id,
                &account.email,
                account.has_active_premium(now),
                self.inner.issuer.access_ttl(),
            )
            .map_err(|e| AuthError::internal(e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_GATEWAY,
            account_id = %account.id,
            "access token refreshed"
        );

        Ok(access.token)
    }

    /// Revokes the session behind a refresh token.
    ///
    /// Succeeds whether or not the session still existed.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        let identity = TokenIdentity::from_token(refresh_token);
        match self
            .deadline(self.inner.sessions.delete_by_token_identity(&identity))
            .await
        {
            Ok(()) => {
                tracing::info!(target: TRACING_TARGET_GATEWAY, "session revoked");
                Ok(())
            }
            Err(StoreError::NotFound) => {
                tracing::debug!(
                    target: TRACING_TARGET_GATEWAY,
                    "logout for an already revoked session"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Revokes every session of an account and returns how many were removed.
    pub async fn revoke_all(&self, account_id: Uuid) -> AuthResult<usize> {
        let revoked = self
            .deadline(self.inner.sessions.delete_all_by_account(account_id))
            .await?;

        tracing::info!(
            target: TRACING_TARGET_GATEWAY,
            account_id = %account_id,
            revoked,
            "all sessions revoked"
        );

        Ok(revoked)
    }

    /// Deletes every expired refresh session and returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> AuthResult<usize> {
        let purged = self
            .deadline(self.inner.sessions.purge_expired(Timestamp::now()))
            .await?;

        if purged > 0 {
            tracing::info!(
                target: TRACING_TARGET_GATEWAY,
                purged,
                "expired sessions purged"
            );
        }

        Ok(purged)
    }

    /// Loads an account by id.
    pub async fn account(&self, account_id: Uuid) -> AuthResult<Account> {
        self.deadline(self.inner.accounts.find_account_by_id(account_id))
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))
    }

    /// Changes an account's display name.
    pub async fn update_profile(&self, account_id: Uuid, display_name: &str) -> AuthResult<Account> {
        if display_name.trim().is_empty() {
            return Err(AuthError::validation("Name is required"));
        }

        match self
            .deadline(self.inner.accounts.update_display_name(account_id, display_name))
            .await
        {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(AuthError::NotFound("User not found".into())),
            Err(err) => Err(err.into()),
        }
    }

    /// Mints a token pair for the account and persists the refresh session.
    async fn open_session(&self, account: Account) -> AuthResult<AuthSession> {
        let issuer = &self.inner.issuer;
        let is_premium = account.has_active_premium(Timestamp::now());

        let access = issuer
            .mint_access(account.id, &account.email, is_premium, issuer.access_ttl())
            .map_err(|e| AuthError::internal(e.to_string()))?;
        let refresh = issuer
            .mint_refresh(account.id, issuer.refresh_ttl())
            .map_err(|e| AuthError::internal(e.to_string()))?;

        let new_session = NewSession {
            account_id: account.id,
            token_identity: TokenIdentity::from_token(&refresh.token),
            expires_at: refresh.claims.expires_at(),
        };

        match self
            .deadline(self.inner.sessions.create_session(new_session))
            .await
        {
            Ok(_) => {}
            Err(StoreError::Conflict { .. }) => {
                // Two refresh tokens with the same digest means a broken issuer.
                return Err(AuthError::internal("refresh token identity collision"));
            }
            Err(err) => return Err(err.into()),
        }

        Ok(AuthSession {
            access_token: access.token,
            refresh_token: refresh.token,
            account,
        })
    }

    async fn hash_password(&self, password: String) -> AuthResult<String> {
        let hasher = self.inner.hasher.clone();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::internal(format!("hashing task failed: {e}")))?;

        hashed.map_err(|e| match e {
            HashingError::TooLong { .. } => AuthError::validation(format!(
                "Password must be at most {MAX_PASSWORD_BYTES} bytes"
            )),
            other => AuthError::internal(other.to_string()),
        })
    }

    /// Bounds a store call by the configured deadline.
    async fn deadline<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let timeout = self.inner.store_timeout;
        tokio::time::timeout(timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(timeout))?
    }
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("issuer", &self.inner.issuer)
            .field("store_timeout", &self.inner.store_timeout)
            .finish_non_exhaustive()
    }
}
