//! Signed access and refresh tokens.
//!
//! Access and refresh tokens are HS256 JWTs signed with two physically
//! distinct secrets. A token minted in one namespace never verifies in the
//! other: the signature fails first, and the `typ` claim is checked as well.

use std::fmt;
use std::sync::Arc;

#[cfg(any(test, feature = "config"))]
use clap::Args;
use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::{Error, Result, TRACING_TARGET_TOKEN_ISSUER};

/// Minimum length of each signing secret.
pub const MIN_SECRET_BYTES: usize = 32;

/// Signing secrets, lifetimes and clock leeway for issued tokens.
#[derive(Clone, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
pub struct TokenConfig {
    /// Secret for signing access tokens (at least 32 bytes).
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "JWT_SECRET", hide_env_values = true)
    )]
    pub jwt_secret: String,

    /// Access token lifetime in seconds.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "JWT_EXPIRATION_SECS", default_value_t = 900)
    )]
    #[serde(default = "TokenConfig::default_access_ttl")]
    pub jwt_expiration_secs: u64,

    /// Secret for signing refresh tokens (at least 32 bytes, distinct from the access secret).
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "REFRESH_TOKEN_SECRET", hide_env_values = true)
    )]
    pub refresh_token_secret: String,

    /// Refresh token lifetime in seconds.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "REFRESH_TOKEN_EXPIRATION_SECS", default_value_t = 604_800)
    )]
    #[serde(default = "TokenConfig::default_refresh_ttl")]
    pub refresh_token_expiration_secs: u64,

    /// Clock-skew leeway in seconds applied to expiry checks.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "TOKEN_LEEWAY_SECS", default_value_t = 0)
    )]
    #[serde(default)]
    pub token_leeway_secs: u64,
}

impl TokenConfig {
    fn default_access_ttl() -> u64 {
        900
    }

    fn default_refresh_ttl() -> u64 {
        604_800
    }

    /// Creates a configuration with default lifetimes and no leeway.
    pub fn new(jwt_secret: impl Into<String>, refresh_token_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_expiration_secs: Self::default_access_ttl(),
            refresh_token_secret: refresh_token_secret.into(),
            refresh_token_expiration_secs: Self::default_refresh_ttl(),
            token_leeway_secs: 0,
        }
    }

    /// Returns the access token lifetime.
    pub fn access_ttl(&self) -> SignedDuration {
        SignedDuration::from_secs(i64::try_from(self.jwt_expiration_secs).unwrap_or(i64::MAX))
    }

    /// Returns the refresh token lifetime.
    pub fn refresh_ttl(&self) -> SignedDuration {
        SignedDuration::from_secs(
            i64::try_from(self.refresh_token_expiration_secs).unwrap_or(i64::MAX),
        )
    }

    /// Checks secret length, secret separation and lifetimes.
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(Error::config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        if self.refresh_token_secret.len() < MIN_SECRET_BYTES {
            return Err(Error::config(format!(
                "REFRESH_TOKEN_SECRET must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        if self.jwt_secret == self.refresh_token_secret {
            return Err(Error::config(
                "JWT_SECRET and REFRESH_TOKEN_SECRET must differ",
            ));
        }

        if self.jwt_expiration_secs == 0 || self.refresh_token_expiration_secs == 0 {
            return Err(Error::config("token lifetimes must be greater than 0"));
        }

        if self.jwt_expiration_secs > self.refresh_token_expiration_secs {
            return Err(Error::config(
                "access token lifetime cannot exceed refresh token lifetime",
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("refresh_token_secret", &"[REDACTED]")
            .field(
                "refresh_token_expiration_secs",
                &self.refresh_token_expiration_secs,
            )
            .field("token_leeway_secs", &self.token_leeway_secs)
            .finish()
    }
}

/// Signing scope of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TokenNamespace {
    Access,
    Refresh,
}

/// Identity carried inside a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: Uuid,
    /// Account email, access tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Premium entitlement at mint time, access tokens only.
    #[serde(rename = "isPremium", default)]
    pub is_premium: bool,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expires-at, seconds since the epoch.
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
    /// Namespace the token was minted in.
    pub typ: TokenNamespace,
}

impl Claims {
    /// Returns the expiry as a timestamp.
    pub fn expires_at(&self) -> Timestamp {
        Timestamp::from_second(self.exp).unwrap_or(Timestamp::MAX)
    }

    fn with_access_fields(mut self, email: &str, is_premium: bool) -> Self {
        self.email = Some(email.to_owned());
        self.is_premium = is_premium;
        self
    }
}

/// A freshly minted token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Claims,
}

/// Reasons a token fails to mint or verify.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Not a structurally valid token, or one with an unexpected algorithm.
    #[error("token is malformed")]
    Malformed,
    /// Signed with neither namespace's key.
    #[error("token signature is invalid")]
    SignatureInvalid,
    /// The embedded expiry has passed.
    #[error("token has expired")]
    Expired,
    /// Valid, but minted for the other namespace.
    #[error("token belongs to a different namespace")]
    WrongNamespace,
    /// Signing failed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

struct NamespaceKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl NamespaceKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

struct TokenIssuerInner {
    access: NamespaceKeys,
    refresh: NamespaceKeys,
    access_ttl: SignedDuration,
    refresh_ttl: SignedDuration,
    leeway_secs: u64,
}

/// Mints and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    inner: Arc<TokenIssuerInner>,
}

impl TokenIssuer {
    /// Builds the issuer after validating the configuration.
    pub fn new(config: &TokenConfig) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            target: TRACING_TARGET_TOKEN_ISSUER,
            access_ttl_secs = config.jwt_expiration_secs,
            refresh_ttl_secs = config.refresh_token_expiration_secs,
            leeway_secs = config.token_leeway_secs,
            "token issuer initialized"
        );

        let inner = TokenIssuerInner {
            access: NamespaceKeys::from_secret(&config.jwt_secret),
            refresh: NamespaceKeys::from_secret(&config.refresh_token_secret),
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
            leeway_secs: config.token_leeway_secs,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Configured access token lifetime.
    #[inline]
    pub fn access_ttl(&self) -> SignedDuration {
        self.inner.access_ttl
    }

    /// Configured refresh token lifetime.
    #[inline]
    pub fn refresh_ttl(&self) -> SignedDuration {
        self.inner.refresh_ttl
    }

    /// Mints an access token.
    pub fn mint_access(
        &self,
        subject: Uuid,
        email: &str,
        is_premium: bool,
        ttl: SignedDuration,
    ) -> Result<SignedToken, TokenError> {
        let claims = Self::claims(subject, TokenNamespace::Access, ttl)
            .with_access_fields(email, is_premium);
        self.sign(claims)
    }

    /// Mints a refresh token.
    pub fn mint_refresh(&self, subject: Uuid, ttl: SignedDuration) -> Result<SignedToken, TokenError> {
        let claims = Self::claims(subject, TokenNamespace::Refresh, ttl);
        self.sign(claims)
    }

    /// Verifies a token against the given namespace.
    pub fn verify(&self, token: &str, namespace: TokenNamespace) -> Result<Claims, TokenError> {
        let keys = self.keys(namespace);
        let claims = match decode::<Claims>(token, &keys.decoding, &self.validation(true)) {
            Ok(data) => data.claims,
            Err(e) if matches!(e.kind(), JwtErrorKind::InvalidSignature) => {
                return Err(self.classify_bad_signature(token, namespace));
            }
            Err(e) => return Err(Self::classify(&e)),
        };

        if claims.typ != namespace {
            tracing::warn!(
                target: TRACING_TARGET_TOKEN_ISSUER,
                expected = %namespace,
                found = %claims.typ,
                "token type does not match namespace"
            );
            return Err(TokenError::WrongNamespace);
        }

        // Zero grace: a token expiring this very second is already expired.
        let leeway = i64::try_from(self.inner.leeway_secs).unwrap_or(i64::MAX);
        if claims.exp.saturating_add(leeway) <= Timestamp::now().as_second() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn claims(subject: Uuid, typ: TokenNamespace, ttl: SignedDuration) -> Claims {
        let iat = Timestamp::now().as_second();
        Claims {
            sub: subject,
            email: None,
            is_premium: false,
            iat,
            exp: iat.saturating_add(ttl.as_secs()),
            jti: Uuid::new_v4(),
            typ,
        }
    }

    fn sign(&self, claims: Claims) -> Result<SignedToken, TokenError> {
        let keys = self.keys(claims.typ);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_TOKEN_ISSUER,
                error = %e,
                namespace = %claims.typ,
                "failed to sign token"
            );
            TokenError::Signing(e.to_string())
        })?;

        Ok(SignedToken { token, claims })
    }

    fn keys(&self, namespace: TokenNamespace) -> &NamespaceKeys {
        match namespace {
            TokenNamespace::Access => &self.inner.access,
            TokenNamespace::Refresh => &self.inner.refresh,
        }
    }

    fn validation(&self, validate_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.inner.leeway_secs;
        validation.validate_exp = validate_exp;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        validation
    }

    /// Distinguishes a token from the other namespace from a forged one.
    fn classify_bad_signature(&self, token: &str, namespace: TokenNamespace) -> TokenError {
        let other = match namespace {
            TokenNamespace::Access => TokenNamespace::Refresh,
            TokenNamespace::Refresh => TokenNamespace::Access,
        };

        let decoded = decode::<Claims>(token, &self.keys(other).decoding, &self.validation(false));
        if decoded.is_ok() {
            tracing::warn!(
                target: TRACING_TARGET_TOKEN_ISSUER,
                expected = %namespace,
                "token signed for another namespace"
            );
            TokenError::WrongNamespace
        } else {
            tracing::debug!(
                target: TRACING_TARGET_TOKEN_ISSUER,
                expected = %namespace,
                "token signature rejected"
            );
            TokenError::SignatureInvalid
        }
    }

    fn classify(error: &JwtError) -> TokenError {
        match error.kind() {
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            JwtErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            _ => {
                tracing::debug!(
                    target: TRACING_TARGET_TOKEN_ISSUER,
                    error = %error,
                    "malformed token"
                );
                TokenError::Malformed
            }
        }
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.inner.access_ttl)
            .field("refresh_ttl", &self.inner.refresh_ttl)
            .field("leeway_secs", &self.inner.leeway_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &str = "access-secret-for-tests-0123456789abcdef";
    const REFRESH_SECRET: &str = "refresh-secret-for-tests-0123456789abcdef";

    fn issuer() -> anyhow::Result<TokenIssuer> {
        Ok(TokenIssuer::new(&TokenConfig::new(
            ACCESS_SECRET,
            REFRESH_SECRET,
        ))?)
    }

    #[test]
    fn access_round_trip() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let subject = Uuid::new_v4();
        let signed = issuer.mint_access(subject, "a@b.com", true, issuer.access_ttl())?;

        let claims = issuer.verify(&signed.token, TokenNamespace::Access)?;
        assert_eq!(claims, signed.claims);
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
        assert!(claims.is_premium);
        assert_eq!(claims.exp - claims.iat, 900);

        Ok(())
    }

    #[test]
    fn refresh_round_trip() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let subject = Uuid::new_v4();
        let signed = issuer.mint_refresh(subject, issuer.refresh_ttl())?;

        let claims = issuer.verify(&signed.token, TokenNamespace::Refresh)?;
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.email, None);
        assert_eq!(claims.typ, TokenNamespace::Refresh);

        Ok(())
    }

    #[test]
    fn tokens_minted_together_differ() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let subject = Uuid::new_v4();
        let first = issuer.mint_refresh(subject, issuer.refresh_ttl())?;
        let second = issuer.mint_refresh(subject, issuer.refresh_ttl())?;

        assert_ne!(first.token, second.token);
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let signed =
            issuer.mint_access(Uuid::new_v4(), "a@b.com", false, SignedDuration::from_secs(-5))?;

        assert_eq!(
            issuer.verify(&signed.token, TokenNamespace::Access),
            Err(TokenError::Expired)
        );
        Ok(())
    }

    #[test]
    fn zero_ttl_token_is_already_expired() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let signed = issuer.mint_refresh(Uuid::new_v4(), SignedDuration::ZERO)?;

        assert_eq!(
            issuer.verify(&signed.token, TokenNamespace::Refresh),
            Err(TokenError::Expired)
        );
        Ok(())
    }

    #[test]
    fn leeway_admits_recently_expired_token() -> anyhow::Result<()> {
        let mut config = TokenConfig::new(ACCESS_SECRET, REFRESH_SECRET);
        config.token_leeway_secs = 60;
        let issuer = TokenIssuer::new(&config)?;
        let signed =
            issuer.mint_access(Uuid::new_v4(), "a@b.com", false, SignedDuration::from_secs(-5))?;

        assert!(issuer.verify(&signed.token, TokenNamespace::Access).is_ok());
        Ok(())
    }

    #[test]
    fn namespaces_are_isolated() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let subject = Uuid::new_v4();
        let access = issuer.mint_access(subject, "a@b.com", false, issuer.access_ttl())?;
        let refresh = issuer.mint_refresh(subject, issuer.refresh_ttl())?;

        assert_eq!(
            issuer.verify(&refresh.token, TokenNamespace::Access),
            Err(TokenError::WrongNamespace)
        );
        assert_eq!(
            issuer.verify(&access.token, TokenNamespace::Refresh),
            Err(TokenError::WrongNamespace)
        );
        Ok(())
    }

    #[test]
    fn foreign_signature_is_rejected() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let other = TokenIssuer::new(&TokenConfig::new(
            "some-other-access-secret-0123456789abcdef",
            "some-other-refresh-secret-0123456789abcdef",
        ))?;
        let signed = other.mint_access(Uuid::new_v4(), "a@b.com", false, other.access_ttl())?;

        assert_eq!(
            issuer.verify(&signed.token, TokenNamespace::Access),
            Err(TokenError::SignatureInvalid)
        );
        Ok(())
    }

    #[test]
    fn algorithm_substitution_is_rejected() -> anyhow::Result<()> {
        let issuer = issuer()?;
        let signed = issuer.mint_access(Uuid::new_v4(), "a@b.com", false, issuer.access_ttl())?;

        // Same secret, different HMAC variant.
        let hs384 = encode(
            &Header::new(Algorithm::HS384),
            &signed.claims,
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )?;
        assert!(issuer.verify(&hs384, TokenNamespace::Access).is_err());

        // Unsigned token declaring `alg: none`.
        let payload = signed.token.split('.').nth(1).unwrap_or_default();
        let unsigned = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{payload}.");
        assert!(issuer.verify(&unsigned, TokenNamespace::Access).is_err());

        Ok(())
    }

    #[test]
    fn garbage_is_malformed() -> anyhow::Result<()> {
        let issuer = issuer()?;
        assert_eq!(
            issuer.verify("not-a-token", TokenNamespace::Access),
            Err(TokenError::Malformed)
        );
        Ok(())
    }

    #[test]
    fn config_validation() {
        assert!(TokenConfig::new("short", REFRESH_SECRET).validate().is_err());
        assert!(TokenConfig::new(ACCESS_SECRET, "short").validate().is_err());
        assert!(TokenConfig::new(ACCESS_SECRET, ACCESS_SECRET).validate().is_err());
        assert!(TokenConfig::new(ACCESS_SECRET, REFRESH_SECRET).validate().is_ok());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = TokenConfig::new(ACCESS_SECRET, REFRESH_SECRET);
        let debug = format!("{config:?}");
        assert!(!debug.contains(ACCESS_SECRET));
        assert!(!debug.contains(REFRESH_SECRET));
    }
}
