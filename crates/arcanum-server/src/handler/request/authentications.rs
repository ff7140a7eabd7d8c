//! Authentication request types.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for registration.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    /// Email address of the new account.
    #[validate(email)]
    #[validate(length(min = 3, max = 254))]
    pub email: String,

    /// Password, between 8 and 72 bytes.
    #[validate(length(min = 8, max = 72))]
    pub password: String,

    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Request payload for login.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Request payload carrying a refresh token, for refresh and logout.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rules() {
        let valid = Register {
            email: "a@b.com".to_owned(),
            password: "Passw0rd!".to_owned(),
            name: "Alice".to_owned(),
        };
        assert!(valid.validate().is_ok());

        let short = Register {
            password: "short".to_owned(),
            ..valid.clone()
        };
        assert!(short.validate().is_err());

        let bad_email = Register {
            email: "not-an-email".to_owned(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let nameless = Register {
            name: String::new(),
            ..valid
        };
        assert!(nameless.validate().is_err());
    }

    #[test]
    fn refresh_token_field_is_camel_case() -> anyhow::Result<()> {
        let request: RefreshToken = serde_json::from_str(r#"{"refreshToken":"abc"}"#)?;
        assert_eq!(request.refresh_token, "abc");
        Ok(())
    }
}
