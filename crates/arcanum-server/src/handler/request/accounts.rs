//! Account request types.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for updating the current account's profile.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    /// New display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}
