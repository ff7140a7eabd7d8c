//! JSON extractors that reject with descriptive [`Error`]s.
//!
//! [`Error`]: crate::handler::Error

mod enhanced_json;
mod validated_json;

pub use self::enhanced_json::Json;
pub use self::validated_json::ValidateJson;
