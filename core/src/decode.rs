//! Optional typed decoding of the raw JSON text the client returns.
//!
//! The client itself never parses successful responses; these helpers are for
//! callers that know the shape they expect.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, ApiError> {
    serde_json::from_str(raw).map_err(ApiError::Deserialization)
}

/// The `error` field of an error object, whether the provider sent it or the
/// executor synthesized it from the reason phrase.
pub fn error_message(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}
