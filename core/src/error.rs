//! Error types for the Smotreshka API client.
//!
//! # Design
//! Responses the provider rejects (4xx/5xx) are not errors here: the executor
//! folds them into JSON text. `ApiError` only covers the cases where there is
//! no response text to hand back at all: bad configuration, a payload that
//! cannot be encoded, or a request that never got an answer.

use thiserror::Error;

/// Errors returned by `SmotreshkaClient` and the decode helpers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Operator, node, domain or timeout failed validation at construction.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// No response was received: DNS failure, refused connection, timeout,
    /// or a response body that could not be read.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Raw response text could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}
