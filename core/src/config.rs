//! Client configuration and base-address composition.
//!
//! Every tenant of the provider gets its own hostname built from an operator
//! and a node identifier: `http://{operator}.{node}.lfstrm.tv/v2/`.
//! `base_url` replaces the computed address entirely, which is how tests
//! point the client at a local mock server.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_DOMAIN: &str = "lfstrm.tv";
pub const API_VERSION: &str = "v2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub operator: String,
    pub node: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    pub fn new(operator: &str, node: &str) -> Self {
        Self {
            operator: operator.to_string(),
            node: node.to_string(),
            domain: default_domain(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: None,
        }
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Only emptiness is checked; identifiers are otherwise passed through
    /// into the hostname as given.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.operator.is_empty() {
            return Err(ApiError::InvalidConfig("operator must not be empty".to_string()));
        }
        if self.node.is_empty() {
            return Err(ApiError::InvalidConfig("node must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ApiError::InvalidConfig("timeout must be at least one second".to_string()));
        }
        match self.base_url.as_deref() {
            Some(url) if url.trim_end_matches('/').is_empty() => {
                Err(ApiError::InvalidConfig("base_url must not be empty".to_string()))
            }
            None if self.domain.is_empty() => {
                Err(ApiError::InvalidConfig("domain must not be empty".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Base address every relative path is resolved against. Always ends in `/`.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => format!("{}/", url.trim_end_matches('/')),
            None => format!(
                "http://{}.{}.{}/{API_VERSION}/",
                self.operator, self.node, self.domain
            ),
        }
    }
}
