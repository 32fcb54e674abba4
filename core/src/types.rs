//! Request payloads for the account API.
//!
//! # Design
//! Optional fields are modelled as `Option`, `Vec` or `Map` and skipped by
//! serde when absent or empty, so the provider never sees `null`, `""`, `[]`
//! or `{}` for a field the caller did not set. Field order matches the order
//! the provider documents and is preserved on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form account attributes stored by the provider (name, phone, ...).
pub type AccountInfo = Map<String, Value>;

/// Request payload for creating an account. Only `email` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub username: Option<String>,
    /// Subscription identifiers to activate on the new account.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub purchases: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub info: AccountInfo,
}

impl NewAccount {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            ..Self::default()
        }
    }

    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn purchase(mut self, subscription_id: &str) -> Self {
        self.purchases.push(subscription_id.to_string());
        self
    }

    pub fn info(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.info.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AccountUpdate<'a> {
    pub info: &'a AccountInfo,
}

/// An absent or empty password serializes to `{}`.
#[derive(Debug, Serialize)]
pub(crate) struct PasswordReset<'a> {
    #[serde(skip_serializing_if = "is_blank")]
    pub password: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubscriptionChange<'a> {
    pub id: &'a str,
    pub valid: bool,
}

fn is_blank<S: AsRef<str>>(value: &Option<S>) -> bool {
    value.as_ref().map_or(true, |s| s.as_ref().is_empty())
}
