//! Requests and their correlation tokens.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GateError, Result};

/// Correlation token tying a paused request to its later resumption.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(String);

impl RequestToken {
    /// Wrap a caller-supplied token. Blank tokens are rejected.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(GateError::InvalidInput("token must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A request submitted through a gated action. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub token: RequestToken,
    /// Name of the action the request belongs to (e.g. `shipping_order`).
    pub action: String,
    pub quantity: u32,
    /// Opaque target descriptor: a destination, a prompt.
    pub target: String,
    pub created_at: DateTime<Utc>,
}

impl Request {
    pub fn new(
        token: RequestToken,
        action: impl Into<String>,
        quantity: u32,
        target: impl Into<String>,
    ) -> Self {
        Self {
            token,
            action: action.into(),
            quantity,
            target: target.into(),
            created_at: Utc::now(),
        }
    }

    /// Hex SHA-256 over the fields that identify the request's payload.
    ///
    /// Two invocations with the same token and fingerprint are the same
    /// request; a different fingerprint under a live token is a conflict.
    pub fn fingerprint(&self) -> String {
        payload_fingerprint(&self.action, self.quantity, &self.target)
    }
}

pub(crate) fn payload_fingerprint(action: &str, quantity: u32, target: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action.as_bytes());
    hasher.update([0u8]);
    hasher.update(quantity.to_be_bytes());
    hasher.update([0u8]);
    hasher.update(target.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
