//! Human decisions on paused requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::RequestToken;

/// The confirmation a caller attaches when resuming a paused request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Confirmation {
    pub fn approve() -> Self {
        Self {
            confirmed: true,
            note: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            confirmed: false,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A recorded decision. Written once when the request resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub token: RequestToken,
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    pub fn from_confirmation(token: RequestToken, confirmation: Confirmation) -> Self {
        Self {
            token,
            confirmed: confirmation.confirmed,
            note: confirmation.note,
            decided_at: Utc::now(),
        }
    }
}
