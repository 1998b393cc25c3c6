//! Events emitted on dispatcher state transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Outcome;

/// Callback receiving dispatcher events.
pub type EventSink = Arc<dyn Fn(DispatchEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEventKind {
    /// NEW -> RESOLVED without a human.
    AutoApproved { result_id: String },
    /// NEW -> AWAITING_CONFIRMATION.
    Paused { hint: String },
    /// AWAITING_CONFIRMATION -> RESOLVED.
    Resolved {
        outcome: Outcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_id: Option<String>,
    },
    /// A known token was presented again; nothing re-ran.
    Replayed { outcome: Outcome },
    /// An expired awaiting record was removed.
    Reclaimed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub token: String,
    pub action: String,
    pub kind: DispatchEventKind,
    pub timestamp: DateTime<Utc>,
}

impl DispatchEvent {
    pub fn new(token: impl Into<String>, action: impl Into<String>, kind: DispatchEventKind) -> Self {
        Self {
            token: token.into(),
            action: action.into(),
            kind,
            timestamp: Utc::now(),
        }
    }
}
