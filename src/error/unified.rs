//! Error classification and recovery.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Action,
    Storage,
    Configuration,
    Serialization,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Fix the input and call again.
    CorrectInput,
    /// Start the flow over as a new request.
    RestartFlow,
    /// Re-read the current state of the token before deciding.
    RereadState,
    RetryWithBackoff,
    CheckConfiguration,
    CheckStorage,
    ContactSupport,
}
