//! Outcomes and the structured result handed back to the tool layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where a request ended up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    AutoApproved,
    Approved,
    Rejected,
    Pending,
}

impl Outcome {
    /// Caller-facing status. Auto-approval reports as `approved`.
    pub fn status(self) -> ResultStatus {
        match self {
            Self::AutoApproved | Self::Approved => ResultStatus::Approved,
            Self::Rejected => ResultStatus::Rejected,
            Self::Pending => ResultStatus::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Status reported to the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResultStatus {
    Approved,
    Rejected,
    Pending,
}

/// Structured result of a gated tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ResultStatus,
    pub outcome: Outcome,
    /// Token to present when resuming; echoed on every result.
    pub token: String,
    /// Identifier produced by the action; present only when approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    pub message: String,
    /// Prompt to show the human while the request is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ToolResult {
    pub fn is_pending(&self) -> bool {
        self.status == ResultStatus::Pending
    }
}
