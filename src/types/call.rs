//! Inbound gated call.

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::decision::Confirmation;

/// A structured invocation of a gated action.
///
/// ```
/// use gatehouse::types::{Confirmation, ToolCall};
///
/// let first = ToolCall::builder().quantity(7).target("Rotterdam").build();
/// let resume = ToolCall::builder()
///     .quantity(7)
///     .target("Rotterdam")
///     .token("order-7")
///     .decision(Confirmation::approve())
///     .build();
/// assert!(first.decision.is_none());
/// assert_eq!(resume.token.as_deref(), Some("order-7"));
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    /// Requested unit count; validated by the gate.
    pub quantity: i64,
    #[builder(into)]
    pub target: String,
    /// Correlation token. Generated when absent.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Confirmation attached when resuming a paused request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Confirmation>,
}

impl ToolCall {
    pub fn new(quantity: i64, target: impl Into<String>) -> Self {
        Self {
            quantity,
            target: target.into(),
            token: None,
            decision: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_decision(mut self, decision: Confirmation) -> Self {
        self.decision = Some(decision);
        self
    }
}
