//! Approval gate: decides whether a request may proceed on its own.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{GateError, Result};

/// How a request must be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Classification {
    /// At or under the threshold.
    AutoApprove,
    /// Over the threshold; a human must confirm.
    RequiresConfirmation,
}

/// Threshold classifier. Pure; holds no state beyond the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalGate {
    threshold: u32,
}

impl ApprovalGate {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Validate a raw quantity into a unit count.
    pub fn validate(quantity: i64) -> Result<u32> {
        if quantity <= 0 {
            return Err(GateError::InvalidQuantity(quantity));
        }
        u32::try_from(quantity)
            .map_err(|_| GateError::InvalidInput(format!("quantity {quantity} is too large")))
    }

    /// Classify a raw quantity against the threshold.
    pub fn classify(&self, quantity: i64) -> Result<Classification> {
        let quantity = Self::validate(quantity)?;
        Ok(self.classify_units(quantity))
    }

    pub(crate) fn classify_units(&self, quantity: u32) -> Classification {
        if quantity <= self.threshold {
            Classification::AutoApprove
        } else {
            Classification::RequiresConfirmation
        }
    }
}
