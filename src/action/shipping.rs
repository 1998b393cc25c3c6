//! Container shipping orders.

use async_trait::async_trait;

use super::{run_hook, ActionHook, ApprovalAction, ApprovalMode};
use crate::error::Result;
use crate::types::Request;

/// Places a shipping order for `quantity` containers to `target`.
///
/// Order identifiers are `ORD-<containers>-AUTO` or `ORD-<containers>-HUMAN`.
#[derive(Default)]
pub struct ShippingOrder {
    hook: Option<ActionHook>,
}

impl ShippingOrder {
    pub const NAME: &'static str = "shipping_order";

    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` whenever an order is actually placed.
    pub fn with_hook(mut self, hook: ActionHook) -> Self {
        self.hook = Some(hook);
        self
    }
}

#[async_trait]
impl ApprovalAction for ShippingOrder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Places a shipping order. Large orders require human approval."
    }

    fn pending_message(&self, request: &Request) -> String {
        format!(
            "Order for {} containers requires approval",
            request.quantity
        )
    }

    fn confirmation_hint(&self, request: &Request) -> String {
        format!(
            "Large order: {} containers to {}. Do you want to approve?",
            request.quantity, request.target
        )
    }

    fn approved_message(&self, request: &Request, mode: ApprovalMode) -> String {
        match mode {
            ApprovalMode::Auto => format!(
                "Order auto-approved: {} containers to {}",
                request.quantity, request.target
            ),
            ApprovalMode::Human => format!(
                "Order approved: {} containers to {}",
                request.quantity, request.target
            ),
        }
    }

    fn rejected_message(&self, request: &Request) -> String {
        format!(
            "Order rejected: {} containers to {}",
            request.quantity, request.target
        )
    }

    async fn execute(&self, request: &Request, mode: ApprovalMode) -> Result<String> {
        run_hook(self.hook.as_ref(), request, mode).await?;
        Ok(format!("ORD-{}-{}", request.quantity, mode.id_suffix()))
    }
}

impl std::fmt::Debug for ShippingOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingOrder")
            .field("hook", &self.hook.as_ref().map(|_| ".."))
            .finish()
    }
}
