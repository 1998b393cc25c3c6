//! Image generation requests.

use async_trait::async_trait;

use super::{run_hook, ActionHook, ApprovalAction, ApprovalMode};
use crate::error::Result;
use crate::types::Request;

/// Generates `quantity` images for the prompt held in `target`.
///
/// A single image goes straight through with the default thresholds; bulk
/// requests pause for confirmation.
#[derive(Default)]
pub struct ImageGeneration {
    hook: Option<ActionHook>,
}

impl ImageGeneration {
    pub const NAME: &'static str = "image_generation";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: ActionHook) -> Self {
        self.hook = Some(hook);
        self
    }
}

#[async_trait]
impl ApprovalAction for ImageGeneration {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Generates images for a prompt. Bulk requests require human approval."
    }

    fn pending_message(&self, request: &Request) -> String {
        format!("Request for {} images requires approval", request.quantity)
    }

    fn confirmation_hint(&self, request: &Request) -> String {
        format!(
            "Bulk request: {} images for \"{}\". Do you want to approve?",
            request.quantity, request.target
        )
    }

    fn approved_message(&self, request: &Request, mode: ApprovalMode) -> String {
        let noun = if request.quantity == 1 { "image" } else { "images" };
        match mode {
            ApprovalMode::Auto => format!(
                "Generating {} {noun} for \"{}\"",
                request.quantity, request.target
            ),
            ApprovalMode::Human => format!(
                "Approved: generating {} {noun} for \"{}\"",
                request.quantity, request.target
            ),
        }
    }

    fn rejected_message(&self, request: &Request) -> String {
        format!(
            "Image request rejected: {} images for \"{}\"",
            request.quantity, request.target
        )
    }

    async fn execute(&self, request: &Request, mode: ApprovalMode) -> Result<String> {
        run_hook(self.hook.as_ref(), request, mode).await?;
        Ok(format!("IMG-{}-{}", request.quantity, mode.id_suffix()))
    }
}

impl std::fmt::Debug for ImageGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageGeneration")
            .field("hook", &self.hook.as_ref().map(|_| ".."))
            .finish()
    }
}
