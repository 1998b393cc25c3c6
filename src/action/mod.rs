//! Gated actions: the side effect an approved request performs.

pub mod image;
pub mod shipping;

pub use image::ImageGeneration;
pub use shipping::ShippingOrder;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Result;
use crate::types::Request;

/// How an approved request got its approval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalMode {
    /// Under the threshold, no human involved.
    Auto,
    /// A human confirmed the paused request.
    Human,
}

impl ApprovalMode {
    /// Suffix used in result identifiers (`ORD-7-HUMAN`).
    pub fn id_suffix(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Human => "HUMAN",
        }
    }
}

/// Async hook run as the real side effect of an approved request.
pub type ActionHook =
    Arc<dyn Fn(Request, ApprovalMode) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// An action that may be gated behind human confirmation.
///
/// The dispatcher calls [`execute`](Self::execute) at most once per token;
/// the message methods only format text for the caller.
#[async_trait]
pub trait ApprovalAction: Send + Sync {
    /// Stable action name, also used as the tool name.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Message returned while the request waits for confirmation.
    fn pending_message(&self, request: &Request) -> String;

    /// Question shown to the human asked to confirm.
    fn confirmation_hint(&self, request: &Request) -> String;

    fn approved_message(&self, request: &Request, mode: ApprovalMode) -> String;

    fn rejected_message(&self, request: &Request) -> String;

    /// Perform the side effect and return its result identifier.
    async fn execute(&self, request: &Request, mode: ApprovalMode) -> Result<String>;
}

/// Look up a built-in action by name.
pub fn builtin_action(name: &str) -> Option<Arc<dyn ApprovalAction>> {
    match name {
        ShippingOrder::NAME => Some(Arc::new(ShippingOrder::new())),
        ImageGeneration::NAME => Some(Arc::new(ImageGeneration::new())),
        _ => None,
    }
}

async fn run_hook(hook: Option<&ActionHook>, request: &Request, mode: ApprovalMode) -> Result<()> {
    match hook {
        Some(hook) => hook(request.clone(), mode).await,
        None => Ok(()),
    }
}
