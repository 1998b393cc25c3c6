//! Tool trait and the gated tool wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use super::validation::validate_arguments;
use crate::dispatcher::ResumeDispatcher;
use crate::error::GateError;
use crate::types::{Confirmation, ToolCall};

/// Context available during tool execution.
///
/// The agent runtime fills `token` when re-invoking a paused call and
/// `confirmation` once the human has answered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolExecutionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,
}

impl ToolExecutionContext {
    pub fn resuming(token: impl Into<String>, confirmation: Confirmation) -> Self {
        Self {
            token: Some(token.into()),
            confirmation: Some(confirmation),
        }
    }
}

/// Core tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &ToolParameters;

    /// Execute the tool with parsed arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, GateError>;
}

/// A tool whose calls go through a [`ResumeDispatcher`].
///
/// Arguments are read from two named fields: a positive unit count and a
/// target string. The result is the serialized [`ToolResult`](crate::types::ToolResult).
pub struct GatedTool {
    dispatcher: Arc<ResumeDispatcher>,
    quantity_key: String,
    target_key: String,
    parameters: ToolParameters,
}

impl GatedTool {
    pub fn new(
        dispatcher: Arc<ResumeDispatcher>,
        quantity_key: impl Into<String>,
        quantity_description: &str,
        target_key: impl Into<String>,
        target_description: &str,
    ) -> Self {
        let quantity_key = quantity_key.into();
        let target_key = target_key.into();
        let parameters = ToolParameters::object()
            .positive_integer(quantity_key.clone(), quantity_description, true)
            .string(target_key.clone(), target_description, true)
            .build();
        Self {
            dispatcher,
            quantity_key,
            target_key,
            parameters,
        }
    }

    pub fn dispatcher(&self) -> &Arc<ResumeDispatcher> {
        &self.dispatcher
    }

    fn to_call(&self, args: &ToolArguments, ctx: &ToolExecutionContext) -> Result<ToolCall, GateError> {
        validate_arguments(args.raw(), &self.parameters.schema).map_err(|message| {
            GateError::InvalidInput(format!("{}: {message}", self.name()))
        })?;
        Ok(ToolCall {
            quantity: args.get_i64(&self.quantity_key)?,
            target: args.get_str(&self.target_key)?.to_string(),
            token: ctx.token.clone(),
            decision: ctx.confirmation.clone(),
        })
    }
}

#[async_trait]
impl Tool for GatedTool {
    fn name(&self) -> &str {
        self.dispatcher.action().name()
    }

    fn description(&self) -> &str {
        self.dispatcher.action().description()
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, GateError> {
        let call = self.to_call(args, ctx)?;
        let result = self.dispatcher.dispatch(call).await?;
        Ok(serde_json::to_value(result)?)
    }
}

impl std::fmt::Debug for GatedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatedTool")
            .field("name", &self.name())
            .field("quantity_key", &self.quantity_key)
            .field("target_key", &self.target_key)
            .finish()
    }
}
