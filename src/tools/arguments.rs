//! Typed access to tool call arguments.

use crate::error::GateError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    /// Wrap raw arguments. A JSON string is parsed as an encoded object;
    /// an empty string means no arguments.
    pub fn new(value: serde_json::Value) -> Result<Self, GateError> {
        let value = match value {
            serde_json::Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(trimmed).map_err(|e| {
                        GateError::InvalidInput(format!("Failed to parse arguments: {e}"))
                    })?
                }
            }
            other => other,
        };
        Ok(Self { value })
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, GateError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| GateError::InvalidInput(format!("Missing string argument: {key}")))
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, GateError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| GateError::InvalidInput(format!("Missing integer argument: {key}")))
    }
}
