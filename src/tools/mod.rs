//! Tool layer: gated actions exposed as callable tools.

pub mod arguments;
pub mod builtin;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use tool::{GatedTool, Tool, ToolExecutionContext};
pub use types::ToolParameters;
