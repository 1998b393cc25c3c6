//! Convenience re-exports for common use.

pub use crate::action::{ApprovalAction, ApprovalMode, ImageGeneration, ShippingOrder};
pub use crate::config::{GateConfig, StoreBackend};
pub use crate::context::GateContext;
pub use crate::dispatcher::{DispatchEvent, DispatchEventKind, ResumeDispatcher};
pub use crate::error::{GateError, Result};
pub use crate::gate::{ApprovalGate, Classification};
pub use crate::session::Session;
pub use crate::store::{PendingStore, RecordPhase};
pub use crate::tools::{Tool, ToolArguments, ToolExecutionContext};
pub use crate::types::{Confirmation, Outcome, ResultStatus, ToolCall, ToolResult};
