//! Gatehouse: resumable human-in-the-loop approval for tool calls.
//!
//! A gated tool call either proceeds on its own (small requests) or pauses
//! with a correlation token until a human confirms or rejects it. The pause
//! is an explicit, persisted state; the caller re-invokes with the token and
//! the decision, possibly from another process.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gatehouse::prelude::*;
//!
//! # async fn example() -> gatehouse::error::Result<()> {
//! let context = GateContext::new(GateConfig::from_env()?);
//! let session = context.open_session("default").await?;
//! let shipping = session.dispatcher(Arc::new(ShippingOrder::new()))?;
//!
//! let paused = shipping.dispatch(ToolCall::new(7, "Rotterdam")).await?;
//! assert!(paused.is_pending());
//!
//! let done = shipping.resume(&paused.token, Confirmation::approve()).await?;
//! assert_eq!(done.result_id.as_deref(), Some("ORD-7-HUMAN"));
//!
//! context.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod prelude;
pub mod session;
pub mod store;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
