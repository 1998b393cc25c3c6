//! Built-in gated tools.
//!
//! `shipping_order` takes `num_containers` and `destination`;
//! `image_generation` takes `num_images` and `prompt`. Both are bound to a
//! session so paused calls land in that session's store.
//!
//! ```rust,no_run
//! use gatehouse::config::GateConfig;
//! use gatehouse::context::GateContext;
//! use gatehouse::tools::builtin::all_tools;
//!
//! # async fn example() -> gatehouse::error::Result<()> {
//! let context = GateContext::new(GateConfig::new());
//! let session = context.open_session("default").await?;
//! let tools = all_tools(&session)?;
//! assert_eq!(tools.len(), 2);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::action::{ApprovalAction, ImageGeneration, ShippingOrder};
use crate::error::Result;
use crate::session::Session;
use crate::tools::tool::{GatedTool, Tool};

/// `shipping_order`, gated at the session's shipping threshold.
pub fn shipping_order_tool(session: &Session) -> Result<Arc<dyn Tool>> {
    shipping_order_tool_with(session, Arc::new(ShippingOrder::new()))
}

/// `shipping_order` backed by a caller-provided action (e.g. one with a hook).
pub fn shipping_order_tool_with(
    session: &Session,
    action: Arc<dyn ApprovalAction>,
) -> Result<Arc<dyn Tool>> {
    let dispatcher = Arc::new(session.dispatcher(action)?);
    Ok(Arc::new(GatedTool::new(
        dispatcher,
        "num_containers",
        "Number of containers to ship",
        "destination",
        "Shipping destination",
    )))
}

/// `image_generation`, gated at the session's image threshold.
pub fn image_generation_tool(session: &Session) -> Result<Arc<dyn Tool>> {
    let dispatcher = Arc::new(session.dispatcher(Arc::new(ImageGeneration::new()))?);
    Ok(Arc::new(GatedTool::new(
        dispatcher,
        "num_images",
        "Number of images to generate",
        "prompt",
        "Prompt describing the image content",
    )))
}

/// Both built-in tools bound to `session`.
pub fn all_tools(session: &Session) -> Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![
        shipping_order_tool(session)?,
        image_generation_tool(session)?,
    ])
}
