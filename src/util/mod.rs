//! Utility modules: retry, per-token locking.

pub mod locks;
pub mod retry;
