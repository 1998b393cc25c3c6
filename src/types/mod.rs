//! Core types for gatehouse.

pub mod call;
pub mod decision;
pub mod outcome;
pub mod request;

pub use call::*;
pub use decision::*;
pub use outcome::*;
pub use request::*;
