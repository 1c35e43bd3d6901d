//! Base types and error handling.
//!
//! Provides foundational types shared by every layer:
//! - [`neterror::NetError`]: the crate-wide error taxonomy
//! - [`context::RequestContext`]: request-scoped typed context map
//! - [`strategy::ExecutionStrategy`]: offloading decisions, incl. the
//!   connect-time strategy and the I/O-thread marker
//! - [`message`]: request/response metadata and bodies

pub mod context;
pub mod message;
pub mod neterror;
pub mod strategy;
