//! Connection establishment and per-connection concurrency control.
//!
//! - [`factory`]: the load-balance-aware connection factory
//! - [`concurrency`]: reservation-capable request concurrency controller
//! - [`events`]: named transport event streams and close signals
//! - [`observer`]: transport observers
//! - [`transport`]: trait seams for suppliers, filters, and raw connections
//! - [`lb`]: the composed load-balanced connection returned to callers

pub mod concurrency;
pub mod events;
pub mod factory;
pub mod lb;
pub mod observer;
pub mod transport;
