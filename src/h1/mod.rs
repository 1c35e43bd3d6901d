//! HTTP/1.1 wire protocol, request side.
//!
//! - [`encoder`]: serializes outbound requests onto the connection's write
//!   side and tracks the Expect/100-continue state
//! - [`signal`]: the ordered method/signal queues shared with the paired
//!   response decoder to resolve pipelined framing ambiguities
//! - [`headerutils`]: header predicates and body-length inference

pub mod encoder;
pub mod headerutils;
pub mod signal;
