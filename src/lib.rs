//! # wirenet
//!
//! The client-side connection and wire-protocol layer of a streaming HTTP
//! client stack.
//!
//! `wirenet` establishes pooled, load-balance-aware connections, encodes
//! outbound HTTP/1.1 requests onto a shared duplex byte stream, coordinates
//! framing decisions with an independent response decoder through an ordered
//! signal channel, tracks per-connection concurrency limits for
//! reservation-based load balancing, and bridges the asynchronous connection
//! API to a synchronous calling convention.
//!
//! ## Features
//!
//! - **Connection Factory**: filter chains, transport observers, and optional
//!   connect offloading onto a worker executor
//! - **Concurrency Control**: live max-concurrency updates, RAII permits, and
//!   exclusive per-connection reservations
//! - **HTTP/1.1 Encoding**: pipelining-safe request serialization with a
//!   per-request framing signal protocol for the paired decoder
//! - **Expect/100-continue**: deferred body writes with cancel-write support
//! - **Blocking Facade**: one-call-at-a-time synchronous surface over the
//!   fully asynchronous client and connection API
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wirenet::blocking::BlockingClient;
//! use wirenet::base::message::Request;
//! use wirenet::base::strategy::ExecutionStrategy;
//!
//! let client = BlockingClient::new(streaming_client, ExecutionStrategy::Unspecified);
//! let response = client.request(Request::get("/"))?;
//! println!("Status: {}", response.status());
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Core types, errors, execution strategies, and request context
//! - [`conn`] - Connection factory, concurrency controller, and event streams
//! - [`h1`] - HTTP/1.1 request encoder and the encoder/decoder signal protocol
//! - [`blocking`] - Blocking adapters over the asynchronous client surface
//!
//! ## Out of scope
//!
//! Transport sockets and TLS, address resolution, the load-balancing
//! selection algorithm, and response decoding live behind trait seams; this
//! crate specifies their contracts but does not implement them.

pub mod base;
pub mod blocking;
pub mod conn;
pub mod h1;
