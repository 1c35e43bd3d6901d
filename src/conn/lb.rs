//! The composed, reservation-capable connection returned to callers.

use crate::base::message::StreamingRequest;
use crate::base::strategy::ExecutionStrategy;
use crate::conn::concurrency::{ConcurrencyController, Permit, Reservation};
use crate::conn::events::{EventKey, EventStream};
use crate::conn::transport::{CloseFuture, ResponseFuture, StreamingConnection};
use futures::future;
use http::Version;
use std::sync::Arc;
use std::sync::Mutex;

/// A filtered connection bound to its concurrency controller and the
/// execution strategy in effect. Immutable after construction.
#[derive(Clone)]
pub struct LoadBalancedConnection {
    connection: Arc<dyn StreamingConnection>,
    controller: Arc<ConcurrencyController>,
    strategy: ExecutionStrategy,
}

impl std::fmt::Debug for LoadBalancedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancedConnection")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl LoadBalancedConnection {
    pub fn new(
        connection: Arc<dyn StreamingConnection>,
        controller: Arc<ConcurrencyController>,
        strategy: ExecutionStrategy,
    ) -> Self {
        debug_assert!(!strategy.is_unspecified(), "strategy resolved at construction");
        Self { connection, controller, strategy }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub fn version(&self) -> Version {
        self.connection.version()
    }

    pub fn controller(&self) -> &Arc<ConcurrencyController> {
        &self.controller
    }

    /// Probe for one unit of request concurrency. Load balancers try another
    /// connection when refused.
    pub fn try_acquire(&self) -> Option<Permit> {
        self.controller.try_acquire()
    }

    /// Probe for the exclusive connection-scoped reservation.
    pub fn try_reserve(&self) -> Option<ReservedStreamingConnection> {
        let reservation = self.controller.try_reserve()?;
        Some(ReservedStreamingConnection {
            connection: self.clone(),
            reservation: Mutex::new(Some(reservation)),
        })
    }

    pub fn request(&self, request: StreamingRequest) -> ResponseFuture {
        self.connection.request(request)
    }

    pub fn event_stream(&self, key: EventKey) -> EventStream {
        self.connection.event_stream(key)
    }

    pub fn close(&self) -> CloseFuture {
        self.connection.close()
    }

    pub fn close_graceful(&self) -> CloseFuture {
        self.connection.close_graceful()
    }

    /// The underlying filtered connection.
    pub fn as_connection(&self) -> Arc<dyn StreamingConnection> {
        Arc::clone(&self.connection)
    }
}

/// A connection claimed exclusively by one logical caller.
///
/// The claim is released by [`release_async`](Self::release_async) or, as a
/// backstop, when this wrapper is dropped.
pub struct ReservedStreamingConnection {
    connection: LoadBalancedConnection,
    reservation: Mutex<Option<Reservation>>,
}

impl ReservedStreamingConnection {
    /// Return the connection to ordinary load-balanced use. Idempotent.
    pub fn release_async(&self) -> CloseFuture {
        let reservation = self.reservation.lock().unwrap().take();
        drop(reservation);
        Box::pin(future::ready(Ok(())))
    }

    pub fn request(&self, request: StreamingRequest) -> ResponseFuture {
        self.connection.request(request)
    }

    pub fn event_stream(&self, key: EventKey) -> EventStream {
        self.connection.event_stream(key)
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.connection.strategy()
    }

    pub fn close(&self) -> CloseFuture {
        self.connection.close()
    }

    pub fn close_graceful(&self) -> CloseFuture {
        self.connection.close_graceful()
    }

    pub fn as_load_balanced(&self) -> &LoadBalancedConnection {
        &self.connection
    }
}
