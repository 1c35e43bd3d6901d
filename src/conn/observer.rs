//! Transport observers.
//!
//! An observer is notified as a connection is established and torn down. The
//! factory substitutes [`NoopTransportObserver`] when the caller passes none
//! and shields itself from misbehaving user observers with
//! [`SafeTransportObserver`].

use crate::base::neterror::NetError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Observes transport-level connection state.
///
/// All methods default to no-ops so implementations only override what they
/// care about.
pub trait TransportObserver: Send + Sync {
    /// A connection attempt is starting.
    fn on_new_connection(&self) {}

    /// The transport finished establishing the connection.
    fn on_connection_established(&self) {}

    /// The connection closed, with the error that caused it if any.
    fn on_connection_closed(&self, _error: Option<&NetError>) {}
}

/// Blanket impl so `Arc`-wrapped observers can be passed around freely.
impl<O: TransportObserver + ?Sized> TransportObserver for Arc<O> {
    fn on_new_connection(&self) {
        (**self).on_new_connection();
    }

    fn on_connection_established(&self) {
        (**self).on_connection_established();
    }

    fn on_connection_closed(&self, error: Option<&NetError>) {
        (**self).on_connection_closed(error);
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransportObserver;

impl TransportObserver for NoopTransportObserver {}

/// Wrapper that isolates the connection layer from panicking observers.
pub struct SafeTransportObserver {
    inner: Arc<dyn TransportObserver>,
}

impl SafeTransportObserver {
    pub fn wrap(inner: Arc<dyn TransportObserver>) -> Arc<dyn TransportObserver> {
        Arc::new(Self { inner })
    }

    fn guarded(&self, hook: &str, call: impl FnOnce()) {
        if catch_unwind(AssertUnwindSafe(call)).is_err() {
            tracing::warn!(hook, "transport observer panicked");
        }
    }
}

impl TransportObserver for SafeTransportObserver {
    fn on_new_connection(&self) {
        self.guarded("on_new_connection", || self.inner.on_new_connection());
    }

    fn on_connection_established(&self) {
        self.guarded("on_connection_established", || self.inner.on_connection_established());
    }

    fn on_connection_closed(&self, error: Option<&NetError>) {
        self.guarded("on_connection_closed", || self.inner.on_connection_closed(error));
    }
}
