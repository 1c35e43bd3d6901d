//! Per-connection request concurrency control.
//!
//! Each connection carries a [`ConcurrencyController`] that gates how many
//! requests may be outstanding at once. The limit is live: it follows the
//! connection's max-concurrency event stream. A load balancer probes
//! controllers with [`try_acquire`] and moves on to another connection when
//! refused; refusal is an ordinary outcome, never an error.
//!
//! The reservable variant additionally supports one exclusive reservation per
//! connection, used when a caller claims the whole connection for itself.
//!
//! [`try_acquire`]: ConcurrencyController::try_acquire

use crate::conn::events::{CloseSignal, EventStream};
use std::sync::Arc;
use std::sync::Mutex;

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Permits remain; `n` more requests may start.
    Available(u32),
    /// All permits granted; new requests are refused until one is released.
    Exhausted,
    /// An exclusive reservation is outstanding.
    Reserved,
    /// The connection is closing or closed. Terminal.
    Closed,
}

#[derive(Debug)]
struct Inner {
    /// Last observed maximum from the connection's event stream.
    max: u32,
    /// Permits currently granted.
    acquired: u32,
    reserved: bool,
    closed: bool,
}

/// Reservation-capable concurrency gate for one connection.
///
/// All transitions are atomic with respect to each other and none of them
/// panic or return errors; exhaustion and closure surface as refusals.
#[derive(Debug)]
pub struct ConcurrencyController {
    inner: Mutex<Inner>,
}

impl ConcurrencyController {
    pub fn new(initial_max: u32) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                max: initial_max,
                acquired: 0,
                reserved: false,
                closed: false,
            }),
        })
    }

    pub fn state(&self) -> ControllerState {
        let inner = self.inner.lock().unwrap();
        if inner.closed {
            ControllerState::Closed
        } else if inner.reserved {
            ControllerState::Reserved
        } else if inner.acquired >= inner.max {
            ControllerState::Exhausted
        } else {
            ControllerState::Available(inner.max - inner.acquired)
        }
    }

    /// Try to start one request. Refused when exhausted, reserved, or closed.
    ///
    /// Dropping the returned [`Permit`] releases it.
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed || inner.reserved || inner.acquired >= inner.max {
            return None;
        }
        inner.acquired += 1;
        Some(Permit { controller: Arc::clone(self) })
    }

    /// Try to claim the connection exclusively. Refused while another
    /// reservation is outstanding or once closed.
    ///
    /// Dropping the returned [`Reservation`] releases the claim.
    pub fn try_reserve(self: &Arc<Self>) -> Option<Reservation> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed || inner.reserved {
            return None;
        }
        inner.reserved = true;
        Some(Reservation { controller: Arc::clone(self) })
    }

    /// Apply a new maximum from the connection's max-concurrency event.
    ///
    /// Outstanding permits above a lowered maximum are honored; no permit is
    /// revoked. New permits are refused until usage drops below the new
    /// maximum.
    pub fn on_max_concurrency(&self, max: u32) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }
        tracing::debug!(old = inner.max, new = max, "max concurrency updated");
        inner.max = max;
    }

    /// Transition to the terminal closed state. Idempotent.
    pub fn on_closing(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.closed {
            tracing::debug!(outstanding = inner.acquired, "concurrency controller closed");
            inner.closed = true;
        }
    }

    fn release_permit(&self) {
        let mut inner = self.inner.lock().unwrap();
        // Pure bookkeeping even after close.
        inner.acquired = inner.acquired.saturating_sub(1);
    }

    fn release_reservation(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.reserved = false;
    }

    /// Drive this controller from a connection's max-concurrency event stream
    /// and its closing notification. Event-stream termination also means the
    /// connection closed.
    pub fn subscribe(self: &Arc<Self>, events: EventStream, closing: CloseSignal) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.on_max_concurrency(events.current());
            let mut events = events;
            let closing = closing.wait();
            tokio::pin!(closing);
            loop {
                tokio::select! {
                    _ = &mut closing => {
                        controller.on_closing();
                        break;
                    }
                    next = events.next() => match next {
                        Some(max) => controller.on_max_concurrency(max),
                        None => {
                            controller.on_closing();
                            break;
                        }
                    },
                }
            }
        });
    }
}

/// One granted unit of request concurrency. Released on drop.
#[derive(Debug)]
pub struct Permit {
    controller: Arc<ConcurrencyController>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.controller.release_permit();
    }
}

/// An exclusive connection-scoped claim. Released on drop.
#[derive(Debug)]
pub struct Reservation {
    controller: Arc<ConcurrencyController>,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.controller.release_reservation();
    }
}
