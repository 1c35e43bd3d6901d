//! Framing signals shared between the request encoder and response decoder.
//!
//! For every request written to the wire the encoder records two facts in
//! strict write order: the request's method (for default response
//! body-length inference) and a [`Signal`] (to resolve 1xx-response
//! ambiguity under pipelining). The decoder consumes both queues in FIFO
//! order; the queues belong to exactly one connection and are never shared
//! across connections.

use http::Method;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Default backlog limit for the per-connection framing queues.
///
/// Deep enough for aggressive pipelining; a full queue means encoder and
/// decoder have diverged and the connection must be torn down.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Per-request marker telling the decoder how to interpret the matching
/// response's framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Ordinary request.
    Request,
    /// Request carrying `Expect: 100-continue`; the decoder must expect an
    /// interim response before the final one.
    RequestWithExpectContinue,
}

/// Bounded FIFO hand-off between the encoder and the paired decoder.
///
/// `offer` is non-blocking and capacity-checked: it fails fast instead of
/// deadlocking when the backlog limit is hit. Cloning produces the decoder's
/// handle onto the same queue.
pub struct FramingQueue<T> {
    inner: Arc<Mutex<VecDeque<T>>>,
    capacity: usize,
}

impl<T> Clone for FramingQueue<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), capacity: self.capacity }
    }
}

impl<T> Default for FramingQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl<T> FramingQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Arc::new(Mutex::new(VecDeque::new())), capacity }
    }

    /// Append an entry. Returns `false` when the queue is at capacity.
    #[must_use]
    pub fn offer(&self, item: T) -> bool {
        let mut queue = self.inner.lock().unwrap();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(item);
        true
    }

    /// Remove and return the oldest entry. Decoder side.
    pub fn poll(&self) -> Option<T> {
        self.inner.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

/// Alias for the queue of outbound request methods.
pub type MethodQueue = FramingQueue<Method>;

/// Alias for the queue of per-request framing signals.
pub type SignalQueue = FramingQueue<Signal>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = FramingQueue::new(8);
        assert!(queue.offer(Signal::RequestWithExpectContinue));
        assert!(queue.offer(Signal::Request));
        assert_eq!(queue.poll(), Some(Signal::RequestWithExpectContinue));
        assert_eq!(queue.poll(), Some(Signal::Request));
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn test_offer_fails_fast_at_capacity() {
        let queue = FramingQueue::new(2);
        assert!(queue.offer(Signal::Request));
        assert!(queue.offer(Signal::Request));
        assert!(!queue.offer(Signal::Request));
        assert_eq!(queue.len(), 2);

        // Draining one entry frees one slot.
        queue.poll();
        assert!(queue.offer(Signal::Request));
    }

    #[test]
    fn test_clone_shares_the_queue() {
        let encoder_side = MethodQueue::new(4);
        let decoder_side = encoder_side.clone();
        assert!(encoder_side.offer(Method::HEAD));
        assert_eq!(decoder_side.poll(), Some(Method::HEAD));
        assert!(encoder_side.is_empty());
    }
}
