//! Transport event streams.
//!
//! Connections expose a named-event subscription mechanism: a registry keyed
//! by event kind, where each kind carries a live integer value. The only kind
//! this layer consumes is [`EventKey::MaxConcurrency`], the current maximum
//! number of concurrent requests the connection accepts. Streams terminate
//! when the connection closes.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Kinds of transport events a connection can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Live maximum number of concurrent requests for the connection.
    MaxConcurrency,
}

impl EventKey {
    /// Initial value observed by subscribers before the first publish.
    fn initial(self) -> u32 {
        match self {
            // HTTP/1.1 accepts one request at a time until told otherwise.
            EventKey::MaxConcurrency => 1,
        }
    }
}

/// Per-connection registry of live event channels, keyed by event kind.
#[derive(Default)]
pub struct EventRegistry {
    channels: DashMap<EventKey, watch::Sender<u32>>,
    terminated: AtomicBool,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new value for an event kind, creating the channel on first
    /// use. Ignored once terminated.
    pub fn publish(&self, key: EventKey, value: u32) {
        if self.terminated.load(Ordering::Acquire) {
            return;
        }
        let sender =
            self.channels.entry(key).or_insert_with(|| watch::channel(key.initial()).0);
        // Subscribers may lag; watch keeps only the most recent value.
        let _ = sender.send(value);
    }

    /// Subscribe to an event kind. Termination is sticky: a subscriber
    /// arriving after the connection closed gets a stream that ends
    /// immediately.
    pub fn stream(&self, key: EventKey) -> EventStream {
        let rx = {
            let sender =
                self.channels.entry(key).or_insert_with(|| watch::channel(key.initial()).0);
            sender.subscribe()
        };
        // Re-check after subscribing: a concurrent terminate may have missed
        // the entry created above.
        if self.terminated.load(Ordering::Acquire) {
            self.channels.remove(&key);
            return EventStream::ended(key.initial());
        }
        EventStream { rx }
    }

    /// Terminate every stream, existing and future. Called when the
    /// connection closes. Idempotent.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
        // Dropping the senders ends every outstanding stream.
        self.channels.clear();
    }
}

/// A live view of one event kind's value.
///
/// `next` resolves each time the value changes and returns `None` once the
/// connection has closed and no further values will be published.
#[derive(Clone)]
pub struct EventStream {
    rx: watch::Receiver<u32>,
}

impl EventStream {
    /// A stream that is already over; `next` resolves to `None` right away.
    fn ended(value: u32) -> Self {
        let (tx, rx) = watch::channel(value);
        drop(tx);
        Self { rx }
    }

    /// The most recently published value.
    pub fn current(&self) -> u32 {
        *self.rx.borrow()
    }

    /// Wait for the next published value.
    pub async fn next(&mut self) -> Option<u32> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// Source side of a connection close notification.
///
/// `notify` is idempotent; the paired [`CloseSignal`]s observe the first
/// notification and every later subscription immediately sees the closed
/// state.
pub struct CloseNotifier {
    tx: watch::Sender<bool>,
}

impl Default for CloseNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CloseNotifier {
    pub fn new() -> Self {
        Self { tx: watch::channel(false).0 }
    }

    pub fn signal(&self) -> CloseSignal {
        CloseSignal { rx: self.tx.subscribe() }
    }

    pub fn notify(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_notified(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiver side of a connection close notification.
#[derive(Clone)]
pub struct CloseSignal {
    rx: watch::Receiver<bool>,
}

impl CloseSignal {
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the connection is closing. A dropped notifier counts as
    /// closed.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|closed| *closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_sees_initial_then_published_values() {
        let registry = EventRegistry::new();
        let mut stream = registry.stream(EventKey::MaxConcurrency);
        assert_eq!(stream.current(), 1);

        registry.publish(EventKey::MaxConcurrency, 8);
        assert_eq!(stream.next().await, Some(8));
    }

    #[tokio::test]
    async fn test_stream_terminates_on_registry_termination() {
        let registry = EventRegistry::new();
        let mut stream = registry.stream(EventKey::MaxConcurrency);
        registry.terminate();
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_subscribe_after_termination_ends_immediately() {
        let registry = EventRegistry::new();
        registry.publish(EventKey::MaxConcurrency, 6);
        registry.terminate();
        registry.terminate(); // idempotent

        let mut late = registry.stream(EventKey::MaxConcurrency);
        assert_eq!(late.next().await, None);

        // Publishes after termination reach nobody.
        registry.publish(EventKey::MaxConcurrency, 9);
        assert_eq!(registry.stream(EventKey::MaxConcurrency).next().await, None);
    }

    #[tokio::test]
    async fn test_subscribe_after_publish_sees_latest() {
        let registry = EventRegistry::new();
        registry.publish(EventKey::MaxConcurrency, 4);
        let stream = registry.stream(EventKey::MaxConcurrency);
        assert_eq!(stream.current(), 4);
    }

    #[tokio::test]
    async fn test_close_signal() {
        let notifier = CloseNotifier::new();
        let signal = notifier.signal();
        assert!(!signal.is_closed());

        notifier.notify();
        notifier.notify(); // idempotent
        assert!(signal.is_closed());
        signal.wait().await;

        // Late subscribers observe the closed state immediately.
        assert!(notifier.signal().is_closed());
    }

    #[tokio::test]
    async fn test_dropped_notifier_counts_as_closed() {
        let notifier = CloseNotifier::new();
        let signal = notifier.signal();
        drop(notifier);
        signal.wait().await;
    }
}
