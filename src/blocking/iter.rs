//! Blocking iteration over transport event streams.

use crate::conn::events::EventStream;

/// Pull-based blocking view of a push-based transport event stream.
///
/// Buffers at most the single most recent value: a slow consumer observes at
/// least the latest values published while it iterates, not every
/// intermediate one. Iteration ends when the connection closes; dropping the
/// iterator unsubscribes from the stream.
pub struct BlockingEventIter {
    stream: EventStream,
}

impl BlockingEventIter {
    pub fn new(stream: EventStream) -> Self {
        Self { stream }
    }

    /// The most recently observed value, without blocking.
    pub fn current(&self) -> u32 {
        self.stream.current()
    }
}

impl Iterator for BlockingEventIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        futures::executor::block_on(self.stream.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::events::{EventKey, EventRegistry};

    #[test]
    fn test_iterates_published_values_then_ends() {
        let registry = EventRegistry::new();
        let mut iter = BlockingEventIter::new(registry.stream(EventKey::MaxConcurrency));
        assert_eq!(iter.current(), 1);

        registry.publish(EventKey::MaxConcurrency, 2);
        assert_eq!(iter.next(), Some(2));

        registry.publish(EventKey::MaxConcurrency, 9);
        assert_eq!(iter.next(), Some(9));

        registry.terminate();
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_slow_consumer_sees_most_recent_value() {
        let registry = EventRegistry::new();
        let mut iter = BlockingEventIter::new(registry.stream(EventKey::MaxConcurrency));

        registry.publish(EventKey::MaxConcurrency, 2);
        registry.publish(EventKey::MaxConcurrency, 3);
        registry.publish(EventKey::MaxConcurrency, 4);
        // Intermediate values may be skipped; the latest is guaranteed.
        assert_eq!(iter.next(), Some(4));
    }
}
