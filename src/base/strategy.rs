//! Execution strategies and offloading decisions.
//!
//! A strategy describes where continuations of an asynchronous operation are
//! allowed to run: on the I/O-owning execution unit, or offloaded onto a
//! worker executor. "Unspecified" is an explicit variant so that default
//! resolution happens exactly once, at adapter construction, instead of being
//! re-decided ambiguously at each call site.

use std::cell::Cell;

/// Where request/response continuations run for a connection or client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Not chosen by the user. Must be resolved before use.
    #[default]
    Unspecified,
    /// Run continuations directly on the I/O-owning execution unit.
    OffloadNone,
    /// Offload continuations onto the configured worker executor.
    OffloadAll,
}

impl ExecutionStrategy {
    /// Strategy substituted by blocking adapters when the configured strategy
    /// is [`ExecutionStrategy::Unspecified`]. Blocking callers already own a
    /// thread that may block, so no additional offloading is needed.
    pub const DEFAULT_BLOCKING: ExecutionStrategy = ExecutionStrategy::OffloadNone;

    pub fn is_unspecified(self) -> bool {
        self == ExecutionStrategy::Unspecified
    }

    /// Resolve `Unspecified` to the fixed default blocking strategy.
    pub fn resolve_blocking(self) -> ExecutionStrategy {
        if self.is_unspecified() { Self::DEFAULT_BLOCKING } else { self }
    }
}

/// Execution-strategy override carried in a request's [`RequestContext`].
///
/// [`RequestContext`]: crate::base::context::RequestContext
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyOverride(pub ExecutionStrategy);

/// Strategy in effect while establishing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStrategy {
    /// HTTP-aware strategy: also governs the connection after establishment.
    Http(ExecutionStrategy),
    /// Transport-level strategy for the connect operation only.
    Connect {
        /// Deliver the connect result via the worker executor rather than on
        /// the I/O-owning execution unit.
        offload: bool,
    },
}

impl ConnectStrategy {
    /// Whether the connect result must be delivered via the worker executor.
    pub fn offload_connect(self) -> bool {
        matches!(self, ConnectStrategy::Connect { offload: true })
    }

    /// The execution strategy the established connection runs under.
    ///
    /// A connect-only strategy carries no HTTP semantics, so it resolves to
    /// no offloading.
    pub fn effective(self) -> ExecutionStrategy {
        match self {
            ConnectStrategy::Http(strategy) => strategy.resolve_blocking(),
            ConnectStrategy::Connect { .. } => ExecutionStrategy::OffloadNone,
        }
    }
}

thread_local! {
    static IO_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Mark the current thread as an I/O-owning execution unit.
///
/// Transports call this once when spinning up an I/O thread. Offload guards
/// and blocking-call assertions consult the marker.
pub fn mark_io_thread() {
    IO_THREAD.with(|flag| flag.set(true));
}

/// Whether the current thread is an I/O-owning execution unit.
pub fn is_io_thread() -> bool {
    IO_THREAD.with(|flag| flag.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_resolves_to_default_blocking() {
        assert_eq!(
            ExecutionStrategy::Unspecified.resolve_blocking(),
            ExecutionStrategy::DEFAULT_BLOCKING
        );
        assert_eq!(
            ExecutionStrategy::OffloadAll.resolve_blocking(),
            ExecutionStrategy::OffloadAll
        );
    }

    #[test]
    fn test_connect_strategy_effective() {
        assert_eq!(
            ConnectStrategy::Http(ExecutionStrategy::OffloadAll).effective(),
            ExecutionStrategy::OffloadAll
        );
        // Non-HTTP connect strategies never leave the connection strategy unset.
        assert_eq!(
            ConnectStrategy::Connect { offload: true }.effective(),
            ExecutionStrategy::OffloadNone
        );
        assert_eq!(
            ConnectStrategy::Http(ExecutionStrategy::Unspecified).effective(),
            ExecutionStrategy::OffloadNone
        );
    }

    #[test]
    fn test_offload_connect_flag() {
        assert!(ConnectStrategy::Connect { offload: true }.offload_connect());
        assert!(!ConnectStrategy::Connect { offload: false }.offload_connect());
        assert!(!ConnectStrategy::Http(ExecutionStrategy::OffloadAll).offload_connect());
    }

    #[test]
    fn test_io_thread_marker() {
        let handle = std::thread::spawn(|| {
            assert!(!is_io_thread());
            mark_io_thread();
            assert!(is_io_thread());
        });
        handle.join().unwrap();
    }
}
