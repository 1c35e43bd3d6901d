//! Blocking adapters over the asynchronous client surface.
//!
//! Every public operation here performs exactly one underlying asynchronous
//! call and blocks the calling thread until it resolves. These adapters are
//! the only components in the crate that deliberately block; they must never
//! run on an I/O-owning execution unit.
//!
//! - [`client`]: blocking client and reserved-connection wrappers
//! - [`iter`]: blocking iteration over transport event streams

pub mod client;
pub mod iter;

pub use client::{BlockingClient, ReservedBlockingConnection, StreamingClient};
pub use iter::BlockingEventIter;

use crate::base::neterror::NetError;
use crate::base::strategy::is_io_thread;
use std::future::Future;

/// Resolve one asynchronous operation on the calling thread.
///
/// Failures propagate synchronously with their original cause; nothing is
/// swallowed.
pub(crate) fn blocking_invoke<F, T>(future: F) -> Result<T, NetError>
where
    F: Future<Output = Result<T, NetError>>,
{
    debug_assert!(!is_io_thread(), "blocking invocation on the I/O execution unit");
    futures::executor::block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_invoke_resolves_value() {
        let value = blocking_invoke(async { Ok::<_, NetError>(11) }).unwrap();
        assert_eq!(value, 11);
    }

    #[test]
    fn test_blocking_invoke_propagates_failure() {
        let err = blocking_invoke(async { Err::<(), _>(NetError::ConnectionClosed) }).unwrap_err();
        assert!(matches!(err, NetError::ConnectionClosed));
    }
}
