//! Trait seams between the connection layer and its collaborators.
//!
//! The transport, TLS, and decoder live outside this crate; these traits
//! define the contracts the factory and the load balancer program against.

use crate::base::context::RequestContext;
use crate::base::message::{StreamingRequest, StreamingResponse};
use crate::base::neterror::NetError;
use crate::conn::events::{CloseSignal, EventKey, EventStream};
use crate::conn::observer::TransportObserver;
use futures::future::BoxFuture;
use http::Version;
use std::sync::Arc;

/// Alias for the future resolving one request/response exchange.
pub type ResponseFuture = BoxFuture<'static, Result<StreamingResponse, NetError>>;

/// Alias for the future resolving a connection-establishment attempt.
pub type ConnectFuture = BoxFuture<'static, Result<Arc<dyn StreamingConnection>, NetError>>;

/// Alias for the future resolving a close operation.
pub type CloseFuture = BoxFuture<'static, Result<(), NetError>>;

/// A raw filterable connection: a duplex exchange surface plus metadata and
/// an event registry.
///
/// Implementations are provided by the transport binding. All operations are
/// dispatched on the connection's I/O-owning execution unit.
pub trait StreamingConnection: Send + Sync {
    /// Issue one request and resolve with its streaming response.
    fn request(&self, request: StreamingRequest) -> ResponseFuture;

    /// Protocol version negotiated for this connection.
    fn version(&self) -> Version {
        Version::HTTP_11
    }

    /// Subscribe to a named transport event stream.
    fn event_stream(&self, key: EventKey) -> EventStream;

    /// Notification that the connection has fully closed.
    fn close_signal(&self) -> CloseSignal;

    /// Capability hook: a more specific "begin closing" notification, when
    /// the transport exposes one. Behaviorally equivalent to
    /// [`close_signal`](Self::close_signal) for transports that do not.
    fn closing_signal(&self) -> Option<CloseSignal> {
        None
    }

    /// Close immediately. Safe to call repeatedly.
    fn close(&self) -> CloseFuture;

    /// Close after in-flight exchanges finish. Safe to call repeatedly.
    fn close_graceful(&self) -> CloseFuture;
}

/// The ultimate source of connections before filtering.
pub trait ConnectionSupplier<A>: Send + Sync {
    /// Establish a raw connection to a resolved address.
    ///
    /// `context` is the optional request-scoped context map, passed through
    /// unchanged; `observer` is never absent at this seam (the factory
    /// substitutes a no-op observer).
    fn new_connection(
        &self,
        address: A,
        context: Option<RequestContext>,
        observer: Arc<dyn TransportObserver>,
    ) -> ConnectFuture;

    /// Close the supplier. Must be idempotent.
    fn close(&self) -> CloseFuture;

    /// Gracefully close the supplier. Must be idempotent.
    fn close_graceful(&self) -> CloseFuture;
}

impl<A, S: ConnectionSupplier<A> + ?Sized> ConnectionSupplier<A> for Arc<S> {
    fn new_connection(
        &self,
        address: A,
        context: Option<RequestContext>,
        observer: Arc<dyn TransportObserver>,
    ) -> ConnectFuture {
        (**self).new_connection(address, context, observer)
    }

    fn close(&self) -> CloseFuture {
        (**self).close()
    }

    fn close_graceful(&self) -> CloseFuture {
        (**self).close_graceful()
    }
}

/// Decorates a [`ConnectionSupplier`]; applied zero or more times around the
/// raw supplier when the factory is built.
pub trait ConnectionFactoryFilter<A>: Send + Sync {
    fn wrap(&self, inner: Arc<dyn ConnectionSupplier<A>>) -> Arc<dyn ConnectionSupplier<A>>;
}

impl<A, F> ConnectionFactoryFilter<A> for F
where
    F: Fn(Arc<dyn ConnectionSupplier<A>>) -> Arc<dyn ConnectionSupplier<A>> + Send + Sync,
{
    fn wrap(&self, inner: Arc<dyn ConnectionSupplier<A>>) -> Arc<dyn ConnectionSupplier<A>> {
        self(inner)
    }
}

/// Decorates each established connection once, outermost, before protocol
/// binding.
pub trait ConnectionFilterFactory: Send + Sync {
    fn create(&self, connection: Arc<dyn StreamingConnection>) -> Arc<dyn StreamingConnection>;
}

impl<F> ConnectionFilterFactory for F
where
    F: Fn(Arc<dyn StreamingConnection>) -> Arc<dyn StreamingConnection> + Send + Sync,
{
    fn create(&self, connection: Arc<dyn StreamingConnection>) -> Arc<dyn StreamingConnection> {
        self(connection)
    }
}

/// Binds a protocol-specific adapter over the filtered connection.
pub type ProtocolBinding = Arc<
    dyn Fn(Arc<dyn StreamingConnection>) -> Result<Arc<dyn StreamingConnection>, NetError>
        + Send
        + Sync,
>;

/// Identity protocol binding.
pub fn identity_binding() -> ProtocolBinding {
    Arc::new(|connection| Ok(connection))
}
