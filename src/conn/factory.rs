//! Load-balance-aware connection factory.
//!
//! `LbConnectionFactory` turns a raw connection supplier into fully composed
//! [`LoadBalancedConnection`]s: it runs the user-configurable factory filter
//! chain, defaults and panic-isolates the transport observer, offloads the
//! connect operation when the connect strategy requires it, applies the
//! connection-level filter once, wires a concurrency controller to the
//! connection's max-concurrency event stream and closing notification, and
//! binds the protocol-specific adapter.

use crate::base::context::RequestContext;
use crate::base::neterror::NetError;
use crate::base::strategy::{is_io_thread, ConnectStrategy};
use crate::conn::concurrency::ConcurrencyController;
use crate::conn::events::EventKey;
use crate::conn::lb::LoadBalancedConnection;
use crate::conn::observer::{NoopTransportObserver, SafeTransportObserver, TransportObserver};
use crate::conn::transport::{
    CloseFuture, ConnectFuture, ConnectionFactoryFilter, ConnectionFilterFactory,
    ConnectionSupplier, ProtocolBinding,
};
use futures::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Creates load-balanced connections to resolved addresses of type `A`.
pub struct LbConnectionFactory<A> {
    /// Raw supplier wrapped by the offload guard and the filter chain.
    filtered_supplier: Arc<dyn ConnectionSupplier<A>>,
    connection_filter: Option<Arc<dyn ConnectionFilterFactory>>,
    protocol_binding: ProtocolBinding,
    connect_strategy: ConnectStrategy,
    closed: AtomicBool,
}

impl<A: Send + Sync + Clone + 'static> LbConnectionFactory<A> {
    /// Compose the factory.
    ///
    /// `factory_filters` are applied in order around the raw supplier, each
    /// wrapping the previous result (the last filter is outermost).
    /// `executor` is the worker executor used when `connect_strategy`
    /// requires the connect result to be delivered off the I/O thread.
    pub fn new(
        raw_supplier: Arc<dyn ConnectionSupplier<A>>,
        connect_strategy: ConnectStrategy,
        executor: Handle,
        factory_filters: Vec<Arc<dyn ConnectionFactoryFilter<A>>>,
        connection_filter: Option<Arc<dyn ConnectionFilterFactory>>,
        protocol_binding: ProtocolBinding,
    ) -> Self {
        let inner: Arc<dyn ConnectionSupplier<A>> = Arc::new(OffloadingSupplier {
            raw: raw_supplier,
            offload_connect: connect_strategy.offload_connect(),
            executor,
            closed: AtomicBool::new(false),
        });
        let filtered_supplier =
            factory_filters.iter().fold(inner, |supplier, filter| filter.wrap(supplier));
        Self {
            filtered_supplier,
            connection_filter,
            protocol_binding,
            connect_strategy,
            closed: AtomicBool::new(false),
        }
    }

    /// Establish, filter, and compose one connection.
    ///
    /// Any failure while connecting, filtering, or binding propagates as a
    /// connection-establishment failure; no partial connection is returned
    /// and the factory stays usable for further attempts.
    pub async fn new_connection(
        &self,
        address: A,
        context: Option<RequestContext>,
        observer: Option<Arc<dyn TransportObserver>>,
    ) -> Result<LoadBalancedConnection, NetError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NetError::FactoryClosed);
        }
        let observer: Arc<dyn TransportObserver> = match observer {
            Some(observer) => SafeTransportObserver::wrap(observer),
            None => Arc::new(NoopTransportObserver),
        };

        let connection =
            self.filtered_supplier.new_connection(address, context, observer).await?;
        let filtered = match &self.connection_filter {
            Some(filter) => filter.create(connection),
            None => connection,
        };

        // Prefer the transport's dedicated closing-begun notification; the
        // generic closed signal is an equivalent fallback.
        let closing = filtered.closing_signal().unwrap_or_else(|| filtered.close_signal());
        let events = filtered.event_stream(EventKey::MaxConcurrency);
        let controller = ConcurrencyController::new(events.current());
        controller.subscribe(events, closing);

        let bound = (self.protocol_binding)(Arc::clone(&filtered))?;
        tracing::debug!(version = ?bound.version(), "load-balanced connection established");
        Ok(LoadBalancedConnection::new(bound, controller, self.connect_strategy.effective()))
    }

    pub fn connect_strategy(&self) -> ConnectStrategy {
        self.connect_strategy
    }

    /// Close immediately, delegating to the filtered supplier. Idempotent.
    pub fn close(&self) -> CloseFuture {
        self.closed.store(true, Ordering::Release);
        self.filtered_supplier.close()
    }

    /// Close gracefully, delegating to the filtered supplier. Idempotent.
    pub fn close_graceful(&self) -> CloseFuture {
        self.closed.store(true, Ordering::Release);
        self.filtered_supplier.close_graceful()
    }
}

/// Innermost supplier handed to the filter chain: delegates to the raw
/// supplier, delivering the result via the worker executor when connect
/// offloading is in effect and the caller sits on an I/O thread.
struct OffloadingSupplier<A> {
    raw: Arc<dyn ConnectionSupplier<A>>,
    offload_connect: bool,
    executor: Handle,
    closed: AtomicBool,
}

impl<A: Send + Sync + Clone + 'static> ConnectionSupplier<A> for OffloadingSupplier<A> {
    fn new_connection(
        &self,
        address: A,
        context: Option<RequestContext>,
        observer: Arc<dyn TransportObserver>,
    ) -> ConnectFuture {
        let connect = self.raw.new_connection(address, context, observer);
        // Offload only when the continuation would otherwise run on an
        // I/O-owning thread; re-offloading from a worker thread would only
        // add latency and risks starving the worker pool.
        if self.offload_connect && is_io_thread() {
            let executor = self.executor.clone();
            Box::pin(async move {
                executor
                    .spawn(connect)
                    .await
                    .map_err(|join| NetError::OffloadFailed(join.to_string()))?
            })
        } else {
            connect
        }
    }

    fn close(&self) -> CloseFuture {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Box::pin(future::ready(Ok(())));
        }
        self.raw.close()
    }

    fn close_graceful(&self) -> CloseFuture {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Box::pin(future::ready(Ok(())));
        }
        self.raw.close_graceful()
    }
}
