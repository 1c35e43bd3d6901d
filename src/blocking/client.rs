//! Blocking client and reserved-connection wrappers.

use crate::base::message::{Request, RequestMetaData, Response};
use crate::base::neterror::NetError;
use crate::base::strategy::{ExecutionStrategy, StrategyOverride};
use crate::blocking::blocking_invoke;
use crate::blocking::iter::BlockingEventIter;
use crate::conn::events::EventKey;
use crate::conn::lb::ReservedStreamingConnection;
use crate::conn::transport::{CloseFuture, ResponseFuture};
use futures::future::BoxFuture;
use http::Method;
use std::sync::Arc;

/// Alias for the future resolving a connection reservation.
pub type ReserveFuture = BoxFuture<'static, Result<ReservedStreamingConnection, NetError>>;

/// The asynchronous client surface the blocking adapter wraps.
///
/// Implementations route requests across load-balanced connections; the
/// blocking adapter adds nothing but call-site semantics.
pub trait StreamingClient: Send + Sync {
    fn request(&self, request: crate::base::message::StreamingRequest) -> ResponseFuture;

    /// Claim a connection exclusively for the caller described by `meta`.
    fn reserve_connection(&self, meta: RequestMetaData) -> ReserveFuture;

    /// Close immediately. Safe to call repeatedly.
    fn close(&self) -> CloseFuture;

    /// Close after in-flight exchanges finish. Safe to call repeatedly.
    fn close_graceful(&self) -> CloseFuture;
}

/// One-call-at-a-time synchronous surface over a [`StreamingClient`].
///
/// The configured execution strategy is resolved once, at construction:
/// an unspecified strategy becomes the fixed default blocking strategy, so
/// downstream offloading decisions are never ambiguous.
pub struct BlockingClient {
    client: Arc<dyn StreamingClient>,
    strategy: ExecutionStrategy,
}

impl BlockingClient {
    pub fn new(client: Arc<dyn StreamingClient>, strategy: ExecutionStrategy) -> Self {
        Self { client, strategy: strategy.resolve_blocking() }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub fn new_request(&self, method: Method, request_target: impl Into<String>) -> Request {
        Request::new(method, request_target)
    }

    /// Issue one request and block until its aggregated response (or the
    /// propagated failure) is available.
    pub fn request(&self, mut request: Request) -> Result<Response, NetError> {
        request.context_mut().put_if_absent(StrategyOverride(self.strategy));
        let client = Arc::clone(&self.client);
        blocking_invoke(async move {
            client.request(request.into_streaming()).await?.aggregate().await
        })
    }

    /// Reserve a connection and block until the reservation resolves.
    pub fn reserve_connection(
        &self,
        mut meta: RequestMetaData,
    ) -> Result<ReservedBlockingConnection, NetError> {
        meta.context_mut().put_if_absent(StrategyOverride(self.strategy));
        let reserved = blocking_invoke(self.client.reserve_connection(meta))?;
        Ok(ReservedBlockingConnection { connection: reserved, strategy: self.strategy })
    }

    /// The wrapped asynchronous client.
    pub fn as_streaming(&self) -> Arc<dyn StreamingClient> {
        Arc::clone(&self.client)
    }

    pub fn close(&self) -> Result<(), NetError> {
        blocking_invoke(self.client.close())
    }

    pub fn close_graceful(&self) -> Result<(), NetError> {
        blocking_invoke(self.client.close_graceful())
    }
}

/// Blocking wrapper over an exclusively reserved connection.
pub struct ReservedBlockingConnection {
    connection: ReservedStreamingConnection,
    strategy: ExecutionStrategy,
}

impl ReservedBlockingConnection {
    pub fn new(connection: ReservedStreamingConnection, strategy: ExecutionStrategy) -> Self {
        Self { connection, strategy: strategy.resolve_blocking() }
    }

    pub fn new_request(&self, method: Method, request_target: impl Into<String>) -> Request {
        Request::new(method, request_target)
    }

    pub fn request(&self, mut request: Request) -> Result<Response, NetError> {
        request.context_mut().put_if_absent(StrategyOverride(self.strategy));
        blocking_invoke(async {
            self.connection.request(request.into_streaming()).await?.aggregate().await
        })
    }

    /// Return the connection to ordinary load-balanced use, blocking until
    /// the asynchronous release resolves.
    pub fn release(self) -> Result<(), NetError> {
        blocking_invoke(self.connection.release_async())
    }

    /// Blocking iteration over a transport event stream.
    pub fn event_iter(&self, key: EventKey) -> BlockingEventIter {
        BlockingEventIter::new(self.connection.event_stream(key))
    }

    /// The wrapped reserved streaming connection.
    pub fn as_streaming(self) -> ReservedStreamingConnection {
        self.connection
    }

    pub fn close(&self) -> Result<(), NetError> {
        blocking_invoke(self.connection.close())
    }

    pub fn close_graceful(&self) -> Result<(), NetError> {
        blocking_invoke(self.connection.close_graceful())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::message::{BodyStream, StreamingRequest, StreamingResponse};
    use crate::conn::concurrency::ConcurrencyController;
    use crate::conn::events::{CloseNotifier, CloseSignal, EventRegistry, EventStream};
    use crate::conn::lb::LoadBalancedConnection;
    use crate::conn::transport::StreamingConnection;
    use futures::future;
    use futures::stream::{self, StreamExt};
    use http::{HeaderMap, StatusCode, Version};
    use std::sync::Mutex;

    struct StubConnection {
        registry: EventRegistry,
        closer: CloseNotifier,
    }

    impl StreamingConnection for StubConnection {
        fn request(&self, _request: StreamingRequest) -> ResponseFuture {
            let body: BodyStream =
                stream::once(async { Ok(bytes::Bytes::from_static(b"reserved")) }).boxed();
            Box::pin(future::ready(Ok(StreamingResponse::new(
                StatusCode::OK,
                Version::HTTP_11,
                HeaderMap::new(),
                body,
            ))))
        }

        fn event_stream(&self, key: EventKey) -> EventStream {
            self.registry.stream(key)
        }

        fn close_signal(&self) -> CloseSignal {
            self.closer.signal()
        }

        fn close(&self) -> CloseFuture {
            self.closer.notify();
            Box::pin(future::ready(Ok(())))
        }

        fn close_graceful(&self) -> CloseFuture {
            self.close()
        }
    }

    /// Client stub that records the strategy override it observes.
    #[derive(Default)]
    struct RecordingClient {
        seen_strategy: Mutex<Option<ExecutionStrategy>>,
        fail_requests: bool,
        closes: Mutex<u32>,
    }

    impl RecordingClient {
        fn lb_connection() -> LoadBalancedConnection {
            LoadBalancedConnection::new(
                Arc::new(StubConnection {
                    registry: EventRegistry::new(),
                    closer: CloseNotifier::new(),
                }),
                ConcurrencyController::new(1),
                ExecutionStrategy::OffloadNone,
            )
        }
    }

    impl StreamingClient for RecordingClient {
        fn request(&self, request: StreamingRequest) -> ResponseFuture {
            *self.seen_strategy.lock().unwrap() =
                request.meta().context().get::<StrategyOverride>().map(|s| s.0);
            if self.fail_requests {
                return Box::pin(future::ready(Err(NetError::connect_failed(
                    "backend-1",
                    std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer"),
                ))));
            }
            let body: BodyStream = stream::iter(vec![
                Ok(bytes::Bytes::from_static(b"hello ")),
                Ok(bytes::Bytes::from_static(b"world")),
            ])
            .boxed();
            Box::pin(future::ready(Ok(StreamingResponse::new(
                StatusCode::OK,
                Version::HTTP_11,
                HeaderMap::new(),
                body,
            ))))
        }

        fn reserve_connection(&self, meta: RequestMetaData) -> ReserveFuture {
            *self.seen_strategy.lock().unwrap() =
                meta.context().get::<StrategyOverride>().map(|s| s.0);
            let reserved = Self::lb_connection().try_reserve();
            Box::pin(future::ready(
                reserved.ok_or(NetError::ConnectionClosing),
            ))
        }

        fn close(&self) -> CloseFuture {
            *self.closes.lock().unwrap() += 1;
            Box::pin(future::ready(Ok(())))
        }

        fn close_graceful(&self) -> CloseFuture {
            self.close()
        }
    }

    #[test]
    fn test_unspecified_strategy_resolves_to_default_blocking() {
        let client =
            BlockingClient::new(Arc::new(RecordingClient::default()), ExecutionStrategy::Unspecified);
        assert_eq!(client.strategy(), ExecutionStrategy::DEFAULT_BLOCKING);
    }

    #[test]
    fn test_request_injects_strategy_and_aggregates() {
        let recording = Arc::new(RecordingClient::default());
        let client =
            BlockingClient::new(Arc::clone(&recording) as _, ExecutionStrategy::Unspecified);

        let response = client.request(Request::get("/")).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"hello world");
        assert_eq!(
            *recording.seen_strategy.lock().unwrap(),
            Some(ExecutionStrategy::DEFAULT_BLOCKING)
        );
    }

    #[test]
    fn test_request_keeps_caller_strategy_override() {
        let recording = Arc::new(RecordingClient::default());
        let client =
            BlockingClient::new(Arc::clone(&recording) as _, ExecutionStrategy::OffloadNone);

        let mut request = Request::get("/");
        request.context_mut().put(StrategyOverride(ExecutionStrategy::OffloadAll));
        client.request(request).unwrap();
        // put_if_absent must not clobber an explicit override.
        assert_eq!(
            *recording.seen_strategy.lock().unwrap(),
            Some(ExecutionStrategy::OffloadAll)
        );
    }

    #[test]
    fn test_async_failure_is_raised_synchronously_with_cause() {
        let recording = Arc::new(RecordingClient { fail_requests: true, ..Default::default() });
        let client =
            BlockingClient::new(Arc::clone(&recording) as _, ExecutionStrategy::Unspecified);

        let err = client.request(Request::get("/")).unwrap_err();
        match err {
            NetError::ConnectFailed { address, source } => {
                assert_eq!(address, "backend-1");
                assert!(source.to_string().contains("reset by peer"));
            }
            other => panic!("Expected ConnectFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_reserve_release_round_trip() {
        let recording = Arc::new(RecordingClient::default());
        let client =
            BlockingClient::new(Arc::clone(&recording) as _, ExecutionStrategy::Unspecified);

        let reserved = client.reserve_connection(RequestMetaData::new(Method::GET, "/")).unwrap();
        assert_eq!(
            *recording.seen_strategy.lock().unwrap(),
            Some(ExecutionStrategy::DEFAULT_BLOCKING)
        );

        let response = reserved.request(Request::get("/")).unwrap();
        assert_eq!(&response.body()[..], b"reserved");
        reserved.release().unwrap();
    }

    #[test]
    fn test_event_iteration_on_reserved_connection() {
        let lb = RecordingClient::lb_connection();
        let reserved =
            ReservedBlockingConnection::new(lb.try_reserve().unwrap(), ExecutionStrategy::OffloadNone);
        let iter = reserved.event_iter(EventKey::MaxConcurrency);
        assert_eq!(iter.current(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let recording = Arc::new(RecordingClient::default());
        let client =
            BlockingClient::new(Arc::clone(&recording) as _, ExecutionStrategy::Unspecified);
        client.close().unwrap();
        client.close().unwrap();
        assert_eq!(*recording.closes.lock().unwrap(), 2);
    }
}
