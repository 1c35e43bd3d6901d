use thiserror::Error;

/// Boxed low-level cause preserved across the async/blocking boundary.
pub type Cause = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum NetError {
    // Connection establishment
    #[error("Connection to {address} failed: {source}")]
    ConnectFailed {
        address: String,
        #[source]
        source: Cause,
    },
    #[error("Connection filter rejected connection: {0}")]
    FilterRejected(String),
    #[error("Protocol binding failed: {0}")]
    ProtocolBindFailed(String),
    #[error("Connection factory closed")]
    FactoryClosed,
    #[error("Offloaded connect did not complete: {0}")]
    OffloadFailed(String),

    // Connection lifecycle
    #[error("Connection is closing")]
    ConnectionClosing,
    #[error("Connection closed")]
    ConnectionClosed,

    // Wire protocol. A full signal queue is fatal for the connection: the
    // decoder can no longer correlate responses to pipelined requests.
    #[error("Signal queue full: cannot record framing for the decoder")]
    SignalQueueFull,
    #[error("Method queue full: cannot record request method for the decoder")]
    MethodQueueFull,
    #[error("Invalid content-length header: {0:?}")]
    InvalidContentLength(String),
    #[error("Request body exceeds declared content length")]
    ContentLengthExceeded,
    #[error("Request body shorter than declared content length")]
    ContentLengthUnderflow,

    // Body streaming
    #[error("Body stream failed: {0}")]
    BodyStream(#[source] Cause),

    // Event streams
    #[error("Transport event stream terminated")]
    EventStreamClosed,
}

impl NetError {
    /// Wrap a raw transport error as a connection-establishment failure.
    pub fn connect_failed(
        address: impl Into<String>,
        source: impl Into<Cause>,
    ) -> Self {
        NetError::ConnectFailed { address: address.into(), source: source.into() }
    }
}
