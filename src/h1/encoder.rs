//! HTTP/1.1 request encoder.
//!
//! One encoder instance serializes every request written to a connection, in
//! order. Besides producing bytes it keeps the paired response decoder
//! honest: each encoded request pushes its method and a framing [`Signal`]
//! onto the shared queues, and requests carrying `Expect: 100-continue` arm
//! a flag that defers the body until the connection reports either a
//! "100 Continue" or a cancel-write notification.
//!
//! All writes for a connection go through a single owning execution context;
//! encoding is never concurrent on one connection.

use crate::base::message::RequestMetaData;
use crate::base::neterror::NetError;
use crate::h1::headerutils::{self, BodyLength};
use crate::h1::signal::{MethodQueue, Signal, SignalQueue};
use bytes::BytesMut;
use http::{HeaderMap, Version};
use std::borrow::Cow;

/// Connection-scoped notifications the encoder reacts to.
///
/// Both are forwarded unchanged to downstream handlers after the encoder
/// updates its local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireEvent {
    /// The decoder saw a "100 Continue" interim response.
    ContinueReceived,
    /// The deferred body write was cancelled; move on to the next request.
    CancelWrite,
}

/// Progress of the in-flight request's body on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentProgress {
    /// Declared content fully accounted for; ready for the next request.
    Consumed,
    /// This many declared bytes still to write.
    Remaining(u64),
    /// Chunked or unspecified framing; open until finished explicitly.
    Streaming,
}

/// Serializes outbound requests for one connection.
pub struct RequestEncoder {
    method_queue: MethodQueue,
    signal_queue: SignalQueue,
    /// Set while an outgoing request with `Expect: 100-continue` awaits the
    /// server's verdict. Only one request's body can be mid-flight at the
    /// transport-write level, so a single flag suffices even under
    /// pipelining.
    expect_continue: bool,
    content: ContentProgress,
}

impl RequestEncoder {
    /// Create an encoder sharing `method_queue` and `signal_queue` with the
    /// connection's response decoder.
    pub fn new(method_queue: MethodQueue, signal_queue: SignalQueue) -> Self {
        Self {
            method_queue,
            signal_queue,
            expect_continue: false,
            content: ContentProgress::Consumed,
        }
    }

    /// Encode one request's start-line and headers into `buf` and record its
    /// framing for the decoder.
    ///
    /// Returns the inferred body framing. A full method or signal queue is a
    /// hard encode failure: the request cannot be transmitted safely without
    /// a place to record how its response must be decoded, and the
    /// connection should be torn down rather than reused.
    pub fn write_meta_data(
        &mut self,
        buf: &mut BytesMut,
        meta: &RequestMetaData,
    ) -> Result<BodyLength, NetError> {
        self.encode_initial_line(buf, meta);

        // The decoder pops methods in strict FIFO order to pick default
        // framing for the matching response; enqueue exactly once, before
        // any body bytes exist.
        if !self.method_queue.offer(meta.method().clone()) {
            return Err(NetError::MethodQueueFull);
        }

        let body_length = headerutils::body_length(meta)?;
        encode_headers(buf, meta.headers());
        // A body framed as chunked must be declared as chunked, or the peer
        // reads the request as bodiless and the chunk markers as the start of
        // the next request.
        if body_length == BodyLength::Unspecified {
            buf.extend_from_slice(b"transfer-encoding: chunked\r\n");
        }
        buf.extend_from_slice(b"\r\n");

        // One signal per request, regardless of interim responses; without
        // it the decoder mis-frames later pipelined exchanges.
        let expect_continue = headerutils::is_expect_continue(meta.headers());
        let signal = if expect_continue {
            Signal::RequestWithExpectContinue
        } else {
            Signal::Request
        };
        if !self.signal_queue.offer(signal) {
            tracing::error!("signal queue full; tearing down is the only safe option");
            return Err(NetError::SignalQueueFull);
        }

        self.expect_continue = expect_continue;
        self.content = match body_length {
            BodyLength::Known(0) => ContentProgress::Consumed,
            BodyLength::Known(n) => ContentProgress::Remaining(n),
            BodyLength::Chunked | BodyLength::Unspecified => ContentProgress::Streaming,
        };
        Ok(body_length)
    }

    /// Append one body chunk, applying the framing chosen at
    /// [`write_meta_data`](Self::write_meta_data) time.
    pub fn write_body(&mut self, buf: &mut BytesMut, chunk: &[u8]) -> Result<(), NetError> {
        debug_assert!(!self.expect_continue, "body write deferred until 100 Continue");
        if chunk.is_empty() {
            return Ok(());
        }
        match &mut self.content {
            ContentProgress::Consumed => Err(NetError::ContentLengthExceeded),
            ContentProgress::Remaining(remaining) => {
                if (chunk.len() as u64) > *remaining {
                    return Err(NetError::ContentLengthExceeded);
                }
                buf.extend_from_slice(chunk);
                *remaining -= chunk.len() as u64;
                if *remaining == 0 {
                    self.content = ContentProgress::Consumed;
                }
                Ok(())
            }
            ContentProgress::Streaming => {
                buf.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                buf.extend_from_slice(chunk);
                buf.extend_from_slice(b"\r\n");
                Ok(())
            }
        }
    }

    /// Terminate the body: emits the last chunk marker for streamed framing
    /// and fails if declared content is still outstanding.
    pub fn finish_body(&mut self, buf: &mut BytesMut) -> Result<(), NetError> {
        match self.content {
            ContentProgress::Consumed => Ok(()),
            ContentProgress::Remaining(_) => Err(NetError::ContentLengthUnderflow),
            ContentProgress::Streaming => {
                buf.extend_from_slice(b"0\r\n\r\n");
                self.content = ContentProgress::Consumed;
                Ok(())
            }
        }
    }

    /// Whether an encoded request is currently waiting on the server's
    /// 100-continue verdict.
    pub fn expect_continue(&self) -> bool {
        self.expect_continue
    }

    /// Whether the in-flight request's declared content is fully accounted
    /// for.
    pub fn content_consumed(&self) -> bool {
        self.content == ContentProgress::Consumed
    }

    /// React to a connection-scoped notification, then hand it back for
    /// forwarding to downstream handlers.
    pub fn on_event(&mut self, event: WireEvent) -> WireEvent {
        if self.expect_continue {
            match event {
                WireEvent::ContinueReceived => {
                    self.expect_continue = false;
                }
                WireEvent::CancelWrite => {
                    // No body will be sent: mark the declared content as
                    // consumed so the next pipelined request can proceed.
                    self.content = ContentProgress::Consumed;
                    self.expect_continue = false;
                }
            }
        }
        event
    }

    fn encode_initial_line(&self, buf: &mut BytesMut, meta: &RequestMetaData) {
        buf.extend_from_slice(meta.method().as_str().as_bytes());
        buf.extend_from_slice(b" ");

        let target = meta.request_target();
        if target.is_empty() {
            // An absent request-target is sent as the absolute path "/".
            buf.extend_from_slice(b"/ ");
        } else {
            let (target, needs_slash) = normalize_absolute_form(target);
            buf.extend_from_slice(target.as_bytes());
            if needs_slash {
                buf.extend_from_slice(b"/ ");
            } else {
                buf.extend_from_slice(b" ");
            }
        }

        // A request generated with a non-1.x version (e.g. ALPN preferred
        // h2) would produce an invalid request line; force HTTP/1.1.
        buf.extend_from_slice(if meta.version() == Version::HTTP_10 {
            b"HTTP/1.0"
        } else {
            // Covers HTTP_11 and forces every non-1.x version to 1.1.
            b"HTTP/1.1"
        });
        buf.extend_from_slice(b"\r\n");
    }
}

/// Absolute-form targets must carry a path after the authority. Returns the
/// (possibly rewritten) target and whether a trailing `/` must follow it.
fn normalize_absolute_form(target: &str) -> (Cow<'_, str>, bool) {
    let Some(scheme_end) = target.find("://") else {
        return (Cow::Borrowed(target), false);
    };
    if target.starts_with('/') {
        return (Cow::Borrowed(target), false);
    }
    let authority_start = scheme_end + 3;
    match target[authority_start..].find('?') {
        None => {
            let needs_slash = !target[authority_start..].contains('/');
            (Cow::Borrowed(target), needs_slash)
        }
        Some(relative_q) => {
            let q = authority_start + relative_q;
            if target[authority_start..q].contains('/') {
                (Cow::Borrowed(target), false)
            } else {
                // Insert the missing path before the query string.
                let mut rewritten = String::with_capacity(target.len() + 1);
                rewritten.push_str(&target[..q]);
                rewritten.push('/');
                rewritten.push_str(&target[q..]);
                (Cow::Owned(rewritten), false)
            }
        }
    }
}

fn encode_headers(buf: &mut BytesMut, headers: &HeaderMap) {
    for (name, value) in headers {
        buf.extend_from_slice(name.as_str().as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
}
