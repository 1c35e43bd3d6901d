//! Request and response message types.
//!
//! The streaming types carry their payload as an asynchronous byte stream and
//! are what the connection layer trades in. The aggregated types hold the
//! full payload in memory and back the blocking surface; conversion in either
//! direction is provided here.

use crate::base::context::RequestContext;
use crate::base::neterror::NetError;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use http::{HeaderMap, Method, StatusCode, Version};

/// Alias for a streamed message payload.
pub type BodyStream = BoxStream<'static, Result<Bytes, NetError>>;

/// Metadata of one outbound request: start-line fields, headers, and the
/// request-scoped context.
#[derive(Debug)]
pub struct RequestMetaData {
    method: Method,
    request_target: String,
    version: Version,
    headers: HeaderMap,
    context: RequestContext,
}

impl RequestMetaData {
    pub fn new(method: Method, request_target: impl Into<String>) -> Self {
        Self {
            method,
            request_target: request_target.into(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            context: RequestContext::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn request_target(&self) -> &str {
        &self.request_target
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }
}

/// A request whose body is streamed.
pub struct StreamingRequest {
    meta: RequestMetaData,
    body: BodyStream,
}

impl StreamingRequest {
    pub fn new(meta: RequestMetaData, body: BodyStream) -> Self {
        Self { meta, body }
    }

    /// A request with no body.
    pub fn from_meta(meta: RequestMetaData) -> Self {
        Self { meta, body: stream::empty().boxed() }
    }

    pub fn meta(&self) -> &RequestMetaData {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut RequestMetaData {
        &mut self.meta
    }

    pub fn into_parts(self) -> (RequestMetaData, BodyStream) {
        (self.meta, self.body)
    }
}

/// A response whose body is streamed.
pub struct StreamingResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: BodyStream,
}

impl StreamingResponse {
    pub fn new(status: StatusCode, version: Version, headers: HeaderMap, body: BodyStream) -> Self {
        Self { status, version, headers, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Drain the body into memory, producing an aggregated [`Response`].
    pub async fn aggregate(self) -> Result<Response, NetError> {
        let mut buf = BytesMut::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Response {
            status: self.status,
            version: self.version,
            headers: self.headers,
            body: buf.freeze(),
        })
    }
}

/// An aggregated request: the full body is available up front.
#[derive(Debug)]
pub struct Request {
    meta: RequestMetaData,
    body: Bytes,
}

impl Request {
    pub fn new(method: Method, request_target: impl Into<String>) -> Self {
        Self { meta: RequestMetaData::new(method, request_target), body: Bytes::new() }
    }

    pub fn get(request_target: impl Into<String>) -> Self {
        Self::new(Method::GET, request_target)
    }

    pub fn post(request_target: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self { meta: RequestMetaData::new(Method::POST, request_target), body: body.into() }
    }

    pub fn meta(&self) -> &RequestMetaData {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut RequestMetaData {
        &mut self.meta
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        self.meta.context_mut()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Convert into the streaming form used by the connection layer.
    pub fn into_streaming(self) -> StreamingRequest {
        let Request { meta, body } = self;
        let body: BodyStream = if body.is_empty() {
            stream::empty().boxed()
        } else {
            stream::once(async move { Ok(body) }).boxed()
        };
        StreamingRequest { meta, body }
    }
}

/// An aggregated response with its full body in memory.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}
