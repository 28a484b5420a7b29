//! HTTP request handling implementation.
//!
//! [`RequestHeader`] wraps the decoded request line and headers delivered by the reactor.
//! [`Request`] is what handlers see on the worker thread: the header plus a blocking
//! [`BodyReader`].

use std::sync::Arc;

use http::header::{CONTENT_TYPE, HOST};
use http::{Extensions, HeaderMap, HeaderValue, Method, Request as HttpRequest, Uri, Version};

use crate::protocol::body::{BodyReader, BodySlot, ChannelConfig};

/// Represents an HTTP request header.
///
/// Wraps the `http::Request<()>` the reactor decoded, without a body.
#[derive(Debug)]
pub struct RequestHeader {
    inner: HttpRequest<()>,
}

impl RequestHeader {
    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn extensions(&self) -> &Extensions {
        self.inner.extensions()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        self.inner.extensions_mut()
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<HttpRequest<()>> for RequestHeader {
    #[inline]
    fn from(inner: HttpRequest<()>) -> Self {
        Self { inner }
    }
}

/// A request as seen by handlers running on a worker thread.
#[derive(Debug)]
pub struct Request {
    header: RequestHeader,
    body: BodyReader,
}

impl Request {
    pub fn new(header: RequestHeader, body: BodyReader) -> Self {
        Self { header, body }
    }

    /// A request whose body is already at end of stream.
    pub fn without_body(header: impl Into<RequestHeader>) -> Self {
        let slot = BodySlot::new(ChannelConfig::default());
        slot.close();
        Self::new(header.into(), BodyReader::new(Arc::new(slot)))
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn method(&self) -> &Method {
        self.header.method()
    }

    pub fn uri(&self) -> &Uri {
        self.header.uri()
    }

    /// The request path without query string.
    pub fn path(&self) -> &str {
        self.header.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.header.headers()
    }

    pub fn extensions(&self) -> &Extensions {
        self.header.extensions()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        self.header.extensions_mut()
    }

    /// Returns true if `name` occurs once and its whole value is `value`, ignoring ASCII
    /// case and surrounding whitespace. Lists like `foo, websocket` do not match.
    pub fn header_equals(&self, name: impl http::header::AsHeaderName, value: &str) -> bool {
        let mut values = self.headers().get_all(name).iter();
        match (values.next(), values.next()) {
            (Some(only), None) => only.to_str().is_ok_and(|v| v.trim().eq_ignore_ascii_case(value)),
            _ => false,
        }
    }

    /// The raw `Content-Type` value, if present and valid ASCII.
    pub fn content_type(&self) -> Option<&str> {
        self.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// The authority the request was sent to, from the URI or the `Host` header.
    pub fn host(&self) -> Option<&str> {
        self.uri()
            .authority()
            .map(http::uri::Authority::as_str)
            .or_else(|| self.headers().get(HOST).and_then(|v: &HeaderValue| v.to_str().ok()))
    }

    /// Blocking access to the request body.
    pub fn body(&mut self) -> &mut BodyReader {
        &mut self.body
    }

    pub(crate) fn discard_body(&self) {
        self.body.discard();
    }
}
