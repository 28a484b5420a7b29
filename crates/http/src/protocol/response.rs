//! HTTP response handling implementation.
//!
//! Handlers write responses through [`Response`], a buffered `std::io::Write` on top of
//! the reactor-provided [`ResponseSink`]. The head (status and headers) is sent once, on
//! the first flush or at completion, whichever happens first.

use std::io::{self, Write};

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::warn;

use crate::protocol::{SendError, WebSocketUpgrade};

/// Type alias for HTTP response headers.
///
/// This type represents the header portion of an HTTP response, using
/// `http::Response<()>` with an empty body placeholder.
pub type ResponseHead = http::Response<()>;

const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// The reactor side of a response.
///
/// Implementations hand data to the connection without blocking the worker for long;
/// encoding to the wire is their concern.
pub trait ResponseSink: Send {
    fn send_head(&mut self, head: &ResponseHead) -> io::Result<()>;

    fn send_chunk(&mut self, chunk: Bytes) -> io::Result<()>;

    /// Signals that the response is complete.
    fn finish(&mut self) -> io::Result<()>;

    /// Hands the connection over to the websocket frame codec.
    ///
    /// Returns `Ok(false)` when the connection cannot be upgraded.
    fn upgrade(&mut self, _upgrade: WebSocketUpgrade) -> io::Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    Finished,
    Upgraded,
}

/// A response under construction by a handler.
pub struct Response {
    head: ResponseHead,
    buffer: BytesMut,
    buffer_size: usize,
    state: State,
    sink: Box<dyn ResponseSink>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("head", &self.head)
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Response {
    pub fn new(sink: Box<dyn ResponseSink>) -> Self {
        Self { head: ResponseHead::default(), buffer: BytesMut::new(), buffer_size: DEFAULT_BUFFER_SIZE, state: State::Open, sink }
    }

    pub fn status(&self) -> StatusCode {
        self.head.status()
    }

    /// Sets the status code; ignored with a warning once the head was sent.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.is_committed() {
            warn!(status = %status, "status ignored, response head already sent");
            return;
        }
        *self.head.status_mut() = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    /// Mutable headers. Changes made after the head was sent are not transmitted.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.head.headers_mut()
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.head.headers().get(CONTENT_TYPE)
    }

    pub fn set_content_type(&mut self, content_type: HeaderValue) {
        self.headers_mut().insert(CONTENT_TYPE, content_type);
    }

    /// Sets the content type unless the handler already chose one.
    pub fn default_content_type(&mut self, content_type: HeaderValue) {
        self.headers_mut().entry(CONTENT_TYPE).or_insert(content_type);
    }

    /// Sets a `302 Found` pointing at `location`.
    pub fn redirect(&mut self, location: &str) -> Result<(), SendError> {
        let location = HeaderValue::from_str(location).map_err(|e| SendError::invalid_header("location", e))?;
        self.set_status(StatusCode::FOUND);
        self.headers_mut().insert(LOCATION, location);
        Ok(())
    }

    /// Size of the write buffer; reaching it flushes a chunk to the sink.
    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size.max(1);
    }

    /// Returns true once the head has been handed to the sink (or the connection upgraded).
    pub fn is_committed(&self) -> bool {
        self.state != State::Open
    }

    pub fn is_upgraded(&self) -> bool {
        self.state == State::Upgraded
    }

    fn commit(&mut self) -> Result<(), SendError> {
        match self.state {
            State::Open => {
                self.sink.send_head(&self.head)?;
                self.state = State::Committed;
                Ok(())
            }
            State::Committed => Ok(()),
            State::Finished | State::Upgraded => Err(SendError::AlreadyCommitted),
        }
    }

    fn flush_buffer(&mut self) -> Result<(), SendError> {
        self.commit()?;
        if !self.buffer.is_empty() {
            let chunk = self.buffer.split().freeze();
            self.sink.send_chunk(chunk)?;
        }
        Ok(())
    }

    /// Hands the connection to the websocket codec; terminal for this response.
    pub fn upgrade(&mut self, upgrade: WebSocketUpgrade) -> Result<bool, SendError> {
        if self.is_committed() {
            return Err(SendError::AlreadyCommitted);
        }
        let upgraded = self.sink.upgrade(upgrade)?;
        if upgraded {
            self.state = State::Upgraded;
        }
        Ok(upgraded)
    }

    /// Completes the response: sends the head if needed, the buffered body and the end.
    ///
    /// A response that was never flushed gets a `Content-Length`. Finishing twice or after
    /// an upgrade does nothing.
    pub fn finish(&mut self) -> Result<(), SendError> {
        match self.state {
            State::Finished | State::Upgraded => return Ok(()),
            State::Open => {
                let length = HeaderValue::from(self.buffer.len());
                self.headers_mut().entry(CONTENT_LENGTH).or_insert(length);
            }
            State::Committed => {}
        }

        self.flush_buffer()?;
        self.state = State::Finished;
        self.sink.finish()?;
        Ok(())
    }
}

impl Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if matches!(self.state, State::Finished | State::Upgraded) {
            return Err(SendError::AlreadyCommitted.into());
        }

        if self.buffer.len() >= self.buffer_size {
            self.flush_buffer()?;
        }

        // a full buffer is sent on the next write, flush or finish
        let n = buf.len().min(self.buffer_size - self.buffer.len());
        self.buffer.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer().map_err(io::Error::from)
    }
}
