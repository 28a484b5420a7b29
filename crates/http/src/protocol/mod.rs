//! Core protocol abstractions shared by the reactor, the bridge and handlers.
//!
//! # Architecture
//!
//! - **Message Handling** ([`message`]): the tagged body stream item
//!   - [`PayloadItem`]: a body chunk or the end-of-stream marker
//!
//! - **Request Processing** ([`request`]): request header and the handler-facing request
//!   - [`RequestHeader`]: wraps the decoded `http::Request<()>`
//!   - [`Request`]: header plus blocking body access
//!
//! - **Response Processing** ([`response`]): buffered response writing
//!   - [`Response`]: status, headers and a `std::io::Write` body
//!   - [`ResponseSink`]: the reactor's half of a response
//!   - [`MemorySink`]: an in-memory sink for in-process calls
//!
//! - **Body Streaming** ([`body`]): push-to-pull conversion of request bodies
//!
//! - **Upgrades** ([`upgrade`]): websocket hand-over types
//!
//! - **Error Handling** ([`error`]):
//!   - [`ProtocolError`]: request body stream errors
//!   - [`SendError`]: Response sending errors

mod message;
pub use message::PayloadItem;

mod request;
pub use request::Request;
pub use request::RequestHeader;

mod response;
pub use response::Response;
pub use response::ResponseHead;
pub use response::ResponseSink;

mod memory_sink;
pub use memory_sink::MemorySink;
pub use memory_sink::RecordedResponse;
pub use memory_sink::ResponseRecord;

mod upgrade;
pub use upgrade::WebSocket;
pub use upgrade::WebSocketSession;
pub use upgrade::WebSocketSettings;
pub use upgrade::WebSocketUpgrade;

mod error;
pub use error::ProtocolError;
pub use error::SendError;

pub mod body;
