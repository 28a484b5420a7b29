//! The request-processing core of an embeddable HTTP engine.
//!
//! A connection reactor owns the sockets and decodes requests without ever blocking.
//! Handlers, on the other hand, are plain synchronous code that reads the request body
//! and writes the response with `std::io` calls. This crate sits in between.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Write;
//! use bytes::Bytes;
//! use weft_http::bridge::{ReactorHandler, SyncBridge};
//! use weft_http::handler::{make_handler, HandlerError};
//! use weft_http::protocol::{MemorySink, Request, Response};
//!
//! fn echo(request: &mut Request, response: &mut Response) -> Result<bool, HandlerError> {
//!     let body = request.body().read_to_bytes()?;
//!     response.write_all(&body)?;
//!     Ok(true)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = SyncBridge::builder().handler(make_handler(echo)).build()?;
//!
//!     // what a reactor does for one request
//!     let (sink, record) = MemorySink::new();
//!     let header = http::Request::post("/echo").body(())?.into();
//!     let exchange = bridge.on_headers(header, Box::new(sink));
//!     bridge.on_body_chunk(&exchange, Bytes::from_static(b"hello"))?;
//!     bridge.on_complete(&exchange);
//!
//!     let response = tokio::task::spawn_blocking(move || record.wait(std::time::Duration::from_secs(1))).await?;
//!     println!("{:?}", response.map(|r| r.body()));
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: request, response and body types shared by the reactor and handlers
//! - [`protocol::body`]: the backpressured byte channel turning pushed chunks into reads
//! - [`bridge`]: reactor entry points, per-request contexts and the bounded worker pool
//! - [`handler`]: the synchronous handler contract, websocket upgrades, https redirects
//! - [`config`]: serde-loadable runtime limits
//!
//! # Error Handling
//!
//! - [`protocol::ProtocolError`]: request body stream errors (timeouts, overflow)
//! - [`protocol::SendError`]: response sending errors
//! - [`bridge::BridgeError`]: worker pool setup and saturation
//!
//! Handler errors and panics never reach the reactor: the bridge logs them and answers
//! `500` when the response head was not sent yet.

pub mod bridge;
pub mod config;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
