//! HTTP request body handling implementation.
//!
//! The reactor receives request bodies as a push-driven sequence of chunks, while
//! handlers running on worker threads want to pull them with blocking reads. This module
//! bridges the two:
//!
//! - [`ByteChannel`]: ordered chunk queue shared by exactly one writer (the reactor) and
//!   one reader (the worker), terminated by [`PayloadItem::Eof`](crate::protocol::PayloadItem)
//! - [`BodySlot`]: the per-request slot the channel is lazily created in
//! - [`BodyReader`]: the `std::io::Read` view handed to handlers
//!
//! # Design Goals
//!
//! 1. **Reactor never blocks**
//!    - pushes and the end marker are enqueued without waiting on the reader
//!    - a full queue fails the request instead of stalling the connection
//!
//! 2. **Bounded waiting on the worker**
//!    - reads park the worker for at most the configured idle timeout
//!    - closing the channel always wakes a pending read
//!
//! 3. **Protocol Correctness**
//!    - bytes are delivered exactly once and in order
//!    - an unread body is discarded when the request completes

mod body_channel;
mod body_reader;

pub use body_channel::BodySlot;
pub use body_channel::ByteChannel;
pub use body_channel::ChannelConfig;
pub use body_reader::BodyReader;
