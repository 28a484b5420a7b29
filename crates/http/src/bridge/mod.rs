//! The bridge between a non-blocking reactor and blocking handlers.
//!
//! The reactor drives connections and reports request events through [`ReactorHandler`]:
//!
//! 1. [`on_headers`](ReactorHandler::on_headers) creates a [`RequestContext`] and submits it
//!    to the [`WorkerPool`], returning an [`Exchange`] handle.
//! 2. [`on_body_chunk`](ReactorHandler::on_body_chunk) pushes body bytes into the
//!    request's channel, never blocking the reactor.
//! 3. [`on_complete`](ReactorHandler::on_complete) marks the end of the body.
//!
//! On the worker side, handlers read the body with blocking calls and write the response
//! through the reactor's [`ResponseSink`](crate::protocol::ResponseSink).

mod sync_bridge;
mod context;
mod worker_pool;

pub use sync_bridge::Exchange;
pub use sync_bridge::ReactorHandler;
pub use sync_bridge::SyncBridge;
pub use sync_bridge::SyncBridgeBuilder;
pub use context::RequestContext;
pub use worker_pool::Reservation;
pub use worker_pool::WorkerPool;
pub use worker_pool::WorkerPoolMetrics;

use thiserror::Error;
use tokio::runtime::TryCurrentError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("no tokio runtime to run workers on: {source}")]
    NoRuntime {
        #[from]
        source: TryCurrentError,
    },

    #[error("worker pool saturated, max_in_flight: {max_in_flight}")]
    Saturated { max_in_flight: usize },
}
