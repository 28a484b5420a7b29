use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, error, warn};

use crate::bridge::{BridgeError, RequestContext, WorkerPool};
use crate::config::BridgeConfig;
use crate::handler::Handler;
use crate::protocol::body::{BodyReader, BodySlot};
use crate::protocol::{ProtocolError, Request, RequestHeader, Response, ResponseSink};

/// The calls a connection reactor makes for each request.
///
/// All methods run on the reactor thread and return without blocking.
pub trait ReactorHandler: Send + Sync {
    /// The request head was decoded; starts processing it.
    fn on_headers(&self, header: RequestHeader, sink: Box<dyn ResponseSink>) -> Exchange;

    /// A chunk of the request body arrived.
    fn on_body_chunk(&self, exchange: &Exchange, chunk: Bytes) -> Result<(), ProtocolError>;

    /// The request body ended, or the request never had one.
    fn on_complete(&self, exchange: &Exchange);
}

/// The reactor's handle on one in-flight request.
#[derive(Debug)]
pub struct Exchange {
    id: u64,
    slot: Arc<BodySlot>,
}

impl Exchange {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Runs synchronous [`Handler`]s on a bounded worker pool for a non-blocking reactor.
pub struct SyncBridge {
    handlers: Arc<[Box<dyn Handler>]>,
    config: BridgeConfig,
    pool: WorkerPool,
    next_id: AtomicU64,
}

impl std::fmt::Debug for SyncBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBridge")
            .field("handlers", &self.handlers.len())
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl SyncBridge {
    pub fn builder() -> SyncBridgeBuilder {
        SyncBridgeBuilder { handlers: Vec::new(), config: BridgeConfig::default(), pool: None }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn worker_pool(&self) -> &WorkerPool {
        &self.pool
    }

    fn reject(id: u64, sink: Box<dyn ResponseSink>) {
        let mut response = Response::new(sink);
        response.set_status(StatusCode::SERVICE_UNAVAILABLE);
        if let Err(e) = response.finish() {
            error!(id = id, cause = %e, "failed to send rejection");
        }
    }
}

impl ReactorHandler for SyncBridge {
    fn on_headers(&self, header: RequestHeader, sink: Box<dyn ResponseSink>) -> Exchange {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(BodySlot::new(self.config.body()));
        let exchange = Exchange { id, slot: Arc::clone(&slot) };

        match self.pool.try_reserve() {
            Ok(reservation) => {
                debug!(id = id, method = %header.method(), uri = %header.uri(), "dispatching request");
                let request = Request::new(header, BodyReader::new(slot));
                let context = RequestContext::new(id, request, Response::new(sink));
                let handlers = Arc::clone(&self.handlers);
                reservation.run(move || context.dispatch(handlers.as_ref()));
            }
            Err(e) => {
                warn!(id = id, cause = %e, "rejecting request");
                // later chunks for this exchange are dropped
                slot.channel().discard();
                Self::reject(id, sink);
            }
        }

        exchange
    }

    fn on_body_chunk(&self, exchange: &Exchange, chunk: Bytes) -> Result<(), ProtocolError> {
        exchange.slot.channel().push(chunk).inspect_err(|e| {
            warn!(id = exchange.id, cause = %e, "failed to queue request body chunk");
        })
    }

    fn on_complete(&self, exchange: &Exchange) {
        exchange.slot.close();
    }
}

pub struct SyncBridgeBuilder {
    handlers: Vec<Box<dyn Handler>>,
    config: BridgeConfig,
    pool: Option<WorkerPool>,
}

impl std::fmt::Debug for SyncBridgeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBridgeBuilder")
            .field("handlers", &self.handlers.len())
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish()
    }
}

impl SyncBridgeBuilder {
    /// Appends a handler; handlers are tried in the order they were added.
    #[must_use]
    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    #[must_use]
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `pool` instead of a pool on the current runtime sized from the config.
    #[must_use]
    pub fn worker_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<SyncBridge, BridgeError> {
        let pool = match self.pool {
            Some(pool) => pool,
            None => WorkerPool::current(self.config.max_in_flight())?,
        };
        Ok(SyncBridge { handlers: self.handlers.into(), config: self.config, pool, next_id: AtomicU64::new(0) })
    }
}
