use std::panic::{self, AssertUnwindSafe};

use http::StatusCode;
use tracing::{debug, error, warn};

use crate::handler::Handler;
use crate::protocol::{Request, Response};
use crate::utils::panic_message;

/// One in-flight request: the request/response pair a worker thread runs handlers on.
///
/// A context is created when the request head arrives and consumed by
/// [`dispatch`](Self::dispatch); dropping it releases the body channel.
#[derive(Debug)]
pub struct RequestContext {
    id: u64,
    request: Request,
    response: Response,
}

impl RequestContext {
    pub fn new(id: u64, request: Request, response: Response) -> Self {
        Self { id, request, response }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs `handlers` in order until one handles the request, then completes the response.
    ///
    /// Unhandled requests get `404`. A handler error or panic is logged and ends the chain;
    /// the response gets `500` unless its head was already sent.
    pub fn dispatch<H: Handler>(mut self, handlers: &[H]) {
        let id = self.id;
        let handled = handlers.iter().enumerate().any(|(index, handler)| self.run_one(index, handler));

        if !handled {
            debug!(id = id, path = self.request.path(), "no handler accepted the request");
            self.response.set_status(StatusCode::NOT_FOUND);
        }

        self.complete();
    }

    fn run_one<H: Handler>(&mut self, index: usize, handler: &H) -> bool {
        let Self { id, request, response } = self;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request, response)));

        let fault = match outcome {
            Ok(Ok(handled)) => return handled,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()).to_owned(),
        };

        error!(id = *id, handler = index, cause = %fault, "handler failed");
        if !response.is_committed() {
            response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
        true
    }

    fn complete(mut self) {
        self.request.discard_body();
        if let Err(e) = self.response.finish() {
            warn!(id = self.id, cause = %e, "failed to complete response");
        }
    }
}
