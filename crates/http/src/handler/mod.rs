//! The synchronous handler contract.
//!
//! Handlers run on a worker thread and may block while reading the request body or
//! writing the response. They are tried in registration order; the first one returning
//! `Ok(true)` ends the chain.

mod redirect;
mod websocket;

pub use redirect::HttpsRedirector;
pub use websocket::WebSocketFactory;
pub use websocket::WebSocketHandler;
pub use websocket::WebSocketHandlerBuilder;

use std::error::Error;
use std::sync::Arc;

use crate::protocol::{Request, Response};

pub type HandlerError = Box<dyn Error + Send + Sync>;

pub trait Handler: Send + Sync {
    /// Handles the request, returning whether it was handled.
    fn handle(&self, request: &mut Request, response: &mut Response) -> Result<bool, HandlerError>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response) -> Result<bool, HandlerError> + Send + Sync,
{
    fn handle(&self, request: &mut Request, response: &mut Response) -> Result<bool, HandlerError> {
        (self.f)(request, response)
    }
}

pub fn make_handler<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response) -> Result<bool, HandlerError> + Send + Sync,
{
    HandlerFn { f }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn handle(&self, request: &mut Request, response: &mut Response) -> Result<bool, HandlerError> {
        (**self).handle(request, response)
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle(&self, request: &mut Request, response: &mut Response) -> Result<bool, HandlerError> {
        (**self).handle(request, response)
    }
}
