use weft_http::handler::HandlerError;
use weft_http::protocol::{Request, Response};

use crate::PathParams;

/// The handler registered for one resource method.
///
/// It runs on a worker thread once routing and negotiation succeeded; the negotiated
/// content type is already set on the response as a default.
pub trait ResourceHandler: Send + Sync {
    fn handle(&self, request: &mut Request, response: &mut Response, params: &PathParams) -> Result<(), HandlerError>;
}

/// A [`ResourceHandler`] backed by a function or closure.
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

impl<F> ResourceHandler for FnHandler<F>
where
    F: Fn(&mut Request, &mut Response, &PathParams) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, request: &mut Request, response: &mut Response, params: &PathParams) -> Result<(), HandlerError> {
        (self.f)(request, response, params)
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut Request, &mut Response, &PathParams) -> Result<(), HandlerError> + Send + Sync,
{
    FnHandler { f }
}

impl<H: ResourceHandler + ?Sized> ResourceHandler for Box<H> {
    fn handle(&self, request: &mut Request, response: &mut Response, params: &PathParams) -> Result<(), HandlerError> {
        (**self).handle(request, response, params)
    }
}
