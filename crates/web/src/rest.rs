use http::header::ALLOW;
use http::HeaderValue;
use tracing::{debug, warn};
use weft_http::handler::{Handler, HandlerError};
use weft_http::protocol::{Request, Response};

use crate::error::RouteError;
use crate::router::Router;

/// Serves a [`Router`] as a bridge [`Handler`].
///
/// Requests whose path matches no resource are left to the next handler. Method, consumed
/// and produced type mismatches are answered with `405`, `415` and `406`.
#[derive(Debug)]
pub struct RestHandler {
    router: Router,
}

impl RestHandler {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    fn reject(error: &RouteError, response: &mut Response) {
        response.set_status(error.status());
        if let RouteError::MethodNotAllowed { allowed } = error {
            let allow = allowed.iter().map(http::Method::as_str).collect::<Vec<_>>().join(", ");
            match HeaderValue::from_str(&allow) {
                Ok(value) => {
                    response.headers_mut().insert(ALLOW, value);
                }
                Err(e) => warn!(cause = %e, "invalid allow header"),
            }
        }
    }
}

impl From<Router> for RestHandler {
    fn from(router: Router) -> Self {
        Self::new(router)
    }
}

impl Handler for RestHandler {
    fn handle(&self, request: &mut Request, response: &mut Response) -> Result<bool, HandlerError> {
        let matched = match self.router.route(request) {
            Ok(matched) => matched,
            Err(RouteError::NotFound) => return Ok(false),
            Err(e) => {
                debug!(path = request.path(), cause = %e, "request rejected by router");
                Self::reject(&e, response);
                return Ok(true);
            }
        };

        let (resource, params, content_type) = matched.into_parts();
        match HeaderValue::from_str(&content_type.to_string()) {
            Ok(value) => response.default_content_type(value),
            Err(e) => warn!(cause = %e, content_type = %content_type, "negotiated content type is not a valid header"),
        }

        resource.handler().handle(request, response, &params)?;
        Ok(true)
    }
}
