use tracing::debug;

use crate::handler::{Handler, HandlerError};
use crate::protocol::{Request, Response};

/// Redirects plain HTTP requests to the same location on an HTTPS port.
#[derive(Debug, Clone, Copy)]
pub struct HttpsRedirector {
    https_port: u16,
}

impl HttpsRedirector {
    pub fn new(https_port: u16) -> Self {
        Self { https_port }
    }

    pub fn https_port(&self) -> u16 {
        self.https_port
    }

    fn location(&self, request: &Request) -> Option<String> {
        let host = request.host()?;
        let host = strip_port(host);
        let path_and_query = request.uri().path_and_query().map_or("/", |p| p.as_str());
        Some(format!("https://{host}:{}{path_and_query}", self.https_port))
    }
}

fn strip_port(authority: &str) -> &str {
    // IPv6 literals keep their brackets
    if let Some(end) = authority.rfind(']') {
        return &authority[..=end];
    }
    authority.rsplit_once(':').map_or(authority, |(host, _)| host)
}

impl Handler for HttpsRedirector {
    fn handle(&self, request: &mut Request, response: &mut Response) -> Result<bool, HandlerError> {
        let secure = request.uri().scheme_str().is_some_and(|scheme| scheme.eq_ignore_ascii_case("https"));
        if secure {
            return Ok(false);
        }

        let Some(location) = self.location(request) else {
            debug!(uri = %request.uri(), "no host to redirect to");
            return Ok(false);
        };

        debug!(location = %location, "redirecting to https");
        response.redirect(&location)?;
        Ok(true)
    }
}
