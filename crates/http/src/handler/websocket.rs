use std::time::Duration;

use http::header::UPGRADE;
use http::{HeaderMap, Method};
use tracing::{debug, info, warn};

use crate::handler::{Handler, HandlerError};
use crate::protocol::{Request, Response, WebSocket, WebSocketSettings, WebSocketUpgrade};

/// Creates the application socket for an upgrade request.
///
/// Returning `Ok(None)` declines the upgrade and lets the next handler run. Headers added
/// to `response_headers` are sent with the handshake response.
#[cfg_attr(test, mockall::automock)]
pub trait WebSocketFactory: Send + Sync {
    fn create(&self, request: &Request, response_headers: &mut HeaderMap) -> Result<Option<Box<dyn WebSocket>>, HandlerError>;
}

impl<F> WebSocketFactory for F
where
    F: Fn(&Request, &mut HeaderMap) -> Result<Option<Box<dyn WebSocket>>, HandlerError> + Send + Sync,
{
    fn create(&self, request: &Request, response_headers: &mut HeaderMap) -> Result<Option<Box<dyn WebSocket>>, HandlerError> {
        self(request, response_headers)
    }
}

/// Promotes `GET` requests carrying `Upgrade: websocket` into websocket connections.
///
/// The handshake and framing are performed by the reactor's frame codec through
/// [`ResponseSink::upgrade`](crate::protocol::ResponseSink::upgrade).
pub struct WebSocketHandler {
    factory: Box<dyn WebSocketFactory>,
    path: Option<String>,
    settings: WebSocketSettings,
}

impl std::fmt::Debug for WebSocketHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketHandler").field("path", &self.path).field("settings", &self.settings).finish_non_exhaustive()
    }
}

impl WebSocketHandler {
    pub fn builder<F: WebSocketFactory + 'static>(factory: F) -> WebSocketHandlerBuilder {
        WebSocketHandlerBuilder { factory: Box::new(factory), path: None, settings: WebSocketSettings::default() }
    }

    pub fn settings(&self) -> &WebSocketSettings {
        &self.settings
    }

    fn applies_to(&self, request: &Request) -> bool {
        if request.method() != Method::GET {
            return false;
        }
        match &self.path {
            Some(path) if path != request.path() => false,
            _ => request.header_equals(UPGRADE, "websocket"),
        }
    }
}

impl Handler for WebSocketHandler {
    fn handle(&self, request: &mut Request, response: &mut Response) -> Result<bool, HandlerError> {
        if !self.applies_to(request) {
            return Ok(false);
        }

        let mut headers = HeaderMap::new();
        let Some(socket) = self.factory.create(request, &mut headers)? else {
            debug!(path = request.path(), "websocket factory declined the upgrade");
            return Ok(false);
        };

        let upgraded = response.upgrade(WebSocketUpgrade { socket, headers, settings: self.settings })?;
        if upgraded {
            info!(path = request.path(), "connection upgraded to websocket");
        } else {
            warn!(path = request.path(), "connection could not be upgraded to websocket");
        }
        Ok(upgraded)
    }
}

pub struct WebSocketHandlerBuilder {
    factory: Box<dyn WebSocketFactory>,
    path: Option<String>,
    settings: WebSocketSettings,
}

impl std::fmt::Debug for WebSocketHandlerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketHandlerBuilder").field("path", &self.path).field("settings", &self.settings).finish_non_exhaustive()
    }
}

impl WebSocketHandlerBuilder {
    /// Only upgrade requests to exactly this path; any path when unset.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: WebSocketSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_idle_read_timeout(mut self, timeout: Duration) -> Self {
        self.settings = self.settings.with_idle_read_timeout(timeout);
        self
    }

    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.settings = self.settings.with_ping_interval(interval);
        self
    }

    #[must_use]
    pub fn with_max_frame_payload_length(mut self, length: usize) -> Self {
        self.settings = self.settings.with_max_frame_payload_length(length);
        self
    }

    pub fn build(self) -> WebSocketHandler {
        WebSocketHandler { factory: self.factory, path: self.path, settings: self.settings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MemorySink;
    use http::HeaderValue;

    struct Echo;
    impl WebSocket for Echo {}

    fn upgrade_request(method: Method, path: &str) -> Request {
        Request::without_body(
            http::Request::builder()
                .method(method)
                .uri(path)
                .header(http::header::CONNECTION, "Upgrade")
                .header(UPGRADE, "WebSocket")
                .body(())
                .unwrap(),
        )
    }

    fn accepting_factory() -> MockWebSocketFactory {
        let mut factory = MockWebSocketFactory::new();
        factory.expect_create().returning(|_, headers| {
            headers.insert("sec-websocket-protocol", HeaderValue::from_static("chat"));
            Ok(Some(Box::new(Echo)))
        });
        factory
    }

    #[test]
    fn upgrades_with_configured_settings() {
        let handler = WebSocketHandler::builder(accepting_factory())
            .with_path("/chat")
            .with_idle_read_timeout(Duration::from_secs(10))
            .with_ping_interval(Duration::from_secs(2))
            .with_max_frame_payload_length(1024)
            .build();

        let (sink, record) = MemorySink::new();
        let mut response = Response::new(Box::new(sink.accepting_upgrades()));
        let mut request = upgrade_request(Method::GET, "/chat");

        assert!(handler.handle(&mut request, &mut response).unwrap());
        assert!(response.is_upgraded());

        let upgrade = record.take().unwrap().upgrade.unwrap();
        assert_eq!(upgrade.settings.idle_read_timeout(), Duration::from_secs(10));
        assert_eq!(upgrade.settings.ping_interval(), Duration::from_secs(2));
        assert_eq!(upgrade.settings.max_frame_payload_length(), 1024);
        assert_eq!(upgrade.headers.get("sec-websocket-protocol").unwrap(), "chat");
    }

    #[test]
    fn ignores_requests_that_do_not_apply() {
        let mut factory = MockWebSocketFactory::new();
        factory.expect_create().never();
        let handler = WebSocketHandler::builder(factory).with_path("/chat").build();

        let (sink, _record) = MemorySink::new();
        let mut response = Response::new(Box::new(sink.accepting_upgrades()));

        let mut post = upgrade_request(Method::POST, "/chat");
        assert!(!handler.handle(&mut post, &mut response).unwrap());

        let mut other_path = upgrade_request(Method::GET, "/other");
        assert!(!handler.handle(&mut other_path, &mut response).unwrap());

        let mut plain = Request::without_body(http::Request::builder().uri("/chat").body(()).unwrap());
        assert!(!handler.handle(&mut plain, &mut response).unwrap());

        let mut listed = Request::without_body(http::Request::builder().uri("/chat").header(UPGRADE, "foo, websocket").body(()).unwrap());
        assert!(!handler.handle(&mut listed, &mut response).unwrap());

        assert!(!response.is_committed());
    }

    #[test]
    fn declined_factory_yields() {
        let mut factory = MockWebSocketFactory::new();
        factory.expect_create().times(1).returning(|_, _| Ok(None));
        let handler = WebSocketHandler::builder(factory).build();

        let (sink, _record) = MemorySink::new();
        let mut response = Response::new(Box::new(sink.accepting_upgrades()));
        let mut request = upgrade_request(Method::GET, "/anything");

        assert!(!handler.handle(&mut request, &mut response).unwrap());
        assert!(!response.is_upgraded());
    }

    #[test]
    fn reactor_without_upgrade_support_is_not_handled() {
        let handler = WebSocketHandler::builder(accepting_factory()).build();

        let (sink, _record) = MemorySink::new();
        let mut response = Response::new(Box::new(sink));
        let mut request = upgrade_request(Method::GET, "/chat");

        assert!(!handler.handle(&mut request, &mut response).unwrap());
        assert!(!response.is_committed());
    }
}
