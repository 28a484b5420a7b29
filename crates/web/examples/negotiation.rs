//! Drives a bridge the way a connection reactor would, using in-memory response sinks.
//!
//! Run with `cargo run -p weft-web --example negotiation`.

use std::io::Write;
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, UPGRADE};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use weft_http::bridge::{ReactorHandler, SyncBridge};
use weft_http::config::BridgeConfig;
use weft_http::handler::{HandlerError, WebSocketHandler};
use weft_http::protocol::{MemorySink, Request, RequestHeader, Response, WebSocket};
use weft_web::router::{get, post, Router};
use weft_web::{handler_fn, PathParams, RestHandler};

struct Chat;

impl WebSocket for Chat {
    fn on_text(&mut self, message: &str) -> Result<(), HandlerError> {
        info!(message = message, "chat message");
        Ok(())
    }
}

fn image(_: &mut Request, response: &mut Response, params: &PathParams) -> Result<(), HandlerError> {
    write!(response, "<binary {}>", params.get("name").unwrap_or_default())?;
    Ok(())
}

fn image_info(_: &mut Request, response: &mut Response, params: &PathParams) -> Result<(), HandlerError> {
    write!(response, r#"{{"name":"{}"}}"#, params.get("name").unwrap_or_default())?;
    Ok(())
}

fn upload(request: &mut Request, response: &mut Response, _: &PathParams) -> Result<(), HandlerError> {
    let body = request.body().read_to_bytes()?;
    write!(response, "stored {} bytes", body.len())?;
    Ok(())
}

fn not_found(_: &mut Request, response: &mut Response) -> Result<bool, HandlerError> {
    response.write_all(b"nothing here")?;
    Ok(false)
}

fn header(builder: http::request::Builder) -> RequestHeader {
    match builder.body(()) {
        Ok(request) => request.into(),
        Err(e) => panic!("invalid demo request: {e}"),
    }
}

async fn exchange(bridge: &SyncBridge, header: RequestHeader, body: &[&'static str], upgrades: bool) {
    let label = format!("{} {}", header.method(), header.uri());
    let (sink, record) = MemorySink::new();
    let sink = if upgrades { sink.accepting_upgrades() } else { sink };

    let exchange = bridge.on_headers(header, Box::new(sink));
    for chunk in body.iter().copied() {
        if let Err(e) = bridge.on_body_chunk(&exchange, Bytes::from_static(chunk.as_bytes())) {
            error!(cause = %e, "failed to deliver body chunk");
        }
    }
    bridge.on_complete(&exchange);

    let recorded = match tokio::task::spawn_blocking(move || record.wait(Duration::from_secs(5))).await {
        Ok(Some(recorded)) => recorded,
        Ok(None) => {
            error!(request = %label, "no response in time");
            return;
        }
        Err(e) => {
            error!(cause = %e, "waiting for response failed");
            return;
        }
    };

    let content_type = recorded.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("-");
    if recorded.upgrade.is_some() {
        info!(request = %label, "upgraded to websocket");
    } else {
        info!(
            request = %label,
            status = %recorded.status,
            content_type = content_type,
            body = %String::from_utf8_lossy(&recorded.body()),
            "response"
        );
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::builder()
        .route("/images/{name}", get(handler_fn(image)).produces("image/jpeg, image/gif, image/png"))
        .route("/images/{name}", get(handler_fn(image_info)).produces("application/json"))
        .route("/images", post(handler_fn(upload)).consumes("image/*"))
        .build()
        .expect("routes are valid");

    let websocket = WebSocketHandler::builder(|_: &Request, _: &mut http::HeaderMap| -> Result<Option<Box<dyn WebSocket>>, HandlerError> {
        Ok(Some(Box::new(Chat)))
    })
    .with_path("/chat")
    .build();

    let bridge = match SyncBridge::builder()
        .config(BridgeConfig::default().with_max_in_flight(16))
        .handler(websocket)
        .handler(RestHandler::new(router))
        .handler(weft_http::handler::make_handler(not_found))
        .build()
    {
        Ok(bridge) => bridge,
        Err(e) => {
            error!(cause = %e, "failed to build bridge");
            return;
        }
    };

    exchange(&bridge, header(http::Request::get("/images/cat").header(ACCEPT, "image/png")), &[], false).await;
    exchange(&bridge, header(http::Request::get("/images/cat").header(ACCEPT, "application/json")), &[], false).await;
    exchange(&bridge, header(http::Request::get("/images/cat").header(ACCEPT, "text/plain")), &[], false).await;
    exchange(&bridge, header(http::Request::delete("/images/cat")), &[], false).await;
    exchange(&bridge, header(http::Request::post("/images").header(CONTENT_TYPE, "image/png")), &["\u{89}PNG", "...."], false).await;
    exchange(&bridge, header(http::Request::post("/images").header(CONTENT_TYPE, "text/plain")), &["hello"], false).await;
    exchange(&bridge, header(http::Request::get("/chat").header(UPGRADE, "websocket")), &[], true).await;
    exchange(&bridge, header(http::Request::get("/missing")), &[], false).await;
}
