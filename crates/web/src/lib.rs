//! Resource routing and content negotiation for `weft-http`.
//!
//! Resources are registered with a path template, an HTTP method and the media types they
//! produce and consume. At request time the [`Router`] picks one resource and a response
//! content type, and [`RestHandler`] runs it on the bridge's worker thread.
//!
//! ```
//! use std::io::Write;
//! use weft_web::router::{get, Router};
//! use weft_web::{handler_fn, RestHandler};
//!
//! let router = Router::builder()
//!     .route(
//!         "/hello/{name}",
//!         get(handler_fn(|_, response, params| {
//!             write!(response, "hello {}", params.get("name").unwrap_or("world"))?;
//!             Ok(())
//!         }))
//!         .produces("text/plain"),
//!     )
//!     .build()
//!     .expect("valid routes");
//!
//! let handler = RestHandler::new(router);
//! ```

mod error;
mod handler;
mod request;
mod rest;

pub mod media_type;
pub mod negotiation;
pub mod router;

pub use error::MediaTypeError;
pub use error::RegistrationError;
pub use error::RouteError;
pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::ResourceHandler;
pub use media_type::MediaType;
pub use request::PathParams;
pub use rest::RestHandler;
pub use router::Router;
