//! Resource routing: path templates, methods and media types.
//!
//! Resources are registered once through [`RouterBuilder`] and never change afterwards.
//! Matching a request runs these steps, failing with the first [`RouteError`] that applies:
//!
//! 1. templates matching the path, or [`RouteError::NotFound`]
//! 2. of those, resources for the request method, or [`RouteError::MethodNotAllowed`]
//! 3. only the candidates with the most literal segments are kept
//! 4. of those, resources consuming the request `Content-Type`, or
//!    [`RouteError::UnsupportedMediaType`]
//! 5. content negotiation against `Accept`, or [`RouteError::NotAcceptable`]
//!
//! ```
//! use weft_web::router::{get, Router};
//! use weft_web::handler_fn;
//!
//! let router = Router::builder()
//!     .route("/users/{id}", get(handler_fn(|_, _, _| Ok(()))).produces("application/json"))
//!     .build()
//!     .unwrap();
//!
//! let matched = router.at(&http::Method::GET, "/users/7", &http::HeaderMap::new()).unwrap();
//! assert_eq!(matched.params().get("id"), Some("7"));
//! assert_eq!(matched.content_type().to_string(), "application/json");
//! ```

mod template;

pub use template::PathTemplate;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method};
use tracing::debug;
use weft_http::protocol::Request;

use crate::error::{RegistrationError, RouteError};
use crate::handler::ResourceHandler;
use crate::media_type::MediaType;
use crate::negotiation::{can_consume, negotiate, AcceptRanges};
use crate::PathParams;

/// The immutable registry of resources
#[derive(Debug)]
pub struct Router {
    resources: Vec<ResourceDescriptor>,
}

/// One registered resource method.
pub struct ResourceDescriptor {
    template: PathTemplate,
    method: Method,
    produces: Vec<MediaType>,
    consumes: Vec<MediaType>,
    handler: Box<dyn ResourceHandler>,
}

/// A successful match: the resource, its path parameters and the negotiated type.
#[derive(Debug)]
pub struct RouteMatch<'router> {
    resource: &'router ResourceDescriptor,
    params: PathParams,
    content_type: MediaType,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Resources in registration order
    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn route(&self, request: &Request) -> Result<RouteMatch<'_>, RouteError> {
        self.at(request.method(), request.path(), request.headers())
    }

    /// Matches a method and path, negotiating with the `Accept` and `Content-Type`
    /// headers.
    pub fn at(&self, method: &Method, path: &str, headers: &HeaderMap) -> Result<RouteMatch<'_>, RouteError> {
        let path_matches: Vec<(&ResourceDescriptor, PathParams)> = self
            .resources
            .iter()
            .filter_map(|resource| resource.template.matches(path).map(|params| (resource, params)))
            .collect();

        if path_matches.is_empty() {
            return Err(RouteError::NotFound);
        }

        let mut allowed: Vec<Method> = Vec::new();
        for (resource, _) in &path_matches {
            if !allowed.contains(&resource.method) {
                allowed.push(resource.method.clone());
            }
        }

        let mut candidates: Vec<_> = path_matches.into_iter().filter(|(resource, _)| resource.method == method).collect();
        if candidates.is_empty() {
            debug!(method = %method, path = path, "no resource for method");
            return Err(RouteError::MethodNotAllowed { allowed });
        }

        let most_specific = candidates.iter().map(|(resource, _)| resource.template.literal_count()).max().unwrap_or_default();
        candidates.retain(|(resource, _)| resource.template.literal_count() == most_specific);

        let content_type = match headers.get(CONTENT_TYPE).map(|value| value.to_str()) {
            None => None,
            Some(Ok(value)) => Some(value),
            Some(Err(_)) => return Err(RouteError::UnsupportedMediaType),
        };
        candidates.retain(|(resource, _)| can_consume(&resource.consumes, content_type));
        if candidates.is_empty() {
            return Err(RouteError::UnsupportedMediaType);
        }

        let accept = AcceptRanges::from_headers(headers);
        let selection = negotiate(&accept, candidates.iter().map(|(resource, _)| resource.produces.as_slice())).ok_or(RouteError::NotAcceptable)?;

        let (resource, params) = candidates.swap_remove(selection.candidate);
        Ok(RouteMatch { resource, params, content_type: selection.content_type })
    }
}

impl ResourceDescriptor {
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn produces(&self) -> &[MediaType] {
        &self.produces
    }

    pub fn consumes(&self) -> &[MediaType] {
        &self.consumes
    }

    pub fn handler(&self) -> &dyn ResourceHandler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("template", &self.template.as_str())
            .field("method", &self.method)
            .field("produces", &self.produces)
            .field("consumes", &self.consumes)
            .finish_non_exhaustive()
    }
}

impl<'router> RouteMatch<'router> {
    pub fn resource(&self) -> &'router ResourceDescriptor {
        self.resource
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// The negotiated response content type
    pub fn content_type(&self) -> &MediaType {
        &self.content_type
    }

    pub fn into_parts(self) -> (&'router ResourceDescriptor, PathParams, MediaType) {
        (self.resource, self.params, self.content_type)
    }
}

#[derive(Debug)]
pub struct RouterBuilder {
    routes: Vec<(String, RouteBuilder)>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registers a resource method under a path template.
    ///
    /// Registration order breaks ties between equally good matches.
    #[must_use]
    pub fn route(mut self, template: impl Into<String>, route: RouteBuilder) -> Self {
        self.routes.push((template.into(), route));
        self
    }

    /// Compiles every registered template and media type.
    pub fn build(self) -> Result<Router, RegistrationError> {
        let resources = self
            .routes
            .into_iter()
            .map(|(template, route)| route.build(&template))
            .collect::<Result<Vec<_>, _>>()?;

        for resource in &resources {
            debug!(method = %resource.method, template = resource.template.as_str(), "resource registered");
        }
        Ok(Router { resources })
    }
}

/// The method, media types and handler of a resource, before registration.
pub struct RouteBuilder {
    method: Method,
    produces: Vec<String>,
    consumes: Vec<String>,
    handler: Box<dyn ResourceHandler>,
}

impl std::fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("method", &self.method)
            .field("produces", &self.produces)
            .field("consumes", &self.consumes)
            .finish_non_exhaustive()
    }
}

impl RouteBuilder {
    /// Declares produced media types; a comma-separated list is allowed.
    #[must_use]
    pub fn produces(mut self, media_types: impl Into<String>) -> Self {
        self.produces.push(media_types.into());
        self
    }

    /// Declares consumed media types; a comma-separated list is allowed.
    #[must_use]
    pub fn consumes(mut self, media_types: impl Into<String>) -> Self {
        self.consumes.push(media_types.into());
        self
    }

    fn build(self, template: &str) -> Result<ResourceDescriptor, RegistrationError> {
        Ok(ResourceDescriptor {
            template: PathTemplate::parse(template)?,
            method: self.method,
            produces: parse_declared(&self.produces)?,
            consumes: parse_declared(&self.consumes)?,
            handler: self.handler,
        })
    }
}

fn parse_declared(declared: &[String]) -> Result<Vec<MediaType>, RegistrationError> {
    let mut media_types = Vec::new();
    for value in declared {
        media_types.extend(MediaType::parse_list(value)?);
    }
    Ok(media_types)
}

/// A resource for any method, including extension methods.
pub fn on<H: ResourceHandler + 'static>(method: Method, handler: H) -> RouteBuilder {
    RouteBuilder { method, produces: Vec::new(), consumes: Vec::new(), handler: Box::new(handler) }
}

macro_rules! method_route {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("A resource for HTTP ", stringify!($upper_case_method), " requests.")]
        pub fn $method<H: ResourceHandler + 'static>(handler: H) -> RouteBuilder {
            on(Method::$upper_case_method, handler)
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(patch, PATCH);
method_route!(trace, TRACE);
