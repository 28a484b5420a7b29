use http::{Method, StatusCode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("invalid media type '{value}': {reason}")]
    Invalid { value: String, reason: String },

    #[error("invalid quality weight in '{value}'")]
    InvalidWeight { value: String },
}

impl MediaTypeError {
    pub fn invalid<S: ToString>(value: &str, reason: S) -> Self {
        Self::Invalid { value: value.to_owned(), reason: reason.to_string() }
    }

    pub fn invalid_weight(value: &str) -> Self {
        Self::InvalidWeight { value: value.to_owned() }
    }
}

/// Raised by [`RouterBuilder::build`](crate::router::RouterBuilder::build) for a resource
/// that cannot be registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("invalid path template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid declared media type: {source}")]
    InvalidMediaType {
        #[from]
        source: MediaTypeError,
    },
}

impl RegistrationError {
    pub fn invalid_template<S: ToString>(template: &str, reason: S) -> Self {
        Self::InvalidTemplate { template: template.to_owned(), reason: reason.to_string() }
    }
}

/// Why a request matched no resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("no resource matches the path")]
    NotFound,

    #[error("method not allowed, allowed: {allowed:?}")]
    MethodNotAllowed { allowed: Vec<Method> },

    #[error("no acceptable representation")]
    NotAcceptable,

    #[error("unsupported request content type")]
    UnsupportedMediaType,
}

impl RouteError {
    /// The response status this failure maps to
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::NotFound => StatusCode::NOT_FOUND,
            RouteError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RouteError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            RouteError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(RouteError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(RouteError::MethodNotAllowed { allowed: vec![Method::GET] }.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(RouteError::NotAcceptable.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(RouteError::UnsupportedMediaType.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn media_type_error_converts() {
        let error: RegistrationError = MediaTypeError::invalid("nope", "missing subtype").into();
        assert_eq!(error.to_string(), "invalid declared media type: invalid media type 'nope': missing subtype");
    }
}
