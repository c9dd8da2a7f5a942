// Error types for the restive framework

use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The handler's signature matches none of the supported shapes.
    #[error("Unsupported handler signature {signature}: {reason}")]
    Classification { signature: String, reason: String },

    /// A receiver/method-name pair could not be resolved to a usable handler.
    #[error("Method {method:?} not usable on {receiver}: {reason}")]
    MethodNotFound {
        receiver: String,
        method: String,
        reason: String,
    },

    #[error("Binding error: {0}")]
    Binding(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An error returned explicitly by user handler code. Rendered verbatim.
    #[error("{0}")]
    Handler(String),

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("Route already registered: {0}")]
    DuplicateRoute(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a classification error for a printable signature.
    pub fn classification(signature: impl ToString, reason: impl Into<String>) -> Self {
        Error::Classification {
            signature: signature.to_string(),
            reason: reason.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().as_u16()
    }

    /// Get the `http::StatusCode` for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            Error::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            // Everything the dispatch engine itself produces is a server error.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures that can only surface while registering a route.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Error::Classification { .. } | Error::MethodNotFound { .. } | Error::DuplicateRoute(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::RouteNotFound("/x".into()).status_code(), 404);
        assert_eq!(Error::MethodNotAllowed("PUT /x".into()).status_code(), 405);
        assert_eq!(Error::PayloadTooLarge("3 MiB".into()).status_code(), 413);
        assert_eq!(Error::Binding("bad json".into()).status_code(), 500);
        assert_eq!(Error::Serialization("nil".into()).status_code(), 500);
        assert_eq!(Error::Handler("boom".into()).status_code(), 500);
        assert_eq!(Error::HandlerPanicked("oops".into()).status_code(), 500);
    }

    #[test]
    fn test_handler_error_renders_verbatim() {
        assert_eq!(Error::Handler("boom".into()).to_string(), "boom");
    }

    #[test]
    fn test_registration_errors() {
        assert!(Error::classification("fn(i32)", "nope").is_registration_error());
        assert!(Error::DuplicateRoute("GET /a".into()).is_registration_error());
        assert!(!Error::Binding("x".into()).is_registration_error());
    }
}
