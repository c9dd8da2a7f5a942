//! Argument binding.
//!
//! Turns an incoming request into the argument a classified handler
//! expects. Binding is a pure function of `(shape, request)`.

use crate::form::{Params, parse_form};
use crate::media_type::MediaType;
use crate::{Error, HttpMethod, HttpRequest, InputShape};
use serde::de::DeserializeOwned;

/// Arguments produced for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundArguments<T> {
    /// The handler takes no parameters.
    Empty,
    /// Query (GET) or form (POST) parameters.
    Params(Params),
    /// A struct decoded from the request body.
    Body(T),
}

/// How a request body is decoded into a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Form,
}

impl BodyFormat {
    /// Pick the decoding for a request.
    ///
    /// A url-encoded form decodes as a form and JSON types decode as JSON.
    /// An absent or unrecognised content type (`text/plain`, for instance)
    /// also decodes as JSON rather than as a form. Multipart bodies are
    /// refused.
    pub fn for_request(request: &HttpRequest) -> Result<Self, Error> {
        match request.content_type() {
            Some(mt) if mt.is_form_urlencoded() => Ok(BodyFormat::Form),
            Some(mt) if mt.is_json() => Ok(BodyFormat::Json),
            Some(mt) if mt.is_multipart() => Err(unsupported_content_type(&mt)),
            _ => Ok(BodyFormat::Json),
        }
    }
}

fn unsupported_content_type(mt: &MediaType) -> Error {
    Error::Binding(format!("unsupported request content type {}", mt.mime_type()))
}

/// Produce the arguments for a handler of the given input shape.
///
/// `T` is the decode target and is only used for
/// [`InputShape::DecodedBodyStruct`].
pub fn bind<T: DeserializeOwned>(
    shape: InputShape,
    request: &HttpRequest,
) -> Result<BoundArguments<T>, Error> {
    match shape {
        InputShape::NoInput => Ok(BoundArguments::Empty),
        InputShape::QueryOrFormParams => bind_params(request).map(BoundArguments::Params),
        InputShape::DecodedBodyStruct => decode_body(request).map(BoundArguments::Body),
    }
}

fn bind_params(request: &HttpRequest) -> Result<Params, Error> {
    match request.http_method() {
        Some(HttpMethod::POST) => match request.content_type() {
            Some(mt) if mt.is_multipart() => Err(unsupported_content_type(&mt)),
            _ => Params::parse_form(&request.body),
        },
        _ => Params::parse_query(request.query_string()),
    }
}

/// Decode the full request body into a new `T`.
pub fn decode_body<T: DeserializeOwned>(request: &HttpRequest) -> Result<T, Error> {
    match BodyFormat::for_request(request)? {
        BodyFormat::Json => serde_json::from_slice(&request.body)
            .map_err(|e| Error::Binding(format!("Failed to decode JSON body: {}", e))),
        BodyFormat::Form => parse_form(&request.body),
    }
}
