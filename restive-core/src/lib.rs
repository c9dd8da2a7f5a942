// Core library for the restive HTTP framework
// Handler classification, argument binding, result encoding and the server
// that dispatches requests to registered handlers.

pub mod application;
pub mod binder;
pub mod dispatcher;
pub mod encoder;
pub mod error;
pub mod form;
pub mod handler;
pub mod http;
pub mod logging;
pub mod media_type;
pub mod receiver;
pub mod shape;

// Re-export commonly used types
pub use application::*;
pub use binder::{BodyFormat, BoundArguments};
pub use dispatcher::*;
pub use encoder::*;
pub use error::*;
pub use form::*;
pub use handler::*;
pub use crate::http::*;
pub use media_type::MediaType;
pub use receiver::*;
pub use shape::*;
