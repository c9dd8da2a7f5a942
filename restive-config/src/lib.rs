//! Configuration for restive servers.
//!
//! [`ServerConfig`] is assembled from built-in defaults, an optional JSON or
//! TOML file, a `.env` file and `RESTIVE_`-prefixed environment variables,
//! in that order, later sources overriding earlier ones.

pub mod env;
pub mod error;
pub mod loader;
pub mod server;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use server::{DEFAULT_ADDRESS, DEFAULT_MAX_BODY_BYTES, ENV_PREFIX, LogSettings, ServerConfig};
pub use validation::{ConfigValidator, Validate};
