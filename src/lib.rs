// restive - plain Rust functions as REST endpoints
//
// Handlers are ordinary functions and closures. Their signatures are
// classified when they are registered, arguments are bound from the query
// string, form body or JSON body, and return values are encoded as JSON,
// HTML or text.

// Re-export core functionality
pub use restive_core::*;

pub use restive_config;

#[cfg(feature = "testing")]
pub use restive_testing;

use restive_config::{ServerConfig, Validate};
use restive_core::logging::{LogConfig, LogFormat, LogLevel};

/// Serve `dispatcher` with the given configuration. Never returns unless
/// binding fails or the configuration is invalid.
///
/// Logging is initialised from `config.log` unless a global subscriber is
/// already installed.
///
/// ```no_run
/// use restive::prelude::*;
/// use restive::restive_config::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Error> {
///     let mut dispatcher = Dispatcher::new();
///     dispatcher.handle_get("/", || "<h1>Hello</h1>")?;
///
///     let config = ServerConfig::load(Some("restive.toml"))
///         .map_err(|e| Error::Config(e.to_string()))?;
///     restive::run(&config, dispatcher).await
/// }
/// ```
pub async fn run(config: &ServerConfig, dispatcher: Dispatcher) -> Result<(), Error> {
    config
        .validate()
        .map_err(|e| Error::Config(e.to_string()))?;

    let _guard = log_config(config)?.init();

    Application::new(dispatcher)
        .with_max_body_bytes(config.max_body_bytes)
        .listen(config.address.as_str())
        .await
}

/// Logging settings derived from a server configuration.
pub fn log_config(config: &ServerConfig) -> Result<LogConfig, Error> {
    let level: LogLevel = config.log.level.parse().map_err(Error::Config)?;
    let format: LogFormat = config.log.format.parse().map_err(Error::Config)?;
    Ok(LogConfig::new()
        .level(level)
        .format(format)
        .with_colors(format != LogFormat::Json))
}

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Application, Body, Dispatcher, Error, HttpMethod, HttpRequest, HttpResponse, Json,
        MethodSet, Params, Receiver, run_server,
    };
}
