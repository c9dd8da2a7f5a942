// HTTP server

use crate::{Dispatcher, Error, HttpRequest, HttpResponse};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, error, info};

/// Default request body cap: 2 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Serves a frozen [`Dispatcher`] over HTTP/1.1.
///
/// Handlers are synchronous, so each request is dispatched on tokio's
/// blocking pool.
#[derive(Debug, Clone)]
pub struct Application {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
}

impl Application {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::from_shared(Arc::new(dispatcher))
    }

    pub fn from_shared(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Cap on request body size; larger bodies get `413 Payload Too Large`.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Bind `addr` and serve forever.
    pub async fn listen(self, addr: impl ToSocketAddrs) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener, forever.
    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    /// Serve until `signal` resolves. Connections already accepted are
    /// left to finish on their own tasks.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        info!(
            address = %local_addr,
            routes = self.dispatcher.len(),
            max_body_bytes = self.max_body_bytes,
            "Server listening"
        );
        for route in self.dispatcher.routes() {
            info!(method = %route.method, path = %route.path, signature = %route.signature(), "Route");
        }

        tokio::pin!(signal);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        error!(error = %err, "Failed to accept connection");
                        continue;
                    }
                },
                _ = &mut signal => {
                    info!(address = %local_addr, "Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let dispatcher = self.dispatcher.clone();
            let max_body_bytes = self.max_body_bytes;

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let dispatcher = dispatcher.clone();
                    async move { handle_request(req, dispatcher, max_body_bytes).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!(peer = %peer, error = %err, "Error serving connection");
                }
            });
        }
    }
}

/// Bind `addr` and serve `dispatcher` forever with default settings.
pub async fn run_server(addr: impl ToSocketAddrs, dispatcher: Dispatcher) -> Result<(), Error> {
    Application::new(dispatcher).listen(addr).await
}

/// Handle an incoming HTTP request
async fn handle_request(
    req: Request<IncomingBody>,
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match read_request(req, max_body_bytes).await {
        Ok(request) => {
            match tokio::task::spawn_blocking(move || dispatcher.dispatch(&request)).await {
                Ok(response) => response,
                Err(err) => {
                    error!(error = %err, "Dispatch task failed");
                    HttpResponse::from_error(&Error::Http(err.to_string()))
                }
            }
        }
        Err(err) => {
            debug!(error = %err, "Rejected request");
            HttpResponse::from_error(&err)
        }
    };

    Ok(into_hyper(response))
}

async fn read_request(req: Request<IncomingBody>, max_body_bytes: usize) -> Result<HttpRequest, Error> {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::new(req.method().as_str(), target);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    let body = Limited::new(req.into_body(), max_body_bytes)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                Error::PayloadTooLarge(format!("request body exceeds {} bytes", max_body_bytes))
            } else {
                Error::Http(err.to_string())
            }
        })?
        .to_bytes();

    Ok(request.with_body(body.to_vec()))
}

fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let content_length = response.body.len();
    let mut hyper_response = Response::new(Full::new(Bytes::from(response.body)));
    *hyper_response.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let headers = hyper_response.headers_mut();
    for (key, value) in response.headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => error!(header = %key, "Dropping invalid response header"),
        }
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));

    hyper_response
}
