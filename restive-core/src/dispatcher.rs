// Route table and request dispatch

use crate::handler::{Callable, HandlerDescriptor, IntoHandler};
use crate::receiver::Receiver;
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Route table mapping `(verb, path)` to a classified handler.
///
/// Handlers are registered up front; once the dispatcher is handed to the
/// server it is shared read-only between all connections.
///
/// ```
/// use restive_core::{Dispatcher, HttpRequest, Params};
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher
///     .handle_get("/data.json", |params: Params| -> Result<String, String> {
///         match params.get("value") {
///             Some(v) => Ok(format!("value = {}", v)),
///             None => Err("Expecting GET parameter 'value'".to_string()),
///         }
///     })
///     .unwrap();
///
/// let response = dispatcher.dispatch(&HttpRequest::new("GET", "/data.json?value=4"));
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body_text(), "value = 4");
/// ```
#[derive(Debug, Default)]
pub struct Dispatcher {
    routes: HashMap<String, BTreeMap<HttpMethod, HandlerDescriptor>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a GET handler.
    pub fn handle_get<Args, H>(&mut self, path: &str, handler: H) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.register(HttpMethod::GET, path, handler.into_callable())
    }

    /// Register a POST handler.
    pub fn handle_post<Args, H>(&mut self, path: &str, handler: H) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.register(HttpMethod::POST, path, handler.into_callable())
    }

    /// Register the method `name` of `receiver` as a GET handler.
    pub fn handle_get_method<R: Receiver>(
        &mut self,
        path: &str,
        receiver: Arc<R>,
        name: &str,
    ) -> Result<(), Error> {
        self.register_method(HttpMethod::GET, path, receiver, name)
    }

    /// Register the method `name` of `receiver` as a POST handler.
    pub fn handle_post_method<R: Receiver>(
        &mut self,
        path: &str,
        receiver: Arc<R>,
        name: &str,
    ) -> Result<(), Error> {
        self.register_method(HttpMethod::POST, path, receiver, name)
    }

    fn register_method<R: Receiver>(
        &mut self,
        method: HttpMethod,
        path: &str,
        receiver: Arc<R>,
        name: &str,
    ) -> Result<(), Error> {
        let methods = receiver.methods();
        let callable = methods.resolve(name)?;
        let descriptor = HandlerDescriptor::new(method, path, callable)
            .map_err(|err| methods.not_found(name, err.to_string()))?;
        self.insert(descriptor)
    }

    /// Classify and store a handler. Nothing is stored on failure.
    pub fn register(
        &mut self,
        method: HttpMethod,
        path: &str,
        callable: Callable,
    ) -> Result<(), Error> {
        let descriptor = HandlerDescriptor::new(method, path, callable)?;
        self.insert(descriptor)
    }

    fn insert(&mut self, descriptor: HandlerDescriptor) -> Result<(), Error> {
        let verbs = self.routes.entry(descriptor.path.clone()).or_default();
        if verbs.contains_key(&descriptor.method) {
            return Err(Error::DuplicateRoute(format!(
                "{} {}",
                descriptor.method, descriptor.path
            )));
        }

        info!(
            method = %descriptor.method,
            path = %descriptor.path,
            signature = %descriptor.signature(),
            input = ?descriptor.input,
            output = ?descriptor.output,
            "Registered handler"
        );
        verbs.insert(descriptor.method, descriptor);
        Ok(())
    }

    /// Every registered handler, ordered by path then verb.
    pub fn routes(&self) -> Vec<&HandlerDescriptor> {
        let mut paths: Vec<&String> = self.routes.keys().collect();
        paths.sort();
        paths
            .into_iter()
            .filter_map(|path| self.routes.get(path))
            .flat_map(|verbs| verbs.values())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up the handler for a request.
    pub fn find(&self, request: &HttpRequest) -> Result<&HandlerDescriptor, Error> {
        let path = request.path.as_str();
        let verbs = self
            .routes
            .get(path)
            .ok_or_else(|| Error::RouteNotFound(format!("{} {}", request.method, path)))?;

        request
            .http_method()
            .and_then(|method| verbs.get(&method))
            .ok_or_else(|| Error::MethodNotAllowed(format!("{} {}", request.method, path)))
    }

    /// Route, bind, invoke and encode one request.
    ///
    /// Never fails: every problem becomes a plain-text response, and a
    /// panicking handler is caught and reported as a 500.
    pub fn dispatch(&self, request: &HttpRequest) -> HttpResponse {
        let descriptor = match self.find(request) {
            Ok(descriptor) => descriptor,
            Err(err) => return self.routing_failure(request, &err),
        };

        debug!(
            method = %request.method,
            path = %request.path,
            signature = %descriptor.signature(),
            "Dispatching request"
        );

        match catch_unwind(AssertUnwindSafe(|| descriptor.invoke(request))) {
            Ok(encoded) => {
                if encoded.status >= 500 {
                    warn!(
                        method = %request.method,
                        path = %request.path,
                        status = encoded.status,
                        body = %String::from_utf8_lossy(&encoded.body),
                        "Request failed"
                    );
                }
                encoded.into()
            }
            Err(payload) => {
                let err = Error::HandlerPanicked(panic_message(payload.as_ref()));
                error!(
                    method = %request.method,
                    path = %request.path,
                    error = %err,
                    "Handler panicked"
                );
                HttpResponse::from_error(&err)
            }
        }
    }

    fn routing_failure(&self, request: &HttpRequest, err: &Error) -> HttpResponse {
        debug!(method = %request.method, path = %request.path, error = %err, "No route");
        let response = HttpResponse::from_error(err);
        match err {
            Error::MethodNotAllowed(_) => response.with_header(
                "Allow".to_string(),
                self.allowed_methods(&request.path).join(", "),
            ),
            _ => response,
        }
    }

    fn allowed_methods(&self, path: &str) -> Vec<&'static str> {
        self.routes
            .get(path)
            .map(|verbs| verbs.keys().map(HttpMethod::as_str).collect())
            .unwrap_or_default()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Body, Json, MethodSet, Params};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct MyStruct {
        #[serde(rename = "A")]
        a: i32,
        #[serde(rename = "B")]
        b: String,
    }

    #[test]
    fn test_unknown_path_is_404() {
        let dispatcher = Dispatcher::new();
        let res = dispatcher.dispatch(&HttpRequest::new("GET", "/nope"));
        assert_eq!(res.status, 404);
    }

    #[test]
    fn test_wrong_verb_is_405_with_allow() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle_get("/x", || "get").unwrap();
        dispatcher.handle_post("/x", || "post").unwrap();
        dispatcher.handle_get("/only-get", || "get").unwrap();

        let res = dispatcher.dispatch(&HttpRequest::new("PUT", "/x"));
        assert_eq!(res.status, 405);
        assert_eq!(res.header("allow"), Some("GET, POST"));

        let res = dispatcher.dispatch(&HttpRequest::new("POST", "/only-get"));
        assert_eq!(res.status, 405);
        assert_eq!(res.header("allow"), Some("GET"));
    }

    #[test]
    fn test_405_with_query_string_keeps_allow() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle_get("/x", || "get").unwrap();

        let res = dispatcher.dispatch(&HttpRequest::new("POST", "/x?value=1"));
        assert_eq!(res.status, 405);
        assert_eq!(res.header("allow"), Some("GET"));
    }

    #[test]
    fn test_method_match_is_case_sensitive() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle_get("/x", || "get").unwrap();

        let res = dispatcher.dispatch(&HttpRequest::new("get", "/x"));
        assert_eq!(res.status, 405);
        assert_eq!(res.header("allow"), Some("GET"));
        assert_eq!(dispatcher.dispatch(&HttpRequest::new("GET", "/x")).status, 200);
    }

    #[test]
    fn test_same_path_different_verbs() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle_get("/x", || "get").unwrap();
        dispatcher.handle_post("/x", || "post").unwrap();

        assert_eq!(dispatcher.dispatch(&HttpRequest::new("GET", "/x")).body_text(), "get");
        assert_eq!(dispatcher.dispatch(&HttpRequest::new("POST", "/x")).body_text(), "post");
        assert_eq!(dispatcher.len(), 2);
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle_get("/x", || "first").unwrap();
        let err = dispatcher.handle_get("/x", || "second").unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute(_)));
        assert_eq!(dispatcher.dispatch(&HttpRequest::new("GET", "/x")).body_text(), "first");
    }

    #[test]
    fn test_failed_registration_leaves_no_route() {
        let mut dispatcher = Dispatcher::new();
        let err = dispatcher
            .handle_get("/x", |_: Body<MyStruct>| ())
            .unwrap_err();
        assert!(matches!(err, Error::Classification { .. }));
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.dispatch(&HttpRequest::new("GET", "/x")).status, 404);
    }

    #[test]
    fn test_unsupported_payload_rejected() {
        let mut dispatcher = Dispatcher::new();
        let err = dispatcher.handle_get("/n", || 42_i64).unwrap_err();
        assert!(err.to_string().contains("unsupported payload type i64"));
    }

    #[test]
    fn test_panic_becomes_500() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .handle_get("/boom", || -> String { panic!("kaboom") })
            .unwrap();
        dispatcher.handle_get("/fine", || "still fine").unwrap();

        let res = dispatcher.dispatch(&HttpRequest::new("GET", "/boom"));
        assert_eq!(res.status, 500);
        assert_eq!(res.body_text(), "handler panicked: kaboom");

        let res = dispatcher.dispatch(&HttpRequest::new("GET", "/fine"));
        assert_eq!(res.status, 200);
    }

    #[test]
    fn test_query_is_not_part_of_the_path() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle_get("/data.json", |p: Params| p.len().to_string()).unwrap();
        let res = dispatcher.dispatch(&HttpRequest::new("GET", "/data.json?a=1&b=2"));
        assert_eq!(res.body_text(), "2");
    }

    struct Store;

    impl Receiver for Store {
        fn methods(self: Arc<Self>) -> MethodSet {
            MethodSet::new::<Self>()
                .method("Get", || Json(MyStruct { a: 1, b: "Hello".into() }))
                .method("Bad", |_: Body<MyStruct>| ())
        }
    }

    #[test]
    fn test_receiver_methods() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .handle_get_method("/store", Arc::new(Store), "Get")
            .unwrap();
        let res = dispatcher.dispatch(&HttpRequest::new("GET", "/store"));
        assert_eq!(res.body_text(), r#"{"A":1,"B":"Hello"}"#);

        let err = dispatcher
            .handle_get_method("/missing", Arc::new(Store), "Nope")
            .unwrap_err();
        assert!(matches!(err, Error::MethodNotFound { .. }));

        // Resolves, but a body parameter is not valid on GET.
        let err = dispatcher
            .handle_get_method("/bad", Arc::new(Store), "Bad")
            .unwrap_err();
        assert!(matches!(err, Error::MethodNotFound { .. }));
        assert!(err.to_string().contains("GET handlers cannot decode"));

        dispatcher
            .handle_post_method("/bad", Arc::new(Store), "Bad")
            .unwrap();
        assert_eq!(dispatcher.len(), 2);
    }

    #[test]
    fn test_routes_listing() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle_post("/b", || ()).unwrap();
        dispatcher.handle_get("/a", || ()).unwrap();
        dispatcher.handle_get("/b", || ()).unwrap();

        let listed: Vec<(HttpMethod, &str)> = dispatcher
            .routes()
            .iter()
            .map(|d| (d.method, d.path.as_str()))
            .collect();
        assert_eq!(
            listed,
            [
                (HttpMethod::GET, "/a"),
                (HttpMethod::GET, "/b"),
                (HttpMethod::POST, "/b")
            ]
        );
    }
}
