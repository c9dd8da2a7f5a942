// In-process test client

use restive_core::media_type::{APPLICATION_JSON, FORM_URLENCODED};
use restive_core::{Dispatcher, Error, HttpRequest, HttpResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Sends requests straight to a dispatcher
///
/// Requests run on tokio's blocking pool, the same way the server runs
/// them, so handlers that block do not stall the test runtime.
#[derive(Clone)]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
}

impl TestClient {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// GET `target`, which may carry a query string
    pub async fn get(&self, target: &str) -> TestResponse {
        self.request(TestRequestBuilder::new("GET", target)).await
    }

    /// POST a raw body with no content type
    pub async fn post(&self, target: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.request(TestRequestBuilder::new("POST", target).body(body))
            .await
    }

    /// POST `data` url-encoded as a form
    pub async fn post_form<T: Serialize>(&self, target: &str, data: &T) -> Result<TestResponse, Error> {
        let builder = TestRequestBuilder::new("POST", target).form(data)?;
        Ok(self.request(builder).await)
    }

    /// POST `data` encoded as JSON
    pub async fn post_json<T: Serialize>(&self, target: &str, data: &T) -> Result<TestResponse, Error> {
        let builder = TestRequestBuilder::new("POST", target).json(data)?;
        Ok(self.request(builder).await)
    }

    pub async fn request(&self, builder: TestRequestBuilder) -> TestResponse {
        let request = builder.build();
        let dispatcher = self.dispatcher.clone();
        let response = tokio::task::spawn_blocking(move || dispatcher.dispatch(&request))
            .await
            .unwrap_or_else(|err| HttpResponse::from_error(&Error::Http(err.to_string())));
        TestResponse::new(response)
    }
}

impl From<Dispatcher> for TestClient {
    fn from(dispatcher: Dispatcher) -> Self {
        Self::new(Arc::new(dispatcher))
    }
}

/// Builder for test requests
pub struct TestRequestBuilder {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    query_params: Vec<(String, String)>,
}

impl TestRequestBuilder {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            query_params: Vec::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching `Content-Type`
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self.header("Content-Type", APPLICATION_JSON))
    }

    /// Url-encoded form body with a matching `Content-Type`
    pub fn form<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_urlencoded::to_string(data)
            .map_err(|e| Error::Serialization(e.to_string()))?
            .into_bytes();
        Ok(self.header("Content-Type", FORM_URLENCODED))
    }

    /// Append a query parameter; values are percent-encoded
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> HttpRequest {
        let mut target = self.path;
        if !self.query_params.is_empty() {
            let encoded = serde_urlencoded::to_string(&self.query_params).unwrap_or_default();
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&encoded);
        }

        let mut request = HttpRequest::new(self.method, target).with_body(self.body);
        for (key, value) in self.headers {
            request = request.with_header(key, value);
        }
        request
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse {
    response: HttpResponse,
}

impl TestResponse {
    pub fn new(response: HttpResponse) -> Self {
        Self { response }
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    /// Body as UTF-8 text (lossy)
    pub fn body_string(&self) -> String {
        self.response.body_text()
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.response.body
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_slice(&self.response.body)
            .map_err(|e| format!("Deserialization error: {}", e))
    }

    /// Case-insensitive header lookup
    pub fn header(&self, key: &str) -> Option<&str> {
        self.response.header(key)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.response.content_type()
    }

    pub fn into_inner(self) -> HttpResponse {
        self.response
    }
}
