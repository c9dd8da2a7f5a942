//! Testing utilities for restive.
//!
//! [`TestClient`] drives a [`Dispatcher`](restive_core::Dispatcher) in
//! process, without opening a socket, and the free assertion functions
//! check the responses it returns.
//!
//! ```
//! use restive_core::{Dispatcher, Params};
//! use restive_testing::*;
//!
//! # tokio_test::block_on(async {
//! let mut dispatcher = Dispatcher::new();
//! dispatcher
//!     .handle_get("/hello", |p: Params| format!("Hello, {}!", p.get("name").unwrap_or("you")))
//!     .unwrap();
//!
//! let client = TestClient::from(dispatcher);
//! let response = client.get("/hello?name=Alice").await;
//! assert_status(&response, 200);
//! assert_header(&response, "Content-Type", "text/plain; charset=utf-8");
//! assert_body_contains(&response, "Alice");
//! # });
//! ```

mod assertions;
mod test_client;

pub use assertions::{
    assert_body_contains, assert_client_error, assert_content_type, assert_header, assert_json,
    assert_server_error, assert_status, assert_success,
};
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};
