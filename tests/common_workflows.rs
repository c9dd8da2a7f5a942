//! End-to-end workflows through the in-process test client.

use restive::prelude::*;
use restive::{HttpRequest, binder, encode, HandlerOutput};
use restive_testing::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MyStruct {
    #[serde(rename = "A")]
    a: i32,
    #[serde(rename = "B")]
    b: String,
}

fn hello() -> MyStruct {
    MyStruct {
        a: 1,
        b: "Hello".to_string(),
    }
}

#[tokio::test]
async fn test_get_struct_reference() {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .handle_get("/data.json", || Some(Json(hello())))
        .unwrap();

    let client = TestClient::from(dispatcher);
    let response = client.get("/data.json").await;

    assert_status(&response, 200);
    assert_content_type(&response, Some("application/json"));
    assert_eq!(response.body_string(), r#"{"A":1,"B":"Hello"}"#);
    assert_json(&response, &hello());
}

#[tokio::test]
async fn test_post_form_into_struct() {
    let seen = Arc::new(Mutex::new(None));
    let recorder = seen.clone();

    let mut dispatcher = Dispatcher::new();
    dispatcher
        .handle_post("/change-data", move |Body(data): Body<MyStruct>| -> Result<(), String> {
            *recorder.lock().map_err(|e| e.to_string())? = Some(data);
            Ok(())
        })
        .unwrap();

    let client = TestClient::from(dispatcher);
    let response = client
        .post_form("/change-data", &[("A", "1"), ("B", "Hello")])
        .await
        .unwrap();

    assert_status(&response, 200);
    assert_eq!(response.body_string(), "");
    assert_content_type(&response, None);
    assert_eq!(*seen.lock().unwrap(), Some(hello()));
}

#[tokio::test]
async fn test_post_json_into_struct() {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .handle_post("/change-data", |Body(data): Body<MyStruct>| Json(data))
        .unwrap();

    let client = TestClient::from(dispatcher);
    let response = client.post_json("/change-data", &hello()).await.unwrap();
    assert_status(&response, 200);
    assert_json(&response, &hello());

    // Without a Content-Type the body is still read as JSON
    let response = client
        .post("/change-data", r#"{"A":2,"B":"raw"}"#)
        .await;
    assert_json(
        &response,
        &MyStruct {
            a: 2,
            b: "raw".to_string(),
        },
    );
}

fn data_json(params: Params) -> Result<String, String> {
    match params.get("value") {
        Some(value) if !value.is_empty() => Ok(format!("value = {}", value)),
        _ => Err("Expecting GET parameter 'value'".to_string()),
    }
}

#[tokio::test]
async fn test_missing_parameter_is_500_with_message() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.handle_get("/data.json", data_json).unwrap();
    let client = TestClient::from(dispatcher);

    let response = client.get("/data.json?value=").await;
    assert_status(&response, 500);
    assert_content_type(&response, Some("text/plain; charset=utf-8"));
    assert_body_contains(&response, "Expecting GET parameter 'value'");

    let response = client
        .request(TestRequestBuilder::new("GET", "/data.json").query("value", "4"))
        .await;
    assert_status(&response, 200);
    assert_eq!(response.body_string(), "value = 4");
}

#[tokio::test]
async fn test_error_wins_over_payload() {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .handle_get("/", || -> Result<&'static str, String> { Err("boom".to_string()) })
        .unwrap();

    let response = TestClient::from(dispatcher).get("/").await;
    assert_status(&response, 500);
    assert_eq!(response.body_string(), "boom");
}

#[tokio::test]
async fn test_content_sniffing() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.handle_get("/index.html", || "<!doctype html><p>hi").unwrap();
    dispatcher.handle_get("/object", || String::from(r#"{"a":1}"#)).unwrap();
    dispatcher.handle_get("/plain", || "plain").unwrap();
    let client = TestClient::from(dispatcher);

    assert_content_type(
        &client.get("/index.html").await,
        Some("text/html; charset=utf-8"),
    );
    assert_content_type(&client.get("/object").await, Some("application/json"));
    assert_content_type(
        &client.get("/plain").await,
        Some("text/plain; charset=utf-8"),
    );
}

#[tokio::test]
async fn test_unsupported_shapes_store_nothing() {
    let mut dispatcher = Dispatcher::new();

    assert!(dispatcher.handle_get("/pair", || ("a", "b")).is_err());
    assert!(dispatcher.handle_get("/int", || 7_u32).is_err());
    assert!(dispatcher.handle_post("/two", |_: Params, _: Params| ()).is_err());
    assert!(dispatcher.routes().is_empty());

    let client = TestClient::from(dispatcher);
    assert_status(&client.get("/pair").await, 404);
}

#[tokio::test]
async fn test_struct_round_trip() {
    let encoded = encode(Json(hello()).into_returned());
    let request = HttpRequest::new("POST", "/change-data")
        .with_header("Content-Type", encoded.content_type.unwrap_or_default())
        .with_body(encoded.body);

    let decoded: MyStruct = binder::decode_body(&request).unwrap();
    assert_eq!(decoded, hello());
}

struct Store {
    items: Mutex<Vec<String>>,
}

impl Receiver for Store {
    fn methods(self: Arc<Self>) -> MethodSet {
        let adder = self.clone();
        let lister = self.clone();
        MethodSet::new::<Self>()
            .method("Add", move |params: Params| -> Result<(), String> {
                let item = params.get("item").ok_or("missing item")?;
                adder
                    .items
                    .lock()
                    .map_err(|e| e.to_string())?
                    .push(item.to_string());
                Ok(())
            })
            .method("List", move || -> Result<Json<Vec<String>>, String> {
                let items = lister.items.lock().map_err(|e| e.to_string())?;
                Ok(Json(items.clone()))
            })
    }
}

#[tokio::test]
async fn test_receiver_methods_share_state() {
    let store = Arc::new(Store {
        items: Mutex::new(Vec::new()),
    });

    let mut dispatcher = Dispatcher::new();
    dispatcher
        .handle_post_method("/items", store.clone(), "Add")
        .unwrap();
    dispatcher
        .handle_get_method("/items", store.clone(), "List")
        .unwrap();
    assert!(matches!(
        dispatcher.handle_get_method("/other", store, "Remove"),
        Err(Error::MethodNotFound { .. })
    ));

    let client = TestClient::from(dispatcher);
    for item in ["a", "b"] {
        let response = client.post_form("/items", &[("item", item)]).await.unwrap();
        assert_status(&response, 200);
    }
    let response = client.post_form("/items", &[("other", "x")]).await.unwrap();
    assert_status(&response, 500);
    assert_body_contains(&response, "missing item");

    assert_json(&client.get("/items").await, &vec!["a".to_string(), "b".to_string()]);

    let response = client.request(TestRequestBuilder::new("DELETE", "/items")).await;
    assert_client_error(&response);
    assert_header(&response, "Allow", "GET, POST");
}
