//! Minimal REST service: structs out as JSON, strings out with a sniffed
//! content type, form or JSON bodies in.
//!
//! Run with:
//! ```bash
//! cargo run --example go_rest
//! ```
//!
//! Then try:
//! ```bash
//! curl http://127.0.0.1:8080/data.json
//! curl http://127.0.0.1:8080/index.html
//! curl 'http://127.0.0.1:8080/value?value=42'
//! curl -d 'A=2&B=Changed' http://127.0.0.1:8080/change-data
//! curl -H 'Content-Type: application/json' -d '{"A":3,"B":"Json"}' http://127.0.0.1:8080/change-data
//! curl http://127.0.0.1:8080/method-call
//! ```

use restive::prelude::*;
use restive::restive_config::ServerConfig;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MyStruct {
    #[serde(rename = "A")]
    a: i32,
    #[serde(rename = "B")]
    b: String,
}

struct Counter {
    calls: RwLock<u64>,
}

impl Receiver for Counter {
    fn methods(self: Arc<Self>) -> MethodSet {
        MethodSet::new::<Self>().method("MethodName", move || -> Result<String, String> {
            let mut calls = self.calls.write().map_err(|e| e.to_string())?;
            *calls += 1;
            Ok(format!("MethodName called {} times", *calls))
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = ServerConfig::load(None).map_err(|e| Error::Config(e.to_string()))?;

    let data = Arc::new(RwLock::new(MyStruct {
        a: 1,
        b: "Hello World".to_string(),
    }));

    let mut dispatcher = Dispatcher::new();

    let current = data.clone();
    dispatcher.handle_get("/data.json", move || {
        current.read().ok().map(|d| Json(d.clone()))
    })?;

    dispatcher.handle_get("/index.html", || "<!doctype html><p>Hello World")?;

    dispatcher.handle_get("/value", |params: Params| -> Result<String, String> {
        match params.get("value") {
            Some(v) if !v.is_empty() => Ok(format!("value = {}", v)),
            _ => Err("Expecting GET parameter 'value'".to_string()),
        }
    })?;

    let store = data.clone();
    dispatcher.handle_post(
        "/change-data",
        move |Body(update): Body<MyStruct>| -> Result<(), String> {
            let mut d = store.write().map_err(|e| e.to_string())?;
            info!(a = update.a, b = %update.b, "Changing data");
            *d = update;
            Ok(())
        },
    )?;

    let counter = Arc::new(Counter {
        calls: RwLock::new(0),
    });
    dispatcher.handle_get_method("/method-call", counter, "MethodName")?;

    restive::run(&config, dispatcher).await
}
