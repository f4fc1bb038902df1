//! Common test utilities for bill-service integration tests.

use axum::body::Body;
use axum::http::{Method, Request as HttpRequest, StatusCode};
use axum::Router;
use bill_service::config::BillConfig;
use bill_service::services::{init_metrics, InMemoryBillStore};
use bill_service::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Once};
use tower::ServiceExt;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,bill_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Router over a fresh in-memory store.
pub fn test_app() -> Router {
    init_tracing();
    init_metrics();

    build_router(AppState {
        config: BillConfig::in_memory(),
        store: Arc::new(InMemoryBillStore::new()),
    })
}

/// Send a request and decode the JSON response body (`Null` when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = HttpRequest::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Draft for a two-item dinner: 3 coffees at 2.50 and 2 cakes at 4.00.
#[allow(dead_code)]
pub fn dinner_draft() -> Value {
    json!({
        "name": "Team lunch",
        "date": "2024-6-1",
        "currency": "EUR",
        "payment_method": "Pay here: https://pay.example/ana",
        "line_items": [
            { "description": "Coffee", "amount": "3", "total_price": "7.50" },
            { "description": "Cake", "amount": "2", "total_price": "8" }
        ]
    })
}

/// Create a bill and return its share code.
#[allow(dead_code)]
pub async fn create_bill(app: &Router, draft: Value) -> String {
    let (status, body) = send(app, Method::POST, "/bills", Some(draft)).await;
    assert_eq!(status, StatusCode::CREATED, "create bill failed: {}", body);
    body["share_code"].as_str().unwrap().to_string()
}

/// Record a payment and return its id.
#[allow(dead_code)]
pub async fn pay(app: &Router, share_code: &str, creator: &str, lines: Value) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/bills/{}/payments", share_code),
        Some(json!({ "creator": creator, "line_items": lines })),
    )
    .await
}
