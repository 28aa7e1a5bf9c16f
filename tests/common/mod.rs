#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use inventory_service::{app as build_app, catalog, resolve, AppState, MemoryStore, Settings};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Full router over a fresh in-memory store with default settings.
pub fn app() -> Router {
    let settings = Settings::from_lookup(|_| None).unwrap();
    let model = resolve(&catalog(), &settings.schema).unwrap();
    build_app(AppState::new(Arc::new(MemoryStore::new()), model), &settings)
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    send_request(app, builder.body(body).unwrap()).await
}

pub async fn send_request(app: &Router, req: Request<Body>) -> Reply {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, headers, body }
}

pub async fn get(app: &Router, uri: &str) -> Reply {
    send(app, Method::GET, uri, None).await
}

/// POST to a collection and return the created entity, asserting 201.
pub async fn create(app: &Router, collection: &str, body: Value) -> Value {
    let reply = send(app, Method::POST, &format!("/api/v1/{}", collection), Some(body)).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["data"].clone()
}

pub fn key(entity: &Value) -> String {
    entity["objectId"].as_str().unwrap().to_string()
}

/// Classification, Unit, Part, Manufacturer and Supplier ready for inventory records.
pub struct Masters {
    pub classification: Value,
    pub unit: Value,
    pub part: Value,
    pub manufacturer: Value,
    pub supplier: Value,
}

pub async fn seed_masters(app: &Router) -> Masters {
    let classification = create(app, "Classifications", serde_json::json!({ "code": "ENG", "description": "Engine" })).await;
    let unit = create(app, "Units", serde_json::json!({ "code": "PCS", "symbol": "pcs" })).await;
    let part = create(
        app,
        "Parts",
        serde_json::json!({
            "code": "P001",
            "classificationId": classification["objectId"],
            "unitId": unit["objectId"]
        }),
    )
    .await;
    let manufacturer = create(app, "Manufacturers", serde_json::json!({ "code": "M01" })).await;
    let supplier = create(app, "Suppliers", serde_json::json!({ "code": "S01" })).await;
    Masters {
        classification,
        unit,
        part,
        manufacturer,
        supplier,
    }
}
