mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::DateTime;
use common::{app, create, get, key, seed_masters, send, send_request};
use serde_json::json;

#[tokio::test]
async fn inventory_lifecycle() {
    let app = app();
    let m = seed_masters(&app).await;
    assert_eq!(m.part["status"], json!("Active"));

    let inventory = create(
        &app,
        "Inventories",
        json!({
            "partId": m.part["objectId"],
            "manufacturerId": m.manufacturer["objectId"],
            "partNumber": "PN-100",
            "model": "X1"
        }),
    )
    .await;
    assert_eq!(inventory["isOriginal"], json!(false));
    assert_eq!(inventory["createdOn"], inventory["updatedOn"]);
    let k = key(&inventory);

    let read = get(&app, &format!("/api/v1/Inventories/{}", k)).await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body["data"], inventory);

    let deleted = send(&app, Method::DELETE, &format!("/api/v1/Inventories/{}", k), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(deleted.body, serde_json::Value::Null);

    let list = get(&app, "/api/v1/Inventories").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["meta"]["count"], json!(0));
    assert_eq!(list.body["data"], json!([]));

    let missing = get(&app, &format!("/api/v1/Inventories/{}", k)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"]["code"], json!("not_found"));
    assert_eq!(missing.body["error"]["details"]["key"], json!(k));

    let patched = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/Inventories/{}", k),
        Some(json!({ "model": "X2" })),
    )
    .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["data"]["model"], json!("X2"));
    assert_eq!(patched.body["data"]["status"], json!("Inactive"));
}

#[tokio::test]
async fn missing_required_fields_are_all_reported() {
    let app = app();
    let reply = send(&app, Method::POST, "/api/v1/Units", Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["code"], json!("validation_error"));
    let fields: Vec<_> = reply.body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, ["code", "symbol"]);

    let list = get(&app, "/api/v1/Units").await;
    assert_eq!(list.body["meta"]["count"], json!(0));
}

#[tokio::test]
async fn max_lengths_are_enforced() {
    let app = app();
    let reply = send(
        &app,
        Method::POST,
        "/api/v1/Classifications",
        Some(json!({ "code": "C".repeat(31) })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["details"][0]["field"], json!("code"));

    let ok = create(&app, "Classifications", json!({ "code": "C".repeat(30), "remarks": "r".repeat(200) })).await;
    assert_eq!(ok["code"].as_str().unwrap().len(), 30);

    let sale = send(&app, Method::POST, "/api/v1/Sales", Some(json!({ "customer": "c".repeat(181) }))).await;
    assert_eq!(sale.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn client_cannot_set_server_managed_fields() {
    let app = app();
    let reply = create(
        &app,
        "Units",
        json!({
            "code": "KG",
            "symbol": "kg",
            "objectId": "00000000-0000-0000-0000-000000000001",
            "createdOn": "2000-01-01T00:00:00Z",
            "status": "Inactive",
            "id": 42
        }),
    )
    .await;
    assert_ne!(reply["objectId"], json!("00000000-0000-0000-0000-000000000001"));
    assert_ne!(reply["createdOn"], json!("2000-01-01T00:00:00.000000Z"));
    assert_eq!(reply["status"], json!("Active"));
    assert!(reply.get("id").is_none());
}

#[tokio::test]
async fn empty_patch_refreshes_updated_on() {
    let app = app();
    let unit = create(&app, "Units", json!({ "code": "KG", "symbol": "kg" })).await;
    let reply = send(&app, Method::PATCH, &format!("/api/v1/Units/{}", key(&unit)), Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::OK);
    let before = DateTime::parse_from_rfc3339(unit["updatedOn"].as_str().unwrap()).unwrap();
    let after = DateTime::parse_from_rfc3339(reply.body["data"]["updatedOn"].as_str().unwrap()).unwrap();
    assert!(after >= before);
    assert_eq!(reply.body["data"]["createdOn"], unit["createdOn"]);
    assert_eq!(reply.body["data"]["code"], json!("KG"));
}

#[tokio::test]
async fn sale_status_workflow() {
    let app = app();
    let sale = create(&app, "Sales", json!({ "customer": "ACME", "amount": 100, "markup": "12.345" })).await;
    assert_eq!(sale["status"], json!("Created"));
    assert_eq!(sale["amount"], json!("100.00"));
    assert_eq!(sale["markup"], json!("12.35"));
    assert_eq!(sale["total"], json!("0.00"));
    assert!(sale["timestamp"].is_string());

    let uri = format!("/api/v1/Sales/{}", key(&sale));
    let pending = send(&app, Method::PATCH, &uri, Some(json!({ "status": "Pending" }))).await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body["data"]["status"], json!("Pending"));

    let bogus = send(&app, Method::PATCH, &uri, Some(json!({ "status": "Active" }))).await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);

    let deleted = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let read = get(&app, &uri).await;
    assert_eq!(read.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dangling_reference_is_a_storage_error() {
    let app = app();
    let reply = send(
        &app,
        Method::POST,
        "/api/v1/Parts",
        Some(json!({
            "code": "P001",
            "classificationId": uuid::Uuid::new_v4().to_string(),
            "unitId": uuid::Uuid::new_v4().to_string()
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["error"]["code"], json!("storage_error"));
}

#[tokio::test]
async fn deactivated_parent_can_still_be_referenced() {
    let app = app();
    let m = seed_masters(&app).await;
    let deleted = send(&app, Method::DELETE, &format!("/api/v1/Manufacturers/{}", key(&m.manufacturer)), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    create(
        &app,
        "Inventories",
        json!({
            "partId": m.part["objectId"],
            "manufacturerId": m.manufacturer["objectId"],
            "partNumber": "PN",
            "model": "M"
        }),
    )
    .await;
}

#[tokio::test]
async fn request_errors() {
    let app = app();
    let unknown = get(&app, "/api/v1/Widgets").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["error"]["code"], json!("not_found"));

    let bad_key = get(&app, "/api/v1/Units/not-a-key").await;
    assert_eq!(bad_key.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_key.body["error"]["code"], json!("bad_request"));

    let not_object = send(&app, Method::POST, "/api/v1/Units", Some(json!(["code"]))).await;
    assert_eq!(not_object.status, StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/Units")
        .header("content-type", "application/json")
        .body(Body::from("{\"code\":"))
        .unwrap();
    let malformed = send_request(&app, req).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let missing_delete = send(&app, Method::DELETE, &format!("/api/v1/Units/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(missing_delete.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn collection_names_are_case_insensitive() {
    let app = app();
    create(&app, "units", json!({ "code": "KG", "symbol": "kg" })).await;
    let list = get(&app, "/api/v1/UNITS").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["meta"]["count"], json!(1));
}

#[tokio::test]
async fn response_headers_and_cors() {
    let app = app();
    let req = Request::builder()
        .uri("/api/v1/Units")
        .header("origin", "http://client.test")
        .body(Body::empty())
        .unwrap();
    let reply = send_request(&app, req).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers.get("api-supported-versions").unwrap(), "1.0");
    assert_eq!(reply.headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
    assert_eq!(reply.headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(reply.headers.get("cache-control").unwrap(), "no-cache, no-store, must-revalidate");
    assert!(reply.headers.get_all("vary").iter().any(|v| v == "Accept-Encoding"));
    assert_eq!(reply.headers.get("access-control-allow-origin").unwrap(), "*");

    let missing = get(&app, "/nowhere").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.headers.get("api-supported-versions").unwrap(), "1.0");
}

#[tokio::test]
async fn common_routes_and_service_document() {
    let app = app();
    assert_eq!(get(&app, "/health").await.body, json!({ "status": "ok" }));
    let ready = get(&app, "/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["database"], json!("ok"));
    let version = get(&app, "/version").await;
    assert_eq!(version.body["name"], json!("inventory-service"));

    let doc = get(&app, "/api/v1").await;
    assert_eq!(doc.status, StatusCode::OK);
    let names: Vec<_> = doc.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        [
            "Classifications",
            "Units",
            "Parts",
            "Manufacturers",
            "Suppliers",
            "Inventories",
            "InventoryItems",
            "Sales",
            "SaleItems"
        ]
    );
}

async fn sale_with_item_source(app: &axum::Router) -> (serde_json::Value, serde_json::Value) {
    let m = seed_masters(app).await;
    let inventory = create(
        app,
        "Inventories",
        json!({
            "partId": m.part["objectId"],
            "manufacturerId": m.manufacturer["objectId"],
            "partNumber": "PN",
            "model": "M"
        }),
    )
    .await;
    let item = create(
        app,
        "InventoryItems",
        json!({ "inventoryId": inventory["objectId"], "supplierId": m.supplier["objectId"], "price": "2.50" }),
    )
    .await;
    let sale = create(app, "Sales", json!({ "customer": "ACME" })).await;
    (sale, item)
}

#[tokio::test]
async fn negative_quantity_is_rejected() {
    let app = app();
    let (sale, item) = sale_with_item_source(&app).await;
    let reply = send(
        &app,
        Method::POST,
        "/api/v1/SaleItems",
        Some(json!({ "saleId": sale["objectId"], "inventoryItemId": item["objectId"], "quantity": -5 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["code"], json!("validation_error"));
    assert_eq!(reply.body["error"]["details"][0]["field"], json!("quantity"));
    assert_eq!(get(&app, "/api/v1/SaleItems").await.body["meta"]["count"], json!(0));

    let line = create(
        &app,
        "SaleItems",
        json!({ "saleId": sale["objectId"], "inventoryItemId": item["objectId"], "quantity": 0 }),
    )
    .await;
    assert_eq!(line["quantity"], json!(0));
    let uri = format!("/api/v1/SaleItems/{}", key(&line));
    let patched = send(&app, Method::PATCH, &uri, Some(json!({ "quantity": -1 }))).await;
    assert_eq!(patched.status, StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, &uri).await.body["data"]["quantity"], json!(0));
}

#[tokio::test]
async fn defaulted_fields_cannot_be_nulled() {
    let app = app();
    let (sale, item) = sale_with_item_source(&app).await;
    assert_eq!(sale["amount"], json!("0.00"));

    let sale_uri = format!("/api/v1/Sales/{}", key(&sale));
    let reply = send(&app, Method::PATCH, &sale_uri, Some(json!({ "total": null }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["details"][0]["field"], json!("total"));
    assert_eq!(get(&app, &sale_uri).await.body["data"]["total"], json!("0.00"));

    let inventory_uri = format!("/api/v1/Inventories/{}", item["inventoryId"].as_str().unwrap());
    let reply = send(&app, Method::PATCH, &inventory_uri, Some(json!({ "isOriginal": null }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, &inventory_uri).await.body["data"]["isOriginal"], json!(false));

    let cleared = send(&app, Method::PATCH, &inventory_uri, Some(json!({ "remarks": null }))).await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.body["data"]["remarks"], serde_json::Value::Null);
}
