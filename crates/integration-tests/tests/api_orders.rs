//! Integration tests for order lifecycle and ordered item routes.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (atelier-cli migrate)
//! - The API server running (cargo run -p atelier-api)
//! - `ATELIER_API_TOKEN` matching the server's token
//! - `STRIPE_WEBHOOK_SECRET` matching the server's secret for the paid order
//!   tests
//!
//! Run with: cargo test -p atelier-integration-tests -- --ignored

use atelier_integration_tests::{
    artwork_stock, authorized, client, create_artwork, intent_succeeded_event, place_order,
    send_signed_event, url,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Test helper: Change an order's status.
async fn set_status(client: &Client, order_id: &Value, status: &str) -> reqwest::Response {
    authorized(client.put(url(&format!("/api/orders/{order_id}"))))
        .json(&json!({"data": {"status": status}}))
        .send()
        .await
        .expect("Failed to update order")
}

/// Test helper: Mark an order paid through a signed webhook event.
async fn pay(client: &Client, order_id: &Value) -> Value {
    let resp = send_signed_event(client, &intent_succeeded_event(order_id, 45_000)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ack: Value = resp.json().await.expect("Failed to parse ack");
    assert_eq!(ack["data"]["handled"], true);

    let order: Value = client
        .get(url(&format!("/api/orders/{order_id}")))
        .send()
        .await
        .expect("Failed to get order")
        .json()
        .await
        .expect("Failed to parse order");
    order["data"].clone()
}

// ============================================================================
// Status transitions
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and ATELIER_API_TOKEN"]
async fn test_disallowed_transition_conflicts() {
    let client = client();
    let artwork = create_artwork(&client, "450.00", 1).await;
    let order = place_order(&client, &artwork["id"], 1).await;

    let resp = set_status(&client, &order["id"], "shipped").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.expect("Failed to parse error");
    assert_eq!(body["error"]["status"], 409);
    assert!(body["data"].is_null());
}

#[tokio::test]
#[ignore = "Requires running API server and ATELIER_API_TOKEN"]
async fn test_cancelling_returns_stock() {
    let client = client();
    let artwork = create_artwork(&client, "450.00", 3).await;
    let order = place_order(&client, &artwork["id"], 2).await;
    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 1);

    let resp = set_status(&client, &order["id"], "cancelled").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse order");
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 3);

    // Cancelling again is a no-op and must not restock twice.
    let resp = set_status(&client, &order["id"], "cancelled").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 3);
}

// ============================================================================
// Paid orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server, ATELIER_API_TOKEN and STRIPE_WEBHOOK_SECRET"]
async fn test_signed_succeeded_event_marks_order_paid() {
    let client = client();
    let artwork = create_artwork(&client, "450.00", 1).await;
    let order = place_order(&client, &artwork["id"], 1).await;

    let paid = pay(&client, &order["id"]).await;
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["payment_status"], "succeeded");
}

#[tokio::test]
#[ignore = "Requires running API server, ATELIER_API_TOKEN and STRIPE_WEBHOOK_SECRET"]
async fn test_paid_order_cannot_be_deleted() {
    let client = client();
    let artwork = create_artwork(&client, "450.00", 1).await;
    let order = place_order(&client, &artwork["id"], 1).await;
    pay(&client, &order["id"]).await;

    let resp = authorized(client.delete(url(&format!("/api/orders/{}", order["id"]))))
        .send()
        .await
        .expect("Failed to delete order");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .get(url(&format!("/api/orders/{}", order["id"])))
        .send()
        .await
        .expect("Failed to get order");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 0);
}

#[tokio::test]
#[ignore = "Requires running API server, ATELIER_API_TOKEN and STRIPE_WEBHOOK_SECRET"]
async fn test_paid_order_lines_are_frozen() {
    let client = client();
    let artwork = create_artwork(&client, "450.00", 2).await;
    let extra = create_artwork(&client, "90.00", 1).await;
    let order = place_order(&client, &artwork["id"], 1).await;
    let item_id = order["items"][0]["id"].clone();
    pay(&client, &order["id"]).await;

    let resp = authorized(client.post(url("/api/ordered-items")))
        .json(&json!({"data": {
            "order_id": order["id"],
            "artwork_id": extra["id"],
            "quantity": 1
        }}))
        .send()
        .await
        .expect("Failed to add ordered item");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = authorized(client.put(url(&format!("/api/ordered-items/{item_id}"))))
        .json(&json!({"data": {"quantity": 2}}))
        .send()
        .await
        .expect("Failed to update ordered item");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = authorized(client.delete(url(&format!("/api/ordered-items/{item_id}"))))
        .send()
        .await
        .expect("Failed to delete ordered item");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 1);
    assert_eq!(artwork_stock(&client, &extra["id"]).await, 1);
}

// ============================================================================
// Ordered items
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and ATELIER_API_TOKEN"]
async fn test_concurrent_line_deletes_restock_once() {
    let client = client();
    let artwork = create_artwork(&client, "450.00", 5).await;
    let keep = create_artwork(&client, "90.00", 1).await;
    let order = place_order(&client, &artwork["id"], 3).await;
    let item_id = order["items"][0]["id"].clone();

    // A second line keeps the order non-empty once the first is gone.
    let resp = authorized(client.post(url("/api/ordered-items")))
        .json(&json!({"data": {
            "order_id": order["id"],
            "artwork_id": keep["id"],
            "quantity": 1
        }}))
        .send()
        .await
        .expect("Failed to add ordered item");
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 2);

    let delete = || {
        authorized(client.delete(url(&format!("/api/ordered-items/{item_id}")))).send()
    };
    let (first, second) = tokio::join!(delete(), delete());
    let mut statuses = [
        first.expect("Failed to delete ordered item").status(),
        second.expect("Failed to delete ordered item").status(),
    ];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::NOT_FOUND]);

    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 5);
}

#[tokio::test]
#[ignore = "Requires running API server and ATELIER_API_TOKEN"]
async fn test_line_quantity_change_adjusts_stock() {
    let client = client();
    let artwork = create_artwork(&client, "120.00", 4).await;
    let order = place_order(&client, &artwork["id"], 1).await;
    let item_id = order["items"][0]["id"].clone();

    let resp = authorized(client.put(url(&format!("/api/ordered-items/{item_id}"))))
        .json(&json!({"data": {"quantity": 3}}))
        .send()
        .await
        .expect("Failed to update ordered item");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse ordered item");
    assert_eq!(body["data"]["quantity"], 3);
    assert_eq!(body["data"]["line_total"], "360.00");
    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 1);

    let resp = authorized(client.put(url(&format!("/api/ordered-items/{item_id}"))))
        .json(&json!({"data": {"quantity": 5}}))
        .send()
        .await
        .expect("Failed to update ordered item");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(artwork_stock(&client, &artwork["id"]).await, 1);
}
