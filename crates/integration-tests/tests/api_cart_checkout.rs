//! Integration tests for carts, wishlists and checkout.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (atelier-cli migrate)
//! - The API server running (cargo run -p atelier-api)
//! - `ATELIER_API_TOKEN` matching the server's token
//!
//! Run with: cargo test -p atelier-integration-tests -- --ignored

use atelier_integration_tests::{client, create_artwork, unique_email, url};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Test helper: Create a cart and return its id.
async fn create_cart(client: &Client) -> Value {
    let resp = client
        .post(url("/api/carts"))
        .json(&json!({"data": {"customer_email": unique_email()}}))
        .send()
        .await
        .expect("Failed to create cart");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Failed to parse cart");
    body["data"]["id"].clone()
}

/// Test helper: Add an artwork to a cart.
async fn add_item(client: &Client, cart_id: &Value, artwork_id: &Value, quantity: i32) -> Value {
    let resp = client
        .post(url("/api/cart-items"))
        .json(&json!({"data": {
            "cart_id": cart_id,
            "artwork_id": artwork_id,
            "quantity": quantity
        }}))
        .send()
        .await
        .expect("Failed to add cart item");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("Failed to parse cart item")
}

// ============================================================================
// Carts
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and ATELIER_API_TOKEN"]
async fn test_cart_totals_merge_quantities() {
    let client = client();
    let artwork = create_artwork(&client, "340.00", 5).await;
    let cart_id = create_cart(&client).await;

    add_item(&client, &cart_id, &artwork["id"], 1).await;
    let merged = add_item(&client, &cart_id, &artwork["id"], 1).await;
    assert_eq!(merged["data"]["quantity"], 2);
    assert_eq!(merged["data"]["line_total"], "680.00");

    let summary: Value = client
        .get(url(&format!("/api/carts/{cart_id}/summary")))
        .send()
        .await
        .expect("Failed to get summary")
        .json()
        .await
        .expect("Failed to parse summary");
    assert_eq!(summary["data"]["total"], "680.00");
    assert_eq!(summary["data"]["item_count"], 2);
    assert_eq!(summary["data"]["line_count"], 1);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_invalid_cart_email_is_rejected() {
    let resp = client()
        .post(url("/api/carts"))
        .json(&json!({"data": {"customer_email": "not-an-email"}}))
        .send()
        .await
        .expect("Failed to create cart");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse error");
    assert_eq!(body["error"]["status"], 400);
}

#[tokio::test]
#[ignore = "Requires running API server and ATELIER_API_TOKEN"]
async fn test_quantity_above_stock_conflicts() {
    let client = client();
    let artwork = create_artwork(&client, "120", 1).await;
    let cart_id = create_cart(&client).await;

    let resp = client
        .post(url("/api/cart-items"))
        .json(&json!({"data": {
            "cart_id": cart_id,
            "artwork_id": artwork["id"],
            "quantity": 3
        }}))
        .send()
        .await
        .expect("Failed to add cart item");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and ATELIER_API_TOKEN"]
async fn test_checkout_places_order_and_decrements_stock() {
    let client = client();
    let artwork = create_artwork(&client, "800.00", 2).await;
    let artwork_id = artwork["id"].clone();
    let cart_id = create_cart(&client).await;
    add_item(&client, &cart_id, &artwork_id, 2).await;

    let resp = client
        .post(url(&format!("/api/carts/{cart_id}/checkout")))
        .json(&json!({"data": {
            "shipping_address": {"line1": "4 Quay Street", "city": "Porto", "country": "PT"},
            "notes": "Please crate for shipping"
        }}))
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let order: Value = resp.json().await.expect("Failed to parse order");
    let order = &order["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "unpaid");
    assert_eq!(order["total"], "1600.00");
    assert!(
        order["order_number"]
            .as_str()
            .is_some_and(|n| n.starts_with("ART-"))
    );

    // The cart is consumed by checkout.
    let resp = client
        .get(url(&format!("/api/carts/{cart_id}")))
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Stock was decremented and the cached copy evicted.
    let fresh: Value = client
        .get(url(&format!("/api/artworks/{artwork_id}")))
        .send()
        .await
        .expect("Failed to get artwork")
        .json()
        .await
        .expect("Failed to parse artwork");
    assert_eq!(fresh["data"]["stock"], 0);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_empty_cart_checkout_is_rejected() {
    let client = client();
    let cart_id = create_cart(&client).await;

    let resp = client
        .post(url(&format!("/api/carts/{cart_id}/checkout")))
        .send()
        .await
        .expect("Failed to check out");
    assert!(resp.status().is_client_error());
}

// ============================================================================
// Wishlists
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and ATELIER_API_TOKEN"]
async fn test_wishlist_saves_artworks() {
    let client = client();
    let artwork = create_artwork(&client, "95", 1).await;

    let resp = client
        .post(url("/api/wishlists"))
        .json(&json!({"data": {"customer_email": unique_email(), "name": "Studio wall"}}))
        .send()
        .await
        .expect("Failed to create wishlist");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let wishlist: Value = resp.json().await.expect("Failed to parse wishlist");
    let wishlist_id = wishlist["data"]["id"].clone();

    let resp = client
        .post(url(&format!("/api/wishlists/{wishlist_id}/artworks")))
        .json(&json!({"data": {"artwork_id": artwork["id"]}}))
        .send()
        .await
        .expect("Failed to save artwork");
    assert!(resp.status().is_success());

    let saved: Value = client
        .get(url(&format!("/api/wishlists/{wishlist_id}")))
        .send()
        .await
        .expect("Failed to get wishlist")
        .json()
        .await
        .expect("Failed to parse wishlist");
    assert_eq!(saved["data"]["artwork_ids"], json!([artwork["id"]]));

    let resp = client
        .delete(url(&format!(
            "/api/wishlists/{wishlist_id}/artworks/{}",
            artwork["id"]
        )))
        .send()
        .await
        .expect("Failed to forget artwork");
    assert!(resp.status().is_success());
}
