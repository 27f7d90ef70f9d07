//! Integration tests for the Atelier API.
//!
//! The tests talk to a running server over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! atelier-cli migrate
//! cargo run -p atelier-api &
//! ATELIER_API_TOKEN=... cargo test -p atelier-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `ATELIER_TEST_URL` - Server under test (default: `http://127.0.0.1:1337`)
//! - `ATELIER_API_TOKEN` - Token for administrative routes
//! - `STRIPE_WEBHOOK_SECRET` - The server's webhook signing secret, for tests
//!   that deliver signed events

use atelier_api::payments::webhook::compute_signature;
use atelier_core::validate_slug;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("ATELIER_TEST_URL").unwrap_or_else(|_| "http://127.0.0.1:1337".to_string())
}

/// Absolute URL for `path`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// Administrative token, if the environment provides one.
#[must_use]
pub fn api_token() -> Option<String> {
    std::env::var("ATELIER_API_TOKEN").ok().filter(|t| !t.is_empty())
}

/// A plain HTTP client. Each test gets its own forwarded address so rate
/// limits do not leak between tests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    let octet = Uuid::new_v4().as_bytes()[0];
    let mut headers = reqwest::header::HeaderMap::new();
    if let Ok(value) = format!("198.51.100.{octet}").parse() {
        headers.insert("x-forwarded-for", value);
    }
    Client::builder()
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Attach the administrative token.
///
/// # Panics
///
/// Panics if `ATELIER_API_TOKEN` is unset.
#[must_use]
pub fn authorized(request: RequestBuilder) -> RequestBuilder {
    let token = api_token().expect("ATELIER_API_TOKEN must be set for this test");
    request.bearer_auth(token)
}

/// A slug unique to this test run.
///
/// # Panics
///
/// Panics if the generated slug is invalid.
#[must_use]
pub fn unique_slug(prefix: &str) -> String {
    let slug = format!("{prefix}-{}", Uuid::new_v4().simple());
    assert!(validate_slug(&slug).is_ok(), "{slug}");
    slug
}

/// A customer email unique to this test run.
#[must_use]
pub fn unique_email() -> String {
    format!("collector+{}@example.com", Uuid::new_v4().simple())
}

/// `{"data": ...}` request body for a published artwork priced at `price`.
#[must_use]
pub fn artwork_body(slug: &str, price: &str, stock: i32) -> Value {
    json!({
        "data": {
            "title": "Harbour at Dusk",
            "slug": slug,
            "artist_name": "Maren Holt",
            "medium": "Oil on linen",
            "year": 2021,
            "width_cm": "50",
            "height_cm": "40",
            "price": price,
            "stock": stock,
            "published": true
        }
    })
}

/// Create a published artwork through the API and return its `data` object.
///
/// # Panics
///
/// Panics if the request fails or the server does not return 201.
pub async fn create_artwork(client: &Client, price: &str, stock: i32) -> Value {
    let slug = unique_slug("it-artwork");
    let resp = authorized(client.post(url("/api/artworks")))
        .json(&artwork_body(&slug, price, stock))
        .send()
        .await
        .expect("Failed to create artwork");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("Failed to parse artwork");
    body["data"].clone()
}

/// Delete an artwork, ignoring failures (it may be referenced by an order).
pub async fn delete_artwork(client: &Client, id: &Value) {
    let _ = authorized(client.delete(url(&format!("/api/artworks/{id}"))))
        .send()
        .await;
}

/// Place a pending order for `quantity` of `artwork_id` and return its `data`
/// object.
///
/// # Panics
///
/// Panics if the request fails or the server does not return 201.
pub async fn place_order(client: &Client, artwork_id: &Value, quantity: i32) -> Value {
    let resp = client
        .post(url("/api/orders"))
        .json(&json!({"data": {
            "customer_email": unique_email(),
            "items": [{"artwork_id": artwork_id, "quantity": quantity}]
        }}))
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("Failed to parse order");
    body["data"].clone()
}

/// Current stock of an artwork.
///
/// # Panics
///
/// Panics if the artwork cannot be fetched.
pub async fn artwork_stock(client: &Client, id: &Value) -> i64 {
    let body: Value = client
        .get(url(&format!("/api/artworks/{id}")))
        .send()
        .await
        .expect("Failed to get artwork")
        .json()
        .await
        .expect("Failed to parse artwork");
    body["data"]["stock"].as_i64().expect("stock is a number")
}

/// Webhook signing secret shared with the server, if the environment provides
/// one.
#[must_use]
pub fn webhook_secret() -> Option<String> {
    std::env::var("STRIPE_WEBHOOK_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
}

/// Deliver `event` to the webhook endpoint with a valid `Stripe-Signature`.
///
/// # Panics
///
/// Panics if `STRIPE_WEBHOOK_SECRET` is unset or the request fails.
pub async fn send_signed_event(client: &Client, event: &Value) -> reqwest::Response {
    let secret = webhook_secret().expect("STRIPE_WEBHOOK_SECRET must be set for this test");
    let payload = event.to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature =
        compute_signature(&timestamp, payload.as_bytes(), &secret).expect("Failed to sign event");

    client
        .post(url("/api/payments/webhook"))
        .header("content-type", "application/json")
        .header("stripe-signature", format!("t={timestamp},v1={signature}"))
        .body(payload)
        .send()
        .await
        .expect("Failed to post webhook")
}

/// A `payment_intent.succeeded` event for a fresh intent whose metadata names
/// `order_id`.
#[must_use]
pub fn intent_succeeded_event(order_id: &Value, amount: i64) -> Value {
    let suffix = Uuid::new_v4().simple();
    json!({
        "id": format!("evt_{suffix}"),
        "type": "payment_intent.succeeded",
        "data": {"object": {
            "id": format!("pi_{suffix}"),
            "status": "succeeded",
            "amount": amount,
            "currency": "eur",
            "metadata": {"order_id": order_id.to_string()}
        }}
    })
}
