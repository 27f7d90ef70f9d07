//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Database readiness
//! GET    /health/detailed               - All dependency probes
//!
//! # Artworks
//! GET    /api/artworks                  - List (filters, sort, pagination)
//! POST   /api/artworks                  - Create (token)
//! GET    /api/artworks/{id}             - Get by id (cached)
//! PUT    /api/artworks/{id}             - Update (token)
//! DELETE /api/artworks/{id}             - Delete (token)
//! GET    /api/artworks/slug/{slug}      - Get by slug (cached)
//!
//! # Carts
//! GET    /api/carts                     - List
//! POST   /api/carts                     - Create
//! GET    /api/carts/{id}                - Get with items and totals
//! PUT    /api/carts/{id}                - Update email
//! DELETE /api/carts/{id}                - Delete
//! GET    /api/carts/{id}/summary        - Totals only
//! POST   /api/carts/{id}/checkout       - Convert into an order
//! GET    /api/cart-items                - List
//! POST   /api/cart-items                - Add artwork (merges quantities)
//! GET    /api/cart-items/{id}           - Get
//! PUT    /api/cart-items/{id}           - Set quantity
//! DELETE /api/cart-items/{id}           - Remove
//!
//! # Wishlists
//! GET    /api/wishlists                 - List
//! POST   /api/wishlists                 - Create
//! GET    /api/wishlists/{id}            - Get with artwork ids
//! PUT    /api/wishlists/{id}            - Rename
//! DELETE /api/wishlists/{id}            - Delete
//! POST   /api/wishlists/{id}/artworks   - Save an artwork
//! DELETE /api/wishlists/{id}/artworks/{artwork_id} - Forget an artwork
//!
//! # Orders
//! GET    /api/orders                    - List
//! POST   /api/orders                    - Place from an item list
//! GET    /api/orders/{id}               - Get with items and totals
//! PUT    /api/orders/{id}               - Status, notes, address (token)
//! DELETE /api/orders/{id}               - Delete pending/cancelled (token)
//! GET    /api/orders/{id}/summary       - Totals only
//! GET    /api/ordered-items             - List
//! POST   /api/ordered-items             - Add line to pending order (token)
//! GET    /api/ordered-items/{id}        - Get
//! PUT    /api/ordered-items/{id}        - Set quantity (token)
//! DELETE /api/ordered-items/{id}        - Remove line (token)
//!
//! # Payments (stricter rate limit)
//! POST   /api/payments/intents          - Create intent for an order
//! GET    /api/payments/intents/{id}     - Retrieve and sync
//! POST   /api/payments/intents/{id}/confirm - Confirm with a payment method
//! POST   /api/payments/intents/{id}/cancel  - Cancel
//! POST   /api/payments/refunds          - Refund (token)
//! POST   /api/payments/webhook          - Stripe events (signed)
//! ```

pub mod artworks;
pub mod cart_items;
pub mod carts;
pub mod health;
pub mod ordered_items;
pub mod orders;
pub mod payments;
pub mod wishlists;

use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::{
    compression::{CompressionLayer, predicate::SizeAbove},
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::HttpConfig;
use crate::error::AppError;
use crate::middleware::{
    REQUEST_ID_HEADER, SecurityHeaders, rate_limiter, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Error assembling the router from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid rate limit: replenish every {replenish_secs}s, burst {burst}")]
    InvalidRateLimit { replenish_secs: u64, burst: u32 },
}

/// Create the health routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::health))
        .route("/ready", get(health::readiness))
        .route("/detailed", get(health::detailed))
}

/// Create the artwork routes router.
pub fn artwork_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(artworks::find).post(artworks::create))
        .route(
            "/{id}",
            get(artworks::find_one)
                .put(artworks::update)
                .delete(artworks::delete),
        )
        .route("/slug/{slug}", get(artworks::find_by_slug))
}

/// Create the cart and cart item routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/carts", get(carts::find).post(carts::create))
        .route(
            "/carts/{id}",
            get(carts::find_one).put(carts::update).delete(carts::delete),
        )
        .route("/carts/{id}/summary", get(carts::summary))
        .route("/carts/{id}/checkout", post(carts::checkout))
        .route("/cart-items", get(cart_items::find).post(cart_items::create))
        .route(
            "/cart-items/{id}",
            get(cart_items::find_one)
                .put(cart_items::update)
                .delete(cart_items::delete),
        )
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    use axum::routing::delete;

    Router::new()
        .route("/", get(wishlists::find).post(wishlists::create))
        .route(
            "/{id}",
            get(wishlists::find_one)
                .put(wishlists::update)
                .delete(wishlists::delete),
        )
        .route("/{id}/artworks", post(wishlists::add_artwork))
        .route(
            "/{id}/artworks/{artwork_id}",
            delete(wishlists::remove_artwork),
        )
}

/// Create the order and ordered item routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::find).post(orders::create))
        .route(
            "/orders/{id}",
            get(orders::find_one)
                .put(orders::update)
                .delete(orders::delete),
        )
        .route("/orders/{id}/summary", get(orders::summary))
        .route(
            "/ordered-items",
            get(ordered_items::find).post(ordered_items::create),
        )
        .route(
            "/ordered-items/{id}",
            get(ordered_items::find_one)
                .put(ordered_items::update)
                .delete(ordered_items::delete),
        )
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/intents", post(payments::create_intent))
        .route("/intents/{id}", get(payments::retrieve_intent))
        .route("/intents/{id}/confirm", post(payments::confirm_intent))
        .route("/intents/{id}/cancel", post(payments::cancel_intent))
        .route("/refunds", post(payments::refund))
        .route("/webhook", post(payments::webhook))
}

/// Create all `/api` routes with their rate limiters.
///
/// # Errors
///
/// Returns `RouterError::InvalidRateLimit` if a limiter setting is zero.
pub fn api_routes(http: &HttpConfig) -> Result<Router<AppState>, RouterError> {
    let general = limiter(http.rate_limit_replenish_secs, http.rate_limit_burst)?;
    let strict = limiter(
        http.payment_rate_limit_replenish_secs,
        http.payment_rate_limit_burst,
    )?;

    let content = Router::new()
        .nest("/artworks", artwork_routes())
        .merge(cart_routes())
        .nest("/wishlists", wishlist_routes())
        .merge(order_routes())
        .layer(general);

    Ok(Router::new()
        .merge(content)
        .nest("/payments", payment_routes().layer(strict)))
}

/// Build the full application router with its middleware stack.
///
/// Sentry layers are added by the binary around this router.
///
/// # Errors
///
/// Returns `RouterError` if the HTTP configuration is invalid.
pub fn app(state: AppState) -> Result<Router, RouterError> {
    let config = state.config();
    let http = &config.http;

    let router = Router::new()
        .nest("/health", health_routes())
        .nest("/api", api_routes(http)?)
        .fallback(|| async { AppError::NotFound("Route".to_string()) })
        .layer(from_fn_with_state(
            SecurityHeaders::from_config(config),
            security_headers_middleware,
        ))
        .layer(
            CompressionLayer::new()
                .gzip(true)
                .br(true)
                .compress_when(SizeAbove::new(http.compression_min_bytes)),
        )
        .layer(cors_layer(http))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        );

    Ok(router.with_state(state))
}

fn limiter(
    replenish_secs: u64,
    burst: u32,
) -> Result<crate::middleware::RateLimiterLayer, RouterError> {
    rate_limiter(replenish_secs, burst).ok_or(RouterError::InvalidRateLimit {
        replenish_secs,
        burst,
    })
}

/// CORS for the configured origins. Unparseable origins are skipped.
fn cors_layer(http: &HttpConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = http
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, request_id.clone()])
        .expose_headers([request_id])
        .max_age(http.cors_max_age)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::state::tests::test_state;

    fn router() -> Router {
        app(test_state()).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body.to_vec())
    }

    fn api_request(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.7")
    }

    #[tokio::test]
    async fn test_health_has_stack_headers() {
        let (status, headers, body) =
            send(Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
        assert!(headers.contains_key(REQUEST_ID_HEADER));
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, _, body) = send(
            api_request(Method::GET, "/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["name"], "NotFoundError");
    }

    #[tokio::test]
    async fn test_admin_route_requires_token() {
        let (status, _, body) = send(
            api_request(Method::DELETE, "/api/artworks/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["name"], "UnauthorizedError");
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let (status, _, body) = send(
            api_request(Method::POST, "/api/payments/webhook")
                .header("stripe-signature", "t=1,v1=deadbeef")
                .body(Body::from(r#"{"id":"evt_1","type":"charge.refunded"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["status"], 400);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (status, headers, _) = send(
            api_request(Method::OPTIONS, "/api/artworks")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert!(status.is_success());
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }
}
