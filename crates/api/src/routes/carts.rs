//! Cart route handlers, including checkout.

use atelier_core::CartId;
use axum::{body::Bytes, extract::State, http::StatusCode};
use tracing::instrument;

use crate::db::{CartRepository, OrderRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    Cart, CartCheckout, CartPatch, CartQuery, CartSummary, CartView, DataBody, Envelope, NewCart,
    OrderView, PageRequest, validate_shipping_address,
};
use crate::state::AppState;

/// `GET /api/carts`
#[instrument(skip(state))]
pub async fn find(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CartQuery>,
) -> Result<Envelope<Vec<Cart>>> {
    let page = PageRequest::new(query.page, query.page_size);
    let (carts, total) = CartRepository::new(state.pool())
        .list(query.customer_email.as_ref(), page)
        .await?;
    Ok(Envelope::page(carts, page, total))
}

/// `GET /api/carts/{id}`
#[instrument(skip(state))]
pub async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CartId>,
) -> Result<Envelope<CartView>> {
    let (cart, items) = load(&state, id).await?;
    Ok(Envelope::single(CartView::new(cart, items)))
}

/// `GET /api/carts/{id}/summary`
#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CartId>,
) -> Result<Envelope<CartSummary>> {
    let (cart, items) = load(&state, id).await?;
    Ok(Envelope::single(CartSummary::new(&cart, &items)))
}

/// `POST /api/carts`
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DataBody<NewCart>>,
) -> Result<(StatusCode, Envelope<CartView>)> {
    let input = input.data;
    let currency = input.currency.unwrap_or(state.config().currency);
    let cart = CartRepository::new(state.pool())
        .create(&input, currency)
        .await?;

    tracing::info!(cart_id = %cart.id, "Cart created");
    Ok((
        StatusCode::CREATED,
        Envelope::single(CartView::new(cart, Vec::new())),
    ))
}

/// `PUT /api/carts/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CartId>,
    ApiJson(patch): ApiJson<DataBody<CartPatch>>,
) -> Result<Envelope<CartView>> {
    let repo = CartRepository::new(state.pool());
    let cart = repo.update(id, patch.data.customer_email.as_ref()).await?;
    let items = repo.items(cart.id).await?;
    Ok(Envelope::single(CartView::new(cart, items)))
}

/// `DELETE /api/carts/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CartId>,
) -> Result<Envelope<Cart>> {
    let cart = CartRepository::new(state.pool()).delete(id).await?;
    Ok(Envelope::single(cart))
}

/// `POST /api/carts/{id}/checkout`
///
/// The body is optional: `{"data": {"shipping_address": {...}, "notes": "..."}}`.
#[instrument(skip(state, body))]
pub async fn checkout(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CartId>,
    body: Bytes,
) -> Result<(StatusCode, Envelope<OrderView>)> {
    let input = parse_checkout(&body)?;
    validate_shipping_address(input.shipping_address.as_ref())?;

    let placed = OrderRepository::new(state.pool())
        .checkout(id, input.shipping_address.as_ref(), input.notes.as_deref())
        .await?;
    state.cache().invalidate_ids(&placed.artwork_ids()).await;

    add_breadcrumb(
        "checkout",
        "Cart checked out",
        &[
            ("cart_id", id.to_string()),
            ("order_number", placed.order.order_number.clone()),
        ],
    );
    tracing::info!(
        cart_id = %id,
        order_id = %placed.order.id,
        order_number = %placed.order.order_number,
        "Cart checked out"
    );

    Ok((
        StatusCode::CREATED,
        Envelope::single(OrderView::new(placed.order, placed.items)),
    ))
}

async fn load(state: &AppState, id: CartId) -> Result<(Cart, Vec<crate::models::CartItem>)> {
    let repo = CartRepository::new(state.pool());
    let cart = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart".to_string()))?;
    let items = repo.items(id).await?;
    Ok((cart, items))
}

fn parse_checkout(body: &[u8]) -> Result<CartCheckout> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CartCheckout::default());
    }
    serde_json::from_slice::<DataBody<CartCheckout>>(body)
        .map(|wrapped| wrapped.data)
        .map_err(|e| AppError::BadRequest(format!("Invalid checkout body: {e}")))
}
