//! Cart item route handlers.

use atelier_core::CartItemId;
use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use crate::db::CartRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    CartItemPatch, CartItemQuery, CartItemView, DataBody, Envelope, NewCartItem, PageRequest,
    validate_quantity,
};
use crate::state::AppState;

/// `GET /api/cart-items`
#[instrument(skip(state))]
pub async fn find(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CartItemQuery>,
) -> Result<Envelope<Vec<CartItemView>>> {
    let page = PageRequest::new(query.page, query.page_size);
    let (items, total) = CartRepository::new(state.pool())
        .list_items(query.cart_id, page)
        .await?;
    Ok(Envelope::page(
        items.into_iter().map(CartItemView::from).collect(),
        page,
        total,
    ))
}

/// `GET /api/cart-items/{id}`
#[instrument(skip(state))]
pub async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CartItemId>,
) -> Result<Envelope<CartItemView>> {
    let item = CartRepository::new(state.pool())
        .get_item(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart item".to_string()))?;
    Ok(Envelope::single(item.into()))
}

/// `POST /api/cart-items`
///
/// Adding an artwork already in the cart increases its quantity.
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DataBody<NewCartItem>>,
) -> Result<(StatusCode, Envelope<CartItemView>)> {
    let input = input.data;
    validate_quantity(input.quantity)?;

    let item = CartRepository::new(state.pool()).add_item(&input).await?;
    tracing::debug!(
        cart_id = %item.cart_id,
        artwork_id = %item.artwork_id,
        quantity = item.quantity,
        "Artwork added to cart"
    );
    Ok((StatusCode::CREATED, Envelope::single(item.into())))
}

/// `PUT /api/cart-items/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CartItemId>,
    ApiJson(patch): ApiJson<DataBody<CartItemPatch>>,
) -> Result<Envelope<CartItemView>> {
    validate_quantity(patch.data.quantity)?;
    let item = CartRepository::new(state.pool())
        .update_item(id, patch.data.quantity)
        .await?;
    Ok(Envelope::single(item.into()))
}

/// `DELETE /api/cart-items/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CartItemId>,
) -> Result<Envelope<CartItemView>> {
    let item = CartRepository::new(state.pool()).delete_item(id).await?;
    Ok(Envelope::single(item.into()))
}
