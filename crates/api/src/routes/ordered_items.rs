//! Ordered item route handlers. Lines can only change while their order is
//! pending.

use atelier_core::OrderedItemId;
use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireApiToken;
use crate::models::{
    DataBody, Envelope, NewOrderedItem, OrderedItemPatch, OrderedItemQuery, OrderedItemView,
    PageRequest, validate_quantity,
};
use crate::state::AppState;

/// `GET /api/ordered-items`
#[instrument(skip(state))]
pub async fn find(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderedItemQuery>,
) -> Result<Envelope<Vec<OrderedItemView>>> {
    let page = PageRequest::new(query.page, query.page_size);
    let (items, total) = OrderRepository::new(state.pool())
        .list_items(query.order_id, page)
        .await?;
    Ok(Envelope::page(
        items.into_iter().map(OrderedItemView::from).collect(),
        page,
        total,
    ))
}

/// `GET /api/ordered-items/{id}`
#[instrument(skip(state))]
pub async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderedItemId>,
) -> Result<Envelope<OrderedItemView>> {
    let item = OrderRepository::new(state.pool())
        .get_item(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ordered item".to_string()))?;
    Ok(Envelope::single(item.into()))
}

/// `POST /api/ordered-items`
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiJson(input): ApiJson<DataBody<NewOrderedItem>>,
) -> Result<(StatusCode, Envelope<OrderedItemView>)> {
    let input = input.data;
    validate_quantity(input.quantity)?;

    let item = OrderRepository::new(state.pool()).add_item(&input).await?;
    state.cache().invalidate_ids(&[item.artwork_id]).await;
    Ok((StatusCode::CREATED, Envelope::single(item.into())))
}

/// `PUT /api/ordered-items/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiPath(id): ApiPath<OrderedItemId>,
    ApiJson(patch): ApiJson<DataBody<OrderedItemPatch>>,
) -> Result<Envelope<OrderedItemView>> {
    validate_quantity(patch.data.quantity)?;
    let item = OrderRepository::new(state.pool())
        .update_item(id, patch.data.quantity)
        .await?;
    state.cache().invalidate_ids(&[item.artwork_id]).await;
    Ok(Envelope::single(item.into()))
}

/// `DELETE /api/ordered-items/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiPath(id): ApiPath<OrderedItemId>,
) -> Result<Envelope<OrderedItemView>> {
    let item = OrderRepository::new(state.pool()).delete_item(id).await?;
    state.cache().invalidate_ids(&[item.artwork_id]).await;
    Ok(Envelope::single(item.into()))
}
