//! Order route handlers.
//!
//! Anyone may place and read orders; changing or deleting them requires the
//! API token. Every stock change evicts the affected artworks from the cache.

use atelier_core::{ArtworkId, OrderId};
use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use crate::db::{OrderRepository, orders::OrderDraft};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireApiToken;
use crate::models::{
    DataBody, Envelope, NewOrder, Order, OrderPatch, OrderQuery, OrderSummary, OrderView,
    OrderedItem, PageRequest, validate_quantity, validate_shipping_address,
};
use crate::state::AppState;

/// `GET /api/orders`
#[instrument(skip(state))]
pub async fn find(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Envelope<Vec<Order>>> {
    let page = PageRequest::new(query.page, query.page_size);
    let (orders, total) = OrderRepository::new(state.pool())
        .list(&query, page)
        .await?;
    Ok(Envelope::page(orders, page, total))
}

/// `GET /api/orders/{id}`
#[instrument(skip(state))]
pub async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Envelope<OrderView>> {
    let (order, items) = load(&state, id).await?;
    Ok(Envelope::single(OrderView::new(order, items)))
}

/// `GET /api/orders/{id}/summary`
#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Envelope<OrderSummary>> {
    let (order, items) = load(&state, id).await?;
    Ok(Envelope::single(OrderSummary::new(&order, &items)))
}

/// `POST /api/orders`
///
/// Titles and prices are snapshotted from the artworks as they are now.
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DataBody<NewOrder>>,
) -> Result<(StatusCode, Envelope<OrderView>)> {
    let input = input.data;
    if input.items.is_empty() {
        return Err(AppError::BadRequest(
            "an order needs at least one item".to_string(),
        ));
    }
    for line in &input.items {
        validate_quantity(line.quantity)?;
    }
    validate_shipping_address(input.shipping_address.as_ref())?;

    let draft = OrderDraft {
        customer_email: &input.customer_email,
        currency: input.currency.unwrap_or(state.config().currency),
        shipping_address: input.shipping_address.as_ref(),
        notes: input.notes.as_deref(),
        lines: &input.items,
    };
    let placed = OrderRepository::new(state.pool()).place(draft).await?;
    state.cache().invalidate_ids(&placed.artwork_ids()).await;

    add_breadcrumb(
        "order",
        "Order placed",
        &[("order_number", placed.order.order_number.clone())],
    );
    Ok((
        StatusCode::CREATED,
        Envelope::single(OrderView::new(placed.order, placed.items)),
    ))
}

/// `PUT /api/orders/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(patch): ApiJson<DataBody<OrderPatch>>,
) -> Result<Envelope<OrderView>> {
    let patch = patch.data;
    validate_shipping_address(patch.shipping_address.as_ref())?;

    let repo = OrderRepository::new(state.pool());
    let order = repo.update(id, &patch).await?;
    let items = repo.items(id).await?;
    if patch.status.is_some() {
        state.cache().invalidate_ids(&artwork_ids(&items)).await;
    }

    Ok(Envelope::single(OrderView::new(order, items)))
}

/// `DELETE /api/orders/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Envelope<Order>> {
    let repo = OrderRepository::new(state.pool());
    let items = repo.items(id).await?;
    let order = repo.delete(id).await?;
    state.cache().invalidate_ids(&artwork_ids(&items)).await;

    tracing::info!(order_id = %id, order_number = %order.order_number, "Order deleted");
    Ok(Envelope::single(order))
}

async fn load(state: &AppState, id: OrderId) -> Result<(Order, Vec<OrderedItem>)> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    let items = repo.items(id).await?;
    Ok((order, items))
}

fn artwork_ids(items: &[OrderedItem]) -> Vec<ArtworkId> {
    items.iter().map(|item| item.artwork_id).collect()
}
