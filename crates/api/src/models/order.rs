//! Orders and ordered items.

use atelier_core::{
    ArtworkId, CurrencyCode, Email, OrderId, OrderStatus, OrderedItemId, PaymentStatus,
    line_total, sum_lines,
};
use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Characters used in the random part of an order number. Ambiguous glyphs
/// (0/O, 1/I) are left out.
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    /// `ART-YYYYMMDD-XXXXXX`
    pub order_number: String,
    pub customer_email: Email,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub currency: CurrencyCode,
    pub shipping_address: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order. Title and price are copied from the artwork when the
/// order is placed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderedItem {
    pub id: OrderedItemId,
    pub order_id: OrderId,
    pub artwork_id: ArtworkId,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderedItemView {
    #[serde(flatten)]
    pub item: OrderedItem,
    pub line_total: Decimal,
}

impl From<OrderedItem> for OrderedItemView {
    fn from(item: OrderedItem) -> Self {
        Self {
            line_total: line_total(item.unit_price, item.quantity),
            item,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderedItemView>,
    pub total: Decimal,
    pub item_count: i64,
}

impl OrderView {
    #[must_use]
    pub fn new(order: Order, items: Vec<OrderedItem>) -> Self {
        Self {
            total: order_total(&items),
            item_count: items.iter().map(|i| i64::from(i.quantity)).sum(),
            items: items.into_iter().map(OrderedItemView::from).collect(),
            order,
        }
    }
}

/// Response of `GET /api/orders/{id}/summary`.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub currency: CurrencyCode,
    pub total: Decimal,
    pub item_count: i64,
}

impl OrderSummary {
    #[must_use]
    pub fn new(order: &Order, items: &[OrderedItem]) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            status: order.status,
            payment_status: order.payment_status,
            currency: order.currency,
            total: order_total(items),
            item_count: items.iter().map(|i| i64::from(i.quantity)).sum(),
        }
    }
}

/// Sum of all line totals.
#[must_use]
pub fn order_total(items: &[OrderedItem]) -> Decimal {
    sum_lines(items.iter().map(|i| (i.unit_price, i.quantity)))
}

/// Generate an order number for `date`, e.g. `ART-20260314-K7QX2M`.
#[must_use]
pub fn generate_order_number(date: NaiveDate) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .filter_map(|_| ORDER_NUMBER_ALPHABET.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect();
    format!("ART-{}-{suffix}", date.format("%Y%m%d"))
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub customer_email: Option<Email>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// One requested line when placing an order.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OrderLine {
    pub artwork_id: ArtworkId,
    pub quantity: i32,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Deserialize)]
pub struct NewOrder {
    pub customer_email: Email,
    pub currency: Option<CurrencyCode>,
    pub shipping_address: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub items: Vec<OrderLine>,
}

/// Body of `PUT /api/orders/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub shipping_address: Option<serde_json::Value>,
}

/// Shipping addresses are free-form but must be JSON objects.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for any other JSON value.
pub fn validate_shipping_address(address: Option<&serde_json::Value>) -> Result<(), AppError> {
    match address {
        Some(value) if !value.is_object() => Err(AppError::BadRequest(
            "shipping_address must be an object".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderedItemQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Deserialize)]
pub struct NewOrderedItem {
    pub order_id: OrderId,
    pub artwork_id: ArtworkId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct OrderedItemPatch {
    pub quantity: i32,
}
