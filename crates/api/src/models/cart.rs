//! Carts and cart items.

use atelier_core::{ArtworkId, CartId, CartItemId, CurrencyCode, Email, line_total, sum_lines};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Cart {
    pub id: CartId,
    pub customer_email: Email,
    pub currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One artwork line in a cart. `unit_price` is the price when first added.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub artwork_id: ArtworkId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    #[serde(flatten)]
    pub item: CartItem,
    pub line_total: Decimal,
}

impl From<CartItem> for CartItemView {
    fn from(item: CartItem) -> Self {
        Self {
            line_total: line_total(item.unit_price, item.quantity),
            item,
        }
    }
}

/// Cart with its lines and computed totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartItemView>,
    pub total: Decimal,
    pub item_count: i64,
}

impl CartView {
    #[must_use]
    pub fn new(cart: Cart, items: Vec<CartItem>) -> Self {
        let totals = Totals::of(&items);
        Self {
            cart,
            items: items.into_iter().map(CartItemView::from).collect(),
            total: totals.total,
            item_count: totals.item_count,
        }
    }
}

/// Response of `GET /api/carts/{id}/summary`.
#[derive(Debug, Serialize)]
pub struct CartSummary {
    pub cart_id: CartId,
    pub currency: CurrencyCode,
    pub total: Decimal,
    pub item_count: i64,
    pub line_count: usize,
}

impl CartSummary {
    #[must_use]
    pub fn new(cart: &Cart, items: &[CartItem]) -> Self {
        let totals = Totals::of(items);
        Self {
            cart_id: cart.id,
            currency: cart.currency,
            total: totals.total,
            item_count: totals.item_count,
            line_count: items.len(),
        }
    }
}

struct Totals {
    total: Decimal,
    item_count: i64,
}

impl Totals {
    fn of(items: &[CartItem]) -> Self {
        Self {
            total: sum_lines(items.iter().map(|i| (i.unit_price, i.quantity))),
            item_count: items.iter().map(|i| i64::from(i.quantity)).sum(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub customer_email: Option<Email>,
}

#[derive(Debug, Deserialize)]
pub struct NewCart {
    pub customer_email: Email,
    /// Defaults to the shop currency.
    pub currency: Option<CurrencyCode>,
}

#[derive(Debug, Deserialize)]
pub struct CartPatch {
    pub customer_email: Option<Email>,
}

#[derive(Debug, Deserialize)]
pub struct CartItemQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub cart_id: Option<CartId>,
}

#[derive(Debug, Deserialize)]
pub struct NewCartItem {
    pub cart_id: CartId,
    pub artwork_id: ArtworkId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CartItemPatch {
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Optional body of `POST /api/carts/{id}/checkout`.
#[derive(Debug, Default, Deserialize)]
pub struct CartCheckout {
    pub shipping_address: Option<serde_json::Value>,
    pub notes: Option<String>,
}

/// Quantities on cart and order lines must be positive.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for zero or negative quantities.
pub fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
