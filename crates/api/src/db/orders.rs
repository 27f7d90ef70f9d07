//! Order and ordered item repository.
//!
//! Stock is kept in step with orders: placing an order or adding a line
//! takes editions out of `shop.artwork.stock`, and cancelling, deleting a
//! pending order or removing a line puts them back. Every such write runs in
//! one transaction with the affected artwork rows locked `FOR UPDATE`.

use std::collections::BTreeMap;

use atelier_core::{
    ArtworkId, CartId, CurrencyCode, Email, OrderId, OrderStatus, OrderedItemId, PaymentStatus,
};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use super::artworks::ARTWORK_COLUMNS;
use super::carts::check_purchasable;
use crate::models::order::generate_order_number;
use crate::models::{
    Artwork, NewOrderedItem, Order, OrderLine, OrderPatch, OrderQuery, OrderedItem, PageRequest,
};

const ORDER_COLUMNS: &str = "id, order_number, customer_email, status, payment_status, \
     currency, shipping_address, notes, stripe_customer_id, payment_intent_id, created_at, \
     updated_at";
const ORDERED_ITEM_COLUMNS: &str =
    "id, order_id, artwork_id, title, unit_price, quantity, created_at, updated_at";

/// Everything needed to place an order.
#[derive(Debug)]
pub struct OrderDraft<'a> {
    pub customer_email: &'a Email,
    pub currency: CurrencyCode,
    pub shipping_address: Option<&'a serde_json::Value>,
    pub notes: Option<&'a str>,
    pub lines: &'a [OrderLine],
}

/// An order with its lines, as returned by writes that create both.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderedItem>,
}

impl PlacedOrder {
    /// Artworks whose stock changed.
    #[must_use]
    pub fn artwork_ids(&self) -> Vec<ArtworkId> {
        let mut ids: Vec<ArtworkId> = self.items.iter().map(|i| i.artwork_id).collect();
        ids.dedup();
        ids
    }
}

/// Repository for orders and their lines.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders matching the filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        query: &OrderQuery,
        page: PageRequest,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        const FILTER: &str = r"
            WHERE ($1::text IS NULL OR customer_email = $1)
              AND ($2::shop.order_status IS NULL OR status = $2)
              AND ($3::shop.payment_status IS NULL OR payment_status = $3)
        ";
        let email = query.customer_email.as_ref().map(Email::as_str);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM shop.order {FILTER}"))
            .bind(email)
            .bind(query.status)
            .bind(query.payment_status)
            .fetch_one(self.pool)
            .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.order
            {FILTER}
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(email)
        .bind(query.status)
        .bind(query.payment_status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Find the order a payment intent was created for.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE payment_intent_id = $1"
        ))
        .bind(payment_intent_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Lines of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderedItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderedItem>(&format!(
            "SELECT {ORDERED_ITEM_COLUMNS} FROM shop.ordered_item WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Place an order directly from a list of lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if an artwork is missing.
    /// Returns `RepositoryError::Conflict` if there are no lines or an artwork
    /// cannot be bought in the requested quantity.
    pub async fn place(&self, draft: OrderDraft<'_>) -> Result<PlacedOrder, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let placed = place_in(&mut tx, &draft).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %placed.order.id,
            order_number = %placed.order.order_number,
            lines = placed.items.len(),
            "Order placed"
        );
        Ok(placed)
    }

    /// Convert a cart into an order and delete the cart.
    ///
    /// Prices are taken from the artworks at checkout time, not from the
    /// cart's snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart is missing.
    /// Returns `RepositoryError::Conflict` if the cart is empty or any artwork
    /// lacks stock.
    pub async fn checkout(
        &self,
        cart_id: CartId,
        shipping_address: Option<&serde_json::Value>,
        notes: Option<&str>,
    ) -> Result<PlacedOrder, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (customer_email, currency) = sqlx::query_as::<_, (Email, CurrencyCode)>(
            "SELECT customer_email, currency FROM shop.cart WHERE id = $1 FOR UPDATE",
        )
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let lines: Vec<OrderLine> = sqlx::query_as::<_, (ArtworkId, i32)>(
            "SELECT artwork_id, quantity FROM shop.cart_item WHERE cart_id = $1 ORDER BY id",
        )
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|(artwork_id, quantity)| OrderLine {
            artwork_id,
            quantity,
        })
        .collect();

        if lines.is_empty() {
            return Err(RepositoryError::Conflict("cart is empty".to_owned()));
        }

        let draft = OrderDraft {
            customer_email: &customer_email,
            currency,
            shipping_address,
            notes,
            lines: &lines,
        };
        let placed = place_in(&mut tx, &draft).await?;

        sqlx::query("DELETE FROM shop.cart WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            cart_id = %cart_id,
            order_id = %placed.order.id,
            order_number = %placed.order.order_number,
            "Cart checked out"
        );
        Ok(placed)
    }

    /// Update status, notes or shipping address.
    ///
    /// Status changes must follow the order state machine. Cancelling returns
    /// the order's editions to stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is missing.
    /// Returns `RepositoryError::Conflict` for a disallowed status change.
    pub async fn update(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = lock_order(&mut tx, id).await?;

        let next = patch.status.unwrap_or(order.status);
        if !order.status.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "cannot move order from {} to {}",
                order.status, next
            )));
        }
        if next == OrderStatus::Cancelled && order.status != OrderStatus::Cancelled {
            restock_order(&mut tx, id).await?;
        }

        let updated = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE shop.order SET
                status           = $2,
                notes            = COALESCE($3, notes),
                shipping_address = COALESCE($4, shipping_address),
                updated_at       = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(next)
        .bind(patch.notes.as_deref())
        .bind(patch.shipping_address.clone())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if updated.status != order.status {
            tracing::info!(
                order_id = %id,
                from = %order.status,
                to = %updated.status,
                "Order status changed"
            );
        }
        Ok(updated)
    }

    /// Delete a pending or cancelled order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is missing.
    /// Returns `RepositoryError::Conflict` for any other status.
    pub async fn delete(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = lock_order(&mut tx, id).await?;

        if !order.status.is_deletable() {
            return Err(RepositoryError::Conflict(format!(
                "{} orders cannot be deleted",
                order.status
            )));
        }
        // Cancelled orders were restocked when they were cancelled.
        if order.status == OrderStatus::Pending {
            restock_order(&mut tx, id).await?;
        }

        sqlx::query("DELETE FROM shop.order WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Store the gateway customer and payment intent created for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is missing.
    /// Returns `RepositoryError::Conflict` if the intent is already linked to
    /// another order.
    pub async fn attach_payment_intent(
        &self,
        id: OrderId,
        stripe_customer_id: &str,
        payment_intent_id: &str,
        payment_status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE shop.order SET
                stripe_customer_id = $2,
                payment_intent_id  = $3,
                payment_status     = $4,
                updated_at         = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(stripe_customer_id)
        .bind(payment_intent_id)
        .bind(payment_status)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_constraint(e, "payment intent belongs to another order")
        })?
        .ok_or(RepositoryError::NotFound)
    }

    /// Record a payment status reported by the gateway.
    ///
    /// A succeeded payment moves a pending order to paid and a full refund
    /// moves it to refunded. Stale reports that would undo a captured payment
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is missing.
    pub async fn record_payment_status(
        &self,
        id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = lock_order(&mut tx, id).await?;

        if order.payment_status == payment_status || !payment_status.supersedes(order.payment_status)
        {
            return Ok(order);
        }

        let status = order.status.after_payment(payment_status);
        let updated = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE shop.order SET payment_status = $2, status = $3, updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(payment_status)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %id,
            payment_status = %payment_status,
            status = %updated.status,
            "Payment status recorded"
        );
        Ok(updated)
    }

    // =========================================================================
    // Ordered items
    // =========================================================================

    /// One page of order lines, optionally for a single order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_items(
        &self,
        order_id: Option<OrderId>,
        page: PageRequest,
    ) -> Result<(Vec<OrderedItem>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.ordered_item WHERE ($1::integer IS NULL OR order_id = $1)",
        )
        .bind(order_id)
        .fetch_one(self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderedItem>(&format!(
            r"
            SELECT {ORDERED_ITEM_COLUMNS} FROM shop.ordered_item
            WHERE ($1::integer IS NULL OR order_id = $1)
            ORDER BY id
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(order_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((items, total))
    }

    /// Get an order line by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_item(
        &self,
        id: OrderedItemId,
    ) -> Result<Option<OrderedItem>, RepositoryError> {
        let item = sqlx::query_as::<_, OrderedItem>(&format!(
            "SELECT {ORDERED_ITEM_COLUMNS} FROM shop.ordered_item WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// Order a line belongs to. Read outside any transaction; callers lock
    /// the order and then re-read the line with `lock_item`.
    async fn item_order(&self, id: OrderedItemId) -> Result<OrderId, RepositoryError> {
        sqlx::query_scalar::<_, OrderId>("SELECT order_id FROM shop.ordered_item WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Add a line to a pending order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order or artwork is missing.
    /// Returns `RepositoryError::Conflict` if the order is no longer pending or
    /// the artwork cannot be bought.
    pub async fn add_item(&self, input: &NewOrderedItem) -> Result<OrderedItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = lock_pending_order(&mut tx, input.order_id).await?;

        let artwork = lock_artworks(&mut tx, &[input.artwork_id])
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)?;
        check_purchasable(&artwork, order.currency, input.quantity)?;

        adjust_stock(&mut tx, input.artwork_id, -input.quantity).await?;
        let item = insert_item(&mut tx, order.id, &artwork, input.quantity).await?;
        touch_order(&mut tx, order.id).await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Change the quantity of a line on a pending order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is missing.
    /// Returns `RepositoryError::Conflict` if the order is no longer pending or
    /// the extra editions are not in stock.
    pub async fn update_item(
        &self,
        id: OrderedItemId,
        quantity: i32,
    ) -> Result<OrderedItem, RepositoryError> {
        let order_id = self.item_order(id).await?;

        let mut tx = self.pool.begin().await?;
        lock_pending_order(&mut tx, order_id).await?;
        let item = lock_item(&mut tx, id).await?;

        let delta = quantity - item.quantity;
        if delta > 0 {
            let artwork = lock_artworks(&mut tx, &[item.artwork_id])
                .await?
                .into_iter()
                .next()
                .ok_or(RepositoryError::NotFound)?;
            if delta > artwork.stock {
                return Err(RepositoryError::Conflict(format!(
                    "only {} more available",
                    artwork.stock
                )));
            }
        }
        adjust_stock(&mut tx, item.artwork_id, -delta).await?;

        let updated = sqlx::query_as::<_, OrderedItem>(&format!(
            r"
            UPDATE shop.ordered_item SET quantity = $2, updated_at = now()
            WHERE id = $1
            RETURNING {ORDERED_ITEM_COLUMNS}
            "
        ))
        .bind(id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;
        touch_order(&mut tx, item.order_id).await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Remove a line from a pending order and return its editions to stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is missing.
    /// Returns `RepositoryError::Conflict` if the order is no longer pending.
    pub async fn delete_item(&self, id: OrderedItemId) -> Result<OrderedItem, RepositoryError> {
        let order_id = self.item_order(id).await?;

        let mut tx = self.pool.begin().await?;
        lock_pending_order(&mut tx, order_id).await?;
        let item = lock_item(&mut tx, id).await?;

        sqlx::query("DELETE FROM shop.ordered_item WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        adjust_stock(&mut tx, item.artwork_id, item.quantity).await?;
        touch_order(&mut tx, item.order_id).await?;

        tx.commit().await?;
        Ok(item)
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

/// Merge repeated artworks and sort by id so row locks are always taken in
/// the same order.
fn merge_lines(lines: &[OrderLine]) -> Vec<OrderLine> {
    let mut merged: BTreeMap<i32, i32> = BTreeMap::new();
    for line in lines {
        let quantity = merged.entry(line.artwork_id.as_i32()).or_insert(0);
        *quantity = quantity.saturating_add(line.quantity);
    }
    merged
        .into_iter()
        .map(|(id, quantity)| OrderLine {
            artwork_id: ArtworkId::new(id),
            quantity,
        })
        .collect()
}

async fn place_in(
    conn: &mut PgConnection,
    draft: &OrderDraft<'_>,
) -> Result<PlacedOrder, RepositoryError> {
    let lines = merge_lines(draft.lines);
    if lines.is_empty() {
        return Err(RepositoryError::Conflict("order has no items".to_owned()));
    }

    let ids: Vec<ArtworkId> = lines.iter().map(|l| l.artwork_id).collect();
    let artworks = lock_artworks(conn, &ids).await?;

    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        let artwork = artworks
            .iter()
            .find(|a| a.id == line.artwork_id)
            .ok_or(RepositoryError::NotFound)?;
        check_purchasable(artwork, draft.currency, line.quantity)?;
        priced.push((artwork, line.quantity));
    }

    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        INSERT INTO shop.order (order_number, customer_email, currency, shipping_address, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(generate_order_number(chrono::Utc::now().date_naive()))
    .bind(draft.customer_email.as_str())
    .bind(draft.currency)
    .bind(draft.shipping_address.cloned())
    .bind(draft.notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_constraint(e, "order number collision, please retry"))?;

    let mut items = Vec::with_capacity(priced.len());
    for (artwork, quantity) in priced {
        adjust_stock(conn, artwork.id, -quantity).await?;
        items.push(insert_item(conn, order.id, artwork, quantity).await?);
    }

    Ok(PlacedOrder { order, items })
}

async fn lock_artworks(
    conn: &mut PgConnection,
    ids: &[ArtworkId],
) -> Result<Vec<Artwork>, RepositoryError> {
    let raw: Vec<i32> = ids.iter().map(ArtworkId::as_i32).collect();
    let artworks = sqlx::query_as::<_, Artwork>(&format!(
        "SELECT {ARTWORK_COLUMNS} FROM shop.artwork WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(raw)
    .fetch_all(&mut *conn)
    .await?;

    Ok(artworks)
}

async fn adjust_stock(
    conn: &mut PgConnection,
    artwork_id: ArtworkId,
    delta: i32,
) -> Result<(), RepositoryError> {
    if delta == 0 {
        return Ok(());
    }
    sqlx::query("UPDATE shop.artwork SET stock = stock + $2, updated_at = now() WHERE id = $1")
        .bind(artwork_id)
        .bind(delta)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "insufficient stock"))?;
    Ok(())
}

async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    artwork: &Artwork,
    quantity: i32,
) -> Result<OrderedItem, RepositoryError> {
    let item = sqlx::query_as::<_, OrderedItem>(&format!(
        r"
        INSERT INTO shop.ordered_item (order_id, artwork_id, title, unit_price, quantity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ORDERED_ITEM_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(artwork.id)
    .bind(&artwork.title)
    .bind(artwork.price)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;

    Ok(item)
}

/// Return every edition on an order to stock.
async fn restock_order(conn: &mut PgConnection, order_id: OrderId) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE shop.artwork AS a
        SET stock = a.stock + oi.quantity, updated_at = now()
        FROM (
            SELECT artwork_id, SUM(quantity)::integer AS quantity
            FROM shop.ordered_item
            WHERE order_id = $1
            GROUP BY artwork_id
        ) AS oi
        WHERE a.id = oi.artwork_id
        ",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn lock_order(conn: &mut PgConnection, id: OrderId) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Lock an order line. Taken after the order lock, so a line removed by a
/// concurrent request reads as missing here.
async fn lock_item(
    conn: &mut PgConnection,
    id: OrderedItemId,
) -> Result<OrderedItem, RepositoryError> {
    sqlx::query_as::<_, OrderedItem>(&format!(
        "SELECT {ORDERED_ITEM_COLUMNS} FROM shop.ordered_item WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

async fn lock_pending_order(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Order, RepositoryError> {
    let order = lock_order(conn, id).await?;
    if order.status != OrderStatus::Pending {
        return Err(RepositoryError::Conflict(format!(
            "order {} is {}; lines can only change while pending",
            order.order_number, order.status
        )));
    }
    Ok(order)
}

async fn touch_order(conn: &mut PgConnection, id: OrderId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.order SET updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, quantity: i32) -> OrderLine {
        OrderLine {
            artwork_id: ArtworkId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_merge_lines_sums_and_sorts() {
        let merged = merge_lines(&[line(9, 1), line(3, 2), line(9, 2)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].artwork_id, ArtworkId::new(3));
        assert_eq!(merged[0].quantity, 2);
        assert_eq!(merged[1].artwork_id, ArtworkId::new(9));
        assert_eq!(merged[1].quantity, 3);
    }

    #[test]
    fn test_merge_lines_empty() {
        assert!(merge_lines(&[]).is_empty());
    }
}
