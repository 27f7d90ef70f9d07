//! Cart and cart item repository.

use atelier_core::{CartId, CartItemId, CurrencyCode, Email};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{Artwork, Cart, CartItem, NewCart, NewCartItem, PageRequest};

const CART_COLUMNS: &str = "id, customer_email, currency, created_at, updated_at";
const CART_ITEM_COLUMNS: &str =
    "id, cart_id, artwork_id, quantity, unit_price, created_at, updated_at";

/// Repository for carts and their lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of carts, optionally for a single customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        customer_email: Option<&Email>,
        page: PageRequest,
    ) -> Result<(Vec<Cart>, i64), RepositoryError> {
        let email = customer_email.map(Email::as_str);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.cart WHERE ($1::text IS NULL OR customer_email = $1)",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        let carts = sqlx::query_as::<_, Cart>(&format!(
            r"
            SELECT {CART_COLUMNS} FROM shop.cart
            WHERE ($1::text IS NULL OR customer_email = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(email)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((carts, total))
    }

    /// Get a cart by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM shop.cart WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(cart)
    }

    /// Lines of a cart in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM shop.cart_item WHERE cart_id = $1 ORDER BY id"
        ))
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Create an empty cart. `currency` applies when the input names none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        input: &NewCart,
        currency: CurrencyCode,
    ) -> Result<Cart, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            r"
            INSERT INTO shop.cart (customer_email, currency)
            VALUES ($1, $2)
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(input.customer_email.as_str())
        .bind(input.currency.unwrap_or(currency))
        .fetch_one(self.pool)
        .await?;

        Ok(cart)
    }

    /// Change the email a cart belongs to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no cart has this ID.
    pub async fn update(
        &self,
        id: CartId,
        customer_email: Option<&Email>,
    ) -> Result<Cart, RepositoryError> {
        sqlx::query_as::<_, Cart>(&format!(
            r"
            UPDATE shop.cart
            SET customer_email = COALESCE($2, customer_email), updated_at = now()
            WHERE id = $1
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(id)
        .bind(customer_email.map(Email::as_str))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a cart and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no cart has this ID.
    pub async fn delete(&self, id: CartId) -> Result<Cart, RepositoryError> {
        sqlx::query_as::<_, Cart>(&format!(
            "DELETE FROM shop.cart WHERE id = $1 RETURNING {CART_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Cart items
    // =========================================================================

    /// One page of cart lines, optionally for a single cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_items(
        &self,
        cart_id: Option<CartId>,
        page: PageRequest,
    ) -> Result<(Vec<CartItem>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.cart_item WHERE ($1::integer IS NULL OR cart_id = $1)",
        )
        .bind(cart_id)
        .fetch_one(self.pool)
        .await?;

        let items = sqlx::query_as::<_, CartItem>(&format!(
            r"
            SELECT {CART_ITEM_COLUMNS} FROM shop.cart_item
            WHERE ($1::integer IS NULL OR cart_id = $1)
            ORDER BY id
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(cart_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((items, total))
    }

    /// Get a cart line by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_item(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM shop.cart_item WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// Add an artwork to a cart.
    ///
    /// Adding an artwork already in the cart increases that line's quantity
    /// and keeps its original price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart or artwork is missing.
    /// Returns `RepositoryError::Conflict` if the artwork is unpublished, out of
    /// stock, priced in another currency, or the total quantity exceeds stock.
    pub async fn add_item(&self, input: &NewCartItem) -> Result<CartItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cart = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM shop.cart WHERE id = $1 FOR UPDATE"
        ))
        .bind(input.cart_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let artwork = sqlx::query_as::<_, Artwork>(&format!(
            "SELECT {} FROM shop.artwork WHERE id = $1",
            super::artworks::ARTWORK_COLUMNS
        ))
        .bind(input.artwork_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let existing: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM shop.cart_item WHERE cart_id = $1 AND artwork_id = $2",
        )
        .bind(input.cart_id)
        .bind(input.artwork_id)
        .fetch_optional(&mut *tx)
        .await?;

        check_purchasable(
            &artwork,
            cart.currency,
            existing.unwrap_or(0).saturating_add(input.quantity),
        )?;

        let item = sqlx::query_as::<_, CartItem>(&format!(
            r"
            INSERT INTO shop.cart_item AS ci (cart_id, artwork_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, artwork_id) DO UPDATE
            SET quantity = ci.quantity + EXCLUDED.quantity,
                updated_at = now()
            RETURNING {CART_ITEM_COLUMNS}
            "
        ))
        .bind(input.cart_id)
        .bind(input.artwork_id)
        .bind(input.quantity)
        .bind(artwork.price)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE shop.cart SET updated_at = now() WHERE id = $1")
            .bind(input.cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(item)
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is missing.
    /// Returns `RepositoryError::Conflict` if the quantity exceeds stock.
    pub async fn update_item(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item = self.get_item(id).await?.ok_or(RepositoryError::NotFound)?;

        let stock: i32 = sqlx::query_scalar("SELECT stock FROM shop.artwork WHERE id = $1")
            .bind(item.artwork_id)
            .fetch_one(self.pool)
            .await?;
        if quantity > stock {
            return Err(insufficient_stock(stock));
        }

        sqlx::query_as::<_, CartItem>(&format!(
            r"
            UPDATE shop.cart_item SET quantity = $2, updated_at = now()
            WHERE id = $1
            RETURNING {CART_ITEM_COLUMNS}
            "
        ))
        .bind(id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is missing.
    pub async fn delete_item(&self, id: CartItemId) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(&format!(
            "DELETE FROM shop.cart_item WHERE id = $1 RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Rules an artwork must meet before `quantity` editions can be bought in
/// `currency`.
pub(crate) fn check_purchasable(
    artwork: &Artwork,
    currency: CurrencyCode,
    quantity: i32,
) -> Result<(), RepositoryError> {
    if !artwork.is_published() {
        return Err(RepositoryError::Conflict(format!(
            "artwork {} is not published",
            artwork.slug
        )));
    }
    if !artwork.is_available() {
        return Err(RepositoryError::Conflict(format!(
            "artwork {} is out of stock",
            artwork.slug
        )));
    }
    if artwork.currency != currency {
        return Err(RepositoryError::Conflict(format!(
            "artwork {} is priced in {}, not {}",
            artwork.slug, artwork.currency, currency
        )));
    }
    if quantity > artwork.stock {
        return Err(insufficient_stock(artwork.stock));
    }
    Ok(())
}

fn insufficient_stock(stock: i32) -> RepositoryError {
    RepositoryError::Conflict(format!("only {stock} available"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::artwork::tests::sample_artwork;

    #[test]
    fn test_purchasable_artwork() {
        let artwork = sample_artwork();
        assert!(check_purchasable(&artwork, CurrencyCode::USD, 2).is_ok());
    }

    #[test]
    fn test_unpublished_artwork_rejected() {
        let mut artwork = sample_artwork();
        artwork.published_at = None;
        let err = check_purchasable(&artwork, CurrencyCode::USD, 1).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg.contains("not published")));
    }

    #[test]
    fn test_out_of_stock_rejected() {
        let mut artwork = sample_artwork();
        artwork.stock = 0;
        let err = check_purchasable(&artwork, CurrencyCode::USD, 1).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg.contains("out of stock")));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let artwork = sample_artwork();
        let err = check_purchasable(&artwork, CurrencyCode::EUR, 1).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg.contains("priced in usd")));
    }

    #[test]
    fn test_quantity_above_stock_rejected() {
        let artwork = sample_artwork();
        let err = check_purchasable(&artwork, CurrencyCode::USD, 3).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg == "only 2 available"));
    }
}
