//! Wishlist repository.

use atelier_core::{ArtworkId, Email, WishlistId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{NewWishlist, PageRequest, Wishlist};

const WISHLIST_COLUMNS: &str = "id, customer_email, name, created_at, updated_at";

/// Repository for wishlists and their artwork membership.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of wishlists, optionally for a single customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        customer_email: Option<&Email>,
        page: PageRequest,
    ) -> Result<(Vec<Wishlist>, i64), RepositoryError> {
        let email = customer_email.map(Email::as_str);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.wishlist WHERE ($1::text IS NULL OR customer_email = $1)",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        let wishlists = sqlx::query_as::<_, Wishlist>(&format!(
            r"
            SELECT {WISHLIST_COLUMNS} FROM shop.wishlist
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

        Ok((wishlists, total))
    }

    /// Get a wishlist by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: WishlistId) -> Result<Option<Wishlist>, RepositoryError> {
        let wishlist = sqlx::query_as::<_, Wishlist>(&format!(
            "SELECT {WISHLIST_COLUMNS} FROM shop.wishlist WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(wishlist)
    }

    /// Artwork ids saved on a wishlist, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn artwork_ids(&self, id: WishlistId) -> Result<Vec<ArtworkId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, ArtworkId>(
            r"
            SELECT artwork_id FROM shop.wishlist_artwork
            WHERE wishlist_id = $1
            ORDER BY added_at DESC, artwork_id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Create an empty wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &NewWishlist) -> Result<Wishlist, RepositoryError> {
        let wishlist = sqlx::query_as::<_, Wishlist>(&format!(
            r"
            INSERT INTO shop.wishlist (customer_email, name)
            VALUES ($1, $2)
            RETURNING {WISHLIST_COLUMNS}
            "
        ))
        .bind(input.customer_email.as_str())
        .bind(input.name.trim())
        .fetch_one(self.pool)
        .await?;

        Ok(wishlist)
    }

    /// Rename a wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no wishlist has this ID.
    pub async fn update(
        &self,
        id: WishlistId,
        name: Option<&str>,
    ) -> Result<Wishlist, RepositoryError> {
        sqlx::query_as::<_, Wishlist>(&format!(
            r"
            UPDATE shop.wishlist
            SET name = COALESCE($2, name), updated_at = now()
            WHERE id = $1
            RETURNING {WISHLIST_COLUMNS}
            "
        ))
        .bind(id)
        .bind(name.map(str::trim))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no wishlist has this ID.
    pub async fn delete(&self, id: WishlistId) -> Result<Wishlist, RepositoryError> {
        sqlx::query_as::<_, Wishlist>(&format!(
            "DELETE FROM shop.wishlist WHERE id = $1 RETURNING {WISHLIST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Save an artwork on a wishlist. Saving it twice is a no-op.
    ///
    /// Returns `true` if the artwork was newly added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the wishlist or artwork is missing.
    pub async fn add_artwork(
        &self,
        id: WishlistId,
        artwork_id: ArtworkId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO shop.wishlist_artwork (wishlist_id, artwork_id)
            VALUES ($1, $2)
            ON CONFLICT (wishlist_id, artwork_id) DO NOTHING
            ",
        )
        .bind(id)
        .bind(artwork_id)
        .execute(self.pool)
        .await
        .map_err(|e| match RepositoryError::from_constraint(e, "") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;

        if result.rows_affected() > 0 {
            self.touch(id).await?;
        }
        Ok(result.rows_affected() > 0)
    }

    /// Remove an artwork from a wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the artwork was not on the list.
    pub async fn remove_artwork(
        &self,
        id: WishlistId,
        artwork_id: ArtworkId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM shop.wishlist_artwork WHERE wishlist_id = $1 AND artwork_id = $2",
        )
        .bind(id)
        .bind(artwork_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.touch(id).await
    }

    async fn touch(&self, id: WishlistId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE shop.wishlist SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
