//! Artwork repository.
//!
//! Lists are built with `sqlx::QueryBuilder` so optional filters bind as
//! parameters; sort clauses come from a fixed set in [`ArtworkSort`].
//!
//! [`ArtworkSort`]: crate::models::ArtworkSort

use atelier_core::{ArtworkId, CurrencyCode};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::RepositoryError;
use crate::models::{Artwork, ArtworkPatch, ArtworkQuery, NewArtwork, PageRequest};

pub(crate) const ARTWORK_COLUMNS: &str = "id, title, slug, artist_name, description, medium, \
     year, width_cm, height_cm, depth_cm, price, currency, stock, image_url, published_at, \
     created_at, updated_at";

/// Upsert result; `xmax = 0` only holds for freshly inserted tuples.
#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    artwork: Artwork,
    inserted: bool,
}

/// Repository for artwork database operations.
pub struct ArtworkRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ArtworkRepository<'a> {
    /// Create a new artwork repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of artworks matching `query`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        query: &ArtworkQuery,
        page: PageRequest,
    ) -> Result<(Vec<Artwork>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.artwork");
        push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {ARTWORK_COLUMNS} FROM shop.artwork"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY ")
            .push(query.sort.order_by())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let artworks = select
            .build_query_as::<Artwork>()
            .fetch_all(self.pool)
            .await?;

        Ok((artworks, total))
    }

    /// Get an artwork by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ArtworkId) -> Result<Option<Artwork>, RepositoryError> {
        let artwork = sqlx::query_as::<_, Artwork>(&format!(
            "SELECT {ARTWORK_COLUMNS} FROM shop.artwork WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(artwork)
    }

    /// Get an artwork by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Artwork>, RepositoryError> {
        let artwork = sqlx::query_as::<_, Artwork>(&format!(
            "SELECT {ARTWORK_COLUMNS} FROM shop.artwork WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(artwork)
    }

    /// Insert a new artwork. `currency` applies when the input names none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        input: &NewArtwork,
        currency: CurrencyCode,
    ) -> Result<Artwork, RepositoryError> {
        sqlx::query_as::<_, Artwork>(&format!(
            r"
            INSERT INTO shop.artwork
                (title, slug, artist_name, description, medium, year,
                 width_cm, height_cm, depth_cm, price, currency, stock, image_url,
                 published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    CASE WHEN $14 THEN now() END)
            RETURNING {ARTWORK_COLUMNS}
            "
        ))
        .bind(input.title.trim())
        .bind(&input.slug)
        .bind(input.artist_name.trim())
        .bind(&input.description)
        .bind(&input.medium)
        .bind(input.year)
        .bind(input.width_cm)
        .bind(input.height_cm)
        .bind(input.depth_cm)
        .bind(input.price)
        .bind(input.currency.unwrap_or(currency))
        .bind(input.stock)
        .bind(&input.image_url)
        .bind(input.published)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "slug already exists"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no artwork has this ID.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ArtworkId,
        patch: &ArtworkPatch,
    ) -> Result<Artwork, RepositoryError> {
        sqlx::query_as::<_, Artwork>(&format!(
            r"
            UPDATE shop.artwork SET
                title        = COALESCE($2, title),
                slug         = COALESCE($3, slug),
                artist_name  = COALESCE($4, artist_name),
                description  = COALESCE($5, description),
                medium       = COALESCE($6, medium),
                year         = COALESCE($7, year),
                width_cm     = COALESCE($8, width_cm),
                height_cm    = COALESCE($9, height_cm),
                depth_cm     = COALESCE($10, depth_cm),
                price        = COALESCE($11, price),
                stock        = COALESCE($12, stock),
                image_url    = COALESCE($13, image_url),
                published_at = CASE
                    WHEN $14::boolean IS NULL THEN published_at
                    WHEN $14 THEN COALESCE(published_at, now())
                    ELSE NULL
                END,
                updated_at   = now()
            WHERE id = $1
            RETURNING {ARTWORK_COLUMNS}
            "
        ))
        .bind(id)
        .bind(patch.title.as_deref().map(str::trim))
        .bind(&patch.slug)
        .bind(patch.artist_name.as_deref().map(str::trim))
        .bind(&patch.description)
        .bind(&patch.medium)
        .bind(patch.year)
        .bind(patch.width_cm)
        .bind(patch.height_cm)
        .bind(patch.depth_cm)
        .bind(patch.price)
        .bind(patch.stock)
        .bind(&patch.image_url)
        .bind(patch.published)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Insert an artwork, or overwrite the one that already has its slug.
    /// Returns the row and whether it was newly inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn upsert_by_slug(
        &self,
        input: &NewArtwork,
        currency: CurrencyCode,
    ) -> Result<(Artwork, bool), RepositoryError> {
        let row = sqlx::query_as::<_, UpsertRow>(&format!(
            r"
            INSERT INTO shop.artwork AS artwork
                (title, slug, artist_name, description, medium, year,
                 width_cm, height_cm, depth_cm, price, currency, stock, image_url,
                 published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    CASE WHEN $14 THEN now() END)
            ON CONFLICT (slug) DO UPDATE SET
                title        = EXCLUDED.title,
                artist_name  = EXCLUDED.artist_name,
                description  = EXCLUDED.description,
                medium       = EXCLUDED.medium,
                year         = EXCLUDED.year,
                width_cm     = EXCLUDED.width_cm,
                height_cm    = EXCLUDED.height_cm,
                depth_cm     = EXCLUDED.depth_cm,
                price        = EXCLUDED.price,
                currency     = EXCLUDED.currency,
                stock        = EXCLUDED.stock,
                image_url    = EXCLUDED.image_url,
                published_at = CASE
                    WHEN $14 THEN COALESCE(artwork.published_at, now())
                    ELSE NULL
                END,
                updated_at   = now()
            RETURNING {ARTWORK_COLUMNS}, (xmax = 0) AS inserted
            "
        ))
        .bind(input.title.trim())
        .bind(&input.slug)
        .bind(input.artist_name.trim())
        .bind(&input.description)
        .bind(&input.medium)
        .bind(input.year)
        .bind(input.width_cm)
        .bind(input.height_cm)
        .bind(input.depth_cm)
        .bind(input.price)
        .bind(input.currency.unwrap_or(currency))
        .bind(input.stock)
        .bind(&input.image_url)
        .bind(input.published)
        .fetch_one(self.pool)
        .await?;
        Ok((row.artwork, row.inserted))
    }

    /// Delete artworks whose slug is not in `keep` and that no order
    /// references. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_except_slugs(&self, keep: &[String]) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.artwork a
            WHERE a.slug <> ALL($1)
              AND NOT EXISTS (
                  SELECT 1 FROM shop.ordered_item oi WHERE oi.artwork_id = a.id
              )
            ",
        )
        .bind(keep)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete an artwork, returning the removed row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no artwork has this ID.
    /// Returns `RepositoryError::Conflict` if an order references it.
    pub async fn delete(&self, id: ArtworkId) -> Result<Artwork, RepositoryError> {
        sqlx::query_as::<_, Artwork>(&format!(
            "DELETE FROM shop.artwork WHERE id = $1 RETURNING {ARTWORK_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "artwork is referenced by an order"))?
        .ok_or(RepositoryError::NotFound)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ArtworkQuery) {
    builder.push(" WHERE ");
    if query.published.unwrap_or(true) {
        builder.push("published_at IS NOT NULL");
    } else {
        builder.push("published_at IS NULL");
    }

    if let Some(artist) = query.artist.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder
            .push(" AND lower(artist_name) = lower(")
            .push_bind(artist.to_owned())
            .push(")");
    }

    if let Some(q) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(q);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR artist_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    match query.available {
        Some(true) => {
            builder.push(" AND stock > 0");
        }
        Some(false) => {
            builder.push(" AND stock = 0");
        }
        None => {}
    }

    if let Some(min) = query.min_price {
        builder.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        builder.push(" AND price <= ").push_bind(max);
    }
}

/// `%term%` with `LIKE` wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtworkSort;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("blue"), "%blue%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }

    #[test]
    fn test_filters_default_to_published() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM shop.artwork");
        push_filters(&mut builder, &ArtworkQuery::default());
        assert_eq!(
            builder.sql(),
            "SELECT 1 FROM shop.artwork WHERE published_at IS NOT NULL"
        );
    }

    #[test]
    fn test_filters_bind_user_input() {
        let query = ArtworkQuery {
            artist: Some("Ines Ferreira".to_string()),
            q: Some("noct".to_string()),
            available: Some(true),
            min_price: Some(100.into()),
            published: Some(false),
            sort: ArtworkSort::Title,
            ..ArtworkQuery::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM shop.artwork");
        push_filters(&mut builder, &query);
        let sql = builder.sql();

        assert!(sql.contains("published_at IS NULL"));
        assert!(sql.contains("lower(artist_name) = lower($1)"));
        assert!(sql.contains("title ILIKE $2 OR artist_name ILIKE $3"));
        assert!(sql.contains("stock > 0"));
        assert!(sql.contains("price >= $4"));
        assert!(!sql.contains("Ines"));
    }
}
