//! In-process artwork cache.
//!
//! Single-artwork reads (`findOne`, `findBySlug`) go through here. Entries
//! expire after the configured TTL and are evicted explicitly whenever an
//! artwork is updated, deleted, or its stock changes at checkout.

use std::time::Instant;

use atelier_core::ArtworkId;
use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::config::CacheConfig;
use crate::db::{ArtworkRepository, RepositoryError};
use crate::models::Artwork;

/// Slug key written and removed by the health probe.
const PROBE_SLUG: &str = "__health_probe__";

/// Artworks by id, plus a slug index pointing at ids.
#[derive(Clone)]
pub struct ArtworkCache {
    artworks: Cache<ArtworkId, Artwork>,
    slugs: Cache<String, ArtworkId>,
}

impl ArtworkCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            artworks: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(config.ttl)
                .build(),
            slugs: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(config.ttl)
                .build(),
        }
    }

    /// Get an artwork by id, loading it from the database on a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the load fails.
    pub async fn get_by_id(
        &self,
        pool: &PgPool,
        id: ArtworkId,
    ) -> Result<Option<Artwork>, RepositoryError> {
        if let Some(artwork) = self.artworks.get(&id).await {
            debug!(artwork_id = %id, "Artwork cache hit");
            return Ok(Some(artwork));
        }

        let artwork = ArtworkRepository::new(pool).get_by_id(id).await?;
        if let Some(artwork) = &artwork {
            self.insert(artwork).await;
        }
        Ok(artwork)
    }

    /// Get an artwork by slug, loading it from the database on a miss.
    ///
    /// A slug entry only counts as a hit if the cached artwork still carries
    /// that slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the load fails.
    pub async fn get_by_slug(
        &self,
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<Artwork>, RepositoryError> {
        if let Some(id) = self.slugs.get(slug).await
            && let Some(artwork) = self.artworks.get(&id).await
            && artwork.slug == slug
        {
            debug!(slug, "Artwork cache hit");
            return Ok(Some(artwork));
        }

        let artwork = ArtworkRepository::new(pool).get_by_slug(slug).await?;
        if let Some(artwork) = &artwork {
            self.insert(artwork).await;
        }
        Ok(artwork)
    }

    async fn insert(&self, artwork: &Artwork) {
        self.slugs.insert(artwork.slug.clone(), artwork.id).await;
        self.artworks.insert(artwork.id, artwork.clone()).await;
    }

    /// Drop a cached artwork and its slug entry.
    pub async fn invalidate(&self, artwork: &Artwork) {
        self.artworks.invalidate(&artwork.id).await;
        self.slugs.invalidate(&artwork.slug).await;
    }

    /// Drop cached artworks by id. Slug entries pointing at them then miss.
    pub async fn invalidate_ids(&self, ids: &[ArtworkId]) {
        for id in ids {
            self.artworks.invalidate(id).await;
        }
        debug!(count = ids.len(), "Evicted artworks from cache");
    }

    /// Write, read back and remove a sentinel entry. Returns the round-trip
    /// time, or `None` if the value did not read back.
    pub async fn probe(&self) -> Option<std::time::Duration> {
        let started = Instant::now();
        let key = PROBE_SLUG.to_string();
        self.slugs.insert(key.clone(), ArtworkId::new(0)).await;
        let read_back = self.slugs.get(&key).await;
        self.slugs.invalidate(&key).await;
        (read_back == Some(ArtworkId::new(0))).then(|| started.elapsed())
    }

    /// Number of cached artworks (approximate until pending tasks run).
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.artworks.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::artwork::tests::sample_artwork;

    fn cache() -> ArtworkCache {
        ArtworkCache::new(CacheConfig {
            ttl: Duration::from_secs(60),
            max_entries: 10,
        })
    }

    #[tokio::test]
    async fn test_insert_and_invalidate() {
        let cache = cache();
        let artwork = sample_artwork();
        cache.insert(&artwork).await;
        assert_eq!(cache.artworks.get(&artwork.id).await, Some(artwork.clone()));
        assert_eq!(cache.slugs.get(&artwork.slug).await, Some(artwork.id));

        cache.invalidate(&artwork).await;
        assert_eq!(cache.artworks.get(&artwork.id).await, None);
        assert_eq!(cache.slugs.get(&artwork.slug).await, None);
    }

    #[tokio::test]
    async fn test_invalidate_ids() {
        let cache = cache();
        let artwork = sample_artwork();
        cache.insert(&artwork).await;
        cache.invalidate_ids(&[artwork.id]).await;
        assert_eq!(cache.artworks.get(&artwork.id).await, None);
    }

    #[tokio::test]
    async fn test_probe_round_trip() {
        let cache = cache();
        assert!(cache.probe().await.is_some());
        assert_eq!(cache.slugs.get(PROBE_SLUG).await, None);
    }
}
