//! Wishlist route handlers.

use atelier_core::{ArtworkId, WishlistId};
use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use crate::db::WishlistRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    DataBody, Envelope, NewWishlist, PageRequest, Wishlist, WishlistArtwork, WishlistPatch,
    WishlistQuery, WishlistView,
};
use crate::state::AppState;

/// Longest accepted wishlist name.
const MAX_NAME_LENGTH: usize = 120;

/// `GET /api/wishlists`
#[instrument(skip(state))]
pub async fn find(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WishlistQuery>,
) -> Result<Envelope<Vec<Wishlist>>> {
    let page = PageRequest::new(query.page, query.page_size);
    let (wishlists, total) = WishlistRepository::new(state.pool())
        .list(query.customer_email.as_ref(), page)
        .await?;
    Ok(Envelope::page(wishlists, page, total))
}

/// `GET /api/wishlists/{id}`
#[instrument(skip(state))]
pub async fn find_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<WishlistId>,
) -> Result<Envelope<WishlistView>> {
    view(&state, id).await.map(Envelope::single)
}

/// `POST /api/wishlists`
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DataBody<NewWishlist>>,
) -> Result<(StatusCode, Envelope<WishlistView>)> {
    let input = input.data;
    validate_name(&input.name)?;

    let wishlist = WishlistRepository::new(state.pool()).create(&input).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::single(WishlistView {
            wishlist,
            artwork_ids: Vec::new(),
        }),
    ))
}

/// `PUT /api/wishlists/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<WishlistId>,
    ApiJson(patch): ApiJson<DataBody<WishlistPatch>>,
) -> Result<Envelope<WishlistView>> {
    let name = patch.data.name;
    if let Some(name) = &name {
        validate_name(name)?;
    }

    WishlistRepository::new(state.pool())
        .update(id, name.as_deref())
        .await?;
    view(&state, id).await.map(Envelope::single)
}

/// `DELETE /api/wishlists/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<WishlistId>,
) -> Result<Envelope<Wishlist>> {
    let wishlist = WishlistRepository::new(state.pool()).delete(id).await?;
    Ok(Envelope::single(wishlist))
}

/// `POST /api/wishlists/{id}/artworks`
///
/// Adding an artwork that is already saved leaves the wishlist unchanged.
#[instrument(skip(state, input))]
pub async fn add_artwork(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<WishlistId>,
    ApiJson(input): ApiJson<DataBody<WishlistArtwork>>,
) -> Result<Envelope<WishlistView>> {
    let added = WishlistRepository::new(state.pool())
        .add_artwork(id, input.data.artwork_id)
        .await?;
    tracing::debug!(wishlist_id = %id, artwork_id = %input.data.artwork_id, added, "Wishlist add");
    view(&state, id).await.map(Envelope::single)
}

/// `DELETE /api/wishlists/{id}/artworks/{artwork_id}`
#[instrument(skip(state))]
pub async fn remove_artwork(
    State(state): State<AppState>,
    ApiPath((id, artwork_id)): ApiPath<(WishlistId, ArtworkId)>,
) -> Result<Envelope<WishlistView>> {
    WishlistRepository::new(state.pool())
        .remove_artwork(id, artwork_id)
        .await?;
    view(&state, id).await.map(Envelope::single)
}

async fn view(state: &AppState, id: WishlistId) -> Result<WishlistView> {
    let repo = WishlistRepository::new(state.pool());
    let wishlist = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Wishlist".to_string()))?;
    let artwork_ids = repo.artwork_ids(id).await?;
    Ok(WishlistView {
        wishlist,
        artwork_ids,
    })
}

fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Living room").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }
}
