//! Artwork route handlers.
//!
//! Drafts (artworks without `published_at`) are only visible to requests
//! carrying the API token.

use atelier_core::ArtworkId;
use axum::{extract::State, http::HeaderMap, http::StatusCode};
use tracing::instrument;

use crate::db::ArtworkRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{RequireApiToken, has_api_token};
use crate::models::{
    Artwork, ArtworkPatch, ArtworkQuery, ArtworkView, DataBody, Envelope, NewArtwork, PageRequest,
};
use crate::state::AppState;

/// `GET /api/artworks`
#[instrument(skip(state, headers))]
pub async fn find(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ArtworkQuery>,
) -> Result<Envelope<Vec<ArtworkView>>> {
    if query.published == Some(false) && !has_api_token(&headers, &state) {
        return Err(AppError::Unauthorized(
            "Listing drafts requires the API token".to_string(),
        ));
    }

    let page = PageRequest::new(query.page, query.page_size);
    let (artworks, total) = ArtworkRepository::new(state.pool())
        .list(&query, page)
        .await?;

    Ok(Envelope::page(
        artworks.into_iter().map(ArtworkView::from).collect(),
        page,
        total,
    ))
}

/// `GET /api/artworks/{id}`
#[instrument(skip(state, headers))]
pub async fn find_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<ArtworkId>,
) -> Result<Envelope<ArtworkView>> {
    let artwork = state.cache().get_by_id(state.pool(), id).await?;
    visible(artwork, &headers, &state).map(|a| Envelope::single(a.into()))
}

/// `GET /api/artworks/slug/{slug}`
#[instrument(skip(state, headers))]
pub async fn find_by_slug(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiPath(slug): ApiPath<String>,
) -> Result<Envelope<ArtworkView>> {
    let artwork = state.cache().get_by_slug(state.pool(), &slug).await?;
    visible(artwork, &headers, &state).map(|a| Envelope::single(a.into()))
}

/// `POST /api/artworks`
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiJson(input): ApiJson<DataBody<NewArtwork>>,
) -> Result<(StatusCode, Envelope<ArtworkView>)> {
    let input = input.data;
    input.validate()?;

    let currency = input.currency.unwrap_or(state.config().currency);
    let artwork = ArtworkRepository::new(state.pool())
        .create(&input, currency)
        .await?;

    tracing::info!(artwork_id = %artwork.id, slug = %artwork.slug, "Artwork created");
    Ok((StatusCode::CREATED, Envelope::single(artwork.into())))
}

/// `PUT /api/artworks/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiPath(id): ApiPath<ArtworkId>,
    ApiJson(patch): ApiJson<DataBody<ArtworkPatch>>,
) -> Result<Envelope<ArtworkView>> {
    let patch = patch.data;
    patch.validate()?;

    let artwork = ArtworkRepository::new(state.pool())
        .update(id, &patch)
        .await?;
    state.cache().invalidate(&artwork).await;

    Ok(Envelope::single(artwork.into()))
}

/// `DELETE /api/artworks/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiPath(id): ApiPath<ArtworkId>,
) -> Result<Envelope<ArtworkView>> {
    let artwork = ArtworkRepository::new(state.pool()).delete(id).await?;
    state.cache().invalidate(&artwork).await;

    tracing::info!(artwork_id = %artwork.id, "Artwork deleted");
    Ok(Envelope::single(artwork.into()))
}

/// Hide drafts from requests without the API token.
fn visible(artwork: Option<Artwork>, headers: &HeaderMap, state: &AppState) -> Result<Artwork> {
    match artwork {
        Some(artwork) if artwork.is_published() || has_api_token(headers, state) => Ok(artwork),
        _ => Err(AppError::NotFound("Artwork".to_string())),
    }
}
