//! Artwork records, inputs and the response view.

use atelier_core::{
    ArtworkId, CurrencyCode, Dimensions, PriceTier, validate_slug,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// An artwork as stored in `shop.artwork`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Artwork {
    pub id: ArtworkId,
    pub title: String,
    pub slug: String,
    pub artist_name: String,
    pub description: Option<String>,
    pub medium: Option<String>,
    pub year: Option<i32>,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
    pub depth_cm: Option<Decimal>,
    pub price: Decimal,
    pub currency: CurrencyCode,
    /// Editions still available.
    pub stock: i32,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artwork {
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.stock > 0
    }

    /// Stored dimensions. The schema guarantees positive sides.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width_cm: self.width_cm,
            height_cm: self.height_cm,
            depth_cm: self.depth_cm,
        }
    }

    #[must_use]
    pub fn price_tier(&self) -> PriceTier {
        PriceTier::for_amount(self.price)
    }
}

/// Artwork as returned by the API: the record plus derived labels.
#[derive(Debug, Serialize)]
pub struct ArtworkView {
    #[serde(flatten)]
    pub artwork: Artwork,
    pub dimensions: String,
    pub price_tier: PriceTier,
}

impl From<Artwork> for ArtworkView {
    fn from(artwork: Artwork) -> Self {
        Self {
            dimensions: artwork.dimensions().label(),
            price_tier: artwork.price_tier(),
            artwork,
        }
    }
}

/// Sort orders for artwork listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtworkSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Title,
}

impl ArtworkSort {
    /// `ORDER BY` clause. Values are fixed strings, never user input.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::PriceAsc => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id DESC",
            Self::Title => "title ASC, id ASC",
        }
    }
}

/// Query parameters for `GET /api/artworks`.
#[derive(Debug, Default, Deserialize)]
pub struct ArtworkQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Exact artist name, case-insensitive.
    pub artist: Option<String>,
    /// Substring search over title and artist.
    pub q: Option<String>,
    /// `true` keeps only works with stock left.
    pub available: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Defaults to `true`; `false` lists drafts only.
    pub published: Option<bool>,
    #[serde(default)]
    pub sort: ArtworkSort,
}

/// Body of `POST /api/artworks`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewArtwork {
    pub title: String,
    pub slug: String,
    pub artist_name: String,
    pub description: Option<String>,
    pub medium: Option<String>,
    pub year: Option<i32>,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
    pub depth_cm: Option<Decimal>,
    pub price: Decimal,
    pub currency: Option<CurrencyCode>,
    #[serde(default = "default_stock")]
    pub stock: i32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

const fn default_stock() -> i32 {
    1
}

impl NewArtwork {
    /// Check field-level rules before hitting the database.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title)?;
        require_text("artist_name", &self.artist_name)?;
        validate_slug(&self.slug).map_err(|e| AppError::BadRequest(e.to_string()))?;
        Dimensions::new(self.width_cm, self.height_cm, self.depth_cm)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        require_non_negative_price(self.price)?;
        require_non_negative_stock(self.stock)?;
        Ok(())
    }
}

/// Body of `PUT /api/artworks/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtworkPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub artist_name: Option<String>,
    pub description: Option<String>,
    pub medium: Option<String>,
    pub year: Option<i32>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub depth_cm: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    /// `true` publishes (keeping an earlier publish date), `false` unpublishes.
    pub published: Option<bool>,
}

impl ArtworkPatch {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(artist) = &self.artist_name {
            require_text("artist_name", artist)?;
        }
        if let Some(slug) = &self.slug {
            validate_slug(slug).map_err(|e| AppError::BadRequest(e.to_string()))?;
        }
        for (side, value) in [
            ("width_cm", self.width_cm),
            ("height_cm", self.height_cm),
            ("depth_cm", self.depth_cm),
        ] {
            if let Some(value) = value
                && value <= Decimal::ZERO
            {
                return Err(AppError::BadRequest(format!(
                    "{side} must be greater than zero"
                )));
            }
        }
        if let Some(price) = self.price {
            require_non_negative_price(price)?;
        }
        if let Some(stock) = self.stock {
            require_non_negative_stock(stock)?;
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

fn require_non_negative_price(price: Decimal) -> Result<(), AppError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::BadRequest("price cannot be negative".to_string()));
    }
    Ok(())
}

fn require_non_negative_stock(stock: i32) -> Result<(), AppError> {
    if stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".to_string()));
    }
    Ok(())
}
