//! Wishlists: named sets of artworks saved by a customer.

use atelier_core::{ArtworkId, Email, WishlistId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Wishlist {
    pub id: WishlistId,
    pub customer_email: Email,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wishlist with its artwork ids, most recently added first.
#[derive(Debug, Serialize)]
pub struct WishlistView {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub artwork_ids: Vec<ArtworkId>,
}

#[derive(Debug, Deserialize)]
pub struct WishlistQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub customer_email: Option<Email>,
}

#[derive(Debug, Deserialize)]
pub struct NewWishlist {
    pub customer_email: Email,
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_name() -> String {
    "Wishlist".to_string()
}

#[derive(Debug, Deserialize)]
pub struct WishlistPatch {
    pub name: Option<String>,
}

/// Body of `POST /api/wishlists/{id}/artworks`.
#[derive(Debug, Deserialize)]
pub struct WishlistArtwork {
    pub artwork_id: ArtworkId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wishlist_default_name() {
        let body: NewWishlist =
            serde_json::from_str(r#"{"customer_email": "Ada@Example.com"}"#).unwrap();
        assert_eq!(body.name, "Wishlist");
        assert_eq!(body.customer_email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_view_lists_artwork_ids() {
        let now = Utc::now();
        let view = WishlistView {
            wishlist: Wishlist {
                id: WishlistId::new(1),
                customer_email: Email::parse("ada@example.com").unwrap(),
                name: "Living room".to_string(),
                created_at: now,
                updated_at: now,
            },
            artwork_ids: vec![ArtworkId::new(4), ArtworkId::new(2)],
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["name"], "Living room");
        assert_eq!(value["artwork_ids"], serde_json::json!([4, 2]));
    }
}
