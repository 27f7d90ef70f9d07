//! Seed the catalogue from a YAML file.
//!
//! ```yaml
//! currency: eur          # optional, default for entries without one
//! artworks:
//!   - title: Nocturne in Ochre
//!     slug: nocturne-in-ochre
//!     artist_name: Ines Ferreira
//!     width_cm: 60
//!     height_cm: 80
//!     price: "1200.00"
//!     stock: 1
//!     published: true
//! ```
//!
//! The whole file is validated before the database is touched. Entries are
//! upserted by slug.

use std::collections::HashSet;
use std::path::Path;

use atelier_api::db::{self, ArtworkRepository};
use atelier_api::models::NewArtwork;
use atelier_core::CurrencyCode;
use serde::Deserialize;
use tracing::{error, info};

/// A YAML catalogue.
#[derive(Debug, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    pub artworks: Vec<NewArtwork>,
}

/// Every validation problem in the catalogue, prefixed with the entry's
/// position and slug.
#[must_use]
pub fn validate_catalogue(catalogue: &Catalogue) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    if catalogue.artworks.is_empty() {
        errors.push("catalogue has no artworks".to_string());
    }

    for (index, artwork) in catalogue.artworks.iter().enumerate() {
        let label = format!("#{} ({})", index + 1, artwork.slug);
        if let Err(e) = artwork.validate() {
            errors.push(format!("{label}: {e}"));
        }
        if !seen.insert(artwork.slug.as_str()) {
            errors.push(format!("{label}: duplicate slug"));
        }
    }

    errors
}

/// Seed artworks from a YAML catalogue.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML catalogue
/// * `replace` - If true, delete artworks missing from the file that no order
///   references
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or fails validation, or a database operation fails.
pub async fn artworks(file_path: &str, replace: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading artwork catalogue");

    let content = tokio::fs::read_to_string(path).await?;
    let catalogue: Catalogue = serde_yaml::from_str(&content)?;

    info!(artworks = catalogue.artworks.len(), "Parsed catalogue");

    let errors = validate_catalogue(&catalogue);
    if !errors.is_empty() {
        error!("Catalogue validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let repo = ArtworkRepository::new(&pool);
    let currency = catalogue.currency.unwrap_or_default();
    let mut inserted = 0_usize;
    let mut updated = 0_usize;

    for artwork in &catalogue.artworks {
        let (_, created) = repo.upsert_by_slug(artwork, currency).await?;
        if created {
            inserted += 1;
        } else {
            updated += 1;
        }
    }

    let removed = if replace {
        let keep: Vec<String> = catalogue.artworks.iter().map(|a| a.slug.clone()).collect();
        repo.delete_except_slugs(&keep).await?
    } else {
        0
    };

    info!("Seeding complete!");
    info!("  Artworks inserted: {inserted}");
    info!("  Artworks updated: {updated}");
    if replace {
        info!("  Artworks removed: {removed}");
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CATALOGUE: &str = r#"
currency: eur
artworks:
  - title: Nocturne in Ochre
    slug: nocturne-in-ochre
    artist_name: Ines Ferreira
    width_cm: 60
    height_cm: 80
    price: "1200.00"
    published: true
  - title: Salt Study IV
    slug: salt-study-iv
    artist_name: Tomasz Wrona
    medium: Gouache on paper
    width_cm: "29.7"
    height_cm: "42"
    price: "340"
    stock: 3
"#;

    #[test]
    fn test_parse_catalogue() {
        let catalogue: Catalogue = serde_yaml::from_str(CATALOGUE).unwrap();
        assert_eq!(catalogue.currency, Some(CurrencyCode::EUR));
        assert_eq!(catalogue.artworks.len(), 2);
        assert_eq!(catalogue.artworks[0].stock, 1);
        assert!(catalogue.artworks[0].published);
        assert_eq!(catalogue.artworks[1].stock, 3);
        assert!(!catalogue.artworks[1].published);
        assert!(validate_catalogue(&catalogue).is_empty());
    }

    #[test]
    fn test_validation_reports_every_entry() {
        let mut catalogue: Catalogue = serde_yaml::from_str(CATALOGUE).unwrap();
        catalogue.artworks[0].slug = "Not A Slug".to_string();
        catalogue.artworks[1].price = (-1).into();
        let mut duplicate = catalogue.artworks[1].clone();
        duplicate.price = 10.into();
        catalogue.artworks.push(duplicate);

        let errors = validate_catalogue(&catalogue);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].starts_with("#1 (Not A Slug)"));
        assert!(errors[1].starts_with("#2 (salt-study-iv)"));
        assert!(errors[2].ends_with("duplicate slug"));
    }

    #[test]
    fn test_empty_catalogue_is_rejected() {
        let catalogue: Catalogue = serde_yaml::from_str("artworks: []").unwrap();
        assert_eq!(validate_catalogue(&catalogue).len(), 1);
    }
}
