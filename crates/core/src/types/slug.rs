//! URL slug validation.

use thiserror::Error;

/// Longest slug accepted.
pub const MAX_SLUG_LENGTH: usize = 120;

/// Reasons a slug is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug cannot be empty")]
    Empty,

    #[error("slug too long (max {max} characters)")]
    TooLong { max: usize },

    #[error("slug may only contain lowercase letters, digits and hyphens (found {0:?})")]
    InvalidChar(char),

    #[error("slug cannot start or end with a hyphen, or contain consecutive hyphens")]
    MisplacedHyphen,
}

/// Check that `slug` is a lowercase, hyphen-separated URL segment such as
/// `blue-nocturne-1962`.
///
/// # Errors
///
/// Returns the first rule the slug breaks.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::Empty);
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(SlugError::TooLong {
            max: MAX_SLUG_LENGTH,
        });
    }
    if let Some(c) = slug
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(SlugError::InvalidChar(c));
    }
    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(SlugError::MisplacedHyphen);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        assert!(validate_slug("blue-nocturne").is_ok());
        assert!(validate_slug("untitled-1962").is_ok());
        assert!(validate_slug("a").is_ok());
    }

    #[test]
    fn test_invalid_slugs() {
        assert_eq!(validate_slug(""), Err(SlugError::Empty));
        assert_eq!(validate_slug("Blue"), Err(SlugError::InvalidChar('B')));
        assert_eq!(validate_slug("blue nocturne"), Err(SlugError::InvalidChar(' ')));
        assert_eq!(validate_slug("-blue"), Err(SlugError::MisplacedHyphen));
        assert_eq!(validate_slug("blue--moon"), Err(SlugError::MisplacedHyphen));
        assert!(matches!(
            validate_slug(&"a".repeat(121)),
            Err(SlugError::TooLong { .. })
        ));
    }
}
