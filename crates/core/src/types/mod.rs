//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod dimensions;
pub mod email;
pub mod id;
pub mod price;
pub mod slug;
pub mod status;

pub use dimensions::{Dimensions, DimensionsError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError, PriceTier, line_total, sum_lines};
pub use slug::{SlugError, validate_slug};
pub use status::*;
