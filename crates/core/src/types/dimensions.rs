//! Physical artwork dimensions in centimetres.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when building [`Dimensions`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DimensionsError {
    /// A side is zero or negative.
    #[error("{side} must be greater than zero (got {value})")]
    NonPositive {
        /// Which side failed validation.
        side: &'static str,
        /// The rejected value.
        value: Decimal,
    },
}

/// Width, height and optional depth of a work, in centimetres.
///
/// ```
/// use atelier_core::Dimensions;
/// use rust_decimal::Decimal;
///
/// let dims = Dimensions::new(Decimal::new(500, 1), Decimal::new(70, 0), None).unwrap();
/// assert_eq!(dims.label(), "50x70cm");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_cm: Decimal,
    pub height_cm: Decimal,
    pub depth_cm: Option<Decimal>,
}

impl Dimensions {
    /// Create validated dimensions.
    ///
    /// # Errors
    ///
    /// Returns `DimensionsError::NonPositive` if any side is not positive.
    pub fn new(
        width_cm: Decimal,
        height_cm: Decimal,
        depth_cm: Option<Decimal>,
    ) -> Result<Self, DimensionsError> {
        check_positive("width_cm", width_cm)?;
        check_positive("height_cm", height_cm)?;
        if let Some(depth) = depth_cm {
            check_positive("depth_cm", depth)?;
        }
        Ok(Self {
            width_cm,
            height_cm,
            depth_cm,
        })
    }

    /// Display label `"{width}x{height}cm"`, or `"{w}x{h}x{d}cm"` with depth.
    ///
    /// Trailing zeros are dropped so `50.0` prints as `50`.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}",
            self.width_cm.normalize(),
            self.height_cm.normalize()
        )?;
        if let Some(depth) = self.depth_cm {
            write!(f, "x{}", depth.normalize())?;
        }
        f.write_str("cm")
    }
}

fn check_positive(side: &'static str, value: Decimal) -> Result<(), DimensionsError> {
    if value <= Decimal::ZERO {
        return Err(DimensionsError::NonPositive { side, value });
    }
    Ok(())
}
