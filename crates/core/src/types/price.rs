//! Money arithmetic using decimal amounts.
//!
//! Amounts are stored as `rust_decimal::Decimal` in the currency's standard
//! unit (e.g. `44.99` dollars, not `4499` cents). Payment gateways expect
//! integer minor units, so conversion happens only at that boundary via
//! [`Price::to_minor_units`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by price arithmetic and parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PriceError {
    /// Amount is negative where only non-negative values are allowed.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),

    /// Amount does not fit in the gateway's integer representation.
    #[error("amount out of range: {0}")]
    OutOfRange(Decimal),

    /// Two prices with different currencies were combined.
    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(CurrencyCode, CurrencyCode),

    /// Unknown ISO 4217 code.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// ISO 4217 currency codes accepted by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Lowercase code, as used by the payment gateway and the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }

    /// Number of decimal places in the minor unit.
    #[must_use]
    pub const fn minor_unit_exponent(self) -> u32 {
        2
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "gbp" => Ok(Self::GBP),
            "cad" => Ok(Self::CAD),
            "aud" => Ok(Self::AUD),
            other => Err(PriceError::UnsupportedCurrency(other.to_string())),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CurrencyCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CurrencyCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse::<Self>()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CurrencyCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Convert to integer minor units (cents), rounding half away from zero.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts and
    /// `PriceError::OutOfRange` if the result does not fit in `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative(self.amount));
        }

        let scale = Decimal::from(10_i64.pow(self.currency.minor_unit_exponent()));
        let minor = self
            .amount
            .checked_mul(scale)
            .ok_or(PriceError::OutOfRange(self.amount))?
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero);

        minor.to_i64().ok_or(PriceError::OutOfRange(self.amount))
    }

    /// Build a price from integer minor units.
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, currency.minor_unit_exponent()), currency)
    }

    /// Add two prices of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::CurrencyMismatch` if currencies differ.
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        if self.currency != other.currency {
            return Err(PriceError::CurrencyMismatch(self.currency, other.currency));
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(PriceError::OutOfRange(self.amount))?;
        Ok(Self::new(amount, self.currency))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} {}",
            self.amount,
            self.currency.as_str().to_ascii_uppercase()
        )
    }
}

/// Total for one line: `unit_price * quantity`.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Sum `unit_price * quantity` over a collection of lines.
#[must_use]
pub fn sum_lines<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, qty)| line_total(price, qty))
        .sum()
}

/// Presentation tier derived from an artwork's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    /// Under 250.
    Affordable,
    /// 250 up to (not including) 2000.
    MidRange,
    /// 2000 and above.
    Premium,
}

impl PriceTier {
    /// Classify an amount in the currency's standard unit.
    #[must_use]
    pub fn for_amount(amount: Decimal) -> Self {
        if amount < Decimal::from(250) {
            Self::Affordable
        } else if amount < Decimal::from(2000) {
            Self::MidRange
        } else {
            Self::Premium
        }
    }

    /// Label used in API responses.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Affordable => "affordable",
            Self::MidRange => "mid_range",
            Self::Premium => "premium",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_to_minor_units() {
        let price = Price::new(dec("44.99"), CurrencyCode::USD);
        assert_eq!(price.to_minor_units().unwrap(), 4499);

        let whole = Price::new(dec("1200"), CurrencyCode::EUR);
        assert_eq!(whole.to_minor_units().unwrap(), 120_000);
    }

    #[test]
    fn test_to_minor_units_rounds_half_away_from_zero() {
        let price = Price::new(dec("10.005"), CurrencyCode::USD);
        assert_eq!(price.to_minor_units().unwrap(), 1001);
    }

    #[test]
    fn test_to_minor_units_rejects_negative() {
        let price = Price::new(dec("-1.00"), CurrencyCode::USD);
        assert!(matches!(
            price.to_minor_units(),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_from_minor_units() {
        let price = Price::from_minor_units(2550, CurrencyCode::GBP);
        assert_eq!(price.amount, dec("25.50"));
        assert_eq!(price.currency, CurrencyCode::GBP);
    }

    #[test]
    fn test_checked_add_currency_mismatch() {
        let a = Price::new(dec("1"), CurrencyCode::USD);
        let b = Price::new(dec("1"), CurrencyCode::EUR);
        assert_eq!(
            a.checked_add(b),
            Err(PriceError::CurrencyMismatch(CurrencyCode::USD, CurrencyCode::EUR))
        );
    }

    #[test]
    fn test_sum_lines() {
        let total = sum_lines([(dec("19.99"), 2), (dec("5.00"), 3)]);
        assert_eq!(total, dec("54.98"));
        assert_eq!(sum_lines(std::iter::empty()), Decimal::ZERO);
    }

    #[test]
    fn test_price_tier_boundaries() {
        assert_eq!(PriceTier::for_amount(dec("249.99")), PriceTier::Affordable);
        assert_eq!(PriceTier::for_amount(dec("250")), PriceTier::MidRange);
        assert_eq!(PriceTier::for_amount(dec("1999.99")), PriceTier::MidRange);
        assert_eq!(PriceTier::for_amount(dec("2000")), PriceTier::Premium);
        assert_eq!(PriceTier::Premium.label(), "premium");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!(" eur ".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("jpy".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(dec("5"), CurrencyCode::CAD);
        assert_eq!(price.to_string(), "5.00 CAD");
    }
}
