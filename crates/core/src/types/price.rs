//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored and exchanged as decimal major-unit amounts (e.g.
//! rupees, dollars). The payment gateway boundary is the only place where
//! amounts become integer minor units (paise, cents), rounded half-up.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors converting a price to the gateway's minor-unit representation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Negative amounts cannot be charged.
    #[error("price amount cannot be negative: {0}")]
    Negative(Decimal),
    /// The minor-unit amount does not fit in an i64.
    #[error("price amount out of range: {0}")]
    OutOfRange(Decimal),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's major unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Convert to the smallest currency unit as an integer, rounding
    /// half-up to the nearest cent/paisa.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for negative amounts and
    /// [`PriceError::OutOfRange`] if the result does not fit in an `i64`.
    pub fn minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative(self.amount));
        }

        let minor = (self.amount * Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        minor.to_i64().ok_or(PriceError::OutOfRange(self.amount))
    }
}

/// ISO 4217 currency codes supported by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    Inr,
    Usd,
    Eur,
    Gbp,
}

impl CurrencyCode {
    /// Lowercase code as expected by the payment gateway API.
    #[must_use]
    pub const fn as_gateway_str(&self) -> &'static str {
        match self {
            Self::Inr => "inr",
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
        }
    }

    /// Parse from a case-insensitive code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "inr" => Some(Self::Inr),
            "usd" => Some(Self::Usd),
            "eur" => Some(Self::Eur),
            "gbp" => Some(Self::Gbp),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        Price::new(s.parse().unwrap(), CurrencyCode::Inr)
    }

    #[test]
    fn test_minor_units_whole_amount() {
        assert_eq!(price("250").minor_units().unwrap(), 25_000);
    }

    #[test]
    fn test_minor_units_fractional() {
        assert_eq!(price("19.99").minor_units().unwrap(), 1_999);
    }

    #[test]
    fn test_minor_units_rounds_half_up() {
        // 234.5 paise rounds up, not to even
        assert_eq!(price("2.345").minor_units().unwrap(), 235);
        assert_eq!(price("2.344").minor_units().unwrap(), 234);
    }

    #[test]
    fn test_minor_units_zero() {
        assert_eq!(price("0").minor_units().unwrap(), 0);
    }

    #[test]
    fn test_minor_units_rejects_negative() {
        assert!(matches!(
            price("-1").minor_units(),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_currency_gateway_str() {
        assert_eq!(CurrencyCode::Inr.as_gateway_str(), "inr");
        assert_eq!(CurrencyCode::parse("INR"), Some(CurrencyCode::Inr));
        assert_eq!(CurrencyCode::parse("xyz"), None);
    }
}
