//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A non-negative amount of money in the store currency.
///
/// The storefront trades in a single currency, so only the amount is stored;
/// the currency code is a property of the store, not of each price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, clamping negative amounts to zero.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            Self::ZERO
        } else {
            Self(amount.normalize())
        }
    }

    /// Parse a feed cell such as `"50"`, `"49.50"` or `"₹ 120"`.
    ///
    /// Unparseable or negative values become zero, mirroring how the feed
    /// has always been read.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        cleaned.parse::<Decimal>().map_or(Self::ZERO, Self::new)
    }

    /// The decimal amount in the currency's standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a line quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Amount in minor units (paise), as payment gateways expect.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.0 * Decimal::ONE_HUNDRED).round().to_i64()
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CurrencyCode::INR.symbol(), self.0.normalize())
    }
}

/// ISO 4217 currency codes the storefront can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
        }
    }

    /// ISO code as sent to payment gateways.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Price::parse_lenient("50"), Price::new(Decimal::from(50)));
        assert_eq!(Price::parse_lenient("₹ 120"), Price::new(Decimal::from(120)));
        assert_eq!(Price::parse_lenient("49.50"), Price::new(Decimal::new(495, 1)));
        assert_eq!(Price::parse_lenient(""), Price::ZERO);
        assert_eq!(Price::parse_lenient("free"), Price::ZERO);
        assert_eq!(Price::parse_lenient("-5"), Price::ZERO);
    }

    #[test]
    fn test_display_drops_trailing_zeros() {
        assert_eq!(Price::parse_lenient("100.00").to_string(), "₹100");
        assert_eq!(Price::parse_lenient("12.5").to_string(), "₹12.5");
    }

    #[test]
    fn test_sum_and_minor_units() {
        let total: Price = [Price::parse_lenient("50").times(2), Price::parse_lenient("30.25")]
            .into_iter()
            .sum();
        assert_eq!(total, Price::new(Decimal::new(13025, 2)));
        assert_eq!(total.to_minor_units(), Some(13025));
    }
}
