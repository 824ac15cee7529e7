//! Type-safe money representation using decimal arithmetic.
//!
//! The store keeps prices as JSON numbers (`"Price": 8.5`), so [`Money`]
//! serializes as a float on the wire but never does float arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error for amounts that cannot be money.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("amount cannot be negative: {0}")]
pub struct NegativeAmount(pub Decimal);

/// A non-negative amount in the single store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new amount.
    ///
    /// # Errors
    ///
    /// Returns [`NegativeAmount`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, NegativeAmount> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(NegativeAmount(amount));
        }
        Ok(Self(amount))
    }

    /// Create an amount from a count of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply a unit price by a quantity. `None` on overflow.
    #[must_use]
    pub fn times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Add two amounts. `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Total of all amounts. `None` on overflow.
    #[must_use]
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = NegativeAmount;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(Money::new(Decimal::new(-1, 2)).is_err());
        assert!(Money::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_times_is_exact() {
        // 0.1 * 3 is the classic float trap
        let dime = Money::from_cents(10);
        assert_eq!(dime.times(3), Some(Money::from_cents(30)));
        assert_eq!(Money::from_cents(850).times(2), Some(Money::from_cents(1700)));
    }

    #[test]
    fn test_sum() {
        let total = Money::checked_sum([Money::from_cents(850), Money::from_cents(1250)]);
        assert_eq!(total, Some(Money::from_cents(2100)));
        assert_eq!(Money::checked_sum([]), Some(Money::ZERO));
    }

    #[test]
    fn test_overflow_is_none() {
        let huge: Money = serde_json::from_str("50000000000000000000000000000").unwrap();
        assert_eq!(huge.times(3), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(Money::checked_sum([huge, huge, huge]), None);
        assert_eq!(huge.times(1), Some(huge));
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Money::from_cents(1700).to_string(), "$17.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
    }

    #[test]
    fn test_reads_json_number() {
        let price: Money = serde_json::from_str("8.5").unwrap();
        assert_eq!(price, Money::from_cents(850));
        assert!(serde_json::from_str::<Money>("-2.0").is_err());
    }

    #[test]
    fn test_writes_json_number() {
        let json = serde_json::to_string(&Money::from_cents(1700)).unwrap();
        assert_eq!(json, "17.0");
    }
}
