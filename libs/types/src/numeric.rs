//! Fixed-point price and quantity types
//!
//! Prices and monetary amounts are signed 64-bit integers at a fixed decimal
//! scale (default 2, i.e. cents). Quantities are unsigned 64-bit integers of
//! whole units. `rust_decimal` is used only at the wire boundary, where
//! prices travel as decimal numbers.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Default number of decimal digits carried by fixed-point prices.
pub const DEFAULT_PRICE_SCALE: u32 = 2;

/// Fixed-point price.
///
/// The raw value is `price × 10^scale`. Zero is the sentinel for "no price"
/// (market orders, empty side of book).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Create from a raw fixed-point value
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw fixed-point value
    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Convert a wire decimal into fixed point at the given scale.
    ///
    /// Digits beyond the scale are rounded half away from zero. Returns
    /// `None` if the value does not fit in 64 bits.
    pub fn from_decimal(value: Decimal, scale: u32) -> Option<Self> {
        let factor = Decimal::from(10u64.checked_pow(scale)?);
        let scaled = value
            .checked_mul(factor)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled.to_i64().map(Self)
    }

    /// Convert to a wire decimal at the given scale.
    pub fn to_decimal(&self, scale: u32) -> Decimal {
        Decimal::new(self.0, scale)
    }

    /// Total value of `quantity` units at this price.
    ///
    /// Returns `None` on 64-bit overflow.
    pub fn notional(&self, quantity: Quantity) -> Option<i64> {
        let qty = i64::try_from(quantity.raw()).ok()?;
        self.0.checked_mul(qty)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quantity of whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    /// # Panics
    /// Panics if the subtraction would underflow.
    fn sub(self, rhs: Self) -> Self::Output {
        assert!(self.0 >= rhs.0, "quantity subtraction would underflow");
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_from_decimal_cents() {
        let d = Decimal::from_str("105.00").unwrap();
        assert_eq!(Price::from_decimal(d, 2), Some(Price::from_raw(10500)));
    }

    #[test]
    fn test_price_from_decimal_rounds_half_up() {
        let d = Decimal::from_str("1.005").unwrap();
        assert_eq!(Price::from_decimal(d, 2), Some(Price::from_raw(101)));

        let d = Decimal::from_str("1.004").unwrap();
        assert_eq!(Price::from_decimal(d, 2), Some(Price::from_raw(100)));
    }

    #[test]
    fn test_price_from_decimal_no_float_drift() {
        // 105.35 is not exactly representable in binary floating point;
        // the decimal path must still land on 10535 exactly.
        let d = Decimal::from_str("105.35").unwrap();
        assert_eq!(Price::from_decimal(d, 2), Some(Price::from_raw(10535)));
    }

    #[test]
    fn test_price_to_decimal_round_trip() {
        let price = Price::from_raw(10500);
        let d = price.to_decimal(2);
        assert_eq!(d, Decimal::from_str("105.00").unwrap());
        assert_eq!(Price::from_decimal(d, 2), Some(price));
    }

    #[test]
    fn test_price_from_decimal_overflow() {
        let huge = Decimal::from(i64::MAX);
        assert_eq!(Price::from_decimal(huge, 2), None);
    }

    #[test]
    fn test_notional() {
        let price = Price::from_raw(10000);
        assert_eq!(price.notional(Quantity::from_raw(5)), Some(50_000));
    }

    #[test]
    fn test_notional_overflow() {
        let price = Price::from_raw(i64::MAX);
        assert_eq!(price.notional(Quantity::from_raw(2)), None);
    }

    #[test]
    fn test_quantity_arithmetic() {
        let a = Quantity::from_raw(10);
        let b = Quantity::from_raw(4);
        assert_eq!(a - b, Quantity::from_raw(6));
        assert_eq!(a + b, Quantity::from_raw(14));
    }

    #[test]
    #[should_panic(expected = "quantity subtraction would underflow")]
    fn test_quantity_sub_underflow_panics() {
        let _ = Quantity::from_raw(1) - Quantity::from_raw(2);
    }

    #[test]
    fn test_price_ordering() {
        assert!(Price::from_raw(10100) > Price::from_raw(10000));
        assert!(Price::ZERO.is_zero());
        assert!(!Price::ZERO.is_positive());
    }
}
