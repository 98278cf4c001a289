//! UsdValue - Non-negative USD valuation
//!
//! Collateral and debt valuations are never negative.
//! This is enforced at the type level.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::Bps;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("USD value cannot be negative: {0}")]
    Negative(Decimal),
}

/// A non-negative USD value.
///
/// # Invariant
/// The inner value is always >= 0. This is enforced by the constructor.
///
/// # Example
/// ```
/// use lendbank_core::UsdValue;
/// use rust_decimal::Decimal;
///
/// let value = UsdValue::new(Decimal::new(1500, 2)).unwrap();
/// assert_eq!(value.value(), Decimal::new(15, 0));
///
/// assert!(UsdValue::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UsdValue(Decimal);

impl UsdValue {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Returns an error if the value is negative.
    pub fn new(value: Decimal) -> Result<Self, ValueError> {
        if value < Decimal::ZERO {
            Err(ValueError::Negative(value))
        } else {
            Ok(Self(value))
        }
    }

    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Scale by a basis-point ratio (collateral * max_ltv)
    pub fn apply_bps(&self, bps: Bps) -> Option<UsdValue> {
        self.0.checked_mul(bps.as_fraction()).map(UsdValue)
    }

    pub fn checked_add(&self, other: &UsdValue) -> Option<UsdValue> {
        self.0.checked_add(other.0).map(UsdValue)
    }

    /// Returns None if the result would be negative
    pub fn checked_sub(&self, other: &UsdValue) -> Option<UsdValue> {
        let result = self.0.checked_sub(other.0)?;
        if result < Decimal::ZERO {
            None
        } else {
            Some(UsdValue(result))
        }
    }
}

impl fmt::Display for UsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl TryFrom<Decimal> for UsdValue {
    type Error = ValueError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UsdValue> for Decimal {
    fn from(value: UsdValue) -> Self {
        value.0
    }
}

impl Default for UsdValue {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(UsdValue::new(dec!(-0.01)), Err(ValueError::Negative(_))));
    }

    #[test]
    fn test_apply_bps() {
        let collateral = UsdValue::new(dec!(1000)).unwrap();
        assert_eq!(collateral.apply_bps(Bps::new(8_000)).unwrap().value(), dec!(800));
    }

    #[test]
    fn test_checked_sub_prevents_negative() {
        let a = UsdValue::new(dec!(50)).unwrap();
        let b = UsdValue::new(dec!(100)).unwrap();
        assert!(a.checked_sub(&b).is_none());
        assert_eq!(b.checked_sub(&a).unwrap().value(), dec!(50));
    }

    #[test]
    fn test_serde_rejects_negative() {
        let parsed: Result<UsdValue, _> = serde_json::from_str("\"-5\"");
        assert!(parsed.is_err());
    }
}
