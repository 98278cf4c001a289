//! Basis points

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 10_000 bps = 100%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// A ratio expressed in basis points (8000 = 80.00%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bps(u64);

impl Bps {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(BPS_DENOMINATOR);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The ratio as a decimal fraction (8000 bps -> 0.8)
    pub fn as_fraction(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(BPS_DENOMINATOR)
    }

    /// True when the ratio is at most 100%
    pub fn is_unit_ratio(&self) -> bool {
        self.0 <= BPS_DENOMINATOR
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

impl From<u64> for Bps {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_as_fraction() {
        assert_eq!(Bps::new(8_000).as_fraction(), dec!(0.8));
        assert_eq!(Bps::new(5).as_fraction(), dec!(0.0005));
        assert_eq!(Bps::MAX.as_fraction(), Decimal::ONE);
    }

    #[test]
    fn test_unit_ratio() {
        assert!(Bps::new(10_000).is_unit_ratio());
        assert!(!Bps::new(10_001).is_unit_ratio());
    }
}
