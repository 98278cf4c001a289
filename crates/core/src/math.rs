//! Index-based share math
//!
//! Balances are stored as shares; value = shares * index. Every conversion
//! names its rounding direction so callers round in the protocol's favour:
//! minted deposit shares and burned debt shares round down, burned deposit
//! shares and minted debt shares round up. Amounts paid out of a share
//! balance round down, amounts owed round up.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on deposit/borrow indexes
pub const INDEX_SCALE: u32 = 12;

/// Decimal places kept on share balances
pub const SHARE_SCALE: u32 = 12;

/// Shares minted for `amount` native units, rounded down
pub fn shares_down(amount: u64, index: Decimal) -> Option<Decimal> {
    Decimal::from(amount)
        .checked_div(index)
        .map(|s| s.round_dp_with_strategy(SHARE_SCALE, RoundingStrategy::ToZero))
}

/// Shares required to cover `amount` native units, rounded up
pub fn shares_up(amount: u64, index: Decimal) -> Option<Decimal> {
    Decimal::from(amount)
        .checked_div(index)
        .map(|s| s.round_dp_with_strategy(SHARE_SCALE, RoundingStrategy::AwayFromZero))
}

/// Exact native-unit value of a share balance
pub fn shares_value(shares: Decimal, index: Decimal) -> Option<Decimal> {
    shares.checked_mul(index)
}

pub fn native_floor(value: Decimal) -> Option<u64> {
    value.floor().to_u64()
}

pub fn native_ceil(value: Decimal) -> Option<u64> {
    value.ceil().to_u64()
}

/// 10^exp for token decimals
pub fn pow10(exp: u32) -> Option<Decimal> {
    10u64.checked_pow(exp).map(Decimal::from)
}

/// Round an index to `INDEX_SCALE`, away from zero (borrow side)
pub fn index_up(index: Decimal) -> Decimal {
    index.round_dp_with_strategy(INDEX_SCALE, RoundingStrategy::AwayFromZero)
}

/// Round an index to `INDEX_SCALE`, toward zero (deposit side)
pub fn index_down(index: Decimal) -> Decimal {
    index.round_dp_with_strategy(INDEX_SCALE, RoundingStrategy::ToZero)
}
