//! Interest Accrual Module
//!
//! Advances a bank's borrow and deposit indexes over elapsed time.
//! Borrowers pay the full rate through the borrow index; depositors receive
//! the interest minus the reserve factor through the deposit index, and the
//! reserve is minted to the protocol as deposit shares.

use lendbank_core::math::{index_down, index_up, shares_value, SHARE_SCALE};
use lendbank_core::{Bps, Timestamp};
use lendbank_ledger::Bank;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RiskError;

/// Seconds in a 365-day year
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Borrow rate policy
pub trait InterestModel: Send + Sync + fmt::Debug {
    /// Borrow index growth factor over `elapsed` seconds, at least 1
    fn borrow_growth(&self, bank: &Bank, elapsed: u64) -> Result<Decimal, RiskError>;
}

/// `rate * elapsed / year`
fn year_fraction(rate: Decimal, elapsed: u64) -> Result<Decimal, RiskError> {
    rate.checked_mul(Decimal::from(elapsed))
        .and_then(|v| v.checked_div(Decimal::from(SECONDS_PER_YEAR)))
        .ok_or(RiskError::Overflow("interest exponent"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compounding {
    /// `1 + r*t/Y`
    Linear,
    /// `e^(r*t/Y)`
    Continuous,
}

/// Fixed annual rate taken from the bank's `interest_rate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRate {
    pub compounding: Compounding,
}

impl InterestModel for FlatRate {
    fn borrow_growth(&self, bank: &Bank, elapsed: u64) -> Result<Decimal, RiskError> {
        let x = year_fraction(bank.params.interest_rate.as_fraction(), elapsed)?;
        match self.compounding {
            Compounding::Linear => x
                .checked_add(Decimal::ONE)
                .ok_or(RiskError::Overflow("linear growth")),
            Compounding::Continuous => x.checked_exp().ok_or(RiskError::Overflow("continuous growth")),
        }
    }
}

/// Utilization curve with a kink
///
/// Below the optimal utilization the rate climbs from the bank's base
/// `interest_rate` by up to `slope_low`; above it, by a further
/// `slope_high` at full utilization. Growth is linear over the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinkedRate {
    pub optimal_utilization_bps: Bps,
    pub slope_low_bps: Bps,
    pub slope_high_bps: Bps,
}

impl KinkedRate {
    /// Annual borrow rate at the bank's current utilization
    pub fn annual_rate(&self, bank: &Bank) -> Result<Decimal, RiskError> {
        let utilization = bank.utilization()?;
        let optimal = self.optimal_utilization_bps.as_fraction().min(Decimal::ONE);
        let base = bank.params.interest_rate.as_fraction();
        let low = self.slope_low_bps.as_fraction();
        let high = self.slope_high_bps.as_fraction();

        let rate = if utilization <= optimal {
            if optimal.is_zero() {
                base
            } else {
                base + low * utilization / optimal
            }
        } else {
            let excess = (utilization - optimal) / (Decimal::ONE - optimal);
            base + low + high * excess
        };
        Ok(rate)
    }
}

impl InterestModel for KinkedRate {
    fn borrow_growth(&self, bank: &Bank, elapsed: u64) -> Result<Decimal, RiskError> {
        let x = year_fraction(self.annual_rate(bank)?, elapsed)?;
        x.checked_add(Decimal::ONE)
            .ok_or(RiskError::Overflow("kinked growth"))
    }
}

/// Serializable model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum RateModel {
    Flat(FlatRate),
    Kinked(KinkedRate),
}

impl Default for RateModel {
    fn default() -> Self {
        Self::Flat(FlatRate {
            compounding: Compounding::Continuous,
        })
    }
}

impl InterestModel for RateModel {
    fn borrow_growth(&self, bank: &Bank, elapsed: u64) -> Result<Decimal, RiskError> {
        match self {
            Self::Flat(m) => m.borrow_growth(bank, elapsed),
            Self::Kinked(m) => m.borrow_growth(bank, elapsed),
        }
    }
}

/// Applies an `InterestModel` to banks
#[derive(Debug)]
pub struct InterestAccrual {
    model: Box<dyn InterestModel>,
}

impl Default for InterestAccrual {
    fn default() -> Self {
        Self::new(Box::new(RateModel::default()))
    }
}

impl InterestAccrual {
    pub fn new(model: Box<dyn InterestModel>) -> Self {
        Self { model }
    }

    /// Bank state advanced to `now`
    ///
    /// Fails with `ClockSkew` when `now` precedes the last update. Zero
    /// elapsed time returns the bank unchanged.
    pub fn accrue(&self, bank: &Bank, now: Timestamp) -> Result<Bank, RiskError> {
        let skew = || RiskError::ClockSkew {
            last_update: bank.last_update_timestamp,
            now,
        };
        let elapsed = now.checked_sub(bank.last_update_timestamp).ok_or_else(skew)?;
        let elapsed = u64::try_from(elapsed).map_err(|_| skew())?;
        if elapsed == 0 {
            return Ok(bank.clone());
        }

        let mut next = bank.clone();
        next.last_update_timestamp = now;
        if bank.total_borrowed_shares.is_zero() {
            return Ok(next);
        }

        let growth = self.model.borrow_growth(bank, elapsed)?.max(Decimal::ONE);
        let borrow_index = bank
            .borrow_index
            .checked_mul(growth)
            .map(index_up)
            .ok_or(RiskError::Overflow("borrow index"))?;

        let interest = shares_value(bank.total_borrowed_shares, borrow_index - bank.borrow_index)
            .ok_or(RiskError::Overflow("borrow interest"))?;
        next.borrow_index = borrow_index;
        if interest.is_zero() {
            return Ok(next);
        }

        let deposit_value = bank.total_deposit_value()?;
        let depositor_share = Decimal::ONE - bank.params.reserve_factor.as_fraction();
        let deposit_index = if deposit_value.is_zero() {
            bank.deposit_index
        } else {
            let growth = Decimal::ONE + interest * depositor_share / deposit_value;
            bank.deposit_index
                .checked_mul(growth)
                .map(index_down)
                .ok_or(RiskError::Overflow("deposit index"))?
                .max(bank.deposit_index)
        };
        next.deposit_index = deposit_index;

        // Whatever interest the deposit index did not pass on belongs to
        // the protocol, so deposited value grows by at least `interest`
        let credited = shares_value(bank.total_deposited_shares, deposit_index)
            .ok_or(RiskError::Overflow("deposit value"))?;
        let fee_value = deposit_value + interest - credited;
        if fee_value > Decimal::ZERO {
            let fee_shares = (fee_value / deposit_index)
                .round_dp_with_strategy(SHARE_SCALE, RoundingStrategy::AwayFromZero);
            next.add_deposit_shares(fee_shares)?;
            next.protocol_fee_shares = next
                .protocol_fee_shares
                .checked_add(fee_shares)
                .ok_or(RiskError::Overflow("protocol fee shares"))?;
        }

        tracing::debug!(
            asset = %bank.asset,
            elapsed,
            borrow_index = %next.borrow_index,
            deposit_index = %next.deposit_index,
            interest = %interest,
            "Accrued interest"
        );
        Ok(next)
    }
}
