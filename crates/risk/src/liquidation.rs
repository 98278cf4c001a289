//! Liquidation engine
//!
//! Plans the closure of part of an under-collateralized position: the
//! liquidator repays up to the close factor of the debt and receives the
//! repaid value plus the liquidation bonus in collateral. Seizure never
//! exceeds the collateral the position actually holds.

use lendbank_core::math::{native_ceil, native_floor, shares_down, shares_up, shares_value};
use lendbank_core::UsdValue;
use lendbank_ledger::{Bank, UserPosition};
use lendbank_oracle::PriceQuote;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::engine::{HealthReport, RiskEngine};
use crate::error::RiskError;

/// What a liquidation moves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidationPlan {
    /// Debt-asset native units paid by the liquidator
    pub repay_amount: u64,
    /// Borrow shares burned on the target position
    pub repay_shares: Decimal,
    /// Collateral-asset native units paid to the liquidator
    pub seize_amount: u64,
    /// Deposit shares removed from the target position
    pub seize_shares: Decimal,
    pub repaid_usd: UsdValue,
    pub seized_usd: UsdValue,
    /// Target health before the liquidation
    pub health: HealthReport,
}

/// Liquidation engine
#[derive(Debug, Default, Clone)]
pub struct LiquidationEngine {
    risk: RiskEngine,
}

impl LiquidationEngine {
    pub fn new(risk: RiskEngine) -> Self {
        Self { risk }
    }

    /// Plan a liquidation against accrued banks
    ///
    /// `requested` caps the repay amount below the close-factor limit.
    /// Close factor is read from the debt bank, the bonus from the
    /// collateral bank.
    pub fn plan(
        &self,
        position: &UserPosition,
        collateral_bank: &Bank,
        debt_bank: &Bank,
        collateral_price: &PriceQuote,
        debt_price: &PriceQuote,
        requested: Option<u64>,
    ) -> Result<LiquidationPlan, RiskError> {
        let health = self.risk.compute_health(
            position,
            collateral_bank,
            debt_bank,
            collateral_price,
            debt_price,
        )?;
        if !health.is_liquidatable {
            return Err(RiskError::PositionHealthy {
                debt_usd: health.debt_value_usd.to_string(),
                liquidation_limit_usd: health.liquidation_limit_usd.to_string(),
            });
        }

        let debt_shares = position.borrowed(&debt_bank.asset);
        let debt = shares_value(debt_shares, debt_bank.borrow_index)
            .and_then(native_ceil)
            .ok_or(RiskError::Overflow("debt amount"))?;
        let close_cap = Decimal::from(debt)
            .checked_mul(debt_bank.params.close_factor.as_fraction())
            .and_then(native_floor)
            .ok_or(RiskError::Overflow("close factor cap"))?
            .clamp(1, debt.max(1));
        let mut repay = requested.map_or(close_cap, |r| r.min(close_cap));

        let collateral_shares = position.deposited(&collateral_bank.asset);
        let collateral = shares_value(collateral_shares, collateral_bank.deposit_index)
            .and_then(native_floor)
            .ok_or(RiskError::Overflow("collateral amount"))?;
        if collateral == 0 {
            return Err(RiskError::SeizeExceedsCollateral(
                "position holds no collateral".to_string(),
            ));
        }

        let bonus = Decimal::ONE + collateral_bank.params.liquidation_bonus.as_fraction();
        let repay_usd = debt_price.value_of(Decimal::from(repay), debt_bank.params.decimals)?;
        let seize_exact = collateral_price.amount_for(
            repay_usd
                .checked_mul(bonus)
                .ok_or(RiskError::Overflow("seize value"))?,
            collateral_bank.params.decimals,
        )?;

        let full_seize = seize_exact > Decimal::from(collateral);
        let seize = if full_seize {
            // Clamp to the collateral and scale the repay down with it
            repay = (Decimal::from(repay) * Decimal::from(collateral))
                .checked_div(seize_exact)
                .and_then(native_floor)
                .ok_or(RiskError::Overflow("scaled repay"))?;
            collateral
        } else {
            native_floor(seize_exact).ok_or(RiskError::Overflow("seize amount"))?
        };
        if repay == 0 {
            return Err(RiskError::SeizeExceedsCollateral(
                "collateral too small to repay any debt".to_string(),
            ));
        }

        let repay_shares = if repay >= debt {
            debt_shares
        } else {
            shares_down(repay, debt_bank.borrow_index)
                .ok_or(RiskError::Overflow("repay shares"))?
                .min(debt_shares)
        };
        if repay_shares.is_zero() {
            return Err(RiskError::SeizeExceedsCollateral(
                "repay burns no debt shares".to_string(),
            ));
        }

        let seize_shares = if full_seize {
            collateral_shares
        } else {
            shares_up(seize, collateral_bank.deposit_index)
                .ok_or(RiskError::Overflow("seize shares"))?
                .min(collateral_shares)
        };

        let repaid_usd = UsdValue::new(
            debt_price.value_of(Decimal::from(repay), debt_bank.params.decimals)?,
        )?;
        let seized_usd = UsdValue::new(
            collateral_price.value_of(Decimal::from(seize), collateral_bank.params.decimals)?,
        )?;

        tracing::debug!(
            owner = %position.owner,
            repay,
            seize,
            full_seize,
            "Planned liquidation"
        );

        Ok(LiquidationPlan {
            repay_amount: repay,
            repay_shares,
            seize_amount: seize,
            seize_shares,
            repaid_usd,
            seized_usd,
            health,
        })
    }
}
