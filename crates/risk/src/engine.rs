//! Risk engine implementation

use lendbank_core::math::shares_value;
use lendbank_core::UsdValue;
use lendbank_ledger::{Bank, UserPosition};
use lendbank_oracle::PriceQuote;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::RiskError;

/// USD health of a collateral/debt pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub collateral_value_usd: UsdValue,
    pub debt_value_usd: UsdValue,
    /// `collateral * max_ltv`
    pub max_borrowable_usd: UsdValue,
    /// `collateral * liquidation_threshold`
    pub liquidation_limit_usd: UsdValue,
    /// `liquidation_limit / debt`; none without debt
    pub health_factor: Option<Decimal>,
    pub is_liquidatable: bool,
}

impl HealthReport {
    pub fn within_max_ltv(&self) -> bool {
        self.debt_value_usd <= self.max_borrowable_usd
    }
}

/// Risk Engine - pre-commit gatekeeper
///
/// Stateless: every check runs against the tentative post-state records
/// and the price quotes read for the operation.
#[derive(Debug, Default, Clone)]
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    /// USD value of the position's deposits in `bank`
    pub fn collateral_value(
        &self,
        position: &UserPosition,
        bank: &Bank,
        price: &PriceQuote,
    ) -> Result<UsdValue, RiskError> {
        let native = shares_value(position.deposited(&bank.asset), bank.deposit_index)
            .ok_or(RiskError::Overflow("collateral value"))?;
        Ok(UsdValue::new(price.value_of(native, bank.params.decimals)?)?)
    }

    /// USD value of the position's debt in `bank`
    pub fn debt_value(
        &self,
        position: &UserPosition,
        bank: &Bank,
        price: &PriceQuote,
    ) -> Result<UsdValue, RiskError> {
        let native = shares_value(position.borrowed(&bank.asset), bank.borrow_index)
            .ok_or(RiskError::Overflow("debt value"))?;
        Ok(UsdValue::new(price.value_of(native, bank.params.decimals)?)?)
    }

    /// Health of the position; LTV and threshold come from the collateral bank
    pub fn compute_health(
        &self,
        position: &UserPosition,
        collateral_bank: &Bank,
        debt_bank: &Bank,
        collateral_price: &PriceQuote,
        debt_price: &PriceQuote,
    ) -> Result<HealthReport, RiskError> {
        let collateral = self.collateral_value(position, collateral_bank, collateral_price)?;
        let debt = self.debt_value(position, debt_bank, debt_price)?;

        let params = &collateral_bank.params;
        let max_borrowable = collateral
            .apply_bps(params.max_ltv)
            .ok_or(RiskError::Overflow("max borrowable"))?;
        let liquidation_limit = collateral
            .apply_bps(params.liquidation_threshold)
            .ok_or(RiskError::Overflow("liquidation limit"))?;

        let health_factor = if debt.is_zero() {
            None
        } else {
            liquidation_limit.value().checked_div(debt.value())
        };

        Ok(HealthReport {
            collateral_value_usd: collateral,
            debt_value_usd: debt,
            max_borrowable_usd: max_borrowable,
            liquidation_limit_usd: liquidation_limit,
            health_factor,
            is_liquidatable: debt > liquidation_limit,
        })
    }

    /// Admission check for the post-borrow position
    pub fn check_borrow(
        &self,
        position: &UserPosition,
        collateral_bank: &Bank,
        debt_bank: &Bank,
        collateral_price: &PriceQuote,
        debt_price: &PriceQuote,
    ) -> Result<HealthReport, RiskError> {
        let report = self.compute_health(position, collateral_bank, debt_bank, collateral_price, debt_price)?;
        if !report.within_max_ltv() {
            return Err(RiskError::InsufficientCollateral {
                debt_usd: report.debt_value_usd.to_string(),
                max_borrowable_usd: report.max_borrowable_usd.to_string(),
            });
        }
        Ok(report)
    }

    /// Admission check for the post-withdraw position
    pub fn check_withdraw(
        &self,
        position: &UserPosition,
        collateral_bank: &Bank,
        debt_bank: &Bank,
        collateral_price: &PriceQuote,
        debt_price: &PriceQuote,
    ) -> Result<HealthReport, RiskError> {
        let report = self.compute_health(position, collateral_bank, debt_bank, collateral_price, debt_price)?;
        if !report.within_max_ltv() {
            return Err(RiskError::WithdrawalExceedsCollateral {
                debt_usd: report.debt_value_usd.to_string(),
                max_borrowable_usd: report.max_borrowable_usd.to_string(),
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lendbank_core::{AssetId, Bps};
    use lendbank_ledger::{Bank, BankParams, UserPosition};
    use lendbank_oracle::PriceQuote;
    use rust_decimal::Decimal;

    pub fn bank(asset: AssetId, feed: &str) -> Bank {
        let params = BankParams::new(
            Bps::new(8_000),
            Bps::new(8_500),
            Bps::new(5_000),
            Bps::new(500),
            6,
            feed.parse().unwrap(),
        );
        Bank::new(asset, "admin".parse().unwrap(), params, 0)
    }

    pub fn usdc_bank() -> Bank {
        bank(AssetId::usdc(), "usdc-usd")
    }

    pub fn sol_bank() -> Bank {
        bank(AssetId::sol(), "sol-usd")
    }

    /// USD price with 6 decimal places
    pub fn quote(feed: &str, micro_usd: i64) -> PriceQuote {
        PriceQuote::new(feed.parse().unwrap(), micro_usd, 0, -6, 0)
    }

    /// 1000 USDC collateral against `sol_debt` native SOL units
    pub fn position(sol_debt: u64) -> UserPosition {
        let mut pos = UserPosition::new("alice".parse().unwrap(), 0);
        pos.credit_deposit(&AssetId::usdc(), Decimal::from(1_000_000_000u64))
            .unwrap();
        pos.credit_borrow(&AssetId::sol(), Decimal::from(sol_debt)).unwrap();
        pos.bind_pair(AssetId::usdc(), AssetId::sol());
        pos
    }
}
