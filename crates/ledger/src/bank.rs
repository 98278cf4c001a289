//! Bank - per-asset reserve
//!
//! Deposits and borrows are tracked as shares; economic value is always
//! `shares * index`. Interest accrual only moves the two indexes, so it is
//! O(1) per bank no matter how many positions exist.

use lendbank_core::math::{native_floor, shares_value};
use lendbank_core::{AssetId, Bps, FeedId, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::custody::CustodyAccount;
use crate::error::LedgerError;

fn default_close_factor() -> Bps {
    Bps::new(5_000)
}

fn default_reserve_factor() -> Bps {
    Bps::new(1_000)
}

/// Bank configuration, fixed at initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankParams {
    /// Maximum debt/collateral ratio admitted by Borrow and Withdraw
    pub max_ltv: Bps,
    /// Debt/collateral ratio above which a position can be liquidated
    pub liquidation_threshold: Bps,
    /// Extra collateral awarded to the liquidator on top of repaid value
    pub liquidation_bonus: Bps,
    /// Annualized borrow rate
    pub interest_rate: Bps,
    /// Maximum share of outstanding debt one liquidation may repay
    #[serde(default = "default_close_factor")]
    pub close_factor: Bps,
    /// Share of borrow interest kept by the protocol
    #[serde(default = "default_reserve_factor")]
    pub reserve_factor: Bps,
    /// Native-unit decimals of the asset
    pub decimals: u8,
    /// Oracle feed quoting this asset in USD
    pub price_feed: FeedId,
}

impl BankParams {
    pub fn new(
        max_ltv: Bps,
        liquidation_threshold: Bps,
        liquidation_bonus: Bps,
        interest_rate: Bps,
        decimals: u8,
        price_feed: FeedId,
    ) -> Self {
        Self {
            max_ltv,
            liquidation_threshold,
            liquidation_bonus,
            interest_rate,
            close_factor: default_close_factor(),
            reserve_factor: default_reserve_factor(),
            decimals,
            price_feed,
        }
    }

    pub fn with_close_factor(mut self, close_factor: Bps) -> Self {
        self.close_factor = close_factor;
        self
    }

    pub fn with_reserve_factor(mut self, reserve_factor: Bps) -> Self {
        self.reserve_factor = reserve_factor;
        self
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        let invalid = |msg: &str| Err(LedgerError::InvalidParams(msg.to_string()));

        if self.max_ltv == Bps::ZERO {
            return invalid("max_ltv must be positive");
        }
        if !self.liquidation_threshold.is_unit_ratio() {
            return invalid("liquidation_threshold must be at most 10000 bps");
        }
        if self.max_ltv > self.liquidation_threshold {
            return invalid("max_ltv must not exceed liquidation_threshold");
        }
        if self.close_factor == Bps::ZERO || !self.close_factor.is_unit_ratio() {
            return invalid("close_factor must be in (0, 10000] bps");
        }
        if !self.reserve_factor.is_unit_ratio() {
            return invalid("reserve_factor must be at most 10000 bps");
        }
        if self.decimals > 18 {
            return invalid("decimals must be at most 18");
        }
        Ok(())
    }
}

/// Per-asset reserve record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub asset: AssetId,
    /// Admin that initialized the bank
    pub authority: UserId,
    pub params: BankParams,
    pub total_deposited_shares: Decimal,
    pub total_borrowed_shares: Decimal,
    pub deposit_index: Decimal,
    pub borrow_index: Decimal,
    /// Deposit shares owned by the protocol (interest spread)
    pub protocol_fee_shares: Decimal,
    pub last_update_timestamp: Timestamp,
}

impl Bank {
    pub fn new(asset: AssetId, authority: UserId, params: BankParams, now: Timestamp) -> Self {
        Self {
            asset,
            authority,
            params,
            total_deposited_shares: Decimal::ZERO,
            total_borrowed_shares: Decimal::ZERO,
            deposit_index: Decimal::ONE,
            borrow_index: Decimal::ONE,
            protocol_fee_shares: Decimal::ZERO,
            last_update_timestamp: now,
        }
    }

    /// Treasury account holding this bank's tokens
    pub fn treasury(&self) -> CustodyAccount {
        CustodyAccount::Treasury(self.asset.clone())
    }

    /// Native-unit value of all deposit shares
    pub fn total_deposit_value(&self) -> Result<Decimal, LedgerError> {
        shares_value(self.total_deposited_shares, self.deposit_index)
            .ok_or(LedgerError::Overflow("total deposit value"))
    }

    /// Native-unit value of all borrow shares
    pub fn total_borrow_value(&self) -> Result<Decimal, LedgerError> {
        shares_value(self.total_borrowed_shares, self.borrow_index)
            .ok_or(LedgerError::Overflow("total borrow value"))
    }

    /// Whole native units that can leave the bank without breaking
    /// `deposits >= borrows`
    pub fn available_liquidity(&self) -> Result<u64, LedgerError> {
        let free = self.total_deposit_value()? - self.total_borrow_value()?;
        if free <= Decimal::ZERO {
            return Ok(0);
        }
        native_floor(free).ok_or(LedgerError::Overflow("available liquidity"))
    }

    /// Borrowed value / deposited value, zero for an empty bank
    pub fn utilization(&self) -> Result<Decimal, LedgerError> {
        let deposits = self.total_deposit_value()?;
        if deposits.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok((self.total_borrow_value()? / deposits).min(Decimal::ONE))
    }

    pub fn is_solvent(&self) -> Result<bool, LedgerError> {
        Ok(self.total_deposit_value()? >= self.total_borrow_value()?)
    }

    pub fn add_deposit_shares(&mut self, shares: Decimal) -> Result<(), LedgerError> {
        self.total_deposited_shares = self
            .total_deposited_shares
            .checked_add(shares)
            .ok_or(LedgerError::Overflow("total deposited shares"))?;
        Ok(())
    }

    pub fn remove_deposit_shares(&mut self, shares: Decimal) -> Result<(), LedgerError> {
        self.total_deposited_shares = checked_remove(&self.asset, self.total_deposited_shares, shares)?;
        Ok(())
    }

    pub fn add_borrow_shares(&mut self, shares: Decimal) -> Result<(), LedgerError> {
        self.total_borrowed_shares = self
            .total_borrowed_shares
            .checked_add(shares)
            .ok_or(LedgerError::Overflow("total borrowed shares"))?;
        Ok(())
    }

    pub fn remove_borrow_shares(&mut self, shares: Decimal) -> Result<(), LedgerError> {
        self.total_borrowed_shares = checked_remove(&self.asset, self.total_borrowed_shares, shares)?;
        Ok(())
    }
}

pub(crate) fn checked_remove(
    asset: &AssetId,
    available: Decimal,
    requested: Decimal,
) -> Result<Decimal, LedgerError> {
    if requested > available {
        return Err(LedgerError::ShareUnderflow {
            asset: asset.clone(),
            available,
            requested,
        });
    }
    Ok(available - requested)
}
