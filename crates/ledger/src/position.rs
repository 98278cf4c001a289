//! User position - per-user deposited and borrowed shares

use lendbank_core::{AssetId, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bank::checked_remove;
use crate::error::LedgerError;

/// Per-user balances, denominated in bank shares
///
/// Zero balances are kept once an asset has been touched. While the
/// position carries debt it is bound to exactly one collateral asset and
/// one debt asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub owner: UserId,
    pub deposited_shares: BTreeMap<AssetId, Decimal>,
    pub borrowed_shares: BTreeMap<AssetId, Decimal>,
    pub collateral_asset: Option<AssetId>,
    pub debt_asset: Option<AssetId>,
    pub last_update_timestamp: Timestamp,
}

impl UserPosition {
    pub fn new(owner: UserId, now: Timestamp) -> Self {
        Self {
            owner,
            deposited_shares: BTreeMap::new(),
            borrowed_shares: BTreeMap::new(),
            collateral_asset: None,
            debt_asset: None,
            last_update_timestamp: now,
        }
    }

    pub fn deposited(&self, asset: &AssetId) -> Decimal {
        self.deposited_shares
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn borrowed(&self, asset: &AssetId) -> Decimal {
        self.borrowed_shares
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn has_debt(&self) -> bool {
        self.borrowed_shares.values().any(|s| !s.is_zero())
    }

    /// The bound (collateral, debt) pair, if the position carries debt
    pub fn pair(&self) -> Option<(&AssetId, &AssetId)> {
        match (&self.collateral_asset, &self.debt_asset) {
            (Some(c), Some(d)) => Some((c, d)),
            _ => None,
        }
    }

    pub fn credit_deposit(&mut self, asset: &AssetId, shares: Decimal) -> Result<(), LedgerError> {
        let entry = self
            .deposited_shares
            .entry(asset.clone())
            .or_insert(Decimal::ZERO);
        *entry = entry
            .checked_add(shares)
            .ok_or(LedgerError::Overflow("deposited shares"))?;
        Ok(())
    }

    pub fn debit_deposit(&mut self, asset: &AssetId, shares: Decimal) -> Result<(), LedgerError> {
        let remaining = checked_remove(asset, self.deposited(asset), shares)?;
        self.deposited_shares.insert(asset.clone(), remaining);
        Ok(())
    }

    pub fn credit_borrow(&mut self, asset: &AssetId, shares: Decimal) -> Result<(), LedgerError> {
        let entry = self
            .borrowed_shares
            .entry(asset.clone())
            .or_insert(Decimal::ZERO);
        *entry = entry
            .checked_add(shares)
            .ok_or(LedgerError::Overflow("borrowed shares"))?;
        Ok(())
    }

    /// Burn debt shares; unbinds the asset pair once all debt is gone
    pub fn debit_borrow(&mut self, asset: &AssetId, shares: Decimal) -> Result<(), LedgerError> {
        let remaining = checked_remove(asset, self.borrowed(asset), shares)?;
        self.borrowed_shares.insert(asset.clone(), remaining);
        if !self.has_debt() {
            self.collateral_asset = None;
            self.debt_asset = None;
        }
        Ok(())
    }

    pub fn bind_pair(&mut self, collateral: AssetId, debt: AssetId) {
        self.collateral_asset = Some(collateral);
        self.debt_asset = Some(debt);
    }
}
