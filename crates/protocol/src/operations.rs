//! Ledger operations
//!
//! Each operation reads everything it needs first (records, then prices),
//! computes the post-state on owned copies, and hands the result to
//! `commit`. Nothing is written before `commit` accepts the whole change.

use lendbank_core::math::{native_ceil, native_floor, shares_down, shares_up, shares_value};
use lendbank_core::{AssetId, Timestamp, UsdValue, UserId};
use lendbank_ledger::{
    Authority, Bank, BankParams, CustodyAccount, LedgerStore, OperationKind, OperationRecord,
    TokenCustody, Transfer, UserPosition,
};
use lendbank_risk::RiskError;
use rust_decimal::Decimal;

use crate::error::ProtocolError;
use crate::protocol::{LendingProtocol, Result};

fn reject<T>(kind: OperationKind, actor: &UserId, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        tracing::warn!(kind = %kind, actor = %actor, class = %e.class(), error = %e, "Rejected operation");
    }
    result
}

fn require_amount(amount: u64) -> Result<()> {
    if amount == 0 {
        return Err(ProtocolError::InvalidAmount("amount must be positive".to_string()));
    }
    Ok(())
}

fn overflow(what: &'static str) -> ProtocolError {
    RiskError::Overflow(what).into()
}

/// Collateral asset for a new borrow of `debt`
fn collateral_for(position: &UserPosition, debt: &AssetId) -> Result<AssetId> {
    if let Some((collateral, bound_debt)) = position.pair() {
        if bound_debt != debt {
            return Err(ProtocolError::UnsupportedAssetPair {
                collateral: collateral.to_string(),
                debt: debt.to_string(),
            });
        }
        return Ok(collateral.clone());
    }

    let mut candidates = position
        .deposited_shares
        .iter()
        .filter(|(asset, shares)| *asset != debt && !shares.is_zero())
        .map(|(asset, _)| asset);
    match (candidates.next(), candidates.next()) {
        (Some(collateral), None) => Ok(collateral.clone()),
        (None, _) => Err(RiskError::InsufficientCollateral {
            debt_usd: "unknown".to_string(),
            max_borrowable_usd: UsdValue::ZERO.to_string(),
        }
        .into()),
        (Some(first), Some(second)) => Err(ProtocolError::UnsupportedAssetPair {
            collateral: format!("{first}+{second}"),
            debt: debt.to_string(),
        }),
    }
}

impl<S: LedgerStore, C: TokenCustody> LendingProtocol<S, C> {
    fn treasury_leg(bank: &Bank, user: &UserId, amount: u64) -> (Transfer, Authority) {
        (
            Transfer::new(
                bank.treasury(),
                CustodyAccount::Wallet(user.clone()),
                bank.asset.clone(),
                amount,
            ),
            Authority::Protocol,
        )
    }

    fn wallet_leg(bank: &Bank, user: &UserId, amount: u64) -> (Transfer, Authority) {
        (
            Transfer::new(
                CustodyAccount::Wallet(user.clone()),
                bank.treasury(),
                bank.asset.clone(),
                amount,
            ),
            Authority::User(user.clone()),
        )
    }

    fn check_liquidity(bank: &Bank, requested: u64) -> Result<()> {
        let available = bank.available_liquidity()?;
        if requested > available {
            return Err(ProtocolError::InsufficientLiquidity {
                asset: bank.asset.clone(),
                available,
                requested,
            });
        }
        Ok(())
    }

    // === InitBank / InitUser ===

    /// Create the bank for `asset`; admin only
    pub fn init_bank(
        &mut self,
        caller: &UserId,
        asset: AssetId,
        params: BankParams,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        let result = self.try_init_bank(caller, asset, params, now);
        reject(OperationKind::InitBank, caller, result)
    }

    fn try_init_bank(
        &mut self,
        caller: &UserId,
        asset: AssetId,
        params: BankParams,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        if *caller != self.config.admin {
            return Err(ProtocolError::Unauthorized(caller.clone()));
        }
        params
            .validate()
            .map_err(|e| ProtocolError::InvalidConfig(e.to_string()))?;

        let key = self.bank_key(&asset);
        if self.store.get(&key)?.is_some() {
            return Err(ProtocolError::BankAlreadyExists(asset));
        }

        let bank = Bank::new(asset.clone(), caller.clone(), params, now);
        let op = OperationRecord::new(OperationKind::InitBank, caller.clone(), now)
            .with_asset(asset, 0)
            .with_record(key, bank);
        self.commit(op, Vec::new())
    }

    /// Create an empty position for `user`
    pub fn init_user(&mut self, user: &UserId, now: Timestamp) -> Result<OperationRecord> {
        let key = self.user_key(user);
        let result = match self.store.get(&key) {
            Err(e) => Err(e.into()),
            Ok(Some(_)) => Err(ProtocolError::UserAlreadyExists(user.clone())),
            Ok(None) => {
                let op = OperationRecord::new(OperationKind::InitUser, user.clone(), now)
                    .with_record(key, UserPosition::new(user.clone(), now));
                self.commit(op, Vec::new())
            }
        };
        reject(OperationKind::InitUser, user, result)
    }

    /// Scaffolding mint of `amount` into the user's wallet
    pub fn airdrop(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        let result = require_amount(amount).and_then(|()| {
            self.load_bank(asset)?;
            let leg = (
                Transfer::new(
                    CustodyAccount::External,
                    CustodyAccount::Wallet(user.clone()),
                    asset.clone(),
                    amount,
                ),
                Authority::Protocol,
            );
            let op = OperationRecord::new(OperationKind::Airdrop, user.clone(), now)
                .with_asset(asset.clone(), amount);
            self.commit(op, vec![leg])
        });
        reject(OperationKind::Airdrop, user, result)
    }

    // === Deposit ===

    pub fn deposit(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        let result = self.try_deposit(user, asset, amount, now);
        reject(OperationKind::Deposit, user, result)
    }

    fn try_deposit(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        require_amount(amount)?;
        let bank = self.load_bank(asset)?;
        let mut position = self.load_position(user)?;

        let mut bank = self.accrual.accrue(&bank, now)?;
        let shares = shares_down(amount, bank.deposit_index).ok_or_else(|| overflow("deposit shares"))?;
        if shares.is_zero() {
            return Err(ProtocolError::InvalidAmount(format!(
                "{amount} is too small to mint shares"
            )));
        }

        bank.add_deposit_shares(shares)?;
        position.credit_deposit(asset, shares)?;
        position.last_update_timestamp = now;

        let leg = Self::wallet_leg(&bank, user, amount);
        let op = OperationRecord::new(OperationKind::Deposit, user.clone(), now)
            .with_asset(asset.clone(), amount)
            .with_shares(shares)
            .with_record(self.bank_key(asset), bank)
            .with_record(self.user_key(user), position);
        self.commit(op, vec![leg])
    }

    // === Withdraw ===

    pub async fn withdraw(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        let result = self.try_withdraw(user, asset, amount, now).await;
        reject(OperationKind::Withdraw, user, result)
    }

    async fn try_withdraw(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        require_amount(amount)?;
        let bank = self.load_bank(asset)?;
        let mut position = self.load_position(user)?;

        // Withdrawing collateral under debt needs both prices
        let debt_side = match position.pair() {
            Some((collateral, debt)) if collateral == asset => {
                let debt_bank = self.load_bank(debt)?;
                let collateral_price = self.price(&bank, now).await?;
                let debt_price = self.price(&debt_bank, now).await?;
                Some((debt_bank, collateral_price, debt_price))
            }
            _ => None,
        };

        let mut bank = self.accrual.accrue(&bank, now)?;
        let held = position.deposited(asset);
        let claim = shares_value(held, bank.deposit_index).ok_or_else(|| overflow("deposit claim"))?;
        let withdrawable = native_floor(claim).ok_or_else(|| overflow("withdrawable amount"))?;
        if amount > withdrawable {
            return Err(ProtocolError::InsufficientFunds {
                asset: asset.clone(),
                available: withdrawable,
                requested: amount,
            });
        }
        Self::check_liquidity(&bank, amount)?;

        // Sub-unit remainders of the claim stay behind as shares
        let shares = if Decimal::from(amount) == claim {
            held
        } else {
            shares_up(amount, bank.deposit_index)
                .ok_or_else(|| overflow("withdraw shares"))?
                .min(held)
        };
        bank.remove_deposit_shares(shares)?;
        position.debit_deposit(asset, shares)?;
        position.last_update_timestamp = now;

        let mut op = OperationRecord::new(OperationKind::Withdraw, user.clone(), now)
            .with_asset(asset.clone(), amount)
            .with_shares(shares);

        if let Some((debt_bank, collateral_price, debt_price)) = debt_side {
            let debt_bank = self.accrual.accrue(&debt_bank, now)?;
            self.risk
                .check_withdraw(&position, &bank, &debt_bank, &collateral_price, &debt_price)?;
            op = op.with_record(self.bank_key(&debt_bank.asset), debt_bank);
        }

        let leg = Self::treasury_leg(&bank, user, amount);
        let op = op
            .with_record(self.bank_key(asset), bank)
            .with_record(self.user_key(user), position);
        self.commit(op, vec![leg])
    }

    // === Borrow ===

    pub async fn borrow(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        let result = self.try_borrow(user, asset, amount, now).await;
        reject(OperationKind::Borrow, user, result)
    }

    async fn try_borrow(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        require_amount(amount)?;
        let debt_bank = self.load_bank(asset)?;
        let mut position = self.load_position(user)?;
        let collateral = collateral_for(&position, asset)?;
        let collateral_bank = self.load_bank(&collateral)?;

        let collateral_price = self.price(&collateral_bank, now).await?;
        let debt_price = self.price(&debt_bank, now).await?;

        let collateral_bank = self.accrual.accrue(&collateral_bank, now)?;
        let mut debt_bank = self.accrual.accrue(&debt_bank, now)?;
        Self::check_liquidity(&debt_bank, amount)?;

        let shares = shares_up(amount, debt_bank.borrow_index).ok_or_else(|| overflow("borrow shares"))?;
        debt_bank.add_borrow_shares(shares)?;
        position.credit_borrow(asset, shares)?;
        position.bind_pair(collateral.clone(), asset.clone());
        position.last_update_timestamp = now;

        let report = self.risk.check_borrow(
            &position,
            &collateral_bank,
            &debt_bank,
            &collateral_price,
            &debt_price,
        )?;

        let leg = Self::treasury_leg(&debt_bank, user, amount);
        let op = OperationRecord::new(OperationKind::Borrow, user.clone(), now)
            .with_asset(asset.clone(), amount)
            .with_shares(shares)
            .with_metadata("collateral_asset", collateral.to_string())
            .with_metadata(
                "health_factor",
                report.health_factor.map(|h| h.round_dp(6).to_string()),
            )
            .with_record(self.bank_key(&collateral), collateral_bank)
            .with_record(self.bank_key(asset), debt_bank)
            .with_record(self.user_key(user), position);
        self.commit(op, vec![leg])
    }

    // === Repay ===

    pub fn repay(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        let result = self.try_repay(user, asset, amount, now);
        reject(OperationKind::Repay, user, result)
    }

    fn try_repay(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: u64,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        require_amount(amount)?;
        let bank = self.load_bank(asset)?;
        let mut position = self.load_position(user)?;

        let mut bank = self.accrual.accrue(&bank, now)?;
        let owed_shares = position.borrowed(asset);
        let outstanding = shares_value(owed_shares, bank.borrow_index)
            .and_then(native_ceil)
            .ok_or_else(|| overflow("outstanding debt"))?;
        if amount > outstanding {
            return Err(ProtocolError::OverRepayment {
                asset: asset.clone(),
                outstanding,
                requested: amount,
            });
        }

        let shares = if amount == outstanding {
            owed_shares
        } else {
            shares_down(amount, bank.borrow_index)
                .ok_or_else(|| overflow("repay shares"))?
                .min(owed_shares)
        };
        bank.remove_borrow_shares(shares)?;
        position.debit_borrow(asset, shares)?;
        position.last_update_timestamp = now;

        let leg = Self::wallet_leg(&bank, user, amount);
        let op = OperationRecord::new(OperationKind::Repay, user.clone(), now)
            .with_asset(asset.clone(), amount)
            .with_shares(shares)
            .with_record(self.bank_key(asset), bank)
            .with_record(self.user_key(user), position);
        self.commit(op, vec![leg])
    }

    // === Liquidate ===

    /// Repay part of `target`'s debt in exchange for its collateral plus bonus
    ///
    /// `requested` caps the repay amount below the close-factor limit.
    pub async fn liquidate(
        &mut self,
        liquidator: &UserId,
        target: &UserId,
        requested: Option<u64>,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        let result = self.try_liquidate(liquidator, target, requested, now).await;
        reject(OperationKind::Liquidate, liquidator, result)
    }

    async fn try_liquidate(
        &mut self,
        liquidator: &UserId,
        target: &UserId,
        requested: Option<u64>,
        now: Timestamp,
    ) -> Result<OperationRecord> {
        if liquidator == target {
            return Err(ProtocolError::SelfLiquidation(liquidator.clone()));
        }
        if let Some(amount) = requested {
            require_amount(amount)?;
        }
        let mut position = self.load_position(target)?;
        let Some((collateral, debt)) = position.pair() else {
            return Err(RiskError::PositionHealthy {
                debt_usd: UsdValue::ZERO.to_string(),
                liquidation_limit_usd: UsdValue::ZERO.to_string(),
            }
            .into());
        };
        let (collateral, debt) = (collateral.clone(), debt.clone());
        let collateral_bank = self.load_bank(&collateral)?;
        let debt_bank = self.load_bank(&debt)?;

        let collateral_price = self.price(&collateral_bank, now).await?;
        let debt_price = self.price(&debt_bank, now).await?;

        let mut collateral_bank = self.accrual.accrue(&collateral_bank, now)?;
        let mut debt_bank = self.accrual.accrue(&debt_bank, now)?;

        let plan = self.liquidation.plan(
            &position,
            &collateral_bank,
            &debt_bank,
            &collateral_price,
            &debt_price,
            requested,
        )?;
        Self::check_liquidity(&collateral_bank, plan.seize_amount)?;

        position.debit_borrow(&debt, plan.repay_shares)?;
        position.debit_deposit(&collateral, plan.seize_shares)?;
        position.last_update_timestamp = now;
        debt_bank.remove_borrow_shares(plan.repay_shares)?;
        collateral_bank.remove_deposit_shares(plan.seize_shares)?;

        let mut legs = vec![Self::wallet_leg(&debt_bank, liquidator, plan.repay_amount)];
        if plan.seize_amount > 0 {
            legs.push(Self::treasury_leg(&collateral_bank, liquidator, plan.seize_amount));
        }

        let op = OperationRecord::new(OperationKind::Liquidate, liquidator.clone(), now)
            .with_asset(debt.clone(), plan.repay_amount)
            .with_shares(plan.repay_shares)
            .with_metadata("target", target.to_string())
            .with_metadata("collateral_asset", collateral.to_string())
            .with_metadata("seize_amount", plan.seize_amount)
            .with_metadata("seize_shares", plan.seize_shares.to_string())
            .with_record(self.bank_key(&collateral), collateral_bank)
            .with_record(self.bank_key(&debt), debt_bank)
            .with_record(self.user_key(target), position);
        let op = self.commit(op, legs)?;

        tracing::warn!(
            liquidator = %liquidator,
            target = %target,
            repaid = plan.repay_amount,
            seized = plan.seize_amount,
            repaid_usd = %plan.repaid_usd,
            seized_usd = %plan.seized_usd,
            "Liquidated position"
        );

        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position() -> UserPosition {
        UserPosition::new("alice".parse().unwrap(), 0)
    }

    #[test]
    fn test_collateral_for_single_deposit() {
        let mut pos = position();
        pos.credit_deposit(&AssetId::usdc(), dec!(10)).unwrap();
        assert_eq!(collateral_for(&pos, &AssetId::sol()).unwrap(), AssetId::usdc());
    }

    #[test]
    fn test_collateral_for_requires_deposit() {
        let mut pos = position();
        pos.credit_deposit(&AssetId::sol(), dec!(10)).unwrap();
        let err = collateral_for(&pos, &AssetId::sol()).unwrap_err();
        assert!(matches!(err, ProtocolError::Risk(RiskError::InsufficientCollateral { .. })));
    }

    #[test]
    fn test_collateral_for_bound_pair() {
        let mut pos = position();
        pos.bind_pair(AssetId::usdc(), AssetId::sol());
        pos.credit_borrow(&AssetId::sol(), Decimal::ONE).unwrap();

        assert_eq!(collateral_for(&pos, &AssetId::sol()).unwrap(), AssetId::usdc());
        let other: AssetId = "ETH".parse().unwrap();
        assert!(matches!(
            collateral_for(&pos, &other),
            Err(ProtocolError::UnsupportedAssetPair { .. })
        ));
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert!(matches!(require_amount(0), Err(ProtocolError::InvalidAmount(_))));
        assert!(require_amount(1).is_ok());
    }
}
