//! Lending protocol - state, commit path and read operations

use lendbank_core::math::{native_ceil, native_floor, shares_value};
use lendbank_core::{AssetId, FeedId, Timestamp, UserId};
use lendbank_ledger::{
    Authority, Bank, LedgerStore, OperationRecord, Record, RecordKey, TokenCustody, Transfer,
    UserPosition,
};
use lendbank_oracle::{PriceOracle, PriceOracleAdapter, PriceQuote};
use lendbank_risk::{HealthReport, InterestAccrual, LiquidationEngine, RiskEngine, RiskError};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;

pub(crate) type Result<T> = std::result::Result<T, ProtocolError>;

/// Lending protocol over an injected record store and token custody
pub struct LendingProtocol<S: LedgerStore, C: TokenCustody> {
    pub(crate) config: ProtocolConfig,
    pub(crate) store: S,
    pub(crate) custody: C,
    pub(crate) oracle: PriceOracleAdapter,
    pub(crate) accrual: InterestAccrual,
    pub(crate) risk: RiskEngine,
    pub(crate) liquidation: LiquidationEngine,
}

impl<S: LedgerStore, C: TokenCustody> LendingProtocol<S, C> {
    pub fn new(
        config: ProtocolConfig,
        store: S,
        custody: C,
        oracle: Arc<dyn PriceOracle>,
    ) -> Result<Self> {
        config.validate()?;
        let oracle = PriceOracleAdapter::new(oracle, config.price_policy());
        let accrual = InterestAccrual::new(Box::new(config.interest_model));

        Ok(Self {
            config,
            store,
            custody,
            oracle,
            accrual,
            risk: RiskEngine::new(),
            liquidation: LiquidationEngine::default(),
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    // === Keys and loading ===

    pub fn bank_key(&self, asset: &AssetId) -> RecordKey {
        RecordKey::bank(&self.config.protocol_id, asset)
    }

    pub fn user_key(&self, user: &UserId) -> RecordKey {
        RecordKey::user(&self.config.protocol_id, user)
    }

    pub(crate) fn load_bank(&self, asset: &AssetId) -> Result<Bank> {
        self.store
            .get_bank(&self.bank_key(asset))?
            .ok_or_else(|| ProtocolError::BankNotFound(asset.clone()))
    }

    pub(crate) fn load_position(&self, user: &UserId) -> Result<UserPosition> {
        self.store
            .get_position(&self.user_key(user))?
            .ok_or_else(|| ProtocolError::UserNotFound(user.clone()))
    }

    pub(crate) async fn price(&self, bank: &Bank, now: Timestamp) -> Result<PriceQuote> {
        Ok(self.oracle.get_price(&bank.params.price_feed, now).await?)
    }

    // === Commit ===

    /// Validate and apply a fully computed operation
    ///
    /// Every touched bank must still satisfy `deposits >= borrows`, and
    /// every custody leg is checked before any leg runs.
    pub(crate) fn commit(
        &mut self,
        mut op: OperationRecord,
        legs: Vec<(Transfer, Authority)>,
    ) -> Result<OperationRecord> {
        for (_, record) in &op.records {
            if let Record::Bank(bank) = record {
                if !bank.is_solvent()? {
                    return Err(ProtocolError::Insolvent(bank.asset.clone()));
                }
            }
        }
        self.custody.check_transfers(&legs)?;

        self.store.put_batch(op.records.clone())?;
        for (transfer, authority) in &legs {
            self.custody.transfer(transfer, authority)?;
        }
        op.transfers = legs.into_iter().map(|(t, _)| t).collect();

        tracing::info!(
            kind = %op.kind,
            actor = %op.actor,
            asset = op.asset.as_ref().map(|a| a.to_string()).unwrap_or_default(),
            amount = op.amount,
            shares = %op.shares,
            "Committed operation"
        );
        Ok(op)
    }

    // === Queries ===

    pub fn bank(&self, asset: &AssetId) -> Result<Bank> {
        self.load_bank(asset)
    }

    pub fn position(&self, user: &UserId) -> Result<UserPosition> {
        self.load_position(user)
    }

    /// Native units the user could withdraw at the bank's last update,
    /// rounded down
    pub fn deposited_amount(&self, user: &UserId, asset: &AssetId) -> Result<u64> {
        let bank = self.load_bank(asset)?;
        let position = self.load_position(user)?;
        shares_value(position.deposited(asset), bank.deposit_index)
            .and_then(native_floor)
            .ok_or_else(|| RiskError::Overflow("deposited amount").into())
    }

    /// Native units the user owes at the bank's last update, rounded up
    pub fn borrowed_amount(&self, user: &UserId, asset: &AssetId) -> Result<u64> {
        let bank = self.load_bank(asset)?;
        let position = self.load_position(user)?;
        shares_value(position.borrowed(asset), bank.borrow_index)
            .and_then(native_ceil)
            .ok_or_else(|| RiskError::Overflow("borrowed amount").into())
    }

    /// Health of a position at `now`; accrual happens in memory only.
    /// `None` when the position carries no debt.
    pub async fn health(&self, user: &UserId, now: Timestamp) -> Result<Option<HealthReport>> {
        let position = self.load_position(user)?;
        let mut prices = HashMap::new();
        self.health_with_prices(&position, now, &mut prices).await
    }

    /// Positions that can currently be liquidated, with their health
    pub async fn liquidatable_positions(
        &self,
        now: Timestamp,
    ) -> Result<Vec<(UserId, HealthReport)>> {
        let mut prices = HashMap::new();
        let mut found = Vec::new();

        for key in self.store.keys()? {
            if key.protocol() != self.config.protocol_id || !matches!(key, RecordKey::User { .. }) {
                continue;
            }
            let Some(position) = self.store.get_position(&key)? else {
                continue;
            };
            if let Some(report) = self.health_with_prices(&position, now, &mut prices).await? {
                if report.is_liquidatable {
                    found.push((position.owner.clone(), report));
                }
            }
        }

        tracing::debug!(count = found.len(), "Scanned for liquidatable positions");
        Ok(found)
    }

    async fn health_with_prices(
        &self,
        position: &UserPosition,
        now: Timestamp,
        prices: &mut HashMap<FeedId, PriceQuote>,
    ) -> Result<Option<HealthReport>> {
        let Some((collateral, debt)) = position.pair() else {
            return Ok(None);
        };
        let collateral_bank = self.accrual.accrue(&self.load_bank(collateral)?, now)?;
        let debt_bank = self.accrual.accrue(&self.load_bank(debt)?, now)?;

        let collateral_price = self.cached_price(&collateral_bank, now, prices).await?;
        let debt_price = self.cached_price(&debt_bank, now, prices).await?;

        Ok(Some(self.risk.compute_health(
            position,
            &collateral_bank,
            &debt_bank,
            &collateral_price,
            &debt_price,
        )?))
    }

    async fn cached_price(
        &self,
        bank: &Bank,
        now: Timestamp,
        prices: &mut HashMap<FeedId, PriceQuote>,
    ) -> Result<PriceQuote> {
        if let Some(quote) = prices.get(&bank.params.price_feed) {
            return Ok(quote.clone());
        }
        let quote = self.price(bank, now).await?;
        prices.insert(bank.params.price_feed.clone(), quote.clone());
        Ok(quote)
    }
}
