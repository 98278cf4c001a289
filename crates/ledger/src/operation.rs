//! Operation records - what one committed operation changed

use lendbank_core::{AssetId, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

use crate::custody::Transfer;
use crate::key::{Record, RecordKey};

/// Operation kinds of the ledger state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    InitBank,
    InitUser,
    Deposit,
    Withdraw,
    Borrow,
    Repay,
    Liquidate,
    /// Scaffolding mint into a wallet
    Airdrop,
}

/// Post-state of every touched record plus the custody legs that ran
///
/// Replaying `records` and `transfers` in journal order rebuilds the store
/// and custody balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub kind: OperationKind,
    /// Caller (admin, depositor, liquidator)
    pub actor: UserId,
    pub asset: Option<AssetId>,
    pub amount: u64,
    /// Shares minted or burned on the caller's position
    pub shares: Decimal,
    pub timestamp: Timestamp,
    pub records: Vec<(RecordKey, Record)>,
    pub transfers: Vec<Transfer>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl OperationRecord {
    pub fn new(kind: OperationKind, actor: UserId, timestamp: Timestamp) -> Self {
        Self {
            kind,
            actor,
            asset: None,
            amount: 0,
            shares: Decimal::ZERO,
            timestamp,
            records: Vec::new(),
            transfers: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_asset(mut self, asset: AssetId, amount: u64) -> Self {
        self.asset = Some(asset);
        self.amount = amount;
        self
    }

    pub fn with_shares(mut self, shares: Decimal) -> Self {
        self.shares = shares;
        self
    }

    pub fn with_record(mut self, key: RecordKey, record: impl Into<Record>) -> Self {
        self.records.push((key, record.into()));
        self
    }

    pub fn with_transfer(mut self, transfer: Transfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::CustodyAccount;
    use crate::position::UserPosition;

    #[test]
    fn test_kind_display() {
        assert_eq!(OperationKind::InitBank.to_string(), "init_bank");
        assert_eq!("liquidate".parse::<OperationKind>().unwrap(), OperationKind::Liquidate);
    }

    #[test]
    fn test_record_serializes_to_json() {
        let alice: UserId = "alice".parse().unwrap();
        let op = OperationRecord::new(OperationKind::Deposit, alice.clone(), 10)
            .with_asset(AssetId::usdc(), 100)
            .with_record(
                RecordKey::user("lendbank", &alice),
                UserPosition::new(alice.clone(), 10),
            )
            .with_transfer(Transfer::new(
                CustodyAccount::Wallet(alice.clone()),
                CustodyAccount::Treasury(AssetId::usdc()),
                AssetId::usdc(),
                100,
            ))
            .with_metadata("note", "test");

        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"USER:lendbank:alice\""));
        assert!(json.contains("\"deposit\""));

        let back: OperationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
