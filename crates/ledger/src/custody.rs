//! Token custody - wallet and treasury balances
//!
//! Custody is the only place tokens physically move. Treasury accounts are
//! controlled by the protocol authority, wallets by their owner. `External`
//! is an unbounded source/sink used for airdrops.

use lendbank_core::{AssetId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("Insufficient balance in {account} for {asset}: available {available}, required {required}")]
    InsufficientBalance {
        account: CustodyAccount,
        asset: AssetId,
        available: u64,
        required: u64,
    },

    #[error("Authority mismatch: {authority} cannot move funds out of {account}")]
    AuthorityMismatch {
        account: CustodyAccount,
        authority: Authority,
    },

    #[error("Balance overflow in {account} for {asset}")]
    Overflow { account: CustodyAccount, asset: AssetId },
}

/// A token account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustodyAccount {
    External,
    Wallet(UserId),
    Treasury(AssetId),
}

impl fmt::Display for CustodyAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => write!(f, "external"),
            Self::Wallet(user) => write!(f, "wallet:{}", user),
            Self::Treasury(asset) => write!(f, "treasury:{}", asset),
        }
    }
}

/// Signer of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    Protocol,
    User(UserId),
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol => write!(f, "protocol"),
            Self::User(user) => write!(f, "user:{}", user),
        }
    }
}

impl Authority {
    /// Whether this authority may debit `account`
    pub fn controls(&self, account: &CustodyAccount) -> bool {
        match (self, account) {
            (Self::User(signer), CustodyAccount::Wallet(owner)) => signer == owner,
            (Self::Protocol, CustodyAccount::Treasury(_)) => true,
            (Self::Protocol, CustodyAccount::External) => true,
            _ => false,
        }
    }
}

/// One token movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: CustodyAccount,
    pub to: CustodyAccount,
    pub asset: AssetId,
    pub amount: u64,
}

impl Transfer {
    pub fn new(from: CustodyAccount, to: CustodyAccount, asset: AssetId, amount: u64) -> Self {
        Self {
            from,
            to,
            asset,
            amount,
        }
    }
}

/// Token custody backend
pub trait TokenCustody: Send {
    /// Current balance; `External` reports `u64::MAX`
    fn balance(&self, account: &CustodyAccount, asset: &AssetId) -> u64;

    fn transfer(&mut self, transfer: &Transfer, authority: &Authority) -> Result<(), CustodyError>;

    /// Check authority and cumulative balances for a sequence of legs
    /// without moving anything
    fn check_transfers(&self, legs: &[(Transfer, Authority)]) -> Result<(), CustodyError> {
        let mut debits: HashMap<(&CustodyAccount, &AssetId), u64> = HashMap::new();

        for (transfer, authority) in legs {
            if !authority.controls(&transfer.from) {
                return Err(CustodyError::AuthorityMismatch {
                    account: transfer.from.clone(),
                    authority: authority.clone(),
                });
            }
            if transfer.from == CustodyAccount::External {
                continue;
            }

            let debit = debits.entry((&transfer.from, &transfer.asset)).or_insert(0);
            *debit = debit.checked_add(transfer.amount).ok_or_else(|| CustodyError::Overflow {
                account: transfer.from.clone(),
                asset: transfer.asset.clone(),
            })?;

            let available = self.balance(&transfer.from, &transfer.asset);
            if *debit > available {
                return Err(CustodyError::InsufficientBalance {
                    account: transfer.from.clone(),
                    asset: transfer.asset.clone(),
                    available,
                    required: *debit,
                });
            }
        }
        Ok(())
    }
}

/// In-memory custody
#[derive(Debug, Default, Clone)]
pub struct MemoryCustody {
    balances: HashMap<(CustodyAccount, AssetId), u64>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move balances without an authority check (journal replay)
    pub fn apply(&mut self, transfer: &Transfer) -> Result<(), CustodyError> {
        if transfer.from != CustodyAccount::External {
            let key = (transfer.from.clone(), transfer.asset.clone());
            let available = self.balances.get(&key).copied().unwrap_or(0);
            if available < transfer.amount {
                return Err(CustodyError::InsufficientBalance {
                    account: transfer.from.clone(),
                    asset: transfer.asset.clone(),
                    available,
                    required: transfer.amount,
                });
            }
            self.balances.insert(key, available - transfer.amount);
        }

        if transfer.to != CustodyAccount::External {
            let entry = self
                .balances
                .entry((transfer.to.clone(), transfer.asset.clone()))
                .or_insert(0);
            *entry = entry.checked_add(transfer.amount).ok_or_else(|| CustodyError::Overflow {
                account: transfer.to.clone(),
                asset: transfer.asset.clone(),
            })?;
        }
        Ok(())
    }
}

impl TokenCustody for MemoryCustody {
    fn balance(&self, account: &CustodyAccount, asset: &AssetId) -> u64 {
        if *account == CustodyAccount::External {
            return u64::MAX;
        }
        self.balances
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&mut self, transfer: &Transfer, authority: &Authority) -> Result<(), CustodyError> {
        if !authority.controls(&transfer.from) {
            return Err(CustodyError::AuthorityMismatch {
                account: transfer.from.clone(),
                authority: authority.clone(),
            });
        }
        self.apply(transfer)?;
        tracing::debug!(
            from = %transfer.from,
            to = %transfer.to,
            asset = %transfer.asset,
            amount = transfer.amount,
            "Custody transfer"
        );
        Ok(())
    }
}
