//! Protocol errors

use lendbank_core::{AssetId, UserId};
use lendbank_ledger::{CustodyError, LedgerError, StoreError};
use lendbank_oracle::OracleError;
use lendbank_risk::RiskError;
use strum_macros::Display;
use thiserror::Error;

/// Coarse failure classes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    /// Missing/duplicate records, bad input, wrong caller, state preconditions
    Configuration,
    /// Stale, unavailable or invalid oracle data
    Price,
    /// Balance, liquidity or collateral shortfall
    InsufficientResource,
    /// Would break an invariant, or arithmetic/clock failure
    SolvencyViolation,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Bank already exists: {0}")]
    BankAlreadyExists(AssetId),

    #[error("Bank not found: {0}")]
    BankNotFound(AssetId),

    #[error("User already exists: {0}")]
    UserAlreadyExists(UserId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Unauthorized: {0} is not the protocol admin")]
    Unauthorized(UserId),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unsupported asset pair: collateral {collateral}, debt {debt}")]
    UnsupportedAssetPair { collateral: String, debt: String },

    #[error("Self-liquidation is not allowed: {0}")]
    SelfLiquidation(UserId),

    #[error("Insufficient funds in {asset}: available {available}, requested {requested}")]
    InsufficientFunds {
        asset: AssetId,
        available: u64,
        requested: u64,
    },

    #[error("Insufficient liquidity in {asset}: available {available}, requested {requested}")]
    InsufficientLiquidity {
        asset: AssetId,
        available: u64,
        requested: u64,
    },

    #[error("Over-repayment in {asset}: outstanding {outstanding}, requested {requested}")]
    OverRepayment {
        asset: AssetId,
        outstanding: u64,
        requested: u64,
    },

    #[error("Bank would become insolvent: {0}")]
    Insolvent(AssetId),

    #[error("Oracle error: {0}")]
    Price(#[from] OracleError),

    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),
}

impl ProtocolError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::BankAlreadyExists(_)
            | Self::BankNotFound(_)
            | Self::UserAlreadyExists(_)
            | Self::UserNotFound(_)
            | Self::Unauthorized(_)
            | Self::InvalidConfig(_)
            | Self::InvalidAmount(_)
            | Self::UnsupportedAssetPair { .. }
            | Self::SelfLiquidation(_) => ErrorClass::Configuration,

            Self::Price(_) => ErrorClass::Price,

            Self::InsufficientFunds { .. }
            | Self::InsufficientLiquidity { .. }
            | Self::OverRepayment { .. } => ErrorClass::InsufficientResource,

            Self::Insolvent(_) | Self::Ledger(_) | Self::Store(_) => ErrorClass::SolvencyViolation,

            Self::Risk(e) => match e {
                RiskError::Price(_) => ErrorClass::Price,
                RiskError::PositionHealthy { .. } => ErrorClass::Configuration,
                RiskError::InsufficientCollateral { .. }
                | RiskError::WithdrawalExceedsCollateral { .. }
                | RiskError::SeizeExceedsCollateral(_) => ErrorClass::InsufficientResource,
                RiskError::ClockSkew { .. }
                | RiskError::Overflow(_)
                | RiskError::Ledger(_)
                | RiskError::Valuation(_) => ErrorClass::SolvencyViolation,
            },

            Self::Custody(e) => match e {
                CustodyError::InsufficientBalance { .. } => ErrorClass::InsufficientResource,
                CustodyError::AuthorityMismatch { .. } => ErrorClass::Configuration,
                CustodyError::Overflow { .. } => ErrorClass::SolvencyViolation,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            ProtocolError::BankAlreadyExists(AssetId::usdc()).class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            ProtocolError::Risk(RiskError::ClockSkew { last_update: 10, now: 5 }).class(),
            ErrorClass::SolvencyViolation
        );
        assert_eq!(
            ProtocolError::Price(OracleError::UnavailableFeed {
                feed: "sol-usd".parse().unwrap(),
                reason: "missing".to_string(),
            })
            .class(),
            ErrorClass::Price
        );
        assert_eq!(
            ProtocolError::OverRepayment {
                asset: AssetId::sol(),
                outstanding: 1,
                requested: 2,
            }
            .class(),
            ErrorClass::InsufficientResource
        );
        assert_eq!(ErrorClass::InsufficientResource.to_string(), "insufficient_resource");
    }
}
