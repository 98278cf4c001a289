//! Risk engine errors

use lendbank_core::{Timestamp, ValueError};
use lendbank_ledger::LedgerError;
use lendbank_oracle::OracleError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error("Clock skew: last update {last_update}, now {now}")]
    ClockSkew { last_update: Timestamp, now: Timestamp },

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Price(#[from] OracleError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Valuation(#[from] ValueError),

    #[error("Insufficient collateral: debt {debt_usd} exceeds borrow limit {max_borrowable_usd}")]
    InsufficientCollateral {
        debt_usd: String,
        max_borrowable_usd: String,
    },

    #[error("Withdrawal exceeds collateral: debt {debt_usd} exceeds borrow limit {max_borrowable_usd}")]
    WithdrawalExceedsCollateral {
        debt_usd: String,
        max_borrowable_usd: String,
    },

    #[error("Position is healthy: debt {debt_usd} within liquidation limit {liquidation_limit_usd}")]
    PositionHealthy {
        debt_usd: String,
        liquidation_limit_usd: String,
    },

    #[error("Seizure exceeds collateral: {0}")]
    SeizeExceedsCollateral(String),
}
