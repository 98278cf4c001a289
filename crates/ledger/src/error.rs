//! Ledger errors

use lendbank_core::AssetId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while mutating ledger records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid bank parameters: {0}")]
    InvalidParams(String),

    #[error("Share underflow on {asset}: have {available}, removing {requested}")]
    ShareUnderflow {
        asset: AssetId,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("Invalid record key: {0}")]
    InvalidKey(String),
}
