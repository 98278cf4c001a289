//! AssetId - Type-safe asset codes
//!
//! Every bank is keyed by one asset. Codes are normalized to uppercase
//! so `usdc` and `USDC` address the same bank.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing asset codes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Empty asset code")]
    EmptyCode,

    #[error("Asset code too long (max 10 chars): {0}")]
    TooLong(String),

    #[error("Invalid asset code format: {0}")]
    InvalidFormat(String),
}

/// Asset code of a supported token
///
/// # Examples
/// ```
/// use lendbank_core::AssetId;
///
/// let usdc: AssetId = "usdc".parse().unwrap();
/// assert_eq!(usdc, AssetId::usdc());
/// assert_eq!(usdc.to_string(), "USDC");
///
/// assert!("SOL-USD".parse::<AssetId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    /// USD Coin
    pub fn usdc() -> Self {
        Self("USDC".to_string())
    }

    /// Solana
    pub fn sol() -> Self {
        Self("SOL".to_string())
    }

    /// Returns the asset code as a string slice
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();

        if s.is_empty() {
            return Err(AssetError::EmptyCode);
        }

        if s.len() > 10 {
            return Err(AssetError::TooLong(s));
        }

        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AssetError::InvalidFormat(s));
        }

        Ok(Self(s))
    }
}

impl TryFrom<String> for AssetId {
    type Error = AssetError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AssetId> for String {
    fn from(asset: AssetId) -> Self {
        asset.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        assert_eq!("sol".parse::<AssetId>().unwrap(), AssetId::sol());
        assert_eq!(" Usdc ".parse::<AssetId>().unwrap(), AssetId::usdc());
    }

    #[test]
    fn test_empty_code_error() {
        let result: Result<AssetId, _> = "".parse();
        assert!(matches!(result, Err(AssetError::EmptyCode)));
    }

    #[test]
    fn test_too_long_error() {
        let result: Result<AssetId, _> = "VERYLONGASSETNAME".parse();
        assert!(matches!(result, Err(AssetError::TooLong(_))));
    }

    #[test]
    fn test_invalid_format_error() {
        let result: Result<AssetId, _> = "SOL/USD".parse();
        assert!(matches!(result, Err(AssetError::InvalidFormat(_))));
    }

    #[test]
    fn test_serde_rejects_invalid_code() {
        let parsed: Result<AssetId, _> = serde_json::from_str("\"BAD CODE\"");
        assert!(parsed.is_err());

        let parsed: AssetId = serde_json::from_str("\"sol\"").unwrap();
        assert_eq!(parsed, AssetId::sol());
    }
}
