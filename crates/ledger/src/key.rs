//! Record addressing
//!
//! Keys are derived deterministically from the protocol id and the asset or
//! user they address, rendered as `BANK:<protocol>:<asset>` and
//! `USER:<protocol>:<user>`.

use lendbank_core::{AssetId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

use crate::bank::Bank;
use crate::error::LedgerError;
use crate::position::UserPosition;

/// Kind of persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    Bank,
    User,
}

/// Address of a persisted record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordKey {
    Bank { protocol: String, asset: AssetId },
    User { protocol: String, user: UserId },
}

impl RecordKey {
    pub fn bank(protocol: &str, asset: &AssetId) -> Self {
        Self::Bank {
            protocol: protocol.to_string(),
            asset: asset.clone(),
        }
    }

    pub fn user(protocol: &str, user: &UserId) -> Self {
        Self::User {
            protocol: protocol.to_string(),
            user: user.clone(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Bank { .. } => RecordKind::Bank,
            Self::User { .. } => RecordKind::User,
        }
    }

    pub fn protocol(&self) -> &str {
        match self {
            Self::Bank { protocol, .. } | Self::User { protocol, .. } => protocol,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bank { protocol, asset } => write!(f, "BANK:{}:{}", protocol, asset),
            Self::User { protocol, user } => write!(f, "USER:{}:{}", protocol, user),
        }
    }
}

impl FromStr for RecordKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidKey(s.to_string());

        let parts: Vec<&str> = s.split(':').collect();
        let [kind, protocol, id] = parts.as_slice() else {
            return Err(invalid());
        };
        if protocol.is_empty() {
            return Err(invalid());
        }

        let kind = RecordKind::from_str(kind).map_err(|_| invalid())?;
        match kind {
            RecordKind::Bank => Ok(Self::Bank {
                protocol: protocol.to_string(),
                asset: id.parse().map_err(|_| invalid())?,
            }),
            RecordKind::User => Ok(Self::User {
                protocol: protocol.to_string(),
                user: id.parse().map_err(|_| invalid())?,
            }),
        }
    }
}

impl TryFrom<String> for RecordKey {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> Self {
        key.to_string()
    }
}

/// A persisted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Record {
    Bank(Bank),
    Position(UserPosition),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Bank(_) => RecordKind::Bank,
            Self::Position(_) => RecordKind::User,
        }
    }
}

impl From<Bank> for Record {
    fn from(bank: Bank) -> Self {
        Self::Bank(bank)
    }
}

impl From<UserPosition> for Record {
    fn from(position: UserPosition) -> Self {
        Self::Position(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rendering() {
        let key = RecordKey::bank("lendbank", &AssetId::usdc());
        assert_eq!(key.to_string(), "BANK:lendbank:USDC");

        let key = RecordKey::user("lendbank", &"alice".parse().unwrap());
        assert_eq!(key.to_string(), "USER:lendbank:alice");
        assert_eq!(key.kind(), RecordKind::User);
    }

    #[test]
    fn test_key_parse() {
        let key: RecordKey = "BANK:lendbank:sol".parse().unwrap();
        assert_eq!(key, RecordKey::bank("lendbank", &AssetId::sol()));
        assert_eq!(key.protocol(), "lendbank");

        assert!("VAULT:lendbank:SOL".parse::<RecordKey>().is_err());
        assert!("BANK::SOL".parse::<RecordKey>().is_err());
        assert!("BANK:lendbank".parse::<RecordKey>().is_err());
        assert!("USER:lendbank:bob:extra".parse::<RecordKey>().is_err());
    }

    #[test]
    fn test_key_serde_as_string() {
        let key = RecordKey::user("lendbank", &"bob".parse().unwrap());
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"USER:lendbank:bob\"");

        let back: RecordKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
