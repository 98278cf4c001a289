//! Record store - injected key-value persistence

use std::collections::BTreeMap;
use thiserror::Error;

use crate::bank::Bank;
use crate::key::{Record, RecordKey, RecordKind};
use crate::position::UserPosition;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record kind mismatch at {key}: expected {expected}")]
    KindMismatch { key: String, expected: RecordKind },

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Key-value store holding banks and positions
pub trait LedgerStore: Send {
    fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError>;

    fn put(&mut self, key: RecordKey, record: Record) -> Result<(), StoreError>;

    /// All keys currently stored, in key order
    fn keys(&self) -> Result<Vec<RecordKey>, StoreError>;

    /// Write several records as one unit; every pair is checked before any
    /// write happens
    fn put_batch(&mut self, records: Vec<(RecordKey, Record)>) -> Result<(), StoreError> {
        for (key, record) in &records {
            check_kind(key, record)?;
        }
        for (key, record) in records {
            self.put(key, record)?;
        }
        Ok(())
    }

    fn get_bank(&self, key: &RecordKey) -> Result<Option<Bank>, StoreError> {
        match self.get(key)? {
            None => Ok(None),
            Some(Record::Bank(bank)) => Ok(Some(bank)),
            Some(_) => Err(StoreError::KindMismatch {
                key: key.to_string(),
                expected: RecordKind::Bank,
            }),
        }
    }

    fn get_position(&self, key: &RecordKey) -> Result<Option<UserPosition>, StoreError> {
        match self.get(key)? {
            None => Ok(None),
            Some(Record::Position(position)) => Ok(Some(position)),
            Some(_) => Err(StoreError::KindMismatch {
                key: key.to_string(),
                expected: RecordKind::User,
            }),
        }
    }
}

fn check_kind(key: &RecordKey, record: &Record) -> Result<(), StoreError> {
    if key.kind() != record.kind() {
        return Err(StoreError::KindMismatch {
            key: key.to_string(),
            expected: key.kind(),
        });
    }
    Ok(())
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<RecordKey, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl LedgerStore for MemoryStore {
    fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        Ok(self.records.get(key).cloned())
    }

    fn put(&mut self, key: RecordKey, record: Record) -> Result<(), StoreError> {
        check_kind(&key, &record)?;
        self.records.insert(key, record);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<RecordKey>, StoreError> {
        Ok(self.records.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendbank_core::{AssetId, Bps};

    use crate::bank::BankParams;

    fn bank() -> Bank {
        let params = BankParams::new(
            Bps::new(8_000),
            Bps::new(8_500),
            Bps::new(500),
            Bps::new(500),
            6,
            "usdc-usd".parse().unwrap(),
        );
        Bank::new(AssetId::usdc(), "admin".parse().unwrap(), params, 0)
    }

    #[test]
    fn test_put_and_get_typed() {
        let mut store = MemoryStore::new();
        let key = RecordKey::bank("lendbank", &AssetId::usdc());

        store.put(key.clone(), bank().into()).unwrap();
        assert_eq!(store.get_bank(&key).unwrap(), Some(bank()));
        assert!(matches!(
            store.get_position(&key),
            Err(StoreError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut store = MemoryStore::new();
        let key = RecordKey::user("lendbank", &"alice".parse().unwrap());
        assert!(store.put(key, bank().into()).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let mut store = MemoryStore::new();
        let alice = "alice".parse().unwrap();
        let good = (
            RecordKey::user("lendbank", &alice),
            UserPosition::new(alice.clone(), 0).into(),
        );
        let bad = (RecordKey::user("lendbank", &alice), bank().into());

        assert!(store.put_batch(vec![good.clone(), bad]).is_err());
        assert!(store.is_empty());

        store.put_batch(vec![good]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.keys().unwrap().len(), 1);
    }
}
