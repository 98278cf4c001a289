//! Journal event

use chrono::{DateTime, Utc};
use lendbank_ledger::OperationRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One committed operation as stored in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the journal, starting at 1
    pub sequence: u64,
    /// Wall-clock time derived from the operation timestamp
    pub recorded_at: DateTime<Utc>,
    pub correlation_id: String,
    pub operation: OperationRecord,
}

impl LedgerEvent {
    pub fn new(sequence: u64, operation: OperationRecord) -> Self {
        let recorded_at = DateTime::<Utc>::from_timestamp(operation.timestamp, 0).unwrap_or_else(Utc::now);
        Self {
            sequence,
            recorded_at,
            correlation_id: Uuid::new_v4().to_string(),
            operation,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}
