//! Application context - wires everything together

use chrono::Utc;
use lendbank_core::Timestamp;
use lendbank_events::{EventError, EventReader, EventStore, LedgerEvent};
use lendbank_ledger::{CustodyError, LedgerStore, MemoryCustody, MemoryStore, OperationRecord, StoreError};
use lendbank_oracle::FileOracle;
use lendbank_protocol::{LendingProtocol, ProtocolConfig, ProtocolError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type Protocol = LendingProtocol<MemoryStore, MemoryCustody>;

/// Application context - protocol state rebuilt from the journal
///
/// Layout of the data directory:
/// - `config.json`: optional `ProtocolConfig`
/// - `prices.json`: quotes read by `FileOracle`
/// - `journal/`: JSONL operation journal
pub struct AppContext {
    pub protocol: Protocol,
    pub oracle: Arc<FileOracle>,
    pub event_store: EventStore,
    journal_path: PathBuf,
    last_sequence: u64,
    last_timestamp: Option<Timestamp>,
}

impl AppContext {
    /// Create a new application context
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        let journal_path = data_path.join("journal");
        let config_path = data_path.join("config.json");

        std::fs::create_dir_all(&journal_path)?;

        let config = if config_path.exists() {
            ProtocolConfig::from_file(&config_path)?
        } else {
            ProtocolConfig::default()
        };
        let config = config.with_env_overrides()?;

        // Replay events to rebuild state
        let event_store = EventStore::new(&journal_path)?;
        let events = EventReader::from_directory(&journal_path)?.read_all()?;
        let (store, custody) = rebuild(&events)?;

        let last_sequence = events.last().map_or(0, |e| e.sequence);
        let last_timestamp = events.last().map(|e| e.operation.timestamp);

        let oracle = Arc::new(FileOracle::new(data_path.join("prices.json")));
        let protocol = LendingProtocol::new(config, store, custody, oracle.clone())?;

        tracing::info!(
            events = events.len(),
            last_sequence,
            journal = %journal_path.display(),
            "Rebuilt state from journal"
        );

        Ok(Self {
            protocol,
            oracle,
            event_store,
            journal_path,
            last_sequence,
            last_timestamp,
        })
    }

    /// Append an operation the protocol has just committed
    pub fn record(
        &mut self,
        operation: OperationRecord,
        correlation_id: &str,
    ) -> Result<LedgerEvent, CommitError> {
        let event =
            LedgerEvent::new(self.last_sequence + 1, operation).with_correlation_id(correlation_id);

        self.event_store.append(&event)?;

        self.last_sequence = event.sequence;
        self.last_timestamp = Some(event.operation.timestamp);
        Ok(event)
    }

    /// The requested time, or the wall clock
    ///
    /// Never earlier than the last journaled operation, so replay sees
    /// timestamps in journal order.
    pub fn clock(&self, requested: Option<Timestamp>) -> Result<Timestamp, CommitError> {
        let now = requested.unwrap_or_else(|| Utc::now().timestamp());
        match self.last_timestamp {
            Some(last) if now < last => Err(CommitError::ClockRegression {
                last,
                requested: now,
            }),
            _ => Ok(now),
        }
    }

    /// Get journal path
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// Get last sequence number
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

/// Rebuild records and custody balances from journaled operations
///
/// Each event carries the post-state of every record it touched, so
/// records are overwritten in order; transfers are re-applied without
/// authority checks.
pub fn rebuild(events: &[LedgerEvent]) -> Result<(MemoryStore, MemoryCustody), CommitError> {
    let mut store = MemoryStore::new();
    let mut custody = MemoryCustody::new();

    for event in events {
        store.put_batch(event.operation.records.clone())?;
        for transfer in &event.operation.transfers {
            custody.apply(transfer)?;
        }
    }

    Ok((store, custody))
}

/// Errors during commit and replay
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Event store error: {0}")]
    Event(#[from] EventError),

    #[error("Replay store error: {0}")]
    Store(#[from] StoreError),

    #[error("Replay custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Clock moved backwards: {requested} is before last journaled operation at {last}")]
    ClockRegression { last: Timestamp, requested: Timestamp },
}
