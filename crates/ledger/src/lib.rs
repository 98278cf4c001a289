//! LendBank Ledger - Persistent records of the lending engine
//!
//! # Key Types
//! - `Bank`: Per-asset reserve (configuration, share totals, indexes)
//! - `UserPosition`: Per-user deposited and borrowed shares
//! - `RecordKey` / `Record`: Deterministic addressing of persisted records
//! - `LedgerStore`: Injected key-value store
//! - `TokenCustody`: Wallet/treasury token movements
//! - `OperationRecord`: What one committed operation changed

pub mod bank;
pub mod custody;
pub mod error;
pub mod key;
pub mod operation;
pub mod position;
pub mod store;

pub use bank::{Bank, BankParams};
pub use custody::{Authority, CustodyAccount, CustodyError, MemoryCustody, TokenCustody, Transfer};
pub use error::LedgerError;
pub use key::{Record, RecordKey, RecordKind};
pub use operation::{OperationKind, OperationRecord};
pub use position::UserPosition;
pub use store::{LedgerStore, MemoryStore, StoreError};
