//! LendBank Events - JSONL operation journal
//!
//! Every committed ledger operation is appended as one `LedgerEvent` line.
//! The journal is the source of truth; the record store and custody
//! balances are rebuilt from it on startup.

pub mod error;
pub mod event;
pub mod reader;
pub mod store;

pub use error::EventError;
pub use event::LedgerEvent;
pub use reader::EventReader;
pub use store::EventStore;
