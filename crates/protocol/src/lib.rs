//! LendBank Protocol - Lending operations
//!
//! `LendingProtocol` is the public state-transition surface:
//! InitBank, InitUser, Deposit, Withdraw, Borrow, Repay, Liquidate.
//!
//! Every operation loads records, reads and validates prices, accrues the
//! touched banks, computes the whole post-state on owned copies, validates
//! it, and only then moves tokens and writes records. A failed operation
//! leaves store and custody untouched.

pub mod config;
pub mod error;
mod operations;
mod protocol;

pub use config::ProtocolConfig;
pub use error::{ErrorClass, ProtocolError};
pub use protocol::LendingProtocol;
