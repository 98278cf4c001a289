//! LendBank Price Oracle
//!
//! Reads USD quotes for bank assets and rejects stale or malformed data.
//! `MockOracle` serves tests, `FileOracle` reads a JSON feed file for the CLI.

mod adapter;
mod error;
mod file;
mod mock;
mod types;

pub use adapter::{PriceOracleAdapter, PricePolicy};
pub use error::OracleError;
pub use file::FileOracle;
pub use mock::MockOracle;
pub use types::{PriceOracle, PriceQuote};
