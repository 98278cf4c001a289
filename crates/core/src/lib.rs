//! LendBank Core - Domain types
//!
//! This crate contains the fundamental types used across LendBank:
//! - `AssetId`: Validated asset codes (USDC, SOL, ...)
//! - `UserId` / `FeedId`: Identities of position owners and price feeds
//! - `Bps`: Basis-point configuration values
//! - `UsdValue`: Non-negative USD valuation
//! - `math`: Index-based share conversions with explicit rounding

pub mod asset;
pub mod bps;
pub mod identity;
pub mod math;
pub mod value;

pub use asset::{AssetError, AssetId};
pub use bps::{Bps, BPS_DENOMINATOR};
pub use identity::{FeedId, IdentityError, UserId};
pub use value::{UsdValue, ValueError};

/// Unix timestamp in seconds
pub type Timestamp = i64;
