//! Oracle error types

use lendbank_core::{FeedId, Timestamp};
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Feed account missing or unreadable
    #[error("Price feed unavailable: {feed}: {reason}")]
    UnavailableFeed { feed: FeedId, reason: String },

    /// Price data is older than the allowed age
    #[error("Stale price for {feed}: published at {publish_time}, now {now}, max age {max_age_secs}s")]
    StalePrice {
        feed: FeedId,
        publish_time: Timestamp,
        now: Timestamp,
        max_age_secs: u64,
    },

    /// Publish time lies ahead of the engine clock beyond the allowed drift
    #[error("Price for {feed} published in the future: {publish_time} > {now}")]
    FutureTimestamp {
        feed: FeedId,
        publish_time: Timestamp,
        now: Timestamp,
    },

    /// Price data is unusable (non-positive, too uncertain, bad exponent)
    #[error("Invalid price for {feed}: {reason}")]
    InvalidPrice { feed: FeedId, reason: String },
}
