//! Price oracle adapter - validated reads
//!
//! Every risk computation goes through `get_price`; a quote that fails any
//! check aborts the enclosing operation instead of being substituted.

use lendbank_core::{FeedId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::OracleError;
use crate::types::{PriceOracle, PriceQuote};

/// Acceptance rules for quotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePolicy {
    /// Maximum `now - publish_time`
    pub max_age_secs: u64,
    /// Maximum confidence interval relative to price; 0 disables the check
    pub max_confidence_bps: u64,
    /// Tolerated clock drift for quotes published slightly ahead of `now`
    pub max_future_drift_secs: u64,
}

impl Default for PricePolicy {
    fn default() -> Self {
        Self {
            max_age_secs: 100,
            max_confidence_bps: 0,
            max_future_drift_secs: 5,
        }
    }
}

impl PricePolicy {
    /// Check a quote against the policy at time `now`
    pub fn validate(&self, quote: &PriceQuote, now: Timestamp) -> Result<(), OracleError> {
        // Rejects non-positive prices and unusable exponents
        quote.usd_price()?;

        let age = i128::from(now) - i128::from(quote.publish_time);
        if age < 0 && age.unsigned_abs() > u128::from(self.max_future_drift_secs) {
            return Err(OracleError::FutureTimestamp {
                feed: quote.feed.clone(),
                publish_time: quote.publish_time,
                now,
            });
        }
        if age > i128::from(self.max_age_secs) {
            return Err(OracleError::StalePrice {
                feed: quote.feed.clone(),
                publish_time: quote.publish_time,
                now,
                max_age_secs: self.max_age_secs,
            });
        }

        if self.max_confidence_bps > 0
            && quote.confidence_bps() > Decimal::from(self.max_confidence_bps)
        {
            return Err(OracleError::InvalidPrice {
                feed: quote.feed.clone(),
                reason: format!(
                    "confidence {} exceeds {} bps of price",
                    quote.confidence, self.max_confidence_bps
                ),
            });
        }

        Ok(())
    }
}

/// Oracle reader enforcing a `PricePolicy`
#[derive(Clone)]
pub struct PriceOracleAdapter {
    oracle: Arc<dyn PriceOracle>,
    policy: PricePolicy,
}

impl PriceOracleAdapter {
    pub fn new(oracle: Arc<dyn PriceOracle>, policy: PricePolicy) -> Self {
        Self { oracle, policy }
    }

    pub fn policy(&self) -> &PricePolicy {
        &self.policy
    }

    /// Read and validate a quote
    pub async fn get_price(&self, feed: &FeedId, now: Timestamp) -> Result<PriceQuote, OracleError> {
        let quote = self.oracle.read_price(feed).await?;

        if let Err(e) = self.policy.validate(&quote, now) {
            tracing::warn!(feed = %feed, error = %e, "Rejected price quote");
            return Err(e);
        }

        tracing::debug!(
            feed = %feed,
            price = quote.price,
            exponent = quote.exponent,
            publish_time = quote.publish_time,
            "Price quote accepted"
        );
        Ok(quote)
    }
}
