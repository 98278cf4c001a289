//! Core oracle types

use async_trait::async_trait;
use lendbank_core::math::pow10;
use lendbank_core::{FeedId, Timestamp, BPS_DENOMINATOR};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::OracleError;

/// Largest scale a `Decimal` can carry
const MAX_DECIMAL_SCALE: u32 = 28;

/// A USD price quote as published by a feed
///
/// `usd_price = price * 10^exponent`. Quotes are ephemeral; they are read
/// fresh for every operation and never persisted with bank state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub feed: FeedId,
    pub price: i64,
    pub confidence: u64,
    pub exponent: i32,
    pub publish_time: Timestamp,
}

impl PriceQuote {
    pub fn new(feed: FeedId, price: i64, confidence: u64, exponent: i32, publish_time: Timestamp) -> Self {
        Self {
            feed,
            price,
            confidence,
            exponent,
            publish_time,
        }
    }

    fn invalid(&self, reason: &str) -> OracleError {
        OracleError::InvalidPrice {
            feed: self.feed.clone(),
            reason: reason.to_string(),
        }
    }

    /// USD value of one whole token
    pub fn usd_price(&self) -> Result<Decimal, OracleError> {
        if self.price <= 0 {
            return Err(self.invalid("price must be positive"));
        }

        if self.exponent <= 0 {
            let scale = self.exponent.unsigned_abs();
            if scale > MAX_DECIMAL_SCALE {
                return Err(self.invalid("exponent out of range"));
            }
            Ok(Decimal::new(self.price, scale))
        } else {
            let factor = pow10(self.exponent.unsigned_abs())
                .ok_or_else(|| self.invalid("exponent out of range"))?;
            Decimal::from(self.price)
                .checked_mul(factor)
                .ok_or_else(|| self.invalid("price overflow"))
        }
    }

    /// USD value of `amount` native units of a token with `decimals` decimals
    ///
    /// `usd = amount * price * 10^exponent / 10^decimals`
    pub fn value_of(&self, amount: Decimal, decimals: u8) -> Result<Decimal, OracleError> {
        let unit = pow10(u32::from(decimals)).ok_or_else(|| self.invalid("decimals out of range"))?;
        amount
            .checked_mul(self.usd_price()?)
            .and_then(|v| v.checked_div(unit))
            .ok_or_else(|| self.invalid("valuation overflow"))
    }

    /// Native units of a token worth `usd`, before rounding
    pub fn amount_for(&self, usd: Decimal, decimals: u8) -> Result<Decimal, OracleError> {
        let unit = pow10(u32::from(decimals)).ok_or_else(|| self.invalid("decimals out of range"))?;
        let price = self.usd_price()?;
        usd.checked_mul(unit)
            .and_then(|v| v.checked_div(price))
            .ok_or_else(|| self.invalid("valuation overflow"))
    }

    /// Confidence interval width relative to price, in bps
    pub fn confidence_bps(&self) -> Decimal {
        if self.price <= 0 {
            return Decimal::MAX;
        }
        Decimal::from(self.confidence) * Decimal::from(BPS_DENOMINATOR) / Decimal::from(self.price)
    }
}

/// Price Oracle trait - read side of a price feed
///
/// Implementations:
/// - MockOracle: For testing with fixed quotes
/// - FileOracle: Quotes stored in a JSON file
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Read the latest quote for a feed
    async fn read_price(&self, feed: &FeedId) -> Result<PriceQuote, OracleError>;

    /// All feeds this oracle can serve
    async fn supported_feeds(&self) -> Vec<FeedId>;

    async fn is_supported(&self, feed: &FeedId) -> bool {
        self.supported_feeds().await.contains(feed)
    }
}
