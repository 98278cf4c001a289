//! Mock Oracle for testing
//!
//! Holds fixed quotes that tests update to move prices or age them.

use async_trait::async_trait;
use lendbank_core::{FeedId, Timestamp};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::OracleError;
use crate::types::{PriceOracle, PriceQuote};

/// Mock Price Oracle for testing
pub struct MockOracle {
    quotes: RwLock<HashMap<FeedId, PriceQuote>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            quotes: RwLock::new(HashMap::new()),
        }
    }

    /// Store a quote, replacing any previous one for the same feed
    pub fn set_quote(&self, quote: PriceQuote) {
        let mut quotes = self.quotes.write().unwrap_or_else(PoisonError::into_inner);
        quotes.insert(quote.feed.clone(), quote);
    }

    /// Set a zero-confidence price
    pub fn set_price(&self, feed: &FeedId, price: i64, exponent: i32, publish_time: Timestamp) {
        self.set_quote(PriceQuote::new(feed.clone(), price, 0, exponent, publish_time));
    }

    /// Remove a feed (for testing unavailable-feed errors)
    pub fn remove(&self, feed: &FeedId) {
        let mut quotes = self.quotes.write().unwrap_or_else(PoisonError::into_inner);
        quotes.remove(feed);
    }

    pub fn feed_count(&self) -> usize {
        self.quotes.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn read_price(&self, feed: &FeedId) -> Result<PriceQuote, OracleError> {
        let quotes = self.quotes.read().unwrap_or_else(PoisonError::into_inner);
        quotes
            .get(feed)
            .cloned()
            .ok_or_else(|| OracleError::UnavailableFeed {
                feed: feed.clone(),
                reason: "feed not registered".to_string(),
            })
    }

    async fn supported_feeds(&self) -> Vec<FeedId> {
        let quotes = self.quotes.read().unwrap_or_else(PoisonError::into_inner);
        quotes.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(name: &str) -> FeedId {
        name.parse().unwrap()
    }

    #[tokio::test]
    async fn test_set_and_read_price() {
        let oracle = MockOracle::new();
        let sol = feed("sol-usd");

        assert!(oracle.read_price(&sol).await.is_err());

        oracle.set_price(&sol, 150_000_000, -6, 1_700_000_000);
        let quote = oracle.read_price(&sol).await.unwrap();
        assert_eq!(quote.price, 150_000_000);
        assert_eq!(quote.publish_time, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_unknown_feed_unavailable() {
        let oracle = MockOracle::new();
        let result = oracle.read_price(&feed("doge-usd")).await;
        assert!(matches!(result, Err(OracleError::UnavailableFeed { .. })));
    }

    #[tokio::test]
    async fn test_remove_feed() {
        let oracle = MockOracle::new();
        let usdc = feed("usdc-usd");
        oracle.set_price(&usdc, 1_000_000, -6, 0);
        assert!(oracle.is_supported(&usdc).await);

        oracle.remove(&usdc);
        assert_eq!(oracle.feed_count(), 0);
        assert!(!oracle.is_supported(&usdc).await);
    }
}
