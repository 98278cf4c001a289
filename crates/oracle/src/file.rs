//! JSON file oracle
//!
//! Quotes live in one JSON file: `{ "<feed id>": { ...PriceQuote } }`.
//! The file is re-read on every call so an external publisher can update it.

use async_trait::async_trait;
use lendbank_core::FeedId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::OracleError;
use crate::types::{PriceOracle, PriceQuote};

pub struct FileOracle {
    path: PathBuf,
}

impl FileOracle {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<FeedId, PriceQuote>, std::io::Error> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }

    /// Publish a quote into the file (used by the CLI `set-price` command)
    pub async fn publish(&self, quote: PriceQuote) -> Result<(), std::io::Error> {
        let mut quotes = self.load().await?;
        quotes.insert(quote.feed.clone(), quote);
        let json = serde_json::to_string_pretty(&quotes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&self.path, json).await
    }
}

#[async_trait]
impl PriceOracle for FileOracle {
    async fn read_price(&self, feed: &FeedId) -> Result<PriceQuote, OracleError> {
        let quotes = self.load().await.map_err(|e| OracleError::UnavailableFeed {
            feed: feed.clone(),
            reason: e.to_string(),
        })?;

        quotes.get(feed).cloned().ok_or_else(|| OracleError::UnavailableFeed {
            feed: feed.clone(),
            reason: format!("not present in {}", self.path.display()),
        })
    }

    async fn supported_feeds(&self) -> Vec<FeedId> {
        match self.load().await {
            Ok(quotes) => quotes.into_keys().collect(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable price file");
                Vec::new()
            }
        }
    }
}
