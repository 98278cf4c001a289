//! Protocol configuration
//!
//! Loaded from a JSON file; every field has a default so partial files
//! work. `LENDBANK_*` environment variables override file values.

use lendbank_core::{Bps, FeedId, UserId};
use lendbank_ledger::BankParams;
use lendbank_oracle::PricePolicy;
use lendbank_risk::RateModel;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Namespace of every record key
    #[serde(default = "default_protocol_id")]
    pub protocol_id: String,

    /// Only identity allowed to initialize banks
    #[serde(default = "default_admin")]
    pub admin: UserId,

    // === Oracle ===
    #[serde(default = "default_max_price_age_secs")]
    pub max_price_age_secs: u64,

    /// 0 disables the confidence check
    #[serde(default)]
    pub max_confidence_bps: u64,

    #[serde(default = "default_max_future_drift_secs")]
    pub max_future_drift_secs: u64,

    // === Bank defaults ===
    #[serde(default = "default_reserve_factor_bps")]
    pub reserve_factor_bps: Bps,

    #[serde(default = "default_close_factor_bps")]
    pub close_factor_bps: Bps,

    #[serde(default)]
    pub interest_model: RateModel,
}

fn default_protocol_id() -> String {
    "lendbank".to_string()
}

fn default_admin() -> UserId {
    UserId::admin()
}

fn default_max_price_age_secs() -> u64 {
    100
}

fn default_max_future_drift_secs() -> u64 {
    5
}

fn default_reserve_factor_bps() -> Bps {
    Bps::new(1_000)
}

fn default_close_factor_bps() -> Bps {
    Bps::new(5_000)
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol_id: default_protocol_id(),
            admin: default_admin(),
            max_price_age_secs: default_max_price_age_secs(),
            max_confidence_bps: 0,
            max_future_drift_secs: default_max_future_drift_secs(),
            reserve_factor_bps: default_reserve_factor_bps(),
            close_factor_bps: default_close_factor_bps(),
            interest_model: RateModel::default(),
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Apply `LENDBANK_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self, ProtocolError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProtocolError> {
        fn parse<T: std::str::FromStr>(key: &str, raw: String) -> Result<T, ProtocolError> {
            raw.parse()
                .map_err(|_| ProtocolError::InvalidConfig(format!("{key}={raw}")))
        }

        if let Some(v) = lookup("LENDBANK_PROTOCOL_ID") {
            self.protocol_id = v;
        }
        if let Some(v) = lookup("LENDBANK_ADMIN") {
            self.admin = parse("LENDBANK_ADMIN", v)?;
        }
        if let Some(v) = lookup("LENDBANK_MAX_PRICE_AGE_SECS") {
            self.max_price_age_secs = parse("LENDBANK_MAX_PRICE_AGE_SECS", v)?;
        }
        if let Some(v) = lookup("LENDBANK_MAX_CONFIDENCE_BPS") {
            self.max_confidence_bps = parse("LENDBANK_MAX_CONFIDENCE_BPS", v)?;
        }
        if let Some(v) = lookup("LENDBANK_MAX_FUTURE_DRIFT_SECS") {
            self.max_future_drift_secs = parse("LENDBANK_MAX_FUTURE_DRIFT_SECS", v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.protocol_id.is_empty() || self.protocol_id.contains(':') {
            return Err(ProtocolError::InvalidConfig(format!(
                "protocol_id {:?} must be non-empty and contain no ':'",
                self.protocol_id
            )));
        }
        if !self.reserve_factor_bps.is_unit_ratio() {
            return Err(ProtocolError::InvalidConfig(
                "reserve_factor_bps must be at most 10000".to_string(),
            ));
        }
        if self.close_factor_bps == Bps::ZERO || !self.close_factor_bps.is_unit_ratio() {
            return Err(ProtocolError::InvalidConfig(
                "close_factor_bps must be in (0, 10000]".to_string(),
            ));
        }
        Ok(())
    }

    pub fn price_policy(&self) -> PricePolicy {
        PricePolicy {
            max_age_secs: self.max_price_age_secs,
            max_confidence_bps: self.max_confidence_bps,
            max_future_drift_secs: self.max_future_drift_secs,
        }
    }

    /// Bank parameters with this configuration's close and reserve factors
    pub fn bank_params(
        &self,
        max_ltv: Bps,
        liquidation_threshold: Bps,
        liquidation_bonus: Bps,
        interest_rate: Bps,
        decimals: u8,
        price_feed: FeedId,
    ) -> BankParams {
        BankParams::new(
            max_ltv,
            liquidation_threshold,
            liquidation_bonus,
            interest_rate,
            decimals,
            price_feed,
        )
        .with_close_factor(self.close_factor_bps)
        .with_reserve_factor(self.reserve_factor_bps)
    }
}
