//! Shared test harness: USDC and SOL banks, 6 decimals each

#![allow(dead_code)]

use lendbank_core::{AssetId, Bps, FeedId, Timestamp, UserId};
use lendbank_ledger::{CustodyAccount, MemoryCustody, MemoryStore, TokenCustody};
use lendbank_oracle::MockOracle;
use lendbank_protocol::{LendingProtocol, ProtocolConfig};
use rust_decimal::Decimal;
use std::sync::Arc;

pub const NOW: Timestamp = 1_700_000_000;
pub const YEAR: Timestamp = 31_536_000;

/// $1.00 and $150.00 with 6 decimal places
pub const USDC_PRICE: i64 = 1_000_000;
pub const SOL_PRICE: i64 = 150_000_000;

pub type Protocol = LendingProtocol<MemoryStore, MemoryCustody>;

pub struct Harness {
    pub protocol: Protocol,
    pub oracle: Arc<MockOracle>,
}

pub fn usdc() -> AssetId {
    AssetId::usdc()
}

pub fn sol() -> AssetId {
    AssetId::sol()
}

pub fn usdc_feed() -> FeedId {
    "usdc-usd".parse().unwrap()
}

pub fn sol_feed() -> FeedId {
    "sol-usd".parse().unwrap()
}

pub fn user(name: &str) -> UserId {
    name.parse().unwrap()
}

impl Harness {
    /// Banks initialized with maxLtv 8000, threshold 8500, bonus 5000, rate 500
    pub fn new() -> Self {
        Self::with_config(ProtocolConfig::default())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        let oracle = Arc::new(MockOracle::new());
        oracle.set_price(&usdc_feed(), USDC_PRICE, -6, NOW);
        oracle.set_price(&sol_feed(), SOL_PRICE, -6, NOW);

        let mut protocol =
            LendingProtocol::new(config, MemoryStore::new(), MemoryCustody::new(), oracle.clone())
                .unwrap();

        for (asset, feed) in [(usdc(), usdc_feed()), (sol(), sol_feed())] {
            let params = protocol.config().bank_params(
                Bps::new(8_000),
                Bps::new(8_500),
                Bps::new(5_000),
                Bps::new(500),
                6,
                feed,
            );
            protocol.init_bank(&UserId::admin(), asset, params, NOW).unwrap();
        }

        Self { protocol, oracle }
    }

    /// Init a user and fund their wallet
    pub fn funded_user(&mut self, name: &str, asset: &AssetId, amount: u64) -> UserId {
        let id = user(name);
        self.protocol.init_user(&id, NOW).unwrap();
        self.protocol.airdrop(&id, asset, amount, NOW).unwrap();
        id
    }

    /// Bob supplies 10 SOL of borrowable liquidity
    pub fn with_sol_liquidity(&mut self) -> UserId {
        let bob = self.funded_user("bob", &sol(), 10_000_000);
        self.protocol.deposit(&bob, &sol(), 10_000_000, NOW).unwrap();
        bob
    }

    /// Alice holds 1000 USDC of collateral
    pub fn with_collateral(&mut self) -> UserId {
        let alice = self.funded_user("alice", &usdc(), 1_000_000_000);
        self.protocol.deposit(&alice, &usdc(), 1_000_000_000, NOW).unwrap();
        alice
    }

    pub fn set_prices(&self, usdc_price: i64, sol_price: i64, publish_time: Timestamp) {
        self.oracle.set_price(&usdc_feed(), usdc_price, -6, publish_time);
        self.oracle.set_price(&sol_feed(), sol_price, -6, publish_time);
    }

    pub fn wallet(&self, user: &UserId, asset: &AssetId) -> u64 {
        self.protocol
            .custody()
            .balance(&CustodyAccount::Wallet(user.clone()), asset)
    }

    pub fn treasury(&self, asset: &AssetId) -> u64 {
        self.protocol
            .custody()
            .balance(&CustodyAccount::Treasury(asset.clone()), asset)
    }

    /// Treasury balance minus what the bank owes depositors net of loans
    pub fn treasury_surplus(&self, asset: &AssetId) -> Decimal {
        let bank = self.protocol.bank(asset).unwrap();
        let free = bank.total_deposit_value().unwrap() - bank.total_borrow_value().unwrap();
        Decimal::from(self.treasury(asset)) - free
    }
}
