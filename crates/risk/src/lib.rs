//! LendBank Risk Engine
//!
//! Pure computations over bank and position records:
//! - `interest`: index accrual behind the `InterestModel` trait
//! - `engine`: USD health of a position and Borrow/Withdraw admission
//! - `liquidation`: bounded, bonus-incentivized liquidation plans
//!
//! Nothing here touches storage or custody; callers pass records and price
//! quotes in and commit the results themselves.

pub mod engine;
pub mod error;
pub mod interest;
pub mod liquidation;

pub use engine::{HealthReport, RiskEngine};
pub use error::RiskError;
pub use interest::{
    Compounding, FlatRate, InterestAccrual, InterestModel, KinkedRate, RateModel, SECONDS_PER_YEAR,
};
pub use liquidation::{LiquidationEngine, LiquidationPlan};
