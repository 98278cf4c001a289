//! End-to-end lending scenarios

mod common;

use common::*;
use lendbank_core::{Bps, UserId};
use lendbank_ledger::LedgerStore;
use lendbank_oracle::OracleError;
use lendbank_protocol::{ErrorClass, ProtocolError};
use lendbank_risk::RiskError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_deposit_borrow_repay_withdraw() {
    let mut h = Harness::new();
    h.with_sol_liquidity();
    let alice = h.funded_user("alice", &usdc(), 1_000_000_000);
    let p = &mut h.protocol;

    p.deposit(&alice, &usdc(), 1_000_000_000, NOW).unwrap();
    assert_eq!(p.deposited_amount(&alice, &usdc()).unwrap(), 1_000_000_000);

    p.borrow(&alice, &sol(), 2_000_000, NOW).await.unwrap();
    assert_eq!(p.borrowed_amount(&alice, &sol()).unwrap(), 2_000_000);

    p.repay(&alice, &sol(), 1_000_000, NOW).unwrap();
    assert_eq!(p.borrowed_amount(&alice, &sol()).unwrap(), 1_000_000);

    p.withdraw(&alice, &usdc(), 50_000_000, NOW).await.unwrap();
    assert_eq!(p.deposited_amount(&alice, &usdc()).unwrap(), 950_000_000);

    assert_eq!(h.wallet(&alice, &usdc()), 50_000_000);
    assert_eq!(h.wallet(&alice, &sol()), 1_000_000);
    assert_eq!(h.treasury(&usdc()), 950_000_000);
    assert_eq!(h.treasury(&sol()), 9_000_000);
}

#[tokio::test]
async fn test_deposit_withdraw_round_trip() {
    let mut h = Harness::new();
    let alice = h.funded_user("alice", &usdc(), 123_456_789);

    h.protocol.deposit(&alice, &usdc(), 123_456_789, NOW).unwrap();
    assert_eq!(h.treasury(&usdc()), 123_456_789);

    h.protocol
        .withdraw(&alice, &usdc(), 123_456_789, NOW)
        .await
        .unwrap();

    let position = h.protocol.position(&alice).unwrap();
    assert!(position.deposited(&usdc()).is_zero());
    assert!(h.protocol.bank(&usdc()).unwrap().total_deposited_shares.is_zero());
    assert_eq!(h.treasury(&usdc()), 0);
    assert_eq!(h.wallet(&alice, &usdc()), 123_456_789);
}

#[tokio::test]
async fn test_withdraw_more_than_deposited() {
    let mut h = Harness::new();
    let alice = h.with_collateral();

    let err = h
        .protocol
        .withdraw(&alice, &usdc(), 1_000_000_001, NOW)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InsufficientFunds {
            available: 1_000_000_000,
            ..
        }
    ));
    assert_eq!(err.class(), ErrorClass::InsufficientResource);
}

#[tokio::test]
async fn test_borrow_beyond_max_ltv_leaves_state() {
    let mut h = Harness::new();
    h.with_sol_liquidity();
    let alice = h.with_collateral();
    let before = h.protocol.position(&alice).unwrap();
    let sol_before = h.protocol.bank(&sol()).unwrap();

    // 6 SOL = $900 against an $800 limit
    let err = h
        .protocol
        .borrow(&alice, &sol(), 6_000_000, NOW)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Risk(RiskError::InsufficientCollateral { .. })
    ));

    assert_eq!(h.protocol.position(&alice).unwrap(), before);
    assert_eq!(h.protocol.bank(&sol()).unwrap(), sol_before);
    assert_eq!(h.wallet(&alice, &sol()), 0);
}

#[tokio::test]
async fn test_borrow_beyond_liquidity() {
    let mut h = Harness::new();
    h.with_sol_liquidity();
    let alice = h.with_collateral();

    let err = h
        .protocol
        .borrow(&alice, &sol(), 11_000_000, NOW)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InsufficientLiquidity {
            available: 10_000_000,
            ..
        }
    ));
}

#[tokio::test]
async fn test_borrow_needs_collateral() {
    let mut h = Harness::new();
    h.with_sol_liquidity();
    let carol = h.funded_user("carol", &usdc(), 1);

    let err = h.protocol.borrow(&carol, &sol(), 1, NOW).await.unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Risk(RiskError::InsufficientCollateral { .. })
    ));
}

#[tokio::test]
async fn test_stale_price_blocks_borrow() {
    let mut h = Harness::new();
    h.with_sol_liquidity();
    let alice = h.with_collateral();
    h.set_prices(USDC_PRICE, SOL_PRICE, NOW - 101);

    let err = h
        .protocol
        .borrow(&alice, &sol(), 1_000_000, NOW)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Price(OracleError::StalePrice { .. })
    ));
    assert_eq!(err.class(), ErrorClass::Price);
    assert_eq!(h.protocol.borrowed_amount(&alice, &sol()).unwrap(), 0);
}

#[tokio::test]
async fn test_withdraw_collateral_under_debt() {
    let mut h = Harness::new();
    h.with_sol_liquidity();
    let alice = h.with_collateral();

    // $750 of debt; withdrawing $100 leaves a $720 limit
    h.protocol.borrow(&alice, &sol(), 5_000_000, NOW).await.unwrap();
    let err = h
        .protocol
        .withdraw(&alice, &usdc(), 100_000_000, NOW)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Risk(RiskError::WithdrawalExceedsCollateral { .. })
    ));
    assert_eq!(h.protocol.deposited_amount(&alice, &usdc()).unwrap(), 1_000_000_000);

    // $60 keeps the position within the limit
    h.protocol
        .withdraw(&alice, &usdc(), 60_000_000, NOW)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_repay_in_full_unbinds_pair() {
    let mut h = Harness::new();
    h.with_sol_liquidity();
    let alice = h.with_collateral();

    h.protocol.borrow(&alice, &sol(), 2_000_000, NOW).await.unwrap();
    let err = h.protocol.repay(&alice, &sol(), 2_000_001, NOW).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::OverRepayment {
            outstanding: 2_000_000,
            ..
        }
    ));

    h.protocol.repay(&alice, &sol(), 2_000_000, NOW).unwrap();
    let position = h.protocol.position(&alice).unwrap();
    assert!(!position.has_debt());
    assert!(position.pair().is_none());
    assert_eq!(h.protocol.health(&alice, NOW).await.unwrap(), None);
}

#[tokio::test]
async fn test_interest_accrues_over_a_year() {
    let mut h = Harness::new();
    let bob = h.with_sol_liquidity();
    let alice = h.with_collateral();
    h.protocol.borrow(&alice, &sol(), 2_000_000, NOW).await.unwrap();

    // 5% continuously compounded on 2 SOL, accrued by the repay
    h.protocol.repay(&alice, &sol(), 1, NOW + YEAR).unwrap();
    let owed = h.protocol.borrowed_amount(&alice, &sol()).unwrap();
    assert!(owed > 2_100_000 && owed < 2_103_000, "owed {owed}");

    // Depositors earn the interest minus the 10% reserve
    let supplied = h.protocol.deposited_amount(&bob, &sol()).unwrap();
    assert!(supplied > 10_090_000 && supplied < 10_102_543, "supplied {supplied}");

    let bank = h.protocol.bank(&sol()).unwrap();
    assert!(bank.borrow_index > Decimal::ONE);
    assert!(bank.protocol_fee_shares > Decimal::ZERO);
    assert!(bank.is_solvent().unwrap());
}

#[tokio::test]
async fn test_withdraw_pays_at_most_the_claim() {
    let mut h = Harness::new();
    let bob = h.with_sol_liquidity();
    let alice = h.with_collateral();
    h.protocol.borrow(&alice, &sol(), 5_000_000, NOW).await.unwrap();
    let carol = h.funded_user("carol", &sol(), 22);
    h.protocol.deposit(&carol, &sol(), 22, NOW).unwrap();

    // Bob's deposit a year later accrues the bank
    h.protocol.airdrop(&bob, &sol(), 1, NOW + YEAR).unwrap();
    h.protocol.deposit(&bob, &sol(), 1, NOW + YEAR).unwrap();

    let bank = h.protocol.bank(&sol()).unwrap();
    let claim = h.protocol.position(&carol).unwrap().deposited(&sol()) * bank.deposit_index;
    assert!(claim > dec!(22.5) && claim < dec!(23), "claim {claim}");
    assert_eq!(h.protocol.deposited_amount(&carol, &sol()).unwrap(), 22);

    let err = h
        .protocol
        .withdraw(&carol, &sol(), 23, NOW + YEAR)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InsufficientFunds { available: 22, .. }
    ));

    h.protocol
        .withdraw(&carol, &sol(), 22, NOW + YEAR)
        .await
        .unwrap();
    assert_eq!(h.wallet(&carol, &sol()), 22);
    // The sub-unit remainder stays as shares
    assert!(h.protocol.position(&carol).unwrap().deposited(&sol()) > Decimal::ZERO);
    assert_eq!(h.protocol.deposited_amount(&carol, &sol()).unwrap(), 0);
    assert!(h.treasury_surplus(&sol()) >= dec!(-0.000001));
}

#[tokio::test]
async fn test_treasury_covers_ledger_after_interest() {
    let mut h = Harness::new();
    let bob = h.with_sol_liquidity();
    let alice = h.with_collateral();
    h.protocol.borrow(&alice, &sol(), 2_000_000, NOW).await.unwrap();
    let later = NOW + YEAR;

    // A one-unit repay accrues a year of interest
    h.protocol.repay(&alice, &sol(), 1, later).unwrap();
    assert!(h.treasury_surplus(&sol()) >= dec!(-0.000001));

    let owed = h.protocol.borrowed_amount(&alice, &sol()).unwrap();
    let top_up = owed - h.wallet(&alice, &sol());
    h.protocol.airdrop(&alice, &sol(), top_up, later).unwrap();
    h.protocol.repay(&alice, &sol(), owed, later).unwrap();
    assert!(h.protocol.bank(&sol()).unwrap().total_borrowed_shares.is_zero());

    let supplied = h.protocol.deposited_amount(&bob, &sol()).unwrap();
    assert!(supplied > 10_000_000);
    h.protocol.withdraw(&bob, &sol(), supplied, later).await.unwrap();
    h.protocol
        .withdraw(&alice, &usdc(), 1_000_000_000, later)
        .await
        .unwrap();

    // Only the reserve and bob's sub-unit remainder stay deposited;
    // the treasury holds all of it plus at most the repay round-up
    let surplus = h.treasury_surplus(&sol());
    assert!(surplus >= dec!(-0.000001) && surplus < Decimal::ONE, "surplus {surplus}");

    let bank = h.protocol.bank(&sol()).unwrap();
    let reserve = bank.protocol_fee_shares * bank.deposit_index;
    assert!(reserve > Decimal::ZERO);
    assert!(Decimal::from(h.treasury(&sol())) >= reserve.floor());
    assert_eq!(h.treasury(&usdc()), 0);
    assert!(h.treasury_surplus(&usdc()).is_zero());
}

#[test]
fn test_clock_skew_rejected() {
    let mut h = Harness::new();
    let alice = h.funded_user("alice", &usdc(), 100);

    let err = h.protocol.deposit(&alice, &usdc(), 100, NOW - 10).unwrap_err();
    assert!(matches!(err, ProtocolError::Risk(RiskError::ClockSkew { .. })));
    assert_eq!(err.class(), ErrorClass::SolvencyViolation);
}

#[test]
fn test_failed_custody_leg_writes_nothing() {
    let mut h = Harness::new();
    let alice = h.funded_user("alice", &usdc(), 100);
    let bank_before = h.protocol.bank(&usdc()).unwrap();

    let err = h.protocol.deposit(&alice, &usdc(), 101, NOW).unwrap_err();
    assert!(matches!(err, ProtocolError::Custody(_)));
    assert_eq!(h.protocol.bank(&usdc()).unwrap(), bank_before);
    assert!(h.protocol.position(&alice).unwrap().deposited(&usdc()).is_zero());
    assert_eq!(h.wallet(&alice, &usdc()), 100);
}

#[test]
fn test_initialization_rules() {
    let mut h = Harness::new();
    let params = h.protocol.config().bank_params(
        Bps::new(8_000),
        Bps::new(8_500),
        Bps::new(500),
        Bps::new(500),
        6,
        usdc_feed(),
    );

    let err = h
        .protocol
        .init_bank(&UserId::admin(), usdc(), params.clone(), NOW)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::BankAlreadyExists(_)));

    let err = h
        .protocol
        .init_bank(&user("mallory"), "ETH".parse().unwrap(), params.clone(), NOW)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Unauthorized(_)));

    let mut bad = params;
    bad.max_ltv = Bps::new(9_000);
    let err = h
        .protocol
        .init_bank(&UserId::admin(), "ETH".parse().unwrap(), bad, NOW)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidConfig(_)));

    let alice = user("alice");
    h.protocol.init_user(&alice, NOW).unwrap();
    let err = h.protocol.init_user(&alice, NOW).unwrap_err();
    assert!(matches!(err, ProtocolError::UserAlreadyExists(_)));

    let err = h.protocol.deposit(&alice, &usdc(), 0, NOW).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidAmount(_)));

    // Two banks and one user
    assert_eq!(h.protocol.store().keys().unwrap().len(), 3);
}
