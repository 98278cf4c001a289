//! Liquidation through the protocol surface

mod common;

use common::*;
use lendbank_protocol::{ErrorClass, ProtocolError};
use lendbank_risk::RiskError;

/// Alice borrows 5 SOL ($750) against 1000 USDC; carol holds 5 SOL
async fn indebted() -> (Harness, lendbank_core::UserId, lendbank_core::UserId) {
    let mut h = Harness::new();
    h.with_sol_liquidity();
    let alice = h.with_collateral();
    h.protocol.borrow(&alice, &sol(), 5_000_000, NOW).await.unwrap();
    let carol = h.funded_user("carol", &sol(), 5_000_000);
    (h, alice, carol)
}

#[tokio::test]
async fn test_liquidate_healthy_position_fails() {
    let (mut h, alice, carol) = indebted().await;
    let alice_before = h.protocol.position(&alice).unwrap();

    let err = h
        .protocol
        .liquidate(&carol, &alice, None, NOW)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Risk(RiskError::PositionHealthy { .. })));

    assert_eq!(h.protocol.position(&alice).unwrap(), alice_before);
    assert_eq!(h.wallet(&carol, &sol()), 5_000_000);
    assert_eq!(h.wallet(&carol, &usdc()), 0);
}

#[tokio::test]
async fn test_liquidate_after_price_move() {
    let (mut h, alice, carol) = indebted().await;

    // SOL at $180: $900 of debt against an $850 limit
    h.set_prices(USDC_PRICE, 180_000_000, NOW);
    let scan = h.protocol.liquidatable_positions(NOW).await.unwrap();
    assert_eq!(scan.len(), 1);
    assert_eq!(scan[0].0, alice);

    let op = h
        .protocol
        .liquidate(&carol, &alice, None, NOW)
        .await
        .unwrap();
    assert_eq!(op.amount, 2_500_000);
    assert_eq!(op.transfers.len(), 2);

    // Half the debt repaid ($450) for $675 of collateral
    assert_eq!(h.protocol.borrowed_amount(&alice, &sol()).unwrap(), 2_500_000);
    assert_eq!(h.protocol.deposited_amount(&alice, &usdc()).unwrap(), 325_000_000);
    assert_eq!(h.wallet(&carol, &sol()), 2_500_000);
    assert_eq!(h.wallet(&carol, &usdc()), 675_000_000);
    assert_eq!(h.treasury(&usdc()), 325_000_000);

    assert!(h.protocol.bank(&usdc()).unwrap().is_solvent().unwrap());
    assert!(h.protocol.bank(&sol()).unwrap().is_solvent().unwrap());
}

#[tokio::test]
async fn test_liquidate_requested_amount() {
    let (mut h, alice, carol) = indebted().await;
    h.set_prices(USDC_PRICE, 180_000_000, NOW);

    h.protocol
        .liquidate(&carol, &alice, Some(1_000_000), NOW)
        .await
        .unwrap();
    assert_eq!(h.protocol.borrowed_amount(&alice, &sol()).unwrap(), 4_000_000);
    // $180 * 1.5
    assert_eq!(h.wallet(&carol, &usdc()), 270_000_000);
}

#[tokio::test]
async fn test_self_liquidation_rejected() {
    let (mut h, alice, _carol) = indebted().await;
    h.set_prices(USDC_PRICE, 180_000_000, NOW);

    let err = h
        .protocol
        .liquidate(&alice, &alice, None, NOW)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::SelfLiquidation(_)));
    assert_eq!(err.class(), ErrorClass::Configuration);
}

#[tokio::test]
async fn test_liquidator_without_funds() {
    let (mut h, alice, _carol) = indebted().await;
    h.set_prices(USDC_PRICE, 180_000_000, NOW);
    let dave = user("dave");
    let before = h.protocol.position(&alice).unwrap();

    let err = h
        .protocol
        .liquidate(&dave, &alice, None, NOW)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Custody(_)));
    assert_eq!(h.protocol.position(&alice).unwrap(), before);
}

#[tokio::test]
async fn test_position_without_debt_is_healthy() {
    let mut h = Harness::new();
    let alice = h.with_collateral();
    let carol = h.funded_user("carol", &sol(), 1);

    let err = h
        .protocol
        .liquidate(&carol, &alice, None, NOW)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Risk(RiskError::PositionHealthy { .. })));
    assert!(h.protocol.liquidatable_positions(NOW).await.unwrap().is_empty());
}
