//! CLI commands

use lendbank_core::{AssetId, Bps, FeedId, Timestamp, UserId};
use lendbank_events::EventReader;
use lendbank_ledger::{LedgerStore, RecordKind};
use lendbank_oracle::{PriceOracle, PriceQuote};

use crate::context::{rebuild, AppContext};

/// Risk terms for a new bank, in basis points
#[derive(Debug, Clone)]
pub struct BankTerms {
    pub max_ltv: u64,
    pub liquidation_threshold: u64,
    pub liquidation_bonus: u64,
    pub interest_rate: u64,
    pub decimals: u8,
    pub price_feed: FeedId,
    pub close_factor: Option<u64>,
    pub reserve_factor: Option<u64>,
}

/// Create a bank for an asset
///
/// The price feed must already be published, so the bank can be valued
/// from its first operation.
pub async fn init_bank(
    ctx: &mut AppContext,
    caller: &UserId,
    asset: AssetId,
    terms: BankTerms,
    now: Timestamp,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    if !ctx.oracle.is_supported(&terms.price_feed).await {
        anyhow::bail!(
            "No price published for feed {} (run set-price first)",
            terms.price_feed
        );
    }

    let mut params = ctx.protocol.config().bank_params(
        Bps::new(terms.max_ltv),
        Bps::new(terms.liquidation_threshold),
        Bps::new(terms.liquidation_bonus),
        Bps::new(terms.interest_rate),
        terms.decimals,
        terms.price_feed,
    );
    if let Some(close_factor) = terms.close_factor {
        params = params.with_close_factor(Bps::new(close_factor));
    }
    if let Some(reserve_factor) = terms.reserve_factor {
        params = params.with_reserve_factor(Bps::new(reserve_factor));
    }

    let op = ctx.protocol.init_bank(caller, asset.clone(), params, now)?;
    let committed = ctx.record(op, correlation_id)?;

    println!("✅ Bank {} initialized (seq: {})", asset, committed.sequence);
    Ok(())
}

/// Create an empty position
pub fn init_user(
    ctx: &mut AppContext,
    user: &UserId,
    now: Timestamp,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let op = ctx.protocol.init_user(user, now)?;
    let committed = ctx.record(op, correlation_id)?;

    println!("✅ User {} initialized (seq: {})", user, committed.sequence);
    Ok(())
}

/// Mint tokens into a user's wallet
pub fn airdrop(
    ctx: &mut AppContext,
    user: &UserId,
    asset: &AssetId,
    amount: u64,
    now: Timestamp,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let op = ctx.protocol.airdrop(user, asset, amount, now)?;
    let committed = ctx.record(op, correlation_id)?;

    println!(
        "✅ Airdropped {} {} to {} (seq: {})",
        amount, asset, user, committed.sequence
    );
    Ok(())
}

/// Publish a quote into the price file
pub async fn set_price(ctx: &AppContext, quote: PriceQuote) -> Result<(), anyhow::Error> {
    let summary = format!(
        "{} = {}e{} ±{} at {}",
        quote.feed, quote.price, quote.exponent, quote.confidence, quote.publish_time
    );
    ctx.oracle.publish(quote).await?;

    println!("✅ Price set: {}", summary);
    Ok(())
}

pub fn deposit(
    ctx: &mut AppContext,
    user: &UserId,
    asset: &AssetId,
    amount: u64,
    now: Timestamp,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let op = ctx.protocol.deposit(user, asset, amount, now)?;
    let committed = ctx.record(op, correlation_id)?;

    println!(
        "✅ Deposited {} {} for {} ({} shares, seq: {})",
        amount, asset, user, committed.operation.shares, committed.sequence
    );
    Ok(())
}

pub async fn withdraw(
    ctx: &mut AppContext,
    user: &UserId,
    asset: &AssetId,
    amount: u64,
    now: Timestamp,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let op = ctx.protocol.withdraw(user, asset, amount, now).await?;
    let committed = ctx.record(op, correlation_id)?;

    println!(
        "✅ Withdrew {} {} for {} ({} shares, seq: {})",
        amount, asset, user, committed.operation.shares, committed.sequence
    );
    Ok(())
}

pub async fn borrow(
    ctx: &mut AppContext,
    user: &UserId,
    asset: &AssetId,
    amount: u64,
    now: Timestamp,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let op = ctx.protocol.borrow(user, asset, amount, now).await?;
    let committed = ctx.record(op, correlation_id)?;

    let collateral = committed
        .operation
        .metadata
        .get("collateral_asset")
        .and_then(|v| v.as_str())
        .unwrap_or("-");
    println!(
        "✅ Borrowed {} {} for {} against {} (seq: {})",
        amount, asset, user, collateral, committed.sequence
    );
    Ok(())
}

pub fn repay(
    ctx: &mut AppContext,
    user: &UserId,
    asset: &AssetId,
    amount: u64,
    now: Timestamp,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let op = ctx.protocol.repay(user, asset, amount, now)?;
    let committed = ctx.record(op, correlation_id)?;

    println!(
        "✅ Repaid {} {} for {} (seq: {})",
        amount, asset, user, committed.sequence
    );
    Ok(())
}

/// Liquidate an unhealthy position
pub async fn liquidate(
    ctx: &mut AppContext,
    liquidator: &UserId,
    target: &UserId,
    amount: Option<u64>,
    now: Timestamp,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let op = ctx.protocol.liquidate(liquidator, target, amount, now).await?;
    let committed = ctx.record(op, correlation_id)?;

    println!(
        "✅ {} liquidated {}: repaid {} {} (seq: {})",
        liquidator,
        target,
        committed.operation.amount,
        committed
            .operation
            .asset
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_default(),
        committed.sequence
    );
    for transfer in &committed.operation.transfers {
        println!(
            "   {} {} : {} -> {}",
            transfer.amount, transfer.asset, transfer.from, transfer.to
        );
    }
    Ok(())
}

/// Show balances and health for a user
pub async fn position(ctx: &AppContext, user: &UserId, now: Timestamp) -> Result<(), anyhow::Error> {
    let position = ctx.protocol.position(user)?;

    println!("Position for {}:", user);
    for asset in position.deposited_shares.keys() {
        let amount = ctx.protocol.deposited_amount(user, asset)?;
        println!("  deposited {} {}", amount, asset);
    }
    for asset in position.borrowed_shares.keys() {
        let amount = ctx.protocol.borrowed_amount(user, asset)?;
        println!("  borrowed  {} {}", amount, asset);
    }

    match ctx.protocol.health(user, now).await {
        Ok(None) => println!("  no debt"),
        Ok(Some(report)) => {
            println!("  collateral value: ${}", report.collateral_value_usd);
            println!("  debt value:       ${}", report.debt_value_usd);
            println!("  liquidation at:   ${}", report.liquidation_limit_usd);
            match report.health_factor {
                Some(hf) => println!("  health factor:    {}", hf.round_dp(4)),
                None => println!("  health factor:    -"),
            }
            if report.is_liquidatable {
                println!("  ⚠️  liquidatable");
            }
        }
        // Balances are still useful without prices
        Err(e) => println!("  ⚠️  health unavailable: {}", e),
    }
    Ok(())
}

/// Show a bank's terms and totals
pub fn bank(ctx: &AppContext, asset: &AssetId) -> Result<(), anyhow::Error> {
    let bank = ctx.protocol.bank(asset)?;
    let params = &bank.params;

    println!("Bank {} (feed {}, {} decimals):", bank.asset, params.price_feed, params.decimals);
    println!(
        "  max LTV {} bps, threshold {} bps, bonus {} bps",
        params.max_ltv, params.liquidation_threshold, params.liquidation_bonus
    );
    println!(
        "  rate {} bps, close factor {} bps, reserve {} bps",
        params.interest_rate, params.close_factor, params.reserve_factor
    );
    println!("  deposited:   {}", bank.total_deposit_value()?.round_dp(6));
    println!("  borrowed:    {}", bank.total_borrow_value()?.round_dp(6));
    println!("  available:   {}", bank.available_liquidity()?);
    println!("  utilization: {}", bank.utilization()?.round_dp(4));
    println!(
        "  indices:     deposit {} / borrow {}",
        bank.deposit_index, bank.borrow_index
    );
    println!("  updated at:  {}", bank.last_update_timestamp);
    Ok(())
}

/// List positions that can be liquidated now
pub async fn liquidatable(ctx: &AppContext, now: Timestamp) -> Result<(), anyhow::Error> {
    let found = ctx.protocol.liquidatable_positions(now).await?;
    if found.is_empty() {
        println!("✅ No liquidatable positions");
        return Ok(());
    }

    for (user, report) in &found {
        println!(
            "⚠️  {}: debt ${} above limit ${}",
            user, report.debt_value_usd, report.liquidation_limit_usd
        );
    }
    Ok(())
}

/// Rebuild state from the journal and check every bank is solvent
pub fn replay(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let events = EventReader::from_directory(ctx.journal_path())?.read_all()?;
    let (store, _custody) = rebuild(&events)?;

    let mut banks = 0;
    for key in store.keys()? {
        if key.kind() != RecordKind::Bank {
            continue;
        }
        if let Some(bank) = store.get_bank(&key)? {
            if !bank.is_solvent()? {
                anyhow::bail!("Bank {} is insolvent after replay", bank.asset);
            }
            banks += 1;
        }
    }

    println!(
        "✅ Replayed {} events ({} records, {} banks solvent)",
        events.len(),
        store.len(),
        banks
    );
    Ok(())
}
