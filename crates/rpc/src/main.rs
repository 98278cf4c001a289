//! LendBank CLI - Main entry point

use clap::{Parser, Subcommand};
use lendbank_core::{AssetId, FeedId, Timestamp, UserId};
use lendbank_oracle::PriceQuote;
use lendbank_rpc::commands::{self, BankTerms};
use lendbank_rpc::AppContext;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lendbank")]
#[command(about = "LendBank - Collateralized lending ledger", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Unix time to run the command at (defaults to the wall clock)
    #[arg(long, global = true)]
    now: Option<Timestamp>,

    /// Optional correlation ID
    #[arg(long, global = true)]
    correlation_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a bank for an asset (admin only)
    InitBank {
        /// Asset code
        asset: AssetId,
        /// Price feed id
        #[arg(long)]
        feed: FeedId,
        /// Maximum loan-to-value, bps
        #[arg(long)]
        max_ltv: u64,
        /// Liquidation threshold, bps
        #[arg(long)]
        threshold: u64,
        /// Liquidation bonus, bps
        #[arg(long)]
        bonus: u64,
        /// Annual interest rate, bps
        #[arg(long)]
        rate: u64,
        /// Native decimals of the asset
        #[arg(long, default_value = "6")]
        decimals: u8,
        /// Close factor override, bps
        #[arg(long)]
        close_factor: Option<u64>,
        /// Reserve factor override, bps
        #[arg(long)]
        reserve_factor: Option<u64>,
        /// Calling user (defaults to the configured admin)
        #[arg(long)]
        caller: Option<UserId>,
    },

    /// Create an empty position for a user
    InitUser {
        user: UserId,
    },

    /// Mint tokens into a user's wallet
    Airdrop {
        user: UserId,
        /// Amount in native units
        amount: u64,
        asset: AssetId,
    },

    /// Publish a price into the price file
    SetPrice {
        feed: FeedId,
        /// Integer price; usd = price * 10^exponent
        #[arg(allow_hyphen_values = true)]
        price: i64,
        #[arg(long, default_value = "-6", allow_hyphen_values = true)]
        exponent: i32,
        #[arg(long, default_value = "0")]
        confidence: u64,
        /// Publish time (defaults to --now)
        #[arg(long)]
        publish_time: Option<Timestamp>,
    },

    /// Supply tokens to a bank
    Deposit {
        user: UserId,
        /// Amount in native units
        amount: u64,
        asset: AssetId,
    },

    /// Withdraw supplied tokens
    Withdraw {
        user: UserId,
        /// Amount in native units
        amount: u64,
        asset: AssetId,
    },

    /// Borrow against deposited collateral
    Borrow {
        user: UserId,
        /// Amount in native units
        amount: u64,
        asset: AssetId,
    },

    /// Repay outstanding debt
    Repay {
        user: UserId,
        /// Amount in native units
        amount: u64,
        asset: AssetId,
    },

    /// Repay part of an unhealthy position's debt for its collateral
    Liquidate {
        liquidator: UserId,
        target: UserId,
        /// Repay amount in native units (defaults to the close-factor limit)
        #[arg(long)]
        amount: Option<u64>,
    },

    /// Show balances and health for a user
    Position {
        user: UserId,
    },

    /// Show a bank's terms and totals
    Bank {
        asset: AssetId,
    },

    /// List liquidatable positions
    Liquidatable,

    /// Rebuild state from the journal and verify bank solvency
    Replay,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let mut ctx = AppContext::new(&cli.data)?;
    let now = ctx.clock(cli.now)?;
    let correlation_id = cli
        .correlation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match cli.command {
        Commands::InitBank {
            asset,
            feed,
            max_ltv,
            threshold,
            bonus,
            rate,
            decimals,
            close_factor,
            reserve_factor,
            caller,
        } => {
            let caller = caller.unwrap_or_else(|| ctx.protocol.config().admin.clone());
            let terms = BankTerms {
                max_ltv,
                liquidation_threshold: threshold,
                liquidation_bonus: bonus,
                interest_rate: rate,
                decimals,
                price_feed: feed,
                close_factor,
                reserve_factor,
            };
            commands::init_bank(&mut ctx, &caller, asset, terms, now, &correlation_id).await?;
        }

        Commands::InitUser { user } => {
            commands::init_user(&mut ctx, &user, now, &correlation_id)?;
        }

        Commands::Airdrop {
            user,
            amount,
            asset,
        } => {
            commands::airdrop(&mut ctx, &user, &asset, amount, now, &correlation_id)?;
        }

        Commands::SetPrice {
            feed,
            price,
            exponent,
            confidence,
            publish_time,
        } => {
            let quote = PriceQuote::new(
                feed,
                price,
                confidence,
                exponent,
                publish_time.unwrap_or(now),
            );
            commands::set_price(&ctx, quote).await?;
        }

        Commands::Deposit {
            user,
            amount,
            asset,
        } => {
            commands::deposit(&mut ctx, &user, &asset, amount, now, &correlation_id)?;
        }

        Commands::Withdraw {
            user,
            amount,
            asset,
        } => {
            commands::withdraw(&mut ctx, &user, &asset, amount, now, &correlation_id).await?;
        }

        Commands::Borrow {
            user,
            amount,
            asset,
        } => {
            commands::borrow(&mut ctx, &user, &asset, amount, now, &correlation_id).await?;
        }

        Commands::Repay {
            user,
            amount,
            asset,
        } => {
            commands::repay(&mut ctx, &user, &asset, amount, now, &correlation_id)?;
        }

        Commands::Liquidate {
            liquidator,
            target,
            amount,
        } => {
            commands::liquidate(&mut ctx, &liquidator, &target, amount, now, &correlation_id)
                .await?;
        }

        Commands::Position { user } => {
            commands::position(&ctx, &user, now).await?;
        }

        Commands::Bank { asset } => {
            commands::bank(&ctx, &asset)?;
        }

        Commands::Liquidatable => {
            commands::liquidatable(&ctx, now).await?;
        }

        Commands::Replay => {
            commands::replay(&ctx)?;
        }
    }

    Ok(())
}
