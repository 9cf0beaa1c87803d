//! Live scan-loop entry point: `bot run [--fresh]` / `bot run-once`.
//!
//! No concrete venue wire client ships in this crate (exchange-specific
//! HTTP/WebSocket clients are out of scope). `PlaceholderVenue` below always
//! reports empty/failed venue calls so the binary demonstrates the full
//! wiring end-to-end; a real deployment links a `VenueClient` implementation
//! in its place.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{error, info, warn};

use updown_arb::config::Config;
use updown_arb::detectors::edge::EdgeConfig;
use updown_arb::detectors::spread::SpreadConfig;
use updown_arb::error::ErrorKind;
use updown_arb::executor::{Executor, ExecutorConfig};
use updown_arb::models::market::{Asset, Market, OrderbookSnapshot};
use updown_arb::models::session::BotSession;
use updown_arb::models::MarketResolution;
use updown_arb::monitor::{MarketMonitor, MonitorConfig};
use updown_arb::repository::InMemoryRepository;
use updown_arb::scanner::{Scanner, ScannerConfig};
use updown_arb::venue::{OrderResult, SignedOrder, UnsignedOrder, VenueClient};

#[derive(Parser)]
#[command(name = "bot", about = "Live market-scan loop for crypto Up/Down contracts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scan loop until interrupted.
    Run {
        /// Force-refresh the market cache on the first tick.
        #[arg(long)]
        fresh: bool,
    },
    /// Run exactly one tick, then exit.
    RunOnce,
}

struct PlaceholderVenue {
    assets: Vec<Asset>,
}

#[async_trait]
impl VenueClient for PlaceholderVenue {
    fn tracked_assets(&self) -> Vec<Asset> {
        self.assets.clone()
    }

    async fn list_active_markets(&self, _asset: Asset, _max_expiry_secs: i64) -> Result<Vec<Market>, ErrorKind> {
        Ok(vec![])
    }

    async fn latest_orderbook(&self, market_id: &str) -> Result<OrderbookSnapshot, ErrorKind> {
        Err(ErrorKind::Transport(format!("no venue client configured for {market_id}")))
    }

    async fn resolved_markets(&self, _window: (DateTime<Utc>, DateTime<Utc>)) -> Result<Vec<MarketResolution>, ErrorKind> {
        Ok(vec![])
    }

    async fn price_history(
        &self,
        _token_id: &str,
        _window: (DateTime<Utc>, DateTime<Utc>),
        _fidelity_secs: i64,
    ) -> Result<Vec<(DateTime<Utc>, Decimal)>, ErrorKind> {
        Ok(vec![])
    }

    async fn sign_order(&self, _order: UnsignedOrder) -> Result<SignedOrder, ErrorKind> {
        Err(ErrorKind::Config("no signing key configured".into()))
    }

    async fn submit(&self, _signed: SignedOrder) -> Result<OrderResult, ErrorKind> {
        Err(ErrorKind::Transport("no venue transport configured".into()))
    }
}

fn scanner_config(config: &Config) -> ScannerConfig {
    ScannerConfig {
        spread: SpreadConfig {
            min_profit: config.spread_bot.min_profit,
            max_price_age_secs: config.thresholds.max_price_age_seconds,
        },
        edge: EdgeConfig {
            min_confidence: config.edge_trader.min_confidence,
            min_edge: config.edge_trader.min_edge,
            kelly_fraction: config.edge_trader.kelly_fraction,
            max_position_pct: config.edge_trader.max_position_pct,
            fee_rate: config.edge_trader.fee_rate,
        },
        fee_rate: config.fees.polymarket,
        min_trade_size: dec!(10),
        max_position_size: config.spread_bot.max_position_size,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default();

    if let Err(e) = config.validate() {
        error!("config validation failed: {e}");
        std::process::exit(1);
    }

    info!("starting bot, dry_run={}", config.spread_bot.dry_run);

    let venue = Arc::new(PlaceholderVenue { assets: config.spread_bot.assets.clone() });
    let monitor = MarketMonitor::new(
        venue,
        MonitorConfig {
            max_time_to_expiry_secs: config.spread_bot.max_time_to_expiry_secs,
            max_orderbook_age_secs: config.thresholds.max_orderbook_age_seconds,
        },
    );
    let repository = Arc::new(InMemoryRepository::new());
    let executor = Arc::new(Executor::new(
        BotSession::new(config.spread_bot.starting_balance, config.spread_bot.dry_run),
        ExecutorConfig {
            max_position_size: config.spread_bot.max_position_size,
            max_total_exposure: config.spread_bot.max_total_exposure,
        },
    ));
    let shutdown = Arc::new(AtomicBool::new(false));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("shutdown signal received");
                shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
            }
        });
    }

    let mut scanner = Scanner::new(monitor, repository, executor.clone(), scanner_config(&config), shutdown);

    match cli.command {
        Command::Run { fresh } => {
            if fresh {
                info!("forcing fresh market discovery on first tick");
                scanner.force_refresh().await;
            }
            scanner.run(std::time::Duration::from_secs(config.scan_interval_secs)).await;
        }
        Command::RunOnce => {
            if let Err(e) = scanner.tick().await {
                error!("tick failed: {e}");
                std::process::exit(1);
            }
        }
    }

    let session = executor.session_snapshot().await;
    info!(
        "session summary: balance={} net_profit={} positions_closed={}",
        session.current_balance(),
        session.net_profit,
        session.positions_closed,
    );

    Ok(())
}
