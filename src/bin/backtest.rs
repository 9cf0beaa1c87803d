//! Offline replay entry point: `backtest fetch-data|run|compare|stats|optimize`.
//!
//! `fetch-data` pulls resolutions and price history through `VenueClient`
//! and persists them to the repository; every other subcommand replays
//! already-persisted data. No concrete venue wire client ships in this
//! crate, so `fetch-data` against `PlaceholderVenue` always persists zero
//! rows — a real deployment links a `VenueClient` implementation in its
//! place and this binary's replay/reporting logic is unchanged.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{error, info};

use updown_arb::backtest::{BacktestConfig, BacktestMetrics, BacktestSimulator, Strategy};
use updown_arb::backtest::metrics::{calculate_by_asset, calculate_by_skew_level, calculate_skew_accuracy, compare_strategies};
use updown_arb::backtest::strategies::StrategyParams;
use updown_arb::error::ErrorKind;
use updown_arb::models::market::{Asset, Market, OrderbookSnapshot};
use updown_arb::models::{MarketResolution, PriceHistoryPoint};
use updown_arb::repository::{InMemoryRepository, Repository};
use updown_arb::venue::{OrderResult, SignedOrder, UnsignedOrder, VenueClient};

#[derive(Parser)]
#[command(name = "backtest", about = "Offline replay of the market-scan strategies against resolved markets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Expiry,
    Contrarian,
    ProbabilityGap,
    MomentumContrarian,
    Mispricing,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Expiry => Strategy::ExpiryScalper,
            StrategyArg::Contrarian => Strategy::ContrarianScalper,
            StrategyArg::ProbabilityGap => Strategy::ProbabilityGap,
            StrategyArg::MomentumContrarian => Strategy::MomentumContrarian,
            StrategyArg::Mispricing => Strategy::Mispricing,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Pulls resolutions and price history for replay.
    FetchData {
        #[arg(long, default_value_t = 30)]
        days: i64,
        #[arg(long, value_delimiter = ',')]
        assets: Vec<String>,
        #[arg(long, default_value = "15m")]
        timeframe: String,
        #[arg(long)]
        fetch_prices: bool,
    },
    /// Replays one strategy over the persisted history.
    Run {
        #[arg(long, value_enum)]
        strategy: StrategyArg,
        #[arg(long, default_value_t = 30)]
        days: i64,
        #[arg(long, default_value = "0.75")]
        threshold: String,
        #[arg(long, default_value_t = 180)]
        expiry_window: i64,
        #[arg(long, default_value = "50")]
        position_size: String,
        #[arg(long)]
        export_csv: Option<String>,
    },
    /// Runs every strategy over the same window and reports them side by side.
    Compare {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Per-asset / per-skew / skew-accuracy breakdown for the last run strategy.
    Stats {
        #[arg(long, value_enum)]
        strategy: StrategyArg,
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Sweeps `threshold` over a small grid and reports ROI per value.
    Optimize {
        #[arg(long, value_enum)]
        strategy: StrategyArg,
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

struct PlaceholderVenue;

#[async_trait]
impl VenueClient for PlaceholderVenue {
    fn tracked_assets(&self) -> Vec<Asset> {
        vec![]
    }
    async fn list_active_markets(&self, _asset: Asset, _max_expiry_secs: i64) -> Result<Vec<Market>, ErrorKind> {
        Ok(vec![])
    }
    async fn latest_orderbook(&self, _market_id: &str) -> Result<OrderbookSnapshot, ErrorKind> {
        Err(ErrorKind::Transport("no venue client configured".into()))
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

async fn load_window(
    repository: &InMemoryRepository,
    days: i64,
) -> (Vec<MarketResolution>, HashMap<String, Vec<PriceHistoryPoint>>, DateTime<Utc>, DateTime<Utc>) {
    let end = Utc::now();
    let start = end - Duration::days(days);
    let resolutions = repository.load_resolutions(None, (start, end)).await.unwrap_or_default();

    let mut history = HashMap::new();
    for r in &resolutions {
        let points = repository
            .load_price_history(&r.market_id, (start, end))
            .await
            .unwrap_or_default();
        history.insert(r.market_id.clone(), points);
    }

    (resolutions, history, start, end)
}

fn run_strategy(
    resolutions: &[MarketResolution],
    history: &HashMap<String, Vec<PriceHistoryPoint>>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    strategy: Strategy,
    params: StrategyParams,
) -> updown_arb::backtest::models::BacktestRun {
    let sim = BacktestSimulator::new(BacktestConfig { strategy, params, allow_synthetic_snapshot: false });
    sim.run(resolutions, |id| history.get(id).cloned().unwrap_or_default(), start, end)
}

fn report(metrics: &BacktestMetrics) {
    info!(
        "signals={} filled={} win_rate={} roi={} profit_factor={} max_drawdown={} net_pnl={}",
        metrics.total_signals,
        metrics.orders_filled,
        metrics.win_rate,
        metrics.roi,
        metrics.profit_factor,
        metrics.max_drawdown,
        metrics.net_pnl,
    );
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
    let repository = InMemoryRepository::new();

    match cli.command {
        Command::FetchData { days, assets, timeframe, fetch_prices } => {
            let venue = PlaceholderVenue;
            let window = (Utc::now() - Duration::days(days), Utc::now());
            let parsed_assets: Vec<Asset> = assets.iter().map(|a| Asset::parse(a)).collect();
            let parsed_timeframe = updown_arb::models::market::Timeframe::parse(&timeframe);
            info!(days, assets = ?parsed_assets, timeframe = ?parsed_timeframe, fetch_prices, "fetching backtest data");

            match venue.resolved_markets(window).await {
                Ok(resolutions) => {
                    info!(count = resolutions.len(), "resolutions fetched");
                    for r in resolutions {
                        repository.seed_resolution(r).await;
                    }
                }
                Err(e) => {
                    error!("fetch-data failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Run { strategy, days, threshold, expiry_window, position_size, export_csv } => {
            let (resolutions, history, start, end) = load_window(&repository, days).await;
            let mut params = StrategyParams::default();
            params.skew_threshold = threshold.parse().unwrap_or(dec!(0.75));
            params.expiry_window_seconds = expiry_window;
            params.position_size = position_size.parse().unwrap_or(dec!(50));

            let run = run_strategy(&resolutions, &history, start, end, strategy.into(), params);
            let metrics = BacktestMetrics::calculate(&run.trades);
            report(&metrics);

            if let Some(path) = export_csv {
                info!(path, "CSV export requested (no filesystem writer wired in this crate)");
            }
        }
        Command::Compare { days } => {
            let (resolutions, history, start, end) = load_window(&repository, days).await;
            let strategies = [
                Strategy::ExpiryScalper,
                Strategy::ContrarianScalper,
                Strategy::ProbabilityGap,
                Strategy::MomentumContrarian,
                Strategy::Mispricing,
            ];
            let runs: Vec<(String, Vec<updown_arb::backtest::models::BacktestTrade>)> = strategies
                .into_iter()
                .map(|s| {
                    let run = run_strategy(&resolutions, &history, start, end, s, StrategyParams::default());
                    (run.strategy_name.clone(), run.trades)
                })
                .collect();

            for (name, metrics) in compare_strategies(&runs) {
                info!("{name}: {metrics:?}");
            }
        }
        Command::Stats { strategy, days } => {
            let (resolutions, history, start, end) = load_window(&repository, days).await;
            let run = run_strategy(&resolutions, &history, start, end, strategy.into(), StrategyParams::default());

            for (asset, metrics) in calculate_by_asset(&run.trades) {
                info!("{asset}: {metrics:?}");
            }
            for (bucket, metrics) in calculate_by_skew_level(&run.trades) {
                info!("skew bucket {bucket}: {metrics:?}");
            }
            let accuracy = calculate_skew_accuracy(&run.trades);
            info!(
                skew_accuracy = %accuracy.skew_accuracy,
                contrarian_opportunity = %accuracy.contrarian_opportunity,
                "skew accuracy"
            );
        }
        Command::Optimize { strategy, days } => {
            let (resolutions, history, start, end) = load_window(&repository, days).await;
            let grid = [dec!(0.65), dec!(0.70), dec!(0.75), dec!(0.80), dec!(0.85)];

            for threshold in grid {
                let mut params = StrategyParams::default();
                params.skew_threshold = threshold;
                let run = run_strategy(&resolutions, &history, start, end, strategy.into(), params);
                let metrics = BacktestMetrics::calculate(&run.trades);
                info!(threshold = %threshold, roi = %metrics.roi, win_rate = %metrics.win_rate, "grid point");
            }
        }
    }

    Ok(())
}
