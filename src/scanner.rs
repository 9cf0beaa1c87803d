//! Scan loop: `IDLE -> SCANNING <-> TRADING -> STOPPING`. Each tick
//! discovers/updates prices, settles expired positions, runs detectors, and
//! trades at most one opportunity. Mispricing and cross-venue detection
//! need inputs this crate's read interface doesn't carry (a spot exchange
//! feed, market display text) and so are exercised only in the backtest
//! module and standalone tests; see `DESIGN.md`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::detectors::edge::{self, EdgeConfig};
use crate::detectors::momentum;
use crate::detectors::spread::{self, SpreadConfig};
use crate::executor::Executor;
use crate::models::candle::Candle;
use crate::models::market::{Market, Outcome};
use crate::models::opportunity::Opportunity;
use crate::models::resolution::PriceHistoryPoint;
use crate::models::trade::TradeSide;
use crate::monitor::MarketMonitor;
use crate::repository::Repository;
use crate::venue::VenueClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Trading,
    Stopping,
}

pub struct ScannerConfig {
    pub spread: SpreadConfig,
    pub edge: EdgeConfig,
    pub fee_rate: Decimal,
    pub min_trade_size: Decimal,
    pub max_position_size: Decimal,
}

pub struct Scanner<V: VenueClient, R: Repository> {
    monitor: MarketMonitor<V>,
    repository: Arc<R>,
    executor: Arc<Executor>,
    config: ScannerConfig,
    /// Flipped by the caller's signal handler; checked between ticks.
    shutdown: Arc<AtomicBool>,
    state: ScanState,
}

impl<V: VenueClient, R: Repository> Scanner<V, R> {
    pub fn new(monitor: MarketMonitor<V>, repository: Arc<R>, executor: Arc<Executor>, config: ScannerConfig, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            monitor,
            repository,
            executor,
            config,
            shutdown,
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Forces an immediate market/orderbook refresh, ignoring the monitor's
    /// cache TTL. Used by the CLI's `--fresh` flag before the first tick.
    pub async fn force_refresh(&self) {
        self.refresh_from_venue(true).await;
    }

    /// Runs ticks until `shutdown` is flipped, sleeping `poll_interval`
    /// between them.
    pub async fn run(&mut self, poll_interval: std::time::Duration) {
        self.state = ScanState::Scanning;
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                self.state = ScanState::Stopping;
                info!("scanner stopping");
                return;
            }
            if let Err(e) = self.tick().await {
                warn!(error = %e, "tick failed, continuing after backoff");
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// One full tick: refresh markets and prices, settle anything expired,
    /// evaluate detectors, and trade at most one opportunity.
    pub async fn tick(&mut self) -> Result<(), crate::error::ErrorKind> {
        self.state = ScanState::Scanning;
        let now = Utc::now();

        self.refresh_from_venue(false).await;

        let markets = self.repository.fetch_active_markets_with_fresh_orderbook(self.config.spread.max_price_age_secs).await?;
        debug!(count = markets.len(), "markets loaded for tick");

        self.settle_expired(&markets).await;

        let mut opportunities: Vec<Opportunity> = Vec::new();
        for market in &markets {
            if let Some(spread_opp) = spread::detect(market, self.config.fee_rate, &self.config.spread, now) {
                opportunities.push(Opportunity::Spread(spread_opp));
            }
            if let Some(edge_opp) = self.detect_edge_opportunity(market, now).await {
                opportunities.push(edge_opp);
            }
        }

        opportunities.sort_by(|a, b| b.net_profit().cmp(&a.net_profit()));

        for opp in &opportunities {
            if self.executor.has_open_position(opp.market_id()).await {
                continue;
            }
            if self.try_trade(opp).await {
                self.state = ScanState::Trading;
                break;
            }
        }

        self.state = ScanState::Scanning;
        Ok(())
    }

    /// Pulls markets and orderbook snapshots from the venue (via the
    /// monitor) and writes them back onto the repository so this tick's
    /// detection reads current prices. A discovery or refresh failure is
    /// logged and skipped; the tick proceeds on whatever the repository
    /// already has.
    async fn refresh_from_venue(&self, force_refresh: bool) {
        match self.monitor.discover(force_refresh).await {
            Ok(markets) => {
                for market in markets {
                    if let Err(e) = self.repository.upsert_market(market).await {
                        warn!(error = %e, "failed to persist discovered market");
                    }
                }
            }
            Err(e) => warn!(error = %e, "market discovery failed, continuing with stale repository state"),
        }

        match self.monitor.update_all_prices().await {
            Ok(snapshots) => {
                for snapshot in snapshots {
                    if let Some(mut market) = self.repository.market_by_condition(&snapshot.market_id).await.ok().flatten() {
                        market.yes_ask = snapshot.yes_ask;
                        market.yes_bid = snapshot.yes_bid;
                        market.no_ask = snapshot.no_ask;
                        market.no_bid = snapshot.no_bid;
                        market.fetched_at = snapshot.captured_at;
                        if let Err(e) = self.repository.upsert_market(market).await {
                            warn!(error = %e, "failed to persist refreshed market prices");
                        }
                    }
                    if let Err(e) = self.repository.record_orderbook(snapshot).await {
                        warn!(error = %e, "failed to persist orderbook snapshot");
                    }
                }
            }
            Err(e) => warn!(error = %e, "orderbook refresh failed, continuing with stale prices"),
        }
    }

    async fn settle_expired(&self, markets: &[Market]) {
        for position in self.executor.check_expired_positions(markets).await {
            let Some(market) = markets.iter().find(|m| m.id == position.market_id) else {
                continue;
            };
            let Some(outcome) = market.resolution else {
                debug!(market_id = %market.id, "expired market has no resolution yet, deferring settlement");
                continue;
            };
            self.executor.settle(position.id, outcome).await;
        }
    }

    async fn detect_edge_opportunity(&self, market: &Market, now: chrono::DateTime<Utc>) -> Option<Opportunity> {
        let window = (now - chrono::Duration::hours(6), now);
        let history = self.repository.load_price_history(&market.id, window).await.ok()?;
        let candles = candles_from_price_history(&history);
        let estimate = momentum::calculate_from_candles(&candles, momentum::DEFAULT_RECENT_WEIGHT)?;

        let total_secs = market.timeframe.seconds();
        let remaining = market.time_to_expiry_secs(now);
        let time_fraction_remaining = if total_secs > 0 {
            Decimal::from(remaining) / Decimal::from(total_secs)
        } else {
            Decimal::ZERO
        };

        let result = edge::detect_edge(
            market.yes_ask,
            market.no_ask,
            estimate.prob_up,
            estimate.confidence,
            time_fraction_remaining,
            &self.config.edge,
        )?;

        Some(Opportunity::Edge(crate::models::opportunity::EdgeOpportunity {
            market_id: market.id.clone(),
            side: result.side,
            edge: result.edge,
            adjusted_confidence: result.adjusted_confidence,
            recommended_size: result.recommended_size,
        }))
    }

    async fn execute_directional(&self, market_id: &str, side: TradeSide, invest: Decimal) -> Option<crate::models::position::Position> {
        let market = self.repository.market_by_condition(market_id).await.ok()??;
        let price = if side == TradeSide::Yes { market.yes_ask } else { market.no_ask };
        self.executor.execute_directional_trade(market_id, side, price, invest, self.config.fee_rate).await
    }

    async fn try_trade(&self, opportunity: &Opportunity) -> bool {
        let session = self.executor.session_snapshot().await;
        let size = self
            .config
            .max_position_size
            .min(session.current_balance())
            .min(opportunity_budget(opportunity));

        if size < self.config.min_trade_size {
            return false;
        }

        let opened = match opportunity {
            Opportunity::Spread(opp) => self.executor.execute_spread_trade(opp, size, self.config.fee_rate).await,
            Opportunity::Edge(opp) => self.execute_directional(&opp.market_id, opp.side, size).await,
            Opportunity::Mispricing(opp) => self.execute_directional(&opp.market_id, opp.side, size).await,
            Opportunity::CrossVenue(_) => None,
        };

        if let Some(position) = opened {
            info!(market_id = %position.market_id, invest = %size, "traded opportunity");
            true
        } else {
            false
        }
    }
}

fn opportunity_budget(opportunity: &Opportunity) -> Decimal {
    match opportunity {
        Opportunity::Edge(o) => o.recommended_size,
        Opportunity::Mispricing(o) => o.recommended_size,
        _ => Decimal::MAX,
    }
}

/// Builds one candle per consecutive pair of price-history points: the
/// only OHLC shape available from a scalar price series.
fn candles_from_price_history(points: &[PriceHistoryPoint]) -> Vec<Candle> {
    points
        .windows(2)
        .map(|w| {
            let open = w[0].yes_price.to_string().parse::<f64>().unwrap_or(0.5);
            let close = w[1].yes_price.to_string().parse::<f64>().unwrap_or(0.5);
            Candle {
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 0.0,
                open_time: w[0].ts,
                close_time: w[1].ts,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::{Asset, MarketType, Timeframe, Venue};
    use crate::models::session::BotSession;
    use crate::repository::InMemoryRepository;
    use crate::venue::{OrderResult, SignedOrder, UnsignedOrder};
    use async_trait::async_trait;
    use chrono::Duration;

    struct StubVenue;

    #[async_trait]
    impl VenueClient for StubVenue {
        fn tracked_assets(&self) -> Vec<Asset> {
            vec![Asset::BTC]
        }
        async fn list_active_markets(&self, _asset: Asset, _max_expiry_secs: i64) -> Result<Vec<Market>, crate::error::ErrorKind> {
            Ok(vec![])
        }
        async fn latest_orderbook(&self, market_id: &str) -> Result<crate::models::market::OrderbookSnapshot, crate::error::ErrorKind> {
            Ok(crate::models::market::OrderbookSnapshot {
                market_id: market_id.into(),
                yes_ask: dec!(0.48),
                yes_bid: dec!(0.46),
                no_ask: dec!(0.50),
                no_bid: dec!(0.48),
                captured_at: Utc::now(),
            })
        }
        async fn resolved_markets(&self, _window: (chrono::DateTime<Utc>, chrono::DateTime<Utc>)) -> Result<Vec<crate::models::MarketResolution>, crate::error::ErrorKind> {
            Ok(vec![])
        }
        async fn price_history(&self, _token_id: &str, _window: (chrono::DateTime<Utc>, chrono::DateTime<Utc>), _fidelity_secs: i64) -> Result<Vec<(chrono::DateTime<Utc>, Decimal)>, crate::error::ErrorKind> {
            Ok(vec![])
        }
        async fn sign_order(&self, order: UnsignedOrder) -> Result<SignedOrder, crate::error::ErrorKind> {
            Ok(SignedOrder { order, signature: String::new() })
        }
        async fn submit(&self, _signed: SignedOrder) -> Result<OrderResult, crate::error::ErrorKind> {
            Ok(OrderResult { accepted: false, fill_price: None })
        }
    }

    fn sample_market(id: &str) -> Market {
        Market {
            id: id.into(),
            venue: Venue::Polymarket,
            asset: Asset::BTC,
            timeframe: Timeframe::FifteenMin,
            market_type: MarketType::UpDown,
            end_time: Utc::now() + Duration::hours(1),
            yes_token_id: "y".into(),
            no_token_id: "n".into(),
            yes_ask: dec!(0.48),
            yes_bid: dec!(0.46),
            no_ask: dec!(0.50),
            no_bid: dec!(0.48),
            volume_24h: dec!(1000),
            liquidity: dec!(5000),
            fetched_at: Utc::now(),
            resolved: false,
            resolution: None,
        }
    }

    fn scanner_config() -> ScannerConfig {
        ScannerConfig {
            spread: SpreadConfig { min_profit: dec!(0.01), max_price_age_secs: 30 },
            edge: EdgeConfig { min_confidence: dec!(0.6), min_edge: dec!(0.05), kelly_fraction: dec!(0.25), max_position_pct: dec!(0.2), fee_rate: dec!(0.02) },
            fee_rate: dec!(0.02),
            min_trade_size: dec!(10),
            max_position_size: dec!(200),
        }
    }

    async fn scanner() -> Scanner<StubVenue, InMemoryRepository> {
        let repo = Arc::new(InMemoryRepository::new());
        let monitor = MarketMonitor::new(Arc::new(StubVenue), crate::monitor::MonitorConfig { max_time_to_expiry_secs: 3600 * 24, max_orderbook_age_secs: 30 });
        let executor = Arc::new(Executor::new(BotSession::new(dec!(1000), true), crate::executor::ExecutorConfig { max_position_size: dec!(200), max_total_exposure: dec!(500) }));
        Scanner::new(monitor, repo, executor, scanner_config(), Arc::new(AtomicBool::new(false)))
    }

    #[tokio::test]
    async fn tick_trades_a_spread_hit() {
        let mut s = scanner().await;
        s.repository.seed_market(sample_market("m1")).await;
        s.repository
            .seed_orderbook(crate::models::market::OrderbookSnapshot {
                market_id: "m1".into(),
                yes_ask: dec!(0.48),
                yes_bid: dec!(0.46),
                no_ask: dec!(0.50),
                no_bid: dec!(0.48),
                captured_at: Utc::now(),
            })
            .await;

        s.tick().await.unwrap();
        assert!(s.executor.has_open_position("m1").await);
    }

    #[tokio::test]
    async fn tick_skips_markets_with_an_existing_open_position() {
        let mut s = scanner().await;
        s.repository.seed_market(sample_market("m1")).await;
        s.repository
            .seed_orderbook(crate::models::market::OrderbookSnapshot {
                market_id: "m1".into(),
                yes_ask: dec!(0.48),
                yes_bid: dec!(0.46),
                no_ask: dec!(0.50),
                no_bid: dec!(0.48),
                captured_at: Utc::now(),
            })
            .await;

        s.tick().await.unwrap();
        let opened_first = s.executor.has_open_position("m1").await;
        s.tick().await.unwrap();
        assert!(opened_first);
    }
}
