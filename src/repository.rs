//! Storage contract. No concrete database lives in this crate — persistence
//! schema and wire format are behavioural, not physical (see external
//! interfaces). `InMemoryRepository` backs the test suite and the `backtest`
//! binary's local replay.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::models::market::Asset;
use crate::models::{Market, MarketResolution, OrderbookSnapshot, Position, PriceHistoryPoint, Trade};

#[async_trait]
pub trait Repository: Send + Sync {
    /// Active, non-expired markets whose latest orderbook snapshot is no
    /// older than `max_orderbook_age_secs`.
    async fn fetch_active_markets_with_fresh_orderbook(
        &self,
        max_orderbook_age_secs: i64,
    ) -> Result<Vec<Market>, ErrorKind>;

    async fn latest_orderbook(&self, market_id: &str) -> Result<Option<OrderbookSnapshot>, ErrorKind>;

    async fn market_by_condition(&self, condition_id: &str) -> Result<Option<Market>, ErrorKind>;

    /// Writes back a market discovered or refreshed by the monitor this
    /// tick. Insert-or-replace by `id`.
    async fn upsert_market(&self, market: Market) -> Result<(), ErrorKind>;

    /// Writes back a freshly fetched orderbook snapshot. Insert-or-replace
    /// by `market_id`; only the latest snapshot per market is retained.
    async fn record_orderbook(&self, snapshot: OrderbookSnapshot) -> Result<(), ErrorKind>;

    /// Inserts a new open position. Every call within one tick that writes
    /// state belongs to a single logical transaction at the caller's level.
    async fn create_position(&self, position: Position) -> Result<(), ErrorKind>;

    async fn record_trade(&self, position_id: Uuid, trade: Trade) -> Result<(), ErrorKind>;

    async fn close_position(&self, position_id: Uuid, position: Position) -> Result<(), ErrorKind>;

    async fn load_resolutions(
        &self,
        assets: Option<&[Asset]>,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<Vec<MarketResolution>, ErrorKind>;

    async fn load_price_history(
        &self,
        condition_id: &str,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<Vec<PriceHistoryPoint>, ErrorKind>;
}

#[derive(Default)]
struct Store {
    markets: HashMap<String, Market>,
    orderbooks: HashMap<String, OrderbookSnapshot>,
    positions: HashMap<Uuid, Position>,
    resolutions: Vec<MarketResolution>,
    price_history: HashMap<String, Vec<PriceHistoryPoint>>,
}

/// In-memory repository. Single transaction per call is trivially true
/// here; real deployments back this with a DB transaction per tick.
pub struct InMemoryRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
        }
    }

    pub async fn seed_market(&self, market: Market) {
        self.store.write().await.markets.insert(market.id.clone(), market);
    }

    pub async fn seed_orderbook(&self, snapshot: OrderbookSnapshot) {
        self.store
            .write()
            .await
            .orderbooks
            .insert(snapshot.market_id.clone(), snapshot);
    }

    pub async fn seed_resolution(&self, resolution: MarketResolution) {
        self.store.write().await.resolutions.push(resolution);
    }

    pub async fn seed_price_history(&self, condition_id: &str, points: Vec<PriceHistoryPoint>) {
        self.store
            .write()
            .await
            .price_history
            .insert(condition_id.to_string(), points);
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn fetch_active_markets_with_fresh_orderbook(
        &self,
        max_orderbook_age_secs: i64,
    ) -> Result<Vec<Market>, ErrorKind> {
        let now = Utc::now();
        let store = self.store.read().await;
        let markets = store
            .markets
            .values()
            .filter(|m| !m.is_expired(now) && !m.resolved)
            .filter(|m| {
                store
                    .orderbooks
                    .get(&m.id)
                    .map(|ob| ob.is_fresh(now, max_orderbook_age_secs))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        Ok(markets)
    }

    async fn latest_orderbook(&self, market_id: &str) -> Result<Option<OrderbookSnapshot>, ErrorKind> {
        Ok(self.store.read().await.orderbooks.get(market_id).cloned())
    }

    async fn market_by_condition(&self, condition_id: &str) -> Result<Option<Market>, ErrorKind> {
        Ok(self
            .store
            .read()
            .await
            .markets
            .values()
            .find(|m| m.id == condition_id)
            .cloned())
    }

    async fn upsert_market(&self, market: Market) -> Result<(), ErrorKind> {
        self.store.write().await.markets.insert(market.id.clone(), market);
        Ok(())
    }

    async fn record_orderbook(&self, snapshot: OrderbookSnapshot) -> Result<(), ErrorKind> {
        self.store.write().await.orderbooks.insert(snapshot.market_id.clone(), snapshot);
        Ok(())
    }

    async fn create_position(&self, position: Position) -> Result<(), ErrorKind> {
        self.store.write().await.positions.insert(position.id, position);
        Ok(())
    }

    async fn record_trade(&self, position_id: Uuid, trade: Trade) -> Result<(), ErrorKind> {
        let mut store = self.store.write().await;
        let position = store
            .positions
            .get_mut(&position_id)
            .ok_or_else(|| ErrorKind::Consistency(format!("no position {position_id}")))?;
        position.trades.push(trade);
        Ok(())
    }

    async fn close_position(&self, position_id: Uuid, position: Position) -> Result<(), ErrorKind> {
        self.store.write().await.positions.insert(position_id, position);
        Ok(())
    }

    async fn load_resolutions(
        &self,
        assets: Option<&[Asset]>,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<Vec<MarketResolution>, ErrorKind> {
        let store = self.store.read().await;
        let filtered = store
            .resolutions
            .iter()
            .filter(|r| r.end_time >= window.0 && r.end_time <= window.1)
            .filter(|r| match assets {
                None => true,
                Some(assets) => store
                    .markets
                    .get(&r.market_id)
                    .map(|m| assets.contains(&m.asset))
                    .unwrap_or(false),
            })
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn load_price_history(
        &self,
        condition_id: &str,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<Vec<PriceHistoryPoint>, ErrorKind> {
        let store = self.store.read().await;
        let points = store
            .price_history
            .get(condition_id)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.ts >= window.0 && p.ts <= window.1)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::{MarketType, Outcome, Timeframe, Venue};
    use rust_decimal_macros::dec;

    fn sample_market(id: &str, end_time: DateTime<Utc>) -> Market {
        Market {
            id: id.into(),
            venue: Venue::Polymarket,
            asset: Asset::BTC,
            timeframe: Timeframe::FifteenMin,
            market_type: MarketType::UpDown,
            end_time,
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

    #[tokio::test]
    async fn excludes_markets_without_fresh_orderbook() {
        let repo = InMemoryRepository::new();
        let m = sample_market("m1", Utc::now() + chrono::Duration::hours(1));
        repo.seed_market(m).await;
        let active = repo.fetch_active_markets_with_fresh_orderbook(30).await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn includes_markets_with_fresh_orderbook() {
        let repo = InMemoryRepository::new();
        let m = sample_market("m1", Utc::now() + chrono::Duration::hours(1));
        repo.seed_market(m).await;
        repo.seed_orderbook(OrderbookSnapshot {
            market_id: "m1".into(),
            yes_ask: dec!(0.48),
            yes_bid: dec!(0.46),
            no_ask: dec!(0.50),
            no_bid: dec!(0.48),
            captured_at: Utc::now(),
        })
        .await;
        let active = repo.fetch_active_markets_with_fresh_orderbook(30).await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn upsert_market_makes_it_visible_via_the_trait() {
        let repo = InMemoryRepository::new();
        let m = sample_market("m1", Utc::now() + chrono::Duration::hours(1));
        repo.upsert_market(m.clone()).await.unwrap();
        repo.record_orderbook(OrderbookSnapshot {
            market_id: "m1".into(),
            yes_ask: dec!(0.48),
            yes_bid: dec!(0.46),
            no_ask: dec!(0.50),
            no_bid: dec!(0.48),
            captured_at: Utc::now(),
        })
        .await
        .unwrap();
        assert!(repo.market_by_condition("m1").await.unwrap().is_some());
        let active = repo.fetch_active_markets_with_fresh_orderbook(30).await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn resolution_window_filters() {
        let repo = InMemoryRepository::new();
        repo.seed_resolution(MarketResolution {
            condition_id: "c1".into(),
            market_id: "m1".into(),
            winning_side: Outcome::Up,
            end_time: Utc::now() - chrono::Duration::days(10),
        })
        .await;
        let window = (Utc::now() - chrono::Duration::days(1), Utc::now());
        let found = repo.load_resolutions(None, window).await.unwrap();
        assert!(found.is_empty());
    }
}
