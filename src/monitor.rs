//! Market monitor: discovers eligible markets and keeps their orderbook
//! snapshots current, tolerating per-asset failures rather than aborting
//! the whole scan.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ErrorKind;
use crate::models::{Market, OrderbookSnapshot};
use crate::venue::VenueClient;

const CACHE_TTL_SECS: i64 = 60;

pub struct MonitorConfig {
    pub max_time_to_expiry_secs: i64,
    pub max_orderbook_age_secs: i64,
}

struct Cache {
    markets: HashMap<String, Market>,
    fetched_at: Option<DateTime<Utc>>,
}

impl Cache {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.fetched_at {
            Some(ts) => (now - ts).num_seconds() <= CACHE_TTL_SECS,
            None => false,
        }
    }
}

/// Discovers and refreshes markets across venues. A single `discover` call
/// walks every configured asset; a failure fetching one asset is logged and
/// skipped, never aborts the others.
pub struct MarketMonitor<V: VenueClient> {
    venue: Arc<V>,
    config: MonitorConfig,
    cache: RwLock<Cache>,
}

impl<V: VenueClient> MarketMonitor<V> {
    pub fn new(venue: Arc<V>, config: MonitorConfig) -> Self {
        Self {
            venue,
            config,
            cache: RwLock::new(Cache {
                markets: HashMap::new(),
                fetched_at: None,
            }),
        }
    }

    /// Loads eligible markets: not expired, not too far from expiry.
    /// `force_refresh` invalidates the cache regardless of its age.
    pub async fn discover(&self, force_refresh: bool) -> Result<Vec<Market>, ErrorKind> {
        let now = Utc::now();
        {
            let cache = self.cache.read().await;
            if !force_refresh && cache.is_fresh(now) {
                return Ok(cache.markets.values().cloned().collect());
            }
        }

        let mut fresh = HashMap::new();
        for asset in self.venue.tracked_assets() {
            match self.venue.list_active_markets(asset, self.config.max_time_to_expiry_secs).await {
                Ok(markets) => {
                    for m in markets {
                        if m.is_expired(now) {
                            continue;
                        }
                        if m.time_to_expiry_secs(now) > self.config.max_time_to_expiry_secs {
                            continue;
                        }
                        fresh.insert(m.id.clone(), m);
                    }
                }
                Err(e) => {
                    warn!(asset = ?asset, error = %e, "market discovery failed for asset, continuing");
                }
            }
        }

        let mut cache = self.cache.write().await;
        cache.markets = fresh.clone();
        cache.fetched_at = Some(now);
        Ok(fresh.into_values().collect())
    }

    /// Refreshes the orderbook snapshot of every cached market in one batch.
    pub async fn update_all_prices(&self) -> Result<Vec<OrderbookSnapshot>, ErrorKind> {
        let ids: Vec<String> = {
            let cache = self.cache.read().await;
            cache.markets.keys().cloned().collect()
        };

        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            match self.venue.latest_orderbook(&id).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => debug!(market_id = %id, error = %e, "orderbook refresh failed, skipping"),
            }
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::{Asset, MarketType, Timeframe, Venue};
    use crate::venue::{OrderResult, SignedOrder, UnsignedOrder};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyVenue {
        calls: AtomicUsize,
    }

    fn sample_market(id: &str, expires_in_secs: i64) -> Market {
        Market {
            id: id.into(),
            venue: Venue::Polymarket,
            asset: Asset::BTC,
            timeframe: Timeframe::FifteenMin,
            market_type: MarketType::UpDown,
            end_time: Utc::now() + chrono::Duration::seconds(expires_in_secs),
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

    #[async_trait]
    impl VenueClient for FlakyVenue {
        fn tracked_assets(&self) -> Vec<Asset> {
            vec![Asset::BTC, Asset::ETH]
        }

        async fn list_active_markets(&self, asset: Asset, _max_expiry_secs: i64) -> Result<Vec<Market>, ErrorKind> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match asset {
                Asset::ETH => Err(ErrorKind::Transport("feed down".into())),
                _ => Ok(vec![sample_market("btc-1", 600), sample_market("btc-2", 10_000_000)]),
            }
        }

        async fn latest_orderbook(&self, market_id: &str) -> Result<OrderbookSnapshot, ErrorKind> {
            Ok(OrderbookSnapshot {
                market_id: market_id.into(),
                yes_ask: dec!(0.48),
                yes_bid: dec!(0.46),
                no_ask: dec!(0.50),
                no_bid: dec!(0.48),
                captured_at: Utc::now(),
            })
        }

        async fn resolved_markets(
            &self,
            _window: (DateTime<Utc>, DateTime<Utc>),
        ) -> Result<Vec<crate::models::MarketResolution>, ErrorKind> {
            Ok(vec![])
        }

        async fn price_history(
            &self,
            _token_id: &str,
            _window: (DateTime<Utc>, DateTime<Utc>),
            _fidelity_secs: i64,
        ) -> Result<Vec<(DateTime<Utc>, rust_decimal::Decimal)>, ErrorKind> {
            Ok(vec![])
        }

        async fn sign_order(&self, order: UnsignedOrder) -> Result<SignedOrder, ErrorKind> {
            Ok(SignedOrder { order, signature: String::new() })
        }

        async fn submit(&self, _signed: SignedOrder) -> Result<OrderResult, ErrorKind> {
            Ok(OrderResult { accepted: false, fill_price: None })
        }
    }

    #[tokio::test]
    async fn discover_drops_far_out_and_expired_markets() {
        let monitor = MarketMonitor::new(
            Arc::new(FlakyVenue { calls: AtomicUsize::new(0) }),
            MonitorConfig {
                max_time_to_expiry_secs: 3_600,
                max_orderbook_age_secs: 30,
            },
        );
        let markets = monitor.discover(false).await.unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].id, "btc-1");
    }

    #[tokio::test]
    async fn discover_tolerates_one_asset_failing() {
        let monitor = MarketMonitor::new(
            Arc::new(FlakyVenue { calls: AtomicUsize::new(0) }),
            MonitorConfig {
                max_time_to_expiry_secs: 3_600,
                max_orderbook_age_secs: 30,
            },
        );
        // ETH fails transport but BTC still comes back.
        let markets = monitor.discover(false).await.unwrap();
        assert!(!markets.is_empty());
    }

    #[tokio::test]
    async fn cache_reused_until_ttl_or_force_refresh() {
        let venue = Arc::new(FlakyVenue { calls: AtomicUsize::new(0) });
        let monitor = MarketMonitor::new(
            venue.clone(),
            MonitorConfig {
                max_time_to_expiry_secs: 3_600,
                max_orderbook_age_secs: 30,
            },
        );
        monitor.discover(false).await.unwrap();
        let calls_after_first = venue.calls.load(Ordering::SeqCst);
        monitor.discover(false).await.unwrap();
        assert_eq!(venue.calls.load(Ordering::SeqCst), calls_after_first);
        monitor.discover(true).await.unwrap();
        assert!(venue.calls.load(Ordering::SeqCst) > calls_after_first);
    }
}
