use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::Outcome;

/// The final winning side of a resolved market, used by the backtest
/// simulator as the oracle truth it plays strategies against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketResolution {
    pub condition_id: String,
    pub market_id: String,
    pub winning_side: Outcome,
    pub end_time: DateTime<Utc>,
}

impl MarketResolution {
    /// A resolution is trustworthy only once its `end_time` is actually in
    /// the past — a resolution dated in the future is malformed data, not
    /// a market that resolved early.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }
}

/// One point in a market's pre-expiry price sequence, sampled roughly once
/// per minute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceHistoryPoint {
    pub ts: DateTime<Utc>,
    pub yes_price: Decimal,
    pub no_price: Decimal,
}

impl PriceHistoryPoint {
    /// `yes_price + no_price` should sit close to 1; callers use this to
    /// discard obviously corrupt snapshots.
    pub fn prices_sum_to_one(&self, tolerance: Decimal) -> bool {
        (self.yes_price + self.no_price - Decimal::ONE).abs() <= tolerance
    }
}
