use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    BTC,
    ETH,
    SOL,
    XRP,
    Other,
}

impl Asset {
    /// Tolerant parse: unknown tickers map to `Other` rather than erroring.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "BTC" | "BITCOIN" => Asset::BTC,
            "ETH" | "ETHEREUM" => Asset::ETH,
            "SOL" | "SOLANA" => Asset::SOL,
            "XRP" | "RIPPLE" => Asset::XRP,
            _ => Asset::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    FifteenMin,
    Hourly,
    Daily,
}

impl Timeframe {
    pub fn seconds(&self) -> i64 {
        match self {
            Timeframe::FifteenMin => 900,
            Timeframe::Hourly => 3_600,
            Timeframe::Daily => 86_400,
        }
    }

    /// Tolerant parse: unknown timeframes default to hourly rather than erroring.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "15m" | "15min" | "fifteen_min" => Timeframe::FifteenMin,
            "1h" | "hourly" | "hour" => Timeframe::Hourly,
            "1d" | "daily" | "day" => Timeframe::Daily,
            _ => Timeframe::Hourly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketType {
    UpDown,
    CryptoAbove,
    CryptoPriceRange,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Polymarket,
    Other,
}

/// Which side of a binary market won. Distinct from `TradeSide` (YES/NO):
/// `Outcome::Up` corresponds to the YES token paying out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub venue: Venue,
    pub asset: Asset,
    pub timeframe: Timeframe,
    pub market_type: MarketType,
    pub end_time: DateTime<Utc>,
    pub yes_token_id: String,
    pub no_token_id: String,
    pub yes_ask: Decimal,
    pub yes_bid: Decimal,
    pub no_ask: Decimal,
    pub no_bid: Decimal,
    pub volume_24h: Decimal,
    pub liquidity: Decimal,
    pub fetched_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolution: Option<Outcome>,
}

impl Market {
    /// Validates the invariants a freshly-ingested market must satisfy.
    pub fn validate(&self) -> Result<(), ErrorKind> {
        let zero = Decimal::ZERO;
        let one = Decimal::ONE;
        if !(zero..=one).contains(&self.yes_ask) || !(zero..=one).contains(&self.no_ask) {
            return Err(ErrorKind::Data(format!(
                "market {} has out-of-range ask prices: yes_ask={} no_ask={}",
                self.id, self.yes_ask, self.no_ask
            )));
        }
        if self.yes_bid > self.yes_ask {
            return Err(ErrorKind::Data(format!(
                "market {} has crossed yes book: bid={} ask={}",
                self.id, self.yes_bid, self.yes_ask
            )));
        }
        if self.resolved && self.resolution.is_none() {
            return Err(ErrorKind::Data(format!(
                "market {} marked resolved with no resolution",
                self.id
            )));
        }
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age_secs: i64) -> bool {
        crate::freshness::stale(self.fetched_at, now, max_age_secs)
    }

    pub fn time_to_expiry_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.end_time - now).num_seconds().max(0)
    }
}

/// Latest best prices (and optional depth) captured for a market's two
/// token books at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    pub market_id: String,
    pub yes_ask: Decimal,
    pub yes_bid: Decimal,
    pub no_ask: Decimal,
    pub no_bid: Decimal,
    pub captured_at: DateTime<Utc>,
}

impl OrderbookSnapshot {
    pub fn is_fresh(&self, now: DateTime<Utc>, max_orderbook_age_secs: i64) -> bool {
        !crate::freshness::stale(self.captured_at, now, max_orderbook_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_market() -> Market {
        Market {
            id: "btc-updown-15m-1".into(),
            venue: Venue::Polymarket,
            asset: Asset::BTC,
            timeframe: Timeframe::FifteenMin,
            market_type: MarketType::UpDown,
            end_time: Utc::now(),
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

    #[test]
    fn valid_market_passes() {
        assert!(sample_market().validate().is_ok());
    }

    #[test]
    fn crossed_book_rejected() {
        let mut m = sample_market();
        m.yes_bid = dec!(0.90);
        assert!(m.validate().is_err());
    }

    #[test]
    fn resolved_without_outcome_rejected() {
        let mut m = sample_market();
        m.resolved = true;
        assert!(m.validate().is_err());
    }

    #[test]
    fn asset_parse_is_tolerant() {
        assert_eq!(Asset::parse("btc"), Asset::BTC);
        assert_eq!(Asset::parse("dogecoin"), Asset::Other);
    }
}
