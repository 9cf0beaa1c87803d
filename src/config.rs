use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::market::Asset;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub log_level: String,
    pub scan_interval_secs: u64,
    pub max_concurrent_requests: usize,
    pub thresholds: ThresholdConfig,
    pub fees: FeeConfig,
    pub spread_bot: SpreadBotConfig,
    pub edge_trader: EdgeTraderConfig,
}

/// Minimum-profit and staleness gates shared across detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub min_internal_arb_profit: Decimal,
    pub min_cross_platform_arb_profit: Decimal,
    pub min_hedging_arb_profit: Decimal,
    pub max_price_age_seconds: i64,
    pub max_orderbook_age_seconds: i64,
}

/// Per-venue taker fee rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub polymarket: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadBotConfig {
    pub dry_run: bool,
    pub min_profit: Decimal,
    pub max_position_size: Decimal,
    pub max_total_exposure: Decimal,
    pub starting_balance: Decimal,
    pub assets: Vec<Asset>,
    pub max_time_to_expiry_secs: i64,
    pub poll_interval_secs: u64,
    pub log_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeTraderConfig {
    pub min_edge: Decimal,
    pub min_confidence: Decimal,
    pub kelly_fraction: Decimal,
    pub max_position_pct: Decimal,
    pub fee_rate: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_internal_arb_profit: dec!(0.01),
            min_cross_platform_arb_profit: dec!(0.02),
            min_hedging_arb_profit: dec!(0.015),
            max_price_age_seconds: 30,
            max_orderbook_age_seconds: 30,
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self { polymarket: dec!(0.02) }
    }
}

impl Default for SpreadBotConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            min_profit: dec!(0.01),
            max_position_size: dec!(200),
            max_total_exposure: dec!(1000),
            starting_balance: dec!(1000),
            assets: vec![Asset::BTC, Asset::ETH, Asset::SOL, Asset::XRP],
            max_time_to_expiry_secs: 3_600 * 24,
            poll_interval_secs: 5,
            log_file: "updown-arb.log".into(),
        }
    }
}

impl Default for EdgeTraderConfig {
    fn default() -> Self {
        Self {
            min_edge: dec!(0.05),
            min_confidence: dec!(0.6),
            kelly_fraction: dec!(0.25),
            max_position_pct: dec!(0.2),
            fee_rate: dec!(0.02),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://updown-arb.db".into(),
            log_level: "info".into(),
            scan_interval_secs: 5,
            max_concurrent_requests: 8,
            thresholds: ThresholdConfig::default(),
            fees: FeeConfig::default(),
            spread_bot: SpreadBotConfig::default(),
            edge_trader: EdgeTraderConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables (`.env` file) with
    /// defaults. Every variable is optional; an unset or unparsable value
    /// falls back to the matching default rather than failing the load.
    pub fn load_or_default() -> Self {
        let _ = dotenv::dotenv();

        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(v) = env_u64("SCAN_INTERVAL") {
            config.scan_interval_secs = v;
        }
        if let Ok(v) = env_usize("MAX_CONCURRENT_REQUESTS") {
            config.max_concurrent_requests = v;
        }

        if let Ok(v) = env_decimal("MIN_INTERNAL_ARB_PROFIT") {
            config.thresholds.min_internal_arb_profit = v;
        }
        if let Ok(v) = env_decimal("MIN_CROSS_PLATFORM_ARB_PROFIT") {
            config.thresholds.min_cross_platform_arb_profit = v;
        }
        if let Ok(v) = env_decimal("MIN_HEDGING_ARB_PROFIT") {
            config.thresholds.min_hedging_arb_profit = v;
        }
        if let Ok(v) = env_i64("MAX_PRICE_AGE_SECONDS") {
            config.thresholds.max_price_age_seconds = v;
        }
        if let Ok(v) = env_i64("MAX_ORDERBOOK_AGE") {
            config.thresholds.max_orderbook_age_seconds = v;
        }

        if let Ok(v) = env_decimal("POLYMARKET_FEE_RATE") {
            config.fees.polymarket = v;
        }

        if let Ok(v) = std::env::var("DRY_RUN") {
            config.spread_bot.dry_run = v == "true" || v == "1";
        }
        if let Ok(v) = env_decimal("MIN_PROFIT") {
            config.spread_bot.min_profit = v;
        }
        if let Ok(v) = env_decimal("MAX_POSITION_SIZE") {
            config.spread_bot.max_position_size = v;
        }
        if let Ok(v) = env_decimal("MAX_TOTAL_EXPOSURE") {
            config.spread_bot.max_total_exposure = v;
        }
        if let Ok(v) = env_decimal("STARTING_BALANCE") {
            config.spread_bot.starting_balance = v;
        }
        if let Ok(v) = std::env::var("ASSETS") {
            let assets: Vec<Asset> = v.split(',').map(Asset::parse).collect();
            if !assets.is_empty() {
                config.spread_bot.assets = assets;
            }
        }
        if let Ok(v) = env_i64("MAX_TIME_TO_EXPIRY") {
            config.spread_bot.max_time_to_expiry_secs = v;
        }
        if let Ok(v) = env_u64("POLL_INTERVAL") {
            config.spread_bot.poll_interval_secs = v;
        }
        if let Ok(v) = std::env::var("LOG_FILE") {
            config.spread_bot.log_file = v;
        }

        if let Ok(v) = env_decimal("EDGE_MIN_EDGE") {
            config.edge_trader.min_edge = v;
        }
        if let Ok(v) = env_decimal("EDGE_MIN_CONFIDENCE") {
            config.edge_trader.min_confidence = v;
        }
        if let Ok(v) = env_decimal("EDGE_KELLY_FRACTION") {
            config.edge_trader.kelly_fraction = v;
        }
        if let Ok(v) = env_decimal("EDGE_MAX_POSITION_PCT") {
            config.edge_trader.max_position_pct = v;
        }
        if let Ok(v) = env_decimal("EDGE_FEE_RATE") {
            config.edge_trader.fee_rate = v;
        }

        config
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.spread_bot.starting_balance > Decimal::ZERO,
            "starting_balance must be positive"
        );
        anyhow::ensure!(
            self.spread_bot.max_position_size > Decimal::ZERO,
            "max_position_size must be positive"
        );
        anyhow::ensure!(
            self.spread_bot.max_total_exposure >= self.spread_bot.max_position_size,
            "max_total_exposure must be at least max_position_size"
        );
        anyhow::ensure!(
            self.edge_trader.kelly_fraction > Decimal::ZERO && self.edge_trader.kelly_fraction <= Decimal::ONE,
            "edge_trader.kelly_fraction must be in (0, 1]"
        );
        Ok(())
    }
}

fn env_decimal(key: &str) -> Result<Decimal, ()> {
    std::env::var(key).ok().and_then(|v| v.parse::<Decimal>().ok()).ok_or(())
}

fn env_i64(key: &str) -> Result<i64, ()> {
    std::env::var(key).ok().and_then(|v| v.parse::<i64>().ok()).ok_or(())
}

fn env_u64(key: &str) -> Result<u64, ()> {
    std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok()).ok_or(())
}

fn env_usize(key: &str) -> Result<usize, ()> {
    std::env::var(key).ok().and_then(|v| v.parse::<usize>().ok()).ok_or(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_exposure_smaller_than_position_size() {
        let mut config = Config::default();
        config.spread_bot.max_total_exposure = dec!(10);
        config.spread_bot.max_position_size = dec!(200);
        assert!(config.validate().is_err());
    }
}
