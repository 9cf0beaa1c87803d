//! Same-market YES+NO spread arbitrage: buy both legs when their combined
//! ask price undercuts the $1 guaranteed payout.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::models::market::Market;
use crate::models::opportunity::SpreadOpportunity;
use crate::numeric::proportional_arb;

/// A market less than an hour from expiry is too risky to spread-trade,
/// independent of whatever upper bound the monitor used to discover it.
const MIN_TIME_TO_EXPIRY_FOR_SPREAD_SECS: i64 = 3600;

pub struct SpreadConfig {
    pub min_profit: Decimal,
    pub max_price_age_secs: i64,
}

/// Evaluates one market for a spread opportunity. Returns `None` rather
/// than raising on any rejection path — detectors never fail the tick.
pub fn detect(market: &Market, fee_rate: Decimal, config: &SpreadConfig, now: chrono::DateTime<chrono::Utc>) -> Option<SpreadOpportunity> {
    if market.resolved {
        return None;
    }
    if market.is_expired(now) || market.time_to_expiry_secs(now) < MIN_TIME_TO_EXPIRY_FOR_SPREAD_SECS {
        debug!(market_id = %market.id, "skipping expiring-soon market for spread scan");
        return None;
    }
    if market.is_stale(now, config.max_price_age_secs) {
        debug!(market_id = %market.id, "skipping stale market for spread scan");
        return None;
    }

    let yes = market.yes_ask;
    let no = market.no_ask;
    if yes <= Decimal::ZERO || no <= Decimal::ZERO {
        return None;
    }

    let total_cost = yes + no;
    if total_cost >= Decimal::ONE {
        return None;
    }

    let gross_profit = Decimal::ONE - total_cost;
    let estimated_fees = total_cost * fee_rate;
    let net_profit = gross_profit - estimated_fees;

    if net_profit <= Decimal::ZERO || net_profit < config.min_profit {
        return None;
    }

    let allocation = proportional_arb(yes, no, Decimal::ONE, fee_rate);

    Some(SpreadOpportunity {
        market_id: market.id.clone(),
        gross_profit,
        net_profit,
        confidence: confidence(gross_profit, market.liquidity, market.volume_24h),
        yes_alloc: allocation.yes_alloc,
        no_alloc: allocation.no_alloc,
        yes_price: yes,
        no_price: no,
    })
}

fn confidence(gross_profit: Decimal, liquidity: Decimal, volume_24h: Decimal) -> Decimal {
    let mut c = dec!(0.8);
    if gross_profit > dec!(0.05) {
        c -= dec!(0.2);
    }
    if liquidity < dec!(1000) {
        c -= dec!(0.1);
    }
    if volume_24h < dec!(100) {
        c -= dec!(0.1);
    }
    c.clamp(dec!(0.1), dec!(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::{Asset, MarketType, Timeframe, Venue};
    use chrono::Utc;

    fn sample_market(yes_ask: Decimal, no_ask: Decimal) -> Market {
        Market {
            id: "m1".into(),
            venue: Venue::Polymarket,
            asset: Asset::BTC,
            timeframe: Timeframe::FifteenMin,
            market_type: MarketType::UpDown,
            end_time: Utc::now() + chrono::Duration::hours(1),
            yes_token_id: "y".into(),
            no_token_id: "n".into(),
            yes_ask,
            yes_bid: yes_ask - dec!(0.01),
            no_ask,
            no_bid: no_ask - dec!(0.01),
            volume_24h: dec!(1000),
            liquidity: dec!(5000),
            fetched_at: Utc::now(),
            resolved: false,
            resolution: None,
        }
    }

    fn default_config() -> SpreadConfig {
        SpreadConfig {
            min_profit: dec!(0.01),
            max_price_age_secs: 30,
        }
    }

    #[test]
    fn detects_spread_hit() {
        let m = sample_market(dec!(0.48), dec!(0.50));
        let opp = detect(&m, Decimal::ZERO, &default_config(), Utc::now()).unwrap();
        assert!((opp.net_profit - dec!(0.02)).abs() < dec!(0.001));
    }

    #[test]
    fn no_opportunity_when_prices_sum_to_one_or_more() {
        let m = sample_market(dec!(0.50), dec!(0.52));
        assert!(detect(&m, Decimal::ZERO, &default_config(), Utc::now()).is_none());
    }

    #[test]
    fn fees_can_wipe_out_thin_edge() {
        let m = sample_market(dec!(0.49), dec!(0.50));
        let opp = detect(&m, dec!(0.05), &default_config(), Utc::now());
        assert!(opp.is_none());
    }

    #[test]
    fn resolved_market_rejected() {
        let mut m = sample_market(dec!(0.40), dec!(0.40));
        m.resolved = true;
        assert!(detect(&m, Decimal::ZERO, &default_config(), Utc::now()).is_none());
    }

    #[test]
    fn near_expiry_market_rejected() {
        let mut m = sample_market(dec!(0.48), dec!(0.50));
        m.end_time = Utc::now() + chrono::Duration::minutes(2);
        assert!(detect(&m, Decimal::ZERO, &default_config(), Utc::now()).is_none());
    }

    #[test]
    fn far_out_market_still_accepted() {
        let mut m = sample_market(dec!(0.48), dec!(0.50));
        m.end_time = Utc::now() + chrono::Duration::days(2);
        assert!(detect(&m, Decimal::ZERO, &default_config(), Utc::now()).is_some());
    }
}
