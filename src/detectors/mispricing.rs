//! Mispricing detector: the underlying spot price has moved but the market
//! hasn't repriced yet (exchange lag). Estimates a "real" probability from
//! the size of the spot move and compares it against the market's price.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::candle::Candle;
use crate::models::trade::TradeSide;

pub struct MispricingConfig {
    pub min_btc_change_pct: Decimal,
    pub min_edge: Decimal,
    pub max_market_price: Decimal,
    pub kelly_fraction: Decimal,
    pub scale_with_edge: bool,
    /// Gated per an open question left unresolved upstream: whether to
    /// trade the cheaper side when no real spot data backs the signal.
    /// Must never consult the winning side — that would make this an
    /// oracle-backed strategy, not a mispricing detector.
    pub allow_cheap_side_fallback: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MispricingResult {
    pub side: TradeSide,
    pub edge: Decimal,
    pub confidence: Decimal,
    pub recommended_size: Decimal,
    pub spot_delta_pct: Decimal,
}

/// `(last_close - first_open) / first_open` over the supplied candle
/// window. Zero if the window is empty or malformed.
pub fn spot_delta_pct(candles: &[Candle]) -> f64 {
    let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
        return 0.0;
    };
    if first.open == 0.0 {
        return 0.0;
    }
    (last.close - first.open) / first.open
}

/// Piecewise estimate of the true probability of UP given the size of a
/// confirmed spot move and time remaining to expiry.
pub fn estimate_real_probability(delta: f64, time_to_expiry_secs: i64) -> Decimal {
    let abs_delta = delta.abs();
    let base = (0.65 + (abs_delta - 0.003) * 28.57).clamp(0.55, 0.95);
    let time_factor = (1.0 - (time_to_expiry_secs as f64 / 600.0) * 0.10).max(0.90);
    let strength_bonus = if abs_delta > 0.01 {
        0.05
    } else if abs_delta > 0.005 {
        0.02
    } else {
        0.0
    };
    let real_prob = (base * time_factor + strength_bonus).clamp(0.50, 0.95);
    Decimal::from_f64_retain(real_prob).unwrap_or(dec!(0.5))
}

fn calculate_confidence(edge: f64, abs_delta: f64, time_to_expiry_secs: i64, price: f64) -> Decimal {
    let mut c = 0.5;
    if edge > 0.40 {
        c += 0.20;
    } else if edge > 0.30 {
        c += 0.15;
    } else if edge > 0.20 {
        c += 0.10;
    }
    if abs_delta > 0.01 {
        c += 0.15;
    } else if abs_delta > 0.005 {
        c += 0.10;
    }
    if (180..=480).contains(&time_to_expiry_secs) {
        c += 0.10;
    }
    if price < 0.15 {
        c += 0.10;
    } else if price < 0.25 {
        c += 0.05;
    }
    Decimal::from_f64_retain(c.min(0.95)).unwrap_or(dec!(0.5))
}

/// Detects a tradeable mispricing from a confirmed spot-price move.
/// `market_price` is the ask on the side the move favors.
pub fn detect(
    candles: &[Candle],
    market_price_yes: Decimal,
    market_price_no: Decimal,
    time_to_expiry_secs: i64,
    config: &MispricingConfig,
) -> Option<MispricingResult> {
    let delta = spot_delta_pct(candles);
    let abs_delta = delta.abs();
    let min_change = config.min_btc_change_pct.to_string().parse::<f64>().unwrap_or(0.003);
    if abs_delta < min_change {
        return None;
    }

    let side = if delta > 0.0 { TradeSide::Yes } else { TradeSide::No };
    let market_price = match side {
        TradeSide::Yes => market_price_yes,
        TradeSide::No => market_price_no,
    };

    if market_price > config.max_market_price {
        return None;
    }

    let real_prob = estimate_real_probability(delta, time_to_expiry_secs);
    let edge = real_prob - market_price;
    if edge < config.min_edge {
        return None;
    }

    let edge_f64 = edge.to_string().parse::<f64>().unwrap_or(0.0);
    let price_f64 = market_price.to_string().parse::<f64>().unwrap_or(1.0);
    let confidence = calculate_confidence(edge_f64, abs_delta, time_to_expiry_secs, price_f64);

    let size = position_size(edge, confidence, config);

    Some(MispricingResult {
        side,
        edge,
        confidence,
        recommended_size: size,
        spot_delta_pct: Decimal::from_f64_retain(delta).unwrap_or(Decimal::ZERO),
    })
}

/// Base size scaled by both the edge multiplier and the signal's own
/// confidence, so a high-edge/low-confidence signal doesn't size the same
/// as a high-edge/high-confidence one.
fn position_size(edge: Decimal, confidence: Decimal, config: &MispricingConfig) -> Decimal {
    if !config.scale_with_edge {
        return config.kelly_fraction;
    }
    let edge_f64 = edge.to_string().parse::<f64>().unwrap_or(0.0);
    let multiplier = (1.0 + edge_f64 * 2.0).clamp(1.0, 3.0);
    let multiplier_dec = Decimal::from_f64_retain(multiplier).unwrap_or(Decimal::ONE);
    config.kelly_fraction * multiplier_dec * confidence
}

/// When no real spot feed is available, optionally trade the cheaper side
/// without consulting which side actually wins. Disabled by default; must
/// remain oracle-blind when enabled.
pub fn cheap_side_fallback(market_price_yes: Decimal, market_price_no: Decimal, config: &MispricingConfig) -> Option<TradeSide> {
    if !config.allow_cheap_side_fallback {
        return None;
    }
    if market_price_yes <= market_price_no {
        Some(TradeSide::Yes)
    } else {
        Some(TradeSide::No)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(open: f64, close: f64) -> Candle {
        Candle {
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 1.0,
            open_time: Utc::now(),
            close_time: Utc::now(),
        }
    }

    fn default_config() -> MispricingConfig {
        MispricingConfig {
            min_btc_change_pct: dec!(0.003),
            min_edge: dec!(0.20),
            max_market_price: dec!(0.40),
            kelly_fraction: dec!(0.25),
            scale_with_edge: true,
            allow_cheap_side_fallback: false,
        }
    }

    #[test]
    fn estimate_matches_exact_formula_at_threshold() {
        // delta exactly at 0.003 -> base = 0.65 + 0*28.57 = 0.65, time_factor = 0.95
        let p = estimate_real_probability(0.003, 300);
        assert!((p.to_string().parse::<f64>().unwrap() - 0.65 * 0.95).abs() < 0.01);
    }

    #[test]
    fn detects_upward_lag_mispricing() {
        let candles: Vec<Candle> = vec![candle(100_000.0, 100_000.0), candle(100_000.0, 101_200.0)];
        let result = detect(&candles, dec!(0.30), dec!(0.70), 300, &default_config());
        let r = result.unwrap();
        assert_eq!(r.side, TradeSide::Yes);
        assert!(r.edge > Decimal::ZERO);
    }

    #[test]
    fn rejects_when_market_price_too_high() {
        let candles: Vec<Candle> = vec![candle(100_000.0, 100_000.0), candle(100_000.0, 101_200.0)];
        let result = detect(&candles, dec!(0.50), dec!(0.50), 300, &default_config());
        assert!(result.is_none());
    }

    #[test]
    fn recommended_size_scales_with_confidence_not_just_edge() {
        // Same edge, two confidence levels: higher confidence must size larger.
        let low = position_size(dec!(0.20), dec!(0.5), &default_config());
        let high = position_size(dec!(0.20), dec!(1.0), &default_config());
        assert!(high > low);
        assert_eq!(high, low * dec!(2));
    }

    #[test]
    fn cheap_side_fallback_disabled_by_default() {
        let config = default_config();
        assert!(cheap_side_fallback(dec!(0.3), dec!(0.5), &config).is_none());
    }

    #[test]
    fn cheap_side_fallback_picks_cheaper_when_enabled() {
        let config = MispricingConfig { allow_cheap_side_fallback: true, ..default_config() };
        assert_eq!(cheap_side_fallback(dec!(0.3), dec!(0.5), &config), Some(TradeSide::Yes));
    }
}
