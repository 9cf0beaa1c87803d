//! Momentum estimator: turns a short window of recent candles into a
//! probability of the market closing up, via a weighted recent/older
//! z-score mapped through the standard normal CDF.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::candle::Candle;
use crate::numeric::normal_cdf;

pub const MIN_CANDLES: usize = 5;
pub const DEFAULT_RECENT_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, Copy)]
pub struct MomentumEstimate {
    pub prob_up: Decimal,
    pub confidence: Decimal,
}

/// `None` if fewer than `MIN_CANDLES` candles are supplied — the caller
/// should fall back to a neutral prior rather than treat this as an error.
pub fn calculate_from_candles(candles: &[Candle], recent_weight: f64) -> Option<MomentumEstimate> {
    if candles.len() < MIN_CANDLES {
        return None;
    }

    let returns: Vec<f64> = candles.iter().map(|c| c.return_pct()).collect();
    let n = returns.len();
    let recent = &returns[n - 3..];
    let older = &returns[..n - 3];

    let recent_avg = mean(recent);
    let older_avg = mean(older);
    let weighted = recent_weight * recent_avg + (1.0 - recent_weight) * older_avg;

    let sigma = stdev(&returns);
    if sigma == 0.0 {
        return Some(MomentumEstimate { prob_up: dec!(0.5), confidence: dec!(0.3) });
    }

    let z = weighted / sigma;
    let prob_up = normal_cdf(z);

    let consistency = returns.iter().filter(|r| **r > 0.0).count() as f64 / n as f64;
    let prob_up_f64 = prob_up_to_f64(prob_up);
    let sample_factor = (n as f64 / 20.0).min(1.0);
    let vol_term = (10.0 * sigma).min(1.0);
    let confidence = 0.5 * (1.0 - (consistency - prob_up_f64).abs()) + 0.3 * sample_factor + 0.2 * (1.0 - vol_term);

    Some(MomentumEstimate {
        prob_up,
        confidence: f64_to_decimal_clamped(confidence, 0.1, 1.0),
    })
}

/// Blends short/medium/higher-timeframe momentum estimates with fixed
/// weights (0.4 / 0.3 / 0.3).
pub fn enhanced_momentum_probability(
    short: Option<MomentumEstimate>,
    medium: Option<MomentumEstimate>,
    higher: Option<MomentumEstimate>,
) -> Option<Decimal> {
    let components: Vec<(MomentumEstimate, f64)> = [
        (short, 0.4),
        (medium, 0.3),
        (higher, 0.3),
    ]
    .into_iter()
    .filter_map(|(est, w)| est.map(|e| (e, w)))
    .collect();

    if components.is_empty() {
        return None;
    }

    let weight_sum: f64 = components.iter().map(|(_, w)| w).sum();
    let blended: f64 = components
        .iter()
        .map(|(e, w)| prob_up_to_f64(e.prob_up) * w)
        .sum::<f64>()
        / weight_sum;

    Some(f64_to_decimal_clamped(blended, 0.0, 1.0))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divides by `n-1`), matching `statistics.stdev`.
fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    variance.sqrt()
}

fn prob_up_to_f64(p: Decimal) -> f64 {
    p.to_string().parse::<f64>().unwrap_or(0.5)
}

fn f64_to_decimal_clamped(v: f64, lo: f64, hi: f64) -> Decimal {
    let clamped = v.clamp(lo, hi);
    Decimal::from_f64_retain(clamped).unwrap_or(dec!(0.5))
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

    #[test]
    fn stdev_uses_sample_variance_not_population_variance() {
        // values 2,4,4,4,5,5,7,9: population stdev = 2.0, sample stdev ≈ 2.138.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = stdev(&values);
        assert!((result - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn too_few_candles_returns_none() {
        let candles = vec![candle(100.0, 101.0); 3];
        assert!(calculate_from_candles(&candles, DEFAULT_RECENT_WEIGHT).is_none());
    }

    #[test]
    fn zero_volatility_returns_neutral_prior() {
        let candles = vec![candle(100.0, 100.0); 6];
        let est = calculate_from_candles(&candles, DEFAULT_RECENT_WEIGHT).unwrap();
        assert_eq!(est.prob_up, dec!(0.5));
        assert_eq!(est.confidence, dec!(0.3));
    }

    #[test]
    fn consistent_uptrend_yields_prob_above_half() {
        let candles: Vec<Candle> = (0..6).map(|i| candle(100.0 + i as f64, 101.0 + i as f64)).collect();
        let est = calculate_from_candles(&candles, DEFAULT_RECENT_WEIGHT).unwrap();
        assert!(est.prob_up > dec!(0.5));
    }

    #[test]
    fn enhanced_blend_requires_at_least_one_component() {
        assert!(enhanced_momentum_probability(None, None, None).is_none());
        let est = MomentumEstimate { prob_up: dec!(0.6), confidence: dec!(0.5) };
        assert!(enhanced_momentum_probability(Some(est), None, None).is_some());
    }
}
