use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar used by the momentum estimator and the mispricing detector.
/// Kept in `f64`: these feed statistical estimators, not money, and are
/// converted to `Decimal` at the boundary once a probability comes out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
}

impl Candle {
    /// `(close - open) / open`. Zero if `open` is zero (a data glitch, not
    /// a panic-worthy condition).
    pub fn return_pct(&self) -> f64 {
        if self.open == 0.0 {
            return 0.0;
        }
        (self.close - self.open) / self.open
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, close: f64) -> Candle {
        Candle {
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 0.0,
            open_time: Utc::now(),
            close_time: Utc::now(),
        }
    }

    #[test]
    fn return_pct_basic() {
        let c = candle(100.0, 101.0);
        assert!((c.return_pct() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn return_pct_zero_open_is_zero_not_nan() {
        let c = candle(0.0, 100.0);
        assert_eq!(c.return_pct(), 0.0);
    }
}
