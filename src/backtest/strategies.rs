//! Backtest strategies. Each variant implements the same signal/side/order
//! contract as the live detectors but against a single price snapshot
//! instead of a live orderbook, so historical runs can be compared without
//! touching the detector modules themselves.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::market::Outcome;
use crate::models::trade::{OrderType, TradeSide};

use super::models::{outcome_to_side, BacktestTrade};

#[derive(Debug, Clone, Copy)]
pub struct PriceSnapshot {
    pub yes_price: Decimal,
    pub no_price: Decimal,
    pub ts: chrono::DateTime<chrono::Utc>,
}

impl PriceSnapshot {
    pub fn skewed_side(&self) -> TradeSide {
        if self.yes_price >= self.no_price {
            TradeSide::Yes
        } else {
            TradeSide::No
        }
    }

    pub fn skew_magnitude(&self) -> Decimal {
        self.yes_price.max(self.no_price)
    }
}

#[derive(Debug, Clone)]
pub struct StrategyParams {
    pub skew_threshold: Decimal,
    pub position_size: Decimal,
    pub expiry_window_seconds: i64,
    pub contrarian_limit_price: Option<Decimal>,
    pub contrarian_use_market_order: bool,
    pub min_edge: Decimal,
    pub reversal_threshold: Decimal,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            skew_threshold: dec!(0.75),
            position_size: dec!(50),
            expiry_window_seconds: 180,
            contrarian_limit_price: Some(dec!(0.01)),
            contrarian_use_market_order: false,
            min_edge: dec!(0.05),
            reversal_threshold: dec!(0.02),
        }
    }
}

/// Momentum state a probability-gap run threads across consecutive
/// snapshots of the same market. Reset per market.
#[derive(Debug, Clone, Default)]
pub struct MomentumState {
    price_history: Vec<Decimal>,
    pub estimated_prob_up: Decimal,
    pub current_edge: Decimal,
}

impl MomentumState {
    pub fn new() -> Self {
        Self {
            price_history: Vec::new(),
            estimated_prob_up: dec!(0.5),
            current_edge: Decimal::ZERO,
        }
    }

    pub fn update(&mut self, yes_price: Decimal) {
        self.price_history.push(yes_price);
        if self.price_history.len() < 3 {
            self.estimated_prob_up = dec!(0.5);
            self.current_edge = Decimal::ZERO;
            return;
        }

        let n = self.price_history.len();
        let recent = &self.price_history[n - 3..];
        let older: Vec<Decimal> = if n > 3 { self.price_history[..n - 3].to_vec() } else { recent.to_vec() };

        let recent_avg = recent.iter().copied().sum::<Decimal>() / Decimal::from(recent.len());
        let older_avg = if older.is_empty() {
            recent_avg
        } else {
            older.iter().copied().sum::<Decimal>() / Decimal::from(older.len())
        };

        let momentum = recent_avg - older_avg;
        let prob_adjustment = (momentum * Decimal::from(2)).clamp(dec!(-0.20), dec!(0.20));

        self.estimated_prob_up = (yes_price + prob_adjustment).clamp(dec!(0.05), dec!(0.95));
        self.current_edge = self.estimated_prob_up - yes_price;
    }
}

/// Tracks the high-water mark of each side's price for a market, so a
/// contrarian call can wait for a visible reversal instead of betting
/// against the skew blind.
#[derive(Debug, Clone, Default)]
pub struct PeakTracker {
    pub peak_yes: Decimal,
    pub peak_no: Decimal,
}

impl PeakTracker {
    pub fn update(&mut self, snapshot: &PriceSnapshot) {
        if snapshot.yes_price > self.peak_yes {
            self.peak_yes = snapshot.yes_price;
        }
        if snapshot.no_price > self.peak_no {
            self.peak_no = snapshot.no_price;
        }
    }

    /// True once either side has fallen back from its peak by more than
    /// the reversal threshold.
    fn reversed(&self, snapshot: &PriceSnapshot, threshold: Decimal) -> bool {
        (self.peak_yes - snapshot.yes_price >= threshold && self.peak_yes >= dec!(0.01))
            || (self.peak_no - snapshot.no_price >= threshold && self.peak_no >= dec!(0.01))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Bet WITH the skew at market price near expiry.
    ExpiryScalper,
    /// Bet AGAINST the skew, either at a near-zero limit price (which only
    /// fills when the bet loses) or at market price.
    ContrarianScalper,
    /// Momentum-derived probability vs. market price, Kelly-scaled.
    ProbabilityGap,
    /// Contrarian, but only after the skewed side visibly reverses from
    /// its peak.
    MomentumContrarian,
    /// Wraps the live exchange-lag mispricing model.
    Mispricing,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::ExpiryScalper => "expiry_scalper",
            Strategy::ContrarianScalper => "contrarian_scalper",
            Strategy::ProbabilityGap => "probability_gap",
            Strategy::MomentumContrarian => "momentum_contrarian",
            Strategy::Mispricing => "mispricing",
        }
    }

    fn should_signal(&self, snapshot: &PriceSnapshot, params: &StrategyParams, momentum: &mut MomentumState) -> bool {
        match self {
            Strategy::ExpiryScalper | Strategy::ContrarianScalper | Strategy::MomentumContrarian => {
                snapshot.yes_price >= params.skew_threshold || snapshot.no_price >= params.skew_threshold
            }
            Strategy::ProbabilityGap => {
                momentum.update(snapshot.yes_price);
                let edge_up = momentum.estimated_prob_up - snapshot.yes_price;
                let edge_down = (Decimal::ONE - momentum.estimated_prob_up) - snapshot.no_price;
                edge_up.abs() >= params.min_edge || edge_down.abs() >= params.min_edge
            }
            Strategy::Mispricing => snapshot.yes_price < params.skew_threshold && snapshot.no_price < params.skew_threshold,
        }
    }

    fn trade_side(&self, snapshot: &PriceSnapshot, params: &StrategyParams, momentum: &MomentumState) -> TradeSide {
        match self {
            Strategy::ExpiryScalper => {
                if snapshot.yes_price >= params.skew_threshold {
                    TradeSide::Yes
                } else {
                    TradeSide::No
                }
            }
            Strategy::ContrarianScalper | Strategy::MomentumContrarian => {
                if snapshot.yes_price >= params.skew_threshold {
                    TradeSide::No
                } else {
                    TradeSide::Yes
                }
            }
            Strategy::ProbabilityGap => {
                let edge_up = momentum.estimated_prob_up - snapshot.yes_price;
                let edge_down = (Decimal::ONE - momentum.estimated_prob_up) - snapshot.no_price;
                if edge_up >= params.min_edge {
                    TradeSide::Yes
                } else if edge_down >= params.min_edge {
                    TradeSide::No
                } else if edge_up > edge_down {
                    TradeSide::Yes
                } else {
                    TradeSide::No
                }
            }
            Strategy::Mispricing => {
                if snapshot.yes_price <= snapshot.no_price {
                    TradeSide::Yes
                } else {
                    TradeSide::No
                }
            }
        }
    }

    fn order_type(&self, params: &StrategyParams) -> OrderType {
        match self {
            Strategy::ExpiryScalper | Strategy::ProbabilityGap | Strategy::Mispricing => OrderType::Market,
            Strategy::ContrarianScalper => {
                if params.contrarian_use_market_order {
                    OrderType::Market
                } else {
                    OrderType::Limit
                }
            }
            Strategy::MomentumContrarian => OrderType::Market,
        }
    }

    fn order_price(&self, snapshot: &PriceSnapshot, side: TradeSide, params: &StrategyParams) -> Option<Decimal> {
        match self {
            Strategy::ContrarianScalper => {
                if params.contrarian_use_market_order {
                    Some(if side == TradeSide::No { snapshot.no_price } else { snapshot.yes_price })
                } else {
                    params.contrarian_limit_price
                }
            }
            _ => None,
        }
    }

    /// Market orders always fill at the snapshot price. Limit orders fill
    /// only when the bet is on the losing side: a low limit is reached by a
    /// price collapsing toward zero, which only happens to the side that
    /// loses.
    fn simulate_fill(order_type: OrderType, order_price: Option<Decimal>, side: TradeSide, winning_side: TradeSide, snapshot: &PriceSnapshot) -> (bool, Decimal) {
        match order_type {
            OrderType::Market => {
                let price = if side == TradeSide::Yes { snapshot.yes_price } else { snapshot.no_price };
                (true, price)
            }
            OrderType::Limit => {
                if side != winning_side {
                    (true, order_price.unwrap_or(Decimal::ZERO))
                } else {
                    (false, Decimal::ZERO)
                }
            }
        }
    }

    /// Evaluates one snapshot and, if it signals, produces a trade against
    /// the market's eventual outcome. `momentum`/`peaks` thread per-market
    /// state across successive calls for the stateful strategies.
    pub fn generate_trade(
        &self,
        market_id: &str,
        snapshot: &PriceSnapshot,
        winning_outcome: Outcome,
        time_to_expiry_secs: i64,
        params: &StrategyParams,
        momentum: &mut MomentumState,
        peaks: &mut PeakTracker,
    ) -> Option<BacktestTrade> {
        peaks.update(snapshot);

        if *self == Strategy::MomentumContrarian {
            let skewed = snapshot.skewed_side() == TradeSide::Yes;
            let reversed = peaks.reversed(snapshot, params.reversal_threshold);
            if !self.should_signal(snapshot, params, momentum) || !reversed {
                return None;
            }
            let _ = skewed;
        } else if !self.should_signal(snapshot, params, momentum) {
            return None;
        }

        if *self == Strategy::ProbabilityGap && time_to_expiry_secs < 60 {
            return None;
        }

        let winning_side = outcome_to_side(winning_outcome);
        let side = self.trade_side(snapshot, params, momentum);
        let order_type = self.order_type(params);
        let order_price = self.order_price(snapshot, side, params);
        let (filled, fill_price) = Self::simulate_fill(order_type, order_price, side, winning_side, snapshot);

        let mut trade = BacktestTrade {
            market_id: market_id.to_string(),
            ts: snapshot.ts,
            side,
            order_type,
            order_price,
            snapshot_price: if side == TradeSide::Yes { snapshot.yes_price } else { snapshot.no_price },
            filled,
            fill_price,
            shares: params.position_size,
            winning_side,
            cost: Decimal::ZERO,
            payout: Decimal::ZERO,
            pnl: Decimal::ZERO,
        };
        trade.calculate_pnl();
        Some(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snap(yes: Decimal, no: Decimal) -> PriceSnapshot {
        PriceSnapshot { yes_price: yes, no_price: no, ts: Utc::now() }
    }

    #[test]
    fn expiry_scalper_bets_with_skew_at_market() {
        let s = Strategy::ExpiryScalper;
        let params = StrategyParams::default();
        let mut momentum = MomentumState::new();
        let mut peaks = PeakTracker::default();
        let snapshot = snap(dec!(0.80), dec!(0.20));
        let trade = s.generate_trade("m1", &snapshot, Outcome::Up, 120, &params, &mut momentum, &mut peaks).unwrap();
        assert_eq!(trade.side, TradeSide::Yes);
        assert!(trade.filled);
        assert_eq!(trade.pnl, dec!(50) - dec!(0.80) * dec!(50));
    }

    #[test]
    fn contrarian_limit_order_fills_only_when_losing() {
        let s = Strategy::ContrarianScalper;
        let params = StrategyParams::default();
        let mut momentum = MomentumState::new();
        let mut peaks = PeakTracker::default();
        let snapshot = snap(dec!(0.80), dec!(0.20));
        // Skew is YES, so contrarian bets NO. Market resolves Up (YES wins),
        // so our NO bet is the losing side and the cheap limit order fills.
        let trade = s.generate_trade("m1", &snapshot, Outcome::Up, 120, &params, &mut momentum, &mut peaks).unwrap();
        assert_eq!(trade.side, TradeSide::No);
        assert!(trade.filled);
        assert_eq!(trade.fill_price, dec!(0.01));
    }

    #[test]
    fn contrarian_limit_order_never_fills_when_winning() {
        let s = Strategy::ContrarianScalper;
        let params = StrategyParams::default();
        let mut momentum = MomentumState::new();
        let mut peaks = PeakTracker::default();
        let snapshot = snap(dec!(0.80), dec!(0.20));
        // Market resolves Down (NO wins): our contrarian NO bet wins, so
        // the low limit price is never touched.
        let trade = s.generate_trade("m1", &snapshot, Outcome::Down, 120, &params, &mut momentum, &mut peaks).unwrap();
        assert_eq!(trade.side, TradeSide::No);
        assert!(!trade.filled);
        assert_eq!(trade.pnl, Decimal::ZERO);
    }

    #[test]
    fn probability_gap_requires_three_snapshots_before_signalling() {
        let s = Strategy::ProbabilityGap;
        let params = StrategyParams::default();
        let mut momentum = MomentumState::new();
        let mut peaks = PeakTracker::default();
        assert!(s.generate_trade("m1", &snap(dec!(0.55), dec!(0.45)), Outcome::Up, 300, &params, &mut momentum, &mut peaks).is_none());
    }
}
