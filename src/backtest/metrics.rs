use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::models::BacktestTrade;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_signals: usize,
    pub orders_filled: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_invested: Decimal,
    pub total_payout: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub net_pnl: Decimal,
    pub win_rate: Decimal,
    pub fill_rate: Decimal,
    pub roi: Decimal,
    pub profit_factor: Decimal,
    pub max_drawdown: Decimal,
}

impl BacktestMetrics {
    pub fn calculate(trades: &[BacktestTrade]) -> Self {
        let total_signals = trades.len();
        let filled: Vec<&BacktestTrade> = trades.iter().filter(|t| t.filled).collect();
        let orders_filled = filled.len();

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_invested = Decimal::ZERO;
        let mut total_payout = Decimal::ZERO;
        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;

        for t in &filled {
            total_invested += t.cost;
            total_payout += t.payout;
            if t.won() {
                winning_trades += 1;
                gross_profit += t.pnl;
            } else {
                losing_trades += 1;
                gross_loss += -t.pnl;
            }
        }

        let net_pnl = total_payout - total_invested;

        let win_rate = if orders_filled > 0 {
            Decimal::from(winning_trades) / Decimal::from(orders_filled)
        } else {
            Decimal::ZERO
        };

        let fill_rate = if total_signals > 0 {
            Decimal::from(orders_filled) / Decimal::from(total_signals)
        } else {
            Decimal::ZERO
        };

        let roi = if total_invested > Decimal::ZERO {
            net_pnl / total_invested
        } else {
            Decimal::ZERO
        };

        let profit_factor = if gross_loss > Decimal::ZERO {
            gross_profit / gross_loss
        } else {
            Decimal::ZERO
        };

        let max_drawdown = calculate_drawdown(&filled);

        Self {
            total_signals,
            orders_filled,
            winning_trades,
            losing_trades,
            total_invested,
            total_payout,
            gross_profit,
            gross_loss,
            net_pnl,
            win_rate,
            fill_rate,
            roi,
            profit_factor,
            max_drawdown,
        }
    }
}

/// Drawdown is measured only from positive equity peaks: if equity never
/// rises above zero, drawdown stays zero rather than measuring decline
/// from an already-negative starting point.
fn calculate_drawdown(filled: &[&BacktestTrade]) -> Decimal {
    let mut equity = Decimal::ZERO;
    let mut peak = Decimal::ZERO;
    let mut max_dd = Decimal::ZERO;

    for t in filled {
        equity += t.pnl;
        if equity > peak {
            peak = equity;
        }
        if peak > Decimal::ZERO {
            let drawdown = peak - equity;
            if drawdown > max_dd {
                max_dd = drawdown;
            }
        }
    }

    max_dd
}

pub fn calculate_equity_curve(trades: &[BacktestTrade]) -> Vec<Decimal> {
    let mut equity = Decimal::ZERO;
    trades
        .iter()
        .filter(|t| t.filled)
        .map(|t| {
            equity += t.pnl;
            equity
        })
        .collect()
}

/// Group filled trades by the asset token embedded in the market id
/// (`"{asset}-updown-..."`).
pub fn calculate_by_asset(trades: &[BacktestTrade]) -> HashMap<String, BacktestMetrics> {
    let mut buckets: HashMap<String, Vec<BacktestTrade>> = HashMap::new();
    for t in trades {
        let asset = t.market_id.split('-').next().unwrap_or("unknown").to_string();
        buckets.entry(asset).or_default().push(t.clone());
    }
    buckets
        .into_iter()
        .map(|(asset, trades)| (asset, BacktestMetrics::calculate(&trades)))
        .collect()
}

/// Five 0.05-wide buckets from 0.75 to 1.00, keyed by the skewed price at
/// signal time (`max(order_price, snapshot_price)`, falling back to
/// snapshot_price when no limit price was set).
pub fn calculate_by_skew_level(trades: &[BacktestTrade]) -> HashMap<String, BacktestMetrics> {
    let mut buckets: HashMap<String, Vec<BacktestTrade>> = HashMap::new();
    for t in trades {
        let skew = t.order_price.unwrap_or(t.snapshot_price);
        let bucket = skew_bucket(skew);
        buckets.entry(bucket).or_default().push(t.clone());
    }
    buckets
        .into_iter()
        .map(|(bucket, trades)| (bucket, BacktestMetrics::calculate(&trades)))
        .collect()
}

fn skew_bucket(skew: Decimal) -> String {
    let edges = [dec!(0.75), dec!(0.80), dec!(0.85), dec!(0.90), dec!(0.95), dec!(1.00)];
    for w in edges.windows(2) {
        if skew >= w[0] && skew < w[1] {
            return format!("{}-{}", w[0], w[1]);
        }
    }
    "other".to_string()
}

/// Four buckets of 0-300s time-to-expiry at signal time.
pub fn calculate_by_time_to_expiry(trades: &[BacktestTrade], end_times: &HashMap<String, chrono::DateTime<chrono::Utc>>) -> HashMap<String, BacktestMetrics> {
    let mut buckets: HashMap<String, Vec<BacktestTrade>> = HashMap::new();
    for t in trades {
        let Some(end_time) = end_times.get(&t.market_id) else {
            continue;
        };
        let tte = (*end_time - t.ts).num_seconds().max(0);
        let bucket = match tte {
            0..=75 => "0-75s",
            76..=150 => "75-150s",
            151..=225 => "150-225s",
            _ => "225-300s",
        };
        buckets.entry(bucket.to_string()).or_default().push(t.clone());
    }
    buckets
        .into_iter()
        .map(|(bucket, trades)| (bucket, BacktestMetrics::calculate(&trades)))
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkewAccuracy {
    pub skew_won: usize,
    pub skew_lost: usize,
    pub skew_accuracy: Decimal,
    pub contrarian_opportunity: Decimal,
}

/// How often the skewed (cheaper-implied) side actually won: a high
/// accuracy means betting with the crowd was usually right, which in turn
/// tells a contrarian strategy how much edge it's giving up.
pub fn calculate_skew_accuracy(trades: &[BacktestTrade]) -> SkewAccuracy {
    let mut skew_won = 0usize;
    let mut skew_lost = 0usize;

    for t in trades.iter().filter(|t| t.filled) {
        let skewed_side = if t.snapshot_price >= dec!(0.5) { t.side } else { t.side.opposite() };
        if skewed_side == t.winning_side {
            skew_won += 1;
        } else {
            skew_lost += 1;
        }
    }

    let total = skew_won + skew_lost;
    let skew_accuracy = if total > 0 {
        Decimal::from(skew_won) / Decimal::from(total)
    } else {
        Decimal::ZERO
    };

    SkewAccuracy {
        skew_won,
        skew_lost,
        skew_accuracy,
        contrarian_opportunity: Decimal::ONE - skew_accuracy,
    }
}

pub fn compare_strategies(runs: &[(String, Vec<BacktestTrade>)]) -> HashMap<String, BacktestMetrics> {
    runs.iter()
        .map(|(name, trades)| (name.clone(), BacktestMetrics::calculate(trades)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trade::{OrderType, TradeSide};
    use chrono::Utc;

    fn filled_trade(side: TradeSide, winning_side: TradeSide, pnl: Decimal) -> BacktestTrade {
        let won = side == winning_side;
        BacktestTrade {
            market_id: "btc-updown-15m-1".into(),
            ts: Utc::now(),
            side,
            order_type: OrderType::Market,
            order_price: None,
            snapshot_price: dec!(0.4),
            filled: true,
            fill_price: dec!(0.4),
            shares: dec!(100),
            winning_side,
            cost: dec!(40),
            payout: if won { dec!(100) } else { Decimal::ZERO },
            pnl,
        }
    }

    #[test]
    fn drawdown_measured_only_from_positive_peaks() {
        let trades = vec![
            filled_trade(TradeSide::Yes, TradeSide::No, dec!(-40)),
            filled_trade(TradeSide::Yes, TradeSide::No, dec!(-40)),
        ];
        let metrics = BacktestMetrics::calculate(&trades);
        // equity goes -40, -80: peak never turns positive, so drawdown is 0.
        assert_eq!(metrics.max_drawdown, Decimal::ZERO);
    }

    #[test]
    fn drawdown_tracks_decline_from_a_positive_peak() {
        let trades = vec![
            filled_trade(TradeSide::Yes, TradeSide::Yes, dec!(60)),
            filled_trade(TradeSide::Yes, TradeSide::No, dec!(-40)),
        ];
        let metrics = BacktestMetrics::calculate(&trades);
        assert_eq!(metrics.max_drawdown, dec!(40));
    }

    #[test]
    fn win_rate_and_roi() {
        let trades = vec![
            filled_trade(TradeSide::Yes, TradeSide::Yes, dec!(60)),
            filled_trade(TradeSide::Yes, TradeSide::No, dec!(-40)),
        ];
        let metrics = BacktestMetrics::calculate(&trades);
        assert_eq!(metrics.win_rate, dec!(0.5));
        assert_eq!(metrics.fill_rate, Decimal::ONE);
    }
}
