use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::market::Outcome;
use crate::models::trade::{OrderType, TradeSide};

/// One simulated trade against one resolved market. `filled` distinguishes
/// a signal that never cleared the book (LIMIT order on the winning side)
/// from a real fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub market_id: String,
    pub ts: DateTime<Utc>,
    pub side: TradeSide,
    pub order_type: OrderType,
    pub order_price: Option<Decimal>,
    pub snapshot_price: Decimal,
    pub filled: bool,
    pub fill_price: Decimal,
    pub shares: Decimal,
    pub winning_side: TradeSide,
    pub cost: Decimal,
    pub payout: Decimal,
    pub pnl: Decimal,
}

impl BacktestTrade {
    /// `won` follows strictly from `side == winning_side`; an unfilled
    /// trade never pays out or costs anything.
    pub fn calculate_pnl(&mut self) {
        if !self.filled {
            self.cost = Decimal::ZERO;
            self.payout = Decimal::ZERO;
            self.pnl = Decimal::ZERO;
            return;
        }
        self.cost = self.fill_price * self.shares;
        let won = self.side == self.winning_side;
        if won {
            self.payout = self.shares;
            self.pnl = self.payout - self.cost;
        } else {
            self.payout = Decimal::ZERO;
            self.pnl = -self.cost;
        }
    }

    pub fn won(&self) -> bool {
        self.filled && self.side == self.winning_side
    }
}

pub fn outcome_to_side(outcome: Outcome) -> TradeSide {
    match outcome {
        Outcome::Up => TradeSide::Yes,
        Outcome::Down => TradeSide::No,
    }
}

/// A single backtest invocation: its parameters and the trades it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    pub id: uuid::Uuid,
    pub strategy_name: String,
    pub window: (DateTime<Utc>, DateTime<Utc>),
    pub trades: Vec<BacktestTrade>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(side: TradeSide, winning_side: TradeSide, filled: bool) -> BacktestTrade {
        let mut t = BacktestTrade {
            market_id: "m1".into(),
            ts: Utc::now(),
            side,
            order_type: OrderType::Market,
            order_price: None,
            snapshot_price: dec!(0.4),
            filled,
            fill_price: dec!(0.4),
            shares: dec!(100),
            winning_side,
            cost: Decimal::ZERO,
            payout: Decimal::ZERO,
            pnl: Decimal::ZERO,
        };
        t.calculate_pnl();
        t
    }

    #[test]
    fn winning_filled_trade_pays_out() {
        let t = trade(TradeSide::Yes, TradeSide::Yes, true);
        assert_eq!(t.cost, dec!(40));
        assert_eq!(t.payout, dec!(100));
        assert_eq!(t.pnl, dec!(60));
    }

    #[test]
    fn losing_filled_trade_loses_cost() {
        let t = trade(TradeSide::Yes, TradeSide::No, true);
        assert_eq!(t.payout, Decimal::ZERO);
        assert_eq!(t.pnl, dec!(-40));
    }

    #[test]
    fn unfilled_trade_has_zero_pnl() {
        let t = trade(TradeSide::Yes, TradeSide::Yes, false);
        assert_eq!(t.pnl, Decimal::ZERO);
        assert_eq!(t.cost, Decimal::ZERO);
    }
}
