use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::market::Outcome;
use super::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closing,
    Closed,
    Settled,
}

/// A held stake in one market, possibly split across both YES and NO (a
/// straddle/arbitrage position carries both legs at once).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub market_id: String,
    pub yes_shares: Decimal,
    pub no_shares: Decimal,
    pub yes_avg_price: Decimal,
    pub no_avg_price: Decimal,
    pub total_invested: Decimal,
    pub status: PositionStatus,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub settled_outcome: Option<Outcome>,
    pub payout: Decimal,
    pub realized_pnl: Decimal,
    pub trades: Vec<Trade>,
}

impl Position {
    pub fn cost_basis(&self) -> Decimal {
        self.total_invested
    }

    /// Settle against the market's winning outcome. A no-op if already
    /// settled: settlement must be idempotent.
    pub fn settle(&mut self, outcome: Outcome, now: DateTime<Utc>) {
        if self.status == PositionStatus::Settled {
            return;
        }
        let payout = match outcome {
            Outcome::Up => self.yes_shares,
            Outcome::Down => self.no_shares,
        };
        self.payout = payout;
        self.realized_pnl = payout - self.total_invested;
        self.settled_outcome = Some(outcome);
        self.status = PositionStatus::Settled;
        self.exit_time = Some(now);
    }

    pub fn is_settled(&self) -> bool {
        self.status == PositionStatus::Settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn open_position() -> Position {
        Position {
            id: Uuid::new_v4(),
            market_id: "m1".into(),
            yes_shares: dec!(100),
            no_shares: Decimal::ZERO,
            yes_avg_price: dec!(0.48),
            no_avg_price: Decimal::ZERO,
            total_invested: dec!(48),
            status: PositionStatus::Open,
            entry_time: Utc::now(),
            exit_time: None,
            settled_outcome: None,
            payout: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            trades: Vec::new(),
        }
    }

    #[test]
    fn settle_winning_yes() {
        let mut p = open_position();
        p.settle(Outcome::Up, Utc::now());
        assert_eq!(p.payout, dec!(100));
        assert_eq!(p.realized_pnl, dec!(52));
        assert!(p.is_settled());
    }

    #[test]
    fn settle_losing_yes() {
        let mut p = open_position();
        p.settle(Outcome::Down, Utc::now());
        assert_eq!(p.payout, Decimal::ZERO);
        assert_eq!(p.realized_pnl, dec!(-48));
    }

    #[test]
    fn settle_is_idempotent() {
        let mut p = open_position();
        p.settle(Outcome::Up, Utc::now());
        let pnl_after_first = p.realized_pnl;
        p.settle(Outcome::Down, Utc::now());
        assert_eq!(p.realized_pnl, pnl_after_first);
    }
}
