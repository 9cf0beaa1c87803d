use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bankroll and aggregate counters for one bot run. Restorable from a
/// checkpoint and continuable across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub starting_balance: Decimal,
    pub net_profit: Decimal,
    pub open_exposure: Decimal,
    pub positions_opened: u64,
    pub positions_closed: u64,
    pub winning_trades: u64,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub dry_run: bool,
}

impl BotSession {
    pub fn new(starting_balance: Decimal, dry_run: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            starting_balance,
            net_profit: Decimal::ZERO,
            open_exposure: Decimal::ZERO,
            positions_opened: 0,
            positions_closed: 0,
            winning_trades: 0,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            dry_run,
        }
    }

    /// `current_balance = starting_balance + net_profit - open_exposure`.
    pub fn current_balance(&self) -> Decimal {
        self.starting_balance + self.net_profit - self.open_exposure
    }

    pub fn record_entry(&mut self, amount: Decimal) {
        self.open_exposure += amount;
        self.positions_opened += 1;
    }

    pub fn record_settlement(&mut self, realized_pnl: Decimal, invested: Decimal, won: bool) {
        self.open_exposure -= invested;
        self.net_profit += realized_pnl;
        self.positions_closed += 1;
        if won {
            self.winning_trades += 1;
            self.gross_profit += realized_pnl;
        } else {
            self.gross_loss += -realized_pnl;
        }
    }

    pub fn win_rate(&self) -> Decimal {
        if self.positions_closed == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.winning_trades) / Decimal::from(self.positions_closed)
    }
}
