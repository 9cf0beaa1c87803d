use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Yes,
    No,
}

impl TradeSide {
    pub fn opposite(&self) -> Self {
        match self {
            TradeSide::Yes => TradeSide::No,
            TradeSide::No => TradeSide::Yes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// An immutable line-item: one fill against one token, never mutated after
/// creation. A `Position` accumulates these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub market_id: String,
    pub side: TradeSide,
    pub action: TradeAction,
    pub price: Decimal,
    pub amount_usd: Decimal,
    pub shares: Decimal,
    pub fee: Decimal,
    pub dry_run: bool,
}
