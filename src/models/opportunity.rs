use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::trade::TradeSide;

/// A same-market YES+NO arbitrage: both legs bought together lock in a
/// profit regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadOpportunity {
    pub market_id: String,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub confidence: Decimal,
    /// Fraction of $1 invested allocated to each leg (`yes_alloc + no_alloc
    /// == 1`), from `proportional_arb`.
    pub yes_alloc: Decimal,
    pub no_alloc: Decimal,
    /// Ask prices observed at detection time, needed to convert a dollar
    /// allocation into a share count when executing.
    pub yes_price: Decimal,
    pub no_price: Decimal,
}

/// A directional mispricing against the market's own probability model
/// (momentum-derived or otherwise).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeOpportunity {
    pub market_id: String,
    pub side: TradeSide,
    pub edge: Decimal,
    pub adjusted_confidence: Decimal,
    pub recommended_size: Decimal,
}

/// A directional mispricing detected from exchange-lag (spot price moved,
/// market hasn't caught up yet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MispricingOpportunity {
    pub market_id: String,
    pub side: TradeSide,
    pub edge: Decimal,
    pub confidence: Decimal,
    pub recommended_size: Decimal,
    pub spot_delta_pct: Decimal,
}

/// A matched pair of markets across venues (or two differently-structured
/// markets on the same venue) whose combined legs lock in a profit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossVenueOpportunity {
    pub primary_market_id: String,
    pub secondary_market_id: String,
    pub match_score: Decimal,
    pub net_profit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Opportunity {
    Spread(SpreadOpportunity),
    Edge(EdgeOpportunity),
    Mispricing(MispricingOpportunity),
    CrossVenue(CrossVenueOpportunity),
}

impl Opportunity {
    pub fn market_id(&self) -> &str {
        match self {
            Opportunity::Spread(o) => &o.market_id,
            Opportunity::Edge(o) => &o.market_id,
            Opportunity::Mispricing(o) => &o.market_id,
            Opportunity::CrossVenue(o) => &o.primary_market_id,
        }
    }

    /// Net profit on the unit of capital implied by the opportunity's own
    /// recommended size, used to rank opportunities within a tick.
    pub fn net_profit(&self) -> Decimal {
        match self {
            Opportunity::Spread(o) => o.net_profit,
            Opportunity::Edge(o) => o.edge * o.recommended_size,
            Opportunity::Mispricing(o) => o.edge * o.recommended_size,
            Opportunity::CrossVenue(o) => o.net_profit,
        }
    }
}

/// Discovered at a point in time; not itself persisted, only the trade(s)
/// it produces are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredAt {
    pub opportunity: Opportunity,
    pub discovered_at: DateTime<Utc>,
}
