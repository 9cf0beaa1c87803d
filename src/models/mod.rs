pub mod candle;
pub mod market;
pub mod opportunity;
pub mod position;
pub mod resolution;
pub mod session;
pub mod trade;

pub use candle::Candle;
pub use market::{Asset, Market, MarketType, Outcome, OrderbookSnapshot, Timeframe, Venue};
pub use opportunity::Opportunity;
pub use position::{Position, PositionStatus};
pub use resolution::{MarketResolution, PriceHistoryPoint};
pub use session::BotSession;
pub use trade::{Trade, TradeAction, TradeSide};
