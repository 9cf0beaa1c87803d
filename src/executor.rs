//! Dry-run executor and position ledger. Owns the in-memory live positions
//! for one session, reconciled against the repository on commit. No live
//! order-placement transport lives here — `VenueClient::submit` is only
//! reached when `dry_run` is false, which this crate never sets on its own.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::models::market::{Market, Outcome};
use crate::models::opportunity::SpreadOpportunity;
use crate::models::position::{Position, PositionStatus};
use crate::models::session::BotSession;
use crate::models::trade::{Trade, TradeAction, TradeSide};

pub struct ExecutorConfig {
    pub max_position_size: Decimal,
    pub max_total_exposure: Decimal,
}

/// Owns the session and its open positions exclusively; no other component
/// mutates either.
pub struct Executor {
    session: RwLock<BotSession>,
    positions: RwLock<Vec<Position>>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(session: BotSession, config: ExecutorConfig) -> Self {
        Self {
            session: RwLock::new(session),
            positions: RwLock::new(Vec::new()),
            config,
        }
    }

    pub async fn session_snapshot(&self) -> BotSession {
        self.session.read().await.clone()
    }

    pub async fn can_trade(&self, amount: Decimal) -> bool {
        let session = self.session.read().await;
        if amount > session.current_balance() {
            return false;
        }
        if amount > self.config.max_position_size {
            return false;
        }
        if session.open_exposure + amount > self.config.max_total_exposure {
            return false;
        }
        true
    }

    /// Executes a spread (same-market YES+NO) opportunity: recomputes the
    /// fill from the detector's allocation, splits the fee across both
    /// legs, deducts the balance, and opens a new position.
    pub async fn execute_spread_trade(&self, opp: &SpreadOpportunity, invest: Decimal, fee_rate: Decimal) -> Option<Position> {
        if !self.can_trade(invest).await {
            return None;
        }

        let now = Utc::now();
        let fee = invest * fee_rate;
        let fee_per_leg = fee / Decimal::from(2);

        let yes_dollars = opp.yes_alloc * invest;
        let no_dollars = opp.no_alloc * invest;

        let id = Uuid::new_v4();
        let yes_trade = Trade {
            id: Uuid::new_v4(),
            ts: now,
            market_id: opp.market_id.clone(),
            side: TradeSide::Yes,
            action: TradeAction::Buy,
            price: opp.yes_price,
            amount_usd: yes_dollars,
            shares: if opp.yes_price.is_zero() { Decimal::ZERO } else { yes_dollars / opp.yes_price },
            fee: fee_per_leg,
            dry_run: true,
        };
        let no_trade = Trade {
            id: Uuid::new_v4(),
            ts: now,
            market_id: opp.market_id.clone(),
            side: TradeSide::No,
            action: TradeAction::Buy,
            price: opp.no_price,
            amount_usd: no_dollars,
            shares: if opp.no_price.is_zero() { Decimal::ZERO } else { no_dollars / opp.no_price },
            fee: fee_per_leg,
            dry_run: true,
        };

        let position = Position {
            id,
            market_id: opp.market_id.clone(),
            yes_shares: yes_trade.shares,
            no_shares: no_trade.shares,
            yes_avg_price: opp.yes_price,
            no_avg_price: opp.no_price,
            total_invested: invest,
            status: PositionStatus::Open,
            entry_time: now,
            exit_time: None,
            settled_outcome: None,
            payout: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            trades: vec![yes_trade, no_trade],
        };

        {
            let mut session = self.session.write().await;
            session.record_entry(invest);
        }
        self.positions.write().await.push(position.clone());
        info!(market_id = %opp.market_id, invest = %invest, "opened spread position (dry run)");
        Some(position)
    }

    /// Executes a single-leg directional trade (edge or mispricing
    /// opportunity): one side only, no offsetting leg.
    pub async fn execute_directional_trade(&self, market_id: &str, side: TradeSide, price: Decimal, invest: Decimal, fee_rate: Decimal) -> Option<Position> {
        if !self.can_trade(invest).await {
            return None;
        }
        if price.is_zero() {
            return None;
        }

        let now = Utc::now();
        let fee = invest * fee_rate;
        let shares = invest / price;

        let trade = Trade {
            id: Uuid::new_v4(),
            ts: now,
            market_id: market_id.to_string(),
            side,
            action: TradeAction::Buy,
            price,
            amount_usd: invest,
            shares,
            fee,
            dry_run: true,
        };

        let position = Position {
            id: Uuid::new_v4(),
            market_id: market_id.to_string(),
            yes_shares: if side == TradeSide::Yes { shares } else { Decimal::ZERO },
            no_shares: if side == TradeSide::No { shares } else { Decimal::ZERO },
            yes_avg_price: if side == TradeSide::Yes { price } else { Decimal::ZERO },
            no_avg_price: if side == TradeSide::No { price } else { Decimal::ZERO },
            total_invested: invest,
            status: PositionStatus::Open,
            entry_time: now,
            exit_time: None,
            settled_outcome: None,
            payout: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            trades: vec![trade],
        };

        {
            let mut session = self.session.write().await;
            session.record_entry(invest);
        }
        self.positions.write().await.push(position.clone());
        info!(market_id = %market_id, side = ?side, invest = %invest, "opened directional position (dry run)");
        Some(position)
    }

    /// Settles an open position against the market's winning outcome.
    /// Idempotent: settling an already-settled position is a no-op.
    pub async fn settle(&self, position_id: Uuid, outcome: Outcome) -> Option<Position> {
        let mut positions = self.positions.write().await;
        let position = positions.iter_mut().find(|p| p.id == position_id)?;
        if position.is_settled() {
            return Some(position.clone());
        }

        let was_open = !position.is_settled();
        let invested = position.total_invested;
        position.settle(outcome, Utc::now());
        let won = position.realized_pnl > Decimal::ZERO;

        if was_open {
            let mut session = self.session.write().await;
            session.record_settlement(position.realized_pnl, invested, won);
        }

        Some(position.clone())
    }

    /// True if an open position already exists for this market.
    pub async fn has_open_position(&self, market_id: &str) -> bool {
        self.positions
            .read()
            .await
            .iter()
            .any(|p| p.market_id == market_id && p.status == PositionStatus::Open)
    }

    /// Returns every open position whose market has already expired, so
    /// the caller can settle them against a just-fetched resolution.
    pub async fn check_expired_positions(&self, markets: &[Market]) -> Vec<Position> {
        let now = Utc::now();
        let positions = self.positions.read().await;
        positions
            .iter()
            .filter(|p| p.status == PositionStatus::Open)
            .filter(|p| {
                markets
                    .iter()
                    .find(|m| m.id == p.market_id)
                    .map(|m| m.is_expired(now))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn executor() -> Executor {
        Executor::new(
            BotSession::new(dec!(1000), true),
            ExecutorConfig {
                max_position_size: dec!(200),
                max_total_exposure: dec!(500),
            },
        )
    }

    fn sample_opportunity() -> SpreadOpportunity {
        SpreadOpportunity {
            market_id: "m1".into(),
            gross_profit: dec!(0.02),
            net_profit: dec!(0.02),
            confidence: dec!(0.8),
            yes_alloc: dec!(0.48),
            no_alloc: dec!(0.52),
            yes_price: dec!(0.48),
            no_price: dec!(0.50),
        }
    }

    #[tokio::test]
    async fn rejects_trade_exceeding_max_position_size() {
        let e = executor();
        assert!(!e.can_trade(dec!(300)).await);
    }

    #[tokio::test]
    async fn executes_spread_trade_and_tracks_exposure() {
        let e = executor();
        let opp = sample_opportunity();
        let position = e.execute_spread_trade(&opp, dec!(98), dec!(0)).await.unwrap();
        assert_eq!(position.status, PositionStatus::Open);
        let session = e.session_snapshot().await;
        assert_eq!(session.open_exposure, dec!(98));
    }

    #[tokio::test]
    async fn settle_is_idempotent_and_updates_balance() {
        let e = executor();
        let opp = sample_opportunity();
        let position = e.execute_spread_trade(&opp, dec!(98), dec!(0)).await.unwrap();

        let settled = e.settle(position.id, Outcome::Up).await.unwrap();
        let first_pnl = settled.realized_pnl;
        let settled_again = e.settle(position.id, Outcome::Down).await.unwrap();
        assert_eq!(settled_again.realized_pnl, first_pnl);
    }

    #[tokio::test]
    async fn check_expired_positions_returns_only_open_on_expired_markets() {
        let e = executor();
        let opp = sample_opportunity();
        let position = e.execute_spread_trade(&opp, dec!(98), dec!(0)).await.unwrap();

        let expired_market = Market {
            id: "m1".into(),
            venue: crate::models::market::Venue::Polymarket,
            asset: crate::models::market::Asset::BTC,
            timeframe: crate::models::market::Timeframe::FifteenMin,
            market_type: crate::models::market::MarketType::UpDown,
            end_time: Utc::now() - chrono::Duration::seconds(5),
            yes_token_id: "y".into(),
            no_token_id: "n".into(),
            yes_ask: dec!(0.48),
            yes_bid: dec!(0.46),
            no_ask: dec!(0.50),
            no_bid: dec!(0.48),
            volume_24h: dec!(1000),
            liquidity: dec!(5000),
            fetched_at: Utc::now(),
            resolved: false,
            resolution: None,
        };

        let expired = e.check_expired_positions(&[expired_market]).await;
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, position.id);
    }
}
