use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::executor::Executor;
use crate::models::trade::TradeSide;

/// Real-time P&L tracking per strategy (detector kind) and overall, backed
/// by the executor's session for the headline numbers.
pub struct PnlTracker {
    executor: Arc<Executor>,
    strategy_pnl: dashmap::DashMap<String, Decimal>,
    trade_log: Arc<tokio::sync::RwLock<Vec<TradeRecord>>>,
}

#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub market_id: String,
    pub strategy: String,
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub size: Decimal,
    pub pnl: Decimal,
}

impl PnlTracker {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            strategy_pnl: dashmap::DashMap::new(),
            trade_log: Arc::new(tokio::sync::RwLock::new(Vec::new())),
        }
    }

    /// Record a completed trade's P&L under its originating detector name.
    pub async fn record_trade(&self, record: TradeRecord) {
        self.strategy_pnl
            .entry(record.strategy.clone())
            .and_modify(|v| *v += record.pnl)
            .or_insert(record.pnl);

        self.trade_log.write().await.push(record);
    }

    pub fn strategy_pnl(&self, strategy: &str) -> Decimal {
        self.strategy_pnl.get(strategy).map(|v| *v).unwrap_or(Decimal::ZERO)
    }

    pub async fn log_summary(&self) {
        let session = self.executor.session_snapshot().await;
        info!(
            "=== P&L SUMMARY === balance={} net_profit={} open_exposure={} trades_closed={} win_rate={}",
            session.current_balance(),
            session.net_profit,
            session.open_exposure,
            session.positions_closed,
            session.win_rate(),
        );

        for entry in self.strategy_pnl.iter() {
            info!("  {}: P&L = {}", entry.key(), entry.value());
        }
    }

    pub async fn trade_count(&self) -> usize {
        self.trade_log.read().await.len()
    }
}
