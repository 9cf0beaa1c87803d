//! Thin, behavioural interfaces to the outside world: market data reads and
//! signed-order submission. No concrete wire protocol (WebSocket feed,
//! EIP-712 signing, CLOB HTTP client) lives in this crate — those are
//! explicitly out of scope. A venue adapter crate implements `VenueClient`
//! against the real thing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::models::market::Asset;
use crate::models::{Market, MarketResolution, OrderbookSnapshot};
use crate::models::trade::TradeSide;

/// An order not yet signed: side, size, and limit price (if any).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsignedOrder {
    pub market_id: String,
    pub side: TradeSide,
    pub amount_usd: Decimal,
    pub limit_price: Option<Decimal>,
}

/// An order signed with the configured private key, ready for submission.
/// The signature scheme itself is out of scope — this crate only defines
/// the shape of the handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedOrder {
    pub order: UnsignedOrder,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub accepted: bool,
    pub fill_price: Option<Decimal>,
}

#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Assets this client is configured to track.
    fn tracked_assets(&self) -> Vec<Asset>;

    async fn list_active_markets(&self, asset: Asset, max_expiry_secs: i64) -> Result<Vec<Market>, ErrorKind>;

    async fn latest_orderbook(&self, market_id: &str) -> Result<OrderbookSnapshot, ErrorKind>;

    async fn resolved_markets(
        &self,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<Vec<MarketResolution>, ErrorKind>;

    async fn price_history(
        &self,
        token_id: &str,
        window: (DateTime<Utc>, DateTime<Utc>),
        fidelity_secs: i64,
    ) -> Result<Vec<(DateTime<Utc>, Decimal)>, ErrorKind>;

    /// Signs an order with the private key available via config. No
    /// concrete signature scheme is implemented here.
    async fn sign_order(&self, order: UnsignedOrder) -> Result<SignedOrder, ErrorKind>;

    /// Submits a signed order. No concrete transport is implemented here;
    /// callers in dry-run mode never reach this.
    async fn submit(&self, signed: SignedOrder) -> Result<OrderResult, ErrorKind>;
}
