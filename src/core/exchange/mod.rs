//! Exchange abstraction layer: the traits the Quote Engine and Order
//! Manager are built against, plus the Polymarket implementation.
//!
//! The HTTP/WebSocket transport internals and the on-chain redemption
//! transactor are represented here only as a trait boundary; the
//! transport plumbing under `polymarket/` is the one concrete
//! implementation this crate ships.

pub mod polymarket;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::domain::{MarketId, OrderId, OrderSide, Price, Side, TokenId, Volume};
use crate::error::ExchangeError;

/// One observation surfaced by the market-data feed.
///
/// Snapshots and deltas carry their price/size data so the consumer (the
/// per-token [`crate::core::domain::MarketState`]) can fold them straight
/// into its own [`crate::core::domain::OrderBook`] without a round trip
/// through a shared cache.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    BookSnapshot {
        token_id: TokenId,
        bids: Vec<(Price, Volume)>,
        asks: Vec<(Price, Volume)>,
    },
    BookDelta {
        token_id: TokenId,
        side: Side,
        price: Price,
        size: Volume,
    },
    TickSizeChanged {
        token_id: TokenId,
        new_tick_size: Price,
    },
    Disconnected {
        reason: String,
    },
}

/// One observation surfaced by the authenticated user-channel feed.
#[derive(Debug, Clone)]
pub enum UserChannelEvent {
    MakerFill(TradeUpdate),
    TakerFill(TradeUpdate),
    OrderUpdate(OrderUpdate),
    Heartbeat,
    SubscriptionAck,
    /// A `ws_sequence` gap was detected in this stream.
    SequenceGap(SequenceGapEvent),
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceGapEvent {
    pub expected_start: u64,
    pub expected_end: u64,
}

#[derive(Debug, Clone)]
pub struct TradeUpdate {
    pub trade_id: String,
    pub order_id: OrderId,
    pub token_id: TokenId,
    pub side: OrderSide,
    pub price: Price,
    pub size: Volume,
    pub fee: Price,
    pub status: TradeStatus,
    pub timestamp: DateTime<Utc>,
    pub ws_sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Matched,
    Confirmed,
    Failed,
    Mined,
}

#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub token_id: TokenId,
    pub status: crate::core::domain::OrderStatus,
    pub remaining_size: Volume,
    pub ws_sequence: u64,
}

/// A streaming market-data connection (C1). One instance subscribes to
/// a fixed token list and yields events until disconnected.
#[async_trait]
pub trait MarketDataStream: Send + Sync {
    async fn connect(&mut self) -> crate::error::Result<()>;
    async fn subscribe(&mut self, token_ids: &[TokenId]) -> crate::error::Result<()>;
    async fn next_event(&mut self) -> Option<MarketEvent>;
    fn exchange_name(&self) -> &'static str;
}

/// The authenticated per-order fill/lifecycle stream.
#[async_trait]
pub trait UserChannelStream: Send + Sync {
    async fn connect(&mut self) -> crate::error::Result<()>;
    async fn next_event(&mut self) -> Option<UserChannelEvent>;
    fn exchange_name(&self) -> &'static str;
}

/// Request to place a single order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub token_id: TokenId,
    pub side: OrderSide,
    pub price: Price,
    pub size: Volume,
    pub post_only: bool,
    pub neg_risk: bool,
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: OrderId,
}

#[derive(Debug, Clone)]
pub struct ApiOrder {
    pub order_id: OrderId,
    pub token_id: TokenId,
    pub side: OrderSide,
    pub price: Price,
    pub original_size: Volume,
    pub size_matched: Volume,
}

#[derive(Debug, Clone)]
pub struct ApiPosition {
    pub token_id: TokenId,
    pub size: Volume,
    pub avg_price: Price,
}

/// Sole writer to the venue's order endpoints. Implementations
/// classify venue failures into [`ExchangeError::is_soft`] soft errors
/// (retried, never counted toward the circuit breaker) and hard errors.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn place_order(&self, request: OrderRequest) -> std::result::Result<PlacedOrder, ExchangeError>;

    async fn place_orders_batch(
        &self,
        requests: Vec<OrderRequest>,
    ) -> Vec<std::result::Result<PlacedOrder, ExchangeError>>;

    async fn cancel_all_for_token(&self, token_id: &TokenId) -> std::result::Result<(), ExchangeError>;

    async fn cancel_all(&self) -> std::result::Result<(), ExchangeError>;

    async fn fetch_open_orders(&self) -> std::result::Result<Vec<ApiOrder>, ExchangeError>;

    async fn fetch_positions(&self, tokens: &[TokenId]) -> std::result::Result<Vec<ApiPosition>, ExchangeError>;
}

/// On-chain redemption transactor. Internals are explicitly out of
/// scope; this is the contract the scheduler drives.
#[async_trait]
pub trait RedemptionTransactor: Send + Sync {
    async fn redeem(&self, condition_id: &MarketId) -> std::result::Result<String, RedemptionError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RedemptionError {
    #[error("condition not yet resolved")]
    NotYetResolved,
    #[error("payout denominator is zero")]
    PayoutDenominatorZero,
    #[error("redemption failed: {0}")]
    Failed(String),
}

impl RedemptionError {
    /// Transient "not ready yet" outcomes retry; anything else fails
    /// permanently.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotYetResolved | Self::PayoutDenominatorZero)
    }
}
