//! Core domain types for quotekeeper.
//!
//! - [`TokenId`] / [`MarketId`] / [`OrderId`] / [`TradeId`] - identifiers
//! - [`OrderBook`] - price-indexed per-token book
//! - [`Order`] / [`OrderStatus`] / [`OrderSide`] - venue order lifecycle
//! - [`Fill`] - a single trade against one of our orders
//! - [`Position`] - per-token inventory (size, avg entry, realized P&L, fees)
//! - [`Quote`] / [`QuoteDecision`] - Quote Engine inputs/outputs
//! - [`MarketState`] / [`MomentumState`] - per-token orchestrator-owned state
//! - [`CircuitBreaker`] / [`CircuitBreakerState`] - risk state machine value
//! - [`LedgerEntry`] / [`EventType`] / [`EventSource`] / [`GapInfo`] - event ledger

mod circuit_breaker;
mod error;
mod fill;
mod ids;
mod ledger_entry;
mod market;
mod money;
mod order;
mod order_book;
mod position;
mod quote;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerState};
pub use error::DomainError;
pub use fill::Fill;
pub use ids::{MarketId, OrderId, TokenId, TradeId};
pub use ledger_entry::{EventSource, EventType, GapInfo, LedgerEntry};
pub use market::{MarketState, MomentumState};
pub use money::{Price, Volume};
pub use order::{Order, OrderSide, OrderStatus};
pub use order_book::{OrderBook, Side};
pub use position::Position;
pub use quote::{Quote, QuoteDecision};
