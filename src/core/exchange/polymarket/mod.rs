//! Polymarket exchange integration: the one concrete venue this crate
//! ships against. WebSocket feeds for C1/C2, and a REST client for C6's
//! order placement/cancellation/reconciliation.

mod client;
mod config;
mod messages;
mod user_messages;
mod user_stream;
mod websocket;

pub use client::PolymarketClient;
pub use config::PolymarketConfig;
pub use messages::{PolymarketBookMessage, PolymarketPriceChangeMessage, PolymarketWsMessage};
pub use user_messages::PolymarketUserMessage;
pub use user_stream::PolymarketUserStream;
pub use websocket::PolymarketDataStream;
