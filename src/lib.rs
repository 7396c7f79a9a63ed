//! Quotekeeper - automated market-making engine for CLOB-based prediction markets.
//!
//! Quotes both sides of complementary binary tokens (UP/DOWN, YES/NO),
//! tracks inventory and fills from venue feeds, and manages risk through
//! a circuit breaker that can halt quoting and unwind a book toward
//! expiry redemption.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── core/ # Reusable domain/service library components
//! │ ├── domain/ # Market, position, order, quote types
//! │ ├── exchange/ # Venue traits (market data, user channel, order execution, redemption)
//! │ └── service/ # Inventory, quoting, risk, wind-down, ledger
//! ├── app/ # Application orchestration, config, wallet, status
//! └── cli/ # Command-line entry points
//! ```
//!
//! # Features
//!
//! - `polymarket` - Enable Polymarket venue support (default)
//! - `telegram` - Enable Telegram notifications

pub mod app;
pub mod cli;
pub mod core;
pub mod error;
