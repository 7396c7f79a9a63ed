//! Quote value type and the Quote Engine's decision output.

use chrono::{DateTime, Utc};

use super::ids::TokenId;
use super::money::{Price, Volume};

/// A two-sided (or one-sided) quote for a token. Either side may be
/// zero-sized.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    token_id: TokenId,
    bid_price: Price,
    bid_size: Volume,
    ask_price: Price,
    ask_size: Volume,
    timestamp: DateTime<Utc>,
}

impl Quote {
    #[must_use]
    pub fn new(
        token_id: TokenId,
        bid_price: Price,
        bid_size: Volume,
        ask_price: Price,
        ask_size: Volume,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            token_id,
            bid_price,
            bid_size,
            ask_price,
            ask_size,
            timestamp,
        }
    }

    #[must_use]
    pub const fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    #[must_use]
    pub const fn bid_price(&self) -> Price {
        self.bid_price
    }

    #[must_use]
    pub const fn bid_size(&self) -> Volume {
        self.bid_size
    }

    #[must_use]
    pub const fn ask_price(&self) -> Price {
        self.ask_price
    }

    #[must_use]
    pub const fn ask_size(&self) -> Volume {
        self.ask_size
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn has_bid(&self) -> bool {
        self.bid_size > Volume::ZERO
    }

    #[must_use]
    pub fn has_ask(&self) -> bool {
        self.ask_size > Volume::ZERO
    }
}

/// The Quote Engine's per-tick decision for a token.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteDecision {
    PlaceQuote(Quote),
    KeepCurrent,
    CancelAll,
}
