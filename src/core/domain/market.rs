//! Per-token market state and momentum signal.

use chrono::{DateTime, Utc};

use super::ids::{MarketId, TokenId};
use super::order_book::OrderBook;
use super::position::Position;
use super::quote::Quote;

/// External momentum-detector signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentumState {
    Quiet,
    /// A momentum event fired; re-quoting is suppressed until `until`.
    Cooldown,
}

/// Everything the Orchestrator tracks for a single token. Exclusively
/// owned by the Orchestrator; other components read/mutate it through
/// well-defined operations.
#[derive(Debug, Clone)]
pub struct MarketState {
    token_id: TokenId,
    paired_token: TokenId,
    condition_id: MarketId,
    orderbook: OrderBook,
    momentum: MomentumState,
    momentum_cooldown_until: Option<DateTime<Utc>>,
    position: Position,
    last_quote: Option<Quote>,
    is_quoting: bool,
    market_start_time: DateTime<Utc>,
    market_end_time: DateTime<Utc>,
}

impl MarketState {
    #[must_use]
    pub fn new(
        token_id: TokenId,
        paired_token: TokenId,
        condition_id: MarketId,
        tick_size: rust_decimal::Decimal,
        market_start_time: DateTime<Utc>,
        market_end_time: DateTime<Utc>,
    ) -> Self {
        let position = Position::flat(token_id.clone());
        Self {
            orderbook: OrderBook::new(token_id.clone(), tick_size),
            token_id,
            paired_token,
            condition_id,
            momentum: MomentumState::Quiet,
            momentum_cooldown_until: None,
            position,
            last_quote: None,
            is_quoting: true,
            market_start_time,
            market_end_time,
        }
    }

    #[must_use]
    pub const fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    #[must_use]
    pub const fn paired_token(&self) -> &TokenId {
        &self.paired_token
    }

    #[must_use]
    pub const fn condition_id(&self) -> &MarketId {
        &self.condition_id
    }

    #[must_use]
    pub const fn orderbook(&self) -> &OrderBook {
        &self.orderbook
    }

    pub fn orderbook_mut(&mut self) -> &mut OrderBook {
        &mut self.orderbook
    }

    #[must_use]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    pub fn position_mut(&mut self) -> &mut Position {
        &mut self.position
    }

    #[must_use]
    pub const fn last_quote(&self) -> Option<&Quote> {
        self.last_quote.as_ref()
    }

    pub fn set_last_quote(&mut self, quote: Option<Quote>) {
        self.last_quote = quote;
    }

    #[must_use]
    pub const fn is_quoting(&self) -> bool {
        self.is_quoting
    }

    pub fn set_is_quoting(&mut self, is_quoting: bool) {
        self.is_quoting = is_quoting;
    }

    #[must_use]
    pub const fn market_start_time(&self) -> DateTime<Utc> {
        self.market_start_time
    }

    #[must_use]
    pub const fn market_end_time(&self) -> DateTime<Utc> {
        self.market_end_time
    }

    /// Seconds remaining until resolution; negative once past end time.
    #[must_use]
    pub fn seconds_to_resolution(&self, now: DateTime<Utc>) -> i64 {
        (self.market_end_time - now).num_seconds()
    }

    #[must_use]
    pub const fn momentum(&self) -> MomentumState {
        self.momentum
    }

    /// Enter a momentum cooldown, suppressing re-quoting until `until`.
    pub fn trigger_momentum_cooldown(&mut self, until: DateTime<Utc>) {
        self.momentum = MomentumState::Cooldown;
        self.momentum_cooldown_until = Some(until);
    }

    #[must_use]
    pub fn in_momentum_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.momentum_cooldown_until {
            Some(until) => now < until,
            None => false,
        }
    }

    pub fn clear_momentum_cooldown(&mut self) {
        self.momentum = MomentumState::Quiet;
        self.momentum_cooldown_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn state() -> MarketState {
        let now = Utc::now();
        MarketState::new(
            TokenId::from("up"),
            TokenId::from("down"),
            MarketId::from("cond-1"),
            dec!(0.01),
            now - chrono::Duration::seconds(60),
            now + chrono::Duration::seconds(600),
        )
    }

    #[test]
    fn new_market_state_starts_quoting_and_quiet() {
        let s = state();
        assert!(s.is_quoting);
        assert_eq!(s.momentum, MomentumState::Quiet);
        assert!(s.last_quote.is_none());
    }

    #[test]
    fn momentum_cooldown_expires() {
        let mut s = state();
        let now = Utc::now();
        s.trigger_momentum_cooldown(now + chrono::Duration::seconds(5));
        assert!(s.in_momentum_cooldown(now));
        assert!(!s.in_momentum_cooldown(now + chrono::Duration::seconds(10)));
    }
}
