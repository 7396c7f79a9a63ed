//! Fill (trade) value type.

use chrono::{DateTime, Utc};

use super::ids::{OrderId, TokenId, TradeId};
use super::money::{Price, Volume};
use super::order::OrderSide;

/// A single fill against one of our orders. `fee` is signed: negative is
/// a rebate earned, positive is a fee paid.
#[derive(Debug, Clone)]
pub struct Fill {
    trade_id: TradeId,
    order_id: OrderId,
    token_id: TokenId,
    side: OrderSide,
    price: Price,
    size: Volume,
    fee: Price,
    timestamp: DateTime<Utc>,
    ws_sequence: u64,
}

impl Fill {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: TradeId,
        order_id: OrderId,
        token_id: TokenId,
        side: OrderSide,
        price: Price,
        size: Volume,
        fee: Price,
        timestamp: DateTime<Utc>,
        ws_sequence: u64,
    ) -> Self {
        Self {
            trade_id,
            order_id,
            token_id,
            side,
            price,
            size,
            fee,
            timestamp,
            ws_sequence,
        }
    }

    #[must_use]
    pub const fn trade_id(&self) -> &TradeId {
        &self.trade_id
    }

    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    #[must_use]
    pub const fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    #[must_use]
    pub const fn price(&self) -> Price {
        self.price
    }

    #[must_use]
    pub const fn size(&self) -> Volume {
        self.size
    }

    #[must_use]
    pub const fn fee(&self) -> Price {
        self.fee
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub const fn ws_sequence(&self) -> u64 {
        self.ws_sequence
    }

    /// Notional value of this fill (`price * size`), used for ledger
    /// summaries and markout bookkeeping.
    #[must_use]
    pub fn notional(&self) -> Price {
        self.price * self.size
    }

    /// Was this fill a rebate (maker) rather than a fee (taker)?
    #[must_use]
    pub fn is_rebate(&self) -> bool {
        self.fee < Price::ZERO
    }
}
