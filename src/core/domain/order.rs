//! Order value type and lifecycle status.

use chrono::{DateTime, Utc};

use super::ids::{OrderId, TokenId};
use super::money::{Price, Volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Venue order status. Terminal in `Cancelled`/`Expired`/`Rejected`;
/// filled-terminal in `Confirmed`/`Mined` with `remaining_size == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    Live,
    Matched,
    Confirmed,
    Cancelled,
    Expired,
    Rejected,
    Mined,
}

impl OrderStatus {
    /// `CANCELLED`/`EXPIRED`/`REJECTED` — no further fills will occur and
    /// any pending reservation must be released.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired | Self::Rejected)
    }

    /// `CONFIRMED`/`MINED` are both treated as terminal for reservation
    /// release, though they remain distinct for audit purposes.
    #[must_use]
    pub const fn is_filled_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Mined)
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        !self.is_terminal() && !self.is_filled_terminal()
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    order_id: OrderId,
    token_id: TokenId,
    side: OrderSide,
    price: Price,
    original_size: Volume,
    remaining_size: Volume,
    status: OrderStatus,
    post_only: bool,
    ws_sequence: Option<u64>,
    placed_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        token_id: TokenId,
        side: OrderSide,
        price: Price,
        original_size: Volume,
        post_only: bool,
        placed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            token_id,
            side,
            price,
            remaining_size: original_size,
            original_size,
            status: OrderStatus::Live,
            post_only,
            ws_sequence: None,
            placed_at,
        }
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
    pub const fn original_size(&self) -> Volume {
        self.original_size
    }

    #[must_use]
    pub const fn remaining_size(&self) -> Volume {
        self.remaining_size
    }

    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    #[must_use]
    pub const fn post_only(&self) -> bool {
        self.post_only
    }

    #[must_use]
    pub const fn ws_sequence(&self) -> Option<u64> {
        self.ws_sequence
    }

    #[must_use]
    pub const fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    /// Apply a status/remaining-size transition observed from the
    /// user-channel feed. Transitions are only accepted if `ws_sequence`
    /// moves forward, preserving ordering.
    pub fn apply_update(&mut self, status: OrderStatus, remaining_size: Volume, ws_sequence: u64) {
        if let Some(last) = self.ws_sequence {
            if ws_sequence <= last {
                return;
            }
        }
        self.status = status;
        self.remaining_size = remaining_size;
        self.ws_sequence = Some(ws_sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order::new(
            OrderId::from("o1"),
            TokenId::from("tok"),
            OrderSide::Buy,
            dec!(0.45),
            dec!(10),
            true,
            Utc::now(),
        )
    }

    #[test]
    fn new_order_is_live_and_open() {
        let o = order();
        assert_eq!(o.status, OrderStatus::Live);
        assert!(o.status.is_open());
        assert_eq!(o.remaining_size, dec!(10));
    }

    #[test]
    fn terminal_statuses_are_not_open() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Cancelled.is_open());
        assert!(OrderStatus::Mined.is_filled_terminal());
    }

    #[test]
    fn apply_update_ignores_out_of_order_sequences() {
        let mut o = order();
        o.apply_update(OrderStatus::Matched, dec!(5), 10);
        o.apply_update(OrderStatus::Cancelled, dec!(0), 3);
        assert_eq!(o.status, OrderStatus::Matched);
        assert_eq!(o.remaining_size, dec!(5));
    }

    #[test]
    fn apply_update_applies_in_order_sequences() {
        let mut o = order();
        o.apply_update(OrderStatus::Matched, dec!(5), 10);
        o.apply_update(OrderStatus::Confirmed, dec!(0), 11);
        assert_eq!(o.status, OrderStatus::Confirmed);
        assert_eq!(o.remaining_size, Volume::ZERO);
    }
}
