//! User-channel WebSocket message schema: trade and order lifecycle
//! events delivered on the authenticated socket.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::super::{OrderUpdate, TradeStatus, TradeUpdate};
use crate::core::domain::{OrderId, OrderSide, OrderStatus, Price, TokenId, Volume};

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type")]
pub enum PolymarketUserMessage {
    #[serde(rename = "trade")]
    Trade(PolymarketTradeMessage),

    #[serde(rename = "order")]
    Order(PolymarketOrderMessage),

    #[serde(rename = "heartbeat")]
    Heartbeat,

    #[serde(rename = "subscribed")]
    SubscriptionAck,

    #[serde(other)]
    Unknown,
}

/// A trade event carries both sides: the maker legs that matched our
/// resting orders, and at most one taker leg if we were the aggressor.
#[derive(Debug, Deserialize)]
pub struct PolymarketTradeMessage {
    pub id: String,
    pub taker_order_id: Option<String>,
    pub maker_orders: Vec<PolymarketMakerOrderFill>,
    pub asset_id: String,
    pub side: String,
    pub price: String,
    pub size: String,
    pub fee_rate_bps: Option<String>,
    pub status: String,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub ws_sequence: u64,
}

impl PolymarketTradeMessage {
    #[must_use]
    pub fn maker_updates(&self) -> Vec<TradeUpdate> {
        self.maker_orders
            .iter()
            .filter_map(|fill| fill.to_trade_update(self))
            .collect()
    }

    /// Only present when this trade message also reports our own taker
    /// fill (we crossed the book rather than resting).
    #[must_use]
    pub fn taker_update(&self) -> Option<TradeUpdate> {
        let order_id = self.taker_order_id.as_ref()?;
        Some(TradeUpdate {
            trade_id: self.id.clone(),
            order_id: OrderId::from(order_id.clone()),
            token_id: TokenId::from(self.asset_id.clone()),
            side: parse_side(&self.side),
            price: self.price.parse().ok()?,
            size: self.size.parse().ok()?,
            fee: parse_fee(self.fee_rate_bps.as_deref(), self.price.parse().ok()?, self.size.parse().ok()?),
            status: parse_trade_status(&self.status),
            timestamp: parse_timestamp(self.timestamp.as_deref()),
            ws_sequence: self.ws_sequence,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PolymarketMakerOrderFill {
    pub order_id: String,
    pub asset_id: String,
    pub side: String,
    pub price: String,
    pub matched_amount: String,
    pub fee_rate_bps: Option<String>,
}

impl PolymarketMakerOrderFill {
    fn to_trade_update(&self, trade: &PolymarketTradeMessage) -> Option<TradeUpdate> {
        let price: Price = self.price.parse().ok()?;
        let size: Volume = self.matched_amount.parse().ok()?;
        Some(TradeUpdate {
            trade_id: trade.id.clone(),
            order_id: OrderId::from(self.order_id.clone()),
            token_id: TokenId::from(self.asset_id.clone()),
            side: parse_side(&self.side),
            price,
            size,
            fee: parse_fee(self.fee_rate_bps.as_deref(), price, size),
            status: parse_trade_status(&trade.status),
            timestamp: parse_timestamp(trade.timestamp.as_deref()),
            ws_sequence: trade.ws_sequence,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PolymarketOrderMessage {
    pub id: String,
    pub asset_id: String,
    pub status: String,
    pub size_remaining: Option<String>,
    #[serde(default)]
    pub ws_sequence: u64,
}

impl PolymarketOrderMessage {
    /// Unrecognized status strings are dropped rather than surfaced as an
    /// update — the book's own reconciliation sweep will catch up on
    /// the next poll.
    #[must_use]
    pub fn to_order_update(&self) -> Option<OrderUpdate> {
        let status = parse_order_status(&self.status)?;
        let remaining_size = self.size_remaining.as_deref().and_then(|s| s.parse().ok()).unwrap_or_default();
        Some(OrderUpdate {
            order_id: OrderId::from(self.id.clone()),
            token_id: TokenId::from(self.asset_id.clone()),
            status,
            remaining_size,
            ws_sequence: self.ws_sequence,
        })
    }
}

fn parse_side(raw: &str) -> OrderSide {
    match raw {
        "BUY" => OrderSide::Buy,
        _ => OrderSide::Sell,
    }
}

fn parse_trade_status(raw: &str) -> TradeStatus {
    match raw {
        "MATCHED" => TradeStatus::Matched,
        "CONFIRMED" => TradeStatus::Confirmed,
        "MINED" => TradeStatus::Mined,
        _ => TradeStatus::Failed,
    }
}

fn parse_order_status(raw: &str) -> Option<OrderStatus> {
    match raw {
        "LIVE" => Some(OrderStatus::Live),
        "MATCHED" => Some(OrderStatus::Matched),
        "CONFIRMED" => Some(OrderStatus::Confirmed),
        "CANCELLED" => Some(OrderStatus::Cancelled),
        "EXPIRED" => Some(OrderStatus::Expired),
        "REJECTED" => Some(OrderStatus::Rejected),
        "MINED" => Some(OrderStatus::Mined),
        _ => None,
    }
}

fn parse_fee(fee_rate_bps: Option<&str>, price: Price, size: Volume) -> Price {
    let Some(bps) = fee_rate_bps.and_then(|s| s.parse::<Price>().ok()) else {
        return Price::ZERO;
    };
    let notional = price * size;
    notional * bps / Price::from(10_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maker_fill_converts_to_trade_update() {
        let trade = PolymarketTradeMessage {
            id: "t-1".into(),
            taker_order_id: None,
            maker_orders: vec![PolymarketMakerOrderFill {
                order_id: "o-1".into(),
                asset_id: "tok-1".into(),
                side: "BUY".into(),
                price: "0.48".into(),
                matched_amount: "10".into(),
                fee_rate_bps: None,
            }],
            asset_id: "tok-1".into(),
            side: "BUY".into(),
            price: "0.48".into(),
            size: "10".into(),
            fee_rate_bps: None,
            status: "MATCHED".into(),
            timestamp: None,
            ws_sequence: 1,
        };
        let updates = trade.maker_updates();
        assert_eq!(updates.len(), 1);
        assert!(trade.taker_update().is_none());
    }

    #[test]
    fn order_message_with_unknown_status_yields_no_update() {
        let msg = PolymarketOrderMessage {
            id: "o-1".into(),
            asset_id: "tok-1".into(),
            status: "WEIRD".into(),
            size_remaining: None,
            ws_sequence: 0,
        };
        assert!(msg.to_order_update().is_none());
    }
}

fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| s.parse::<i64>().ok())
        .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms))
        .unwrap_or_else(Utc::now)
}
