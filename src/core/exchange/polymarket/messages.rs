//! Market-data WebSocket message schema.

use serde::{Deserialize, Serialize};

use crate::core::domain::{Price, TokenId, Volume};

/// Subscription request sent to the market-data WebSocket on connect.
#[derive(Debug, Serialize)]
pub struct PolymarketSubscribeMessage {
    pub assets_ids: Vec<String>,
    #[serde(rename = "type")]
    pub msg_type: String,
}

impl PolymarketSubscribeMessage {
    #[must_use]
    pub fn new(asset_ids: Vec<String>) -> Self {
        Self {
            assets_ids: asset_ids,
            msg_type: "market".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type")]
pub enum PolymarketWsMessage {
    #[serde(rename = "book")]
    Book(PolymarketBookMessage),

    #[serde(rename = "price_change")]
    PriceChange(PolymarketPriceChangeMessage),

    #[serde(rename = "tick_size_change")]
    TickSizeChange(PolymarketTickSizeChangeMessage),

    #[serde(other)]
    Unknown,
}

/// Full book snapshot for one token.
#[derive(Debug, Deserialize)]
pub struct PolymarketBookMessage {
    pub asset_id: String,
    pub market: Option<String>,
    pub bids: Vec<PolymarketWsPriceLevel>,
    pub asks: Vec<PolymarketWsPriceLevel>,
    pub timestamp: Option<String>,
    pub hash: Option<String>,
}

impl PolymarketBookMessage {
    #[must_use]
    pub fn token_id(&self) -> TokenId {
        TokenId::from(self.asset_id.clone())
    }

    #[must_use]
    pub fn parsed_bids(&self) -> Vec<(Price, Volume)> {
        self.bids.iter().filter_map(PolymarketWsPriceLevel::parse).collect()
    }

    #[must_use]
    pub fn parsed_asks(&self) -> Vec<(Price, Volume)> {
        self.asks.iter().filter_map(PolymarketWsPriceLevel::parse).collect()
    }
}

/// Incremental price-level update ("price_change" events).
#[derive(Debug, Deserialize)]
pub struct PolymarketPriceChangeMessage {
    pub asset_id: String,
    pub market: Option<String>,
    pub changes: Option<Vec<PolymarketWsPriceChange>>,
}

impl PolymarketPriceChangeMessage {
    #[must_use]
    pub fn token_id(&self) -> TokenId {
        TokenId::from(self.asset_id.clone())
    }

    #[must_use]
    pub fn parsed_changes(&self) -> Vec<(crate::core::domain::Side, Price, Volume)> {
        let Some(changes) = &self.changes else { return Vec::new() };
        changes
            .iter()
            .filter_map(|change| {
                let (price, size) = change.parse()?;
                let side = match change.side.as_str() {
                    "BUY" => crate::core::domain::Side::Bid,
                    _ => crate::core::domain::Side::Ask,
                };
                Some((side, price, size))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct PolymarketWsPriceChange {
    pub price: String,
    pub size: String,
    pub side: String,
}

impl PolymarketWsPriceChange {
    fn parse(&self) -> Option<(crate::core::domain::Price, crate::core::domain::Volume)> {
        Some((self.price.parse().ok()?, self.size.parse().ok()?))
    }
}

#[derive(Debug, Deserialize)]
pub struct PolymarketTickSizeChangeMessage {
    pub asset_id: String,
    pub new_tick_size: String,
}

impl PolymarketTickSizeChangeMessage {
    #[must_use]
    pub fn token_id(&self) -> TokenId {
        TokenId::from(self.asset_id.clone())
    }

    #[must_use]
    pub fn parsed_tick_size(&self) -> Option<crate::core::domain::Price> {
        self.new_tick_size.parse().ok()
    }
}

/// Price level as received over the wire: strings, not decimals.
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketWsPriceLevel {
    pub price: String,
    pub size: String,
}

impl PolymarketWsPriceLevel {
    fn parse(&self) -> Option<(crate::core::domain::Price, crate::core::domain::Volume)> {
        Some((self.price.parse().ok()?, self.size.parse().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_message_parses_bids_and_asks() {
        let msg = PolymarketBookMessage {
            asset_id: "tok-1".into(),
            market: None,
            bids: vec![PolymarketWsPriceLevel { price: "0.48".into(), size: "100".into() }],
            asks: vec![PolymarketWsPriceLevel { price: "0.52".into(), size: "80".into() }],
            timestamp: None,
            hash: None,
        };
        assert_eq!(msg.parsed_bids().len(), 1);
        assert_eq!(msg.parsed_asks().len(), 1);
    }

    #[test]
    fn price_change_skips_unparseable_levels() {
        let msg = PolymarketPriceChangeMessage {
            asset_id: "tok-1".into(),
            market: None,
            changes: Some(vec![PolymarketWsPriceChange {
                price: "not-a-number".into(),
                size: "10".into(),
                side: "BUY".into(),
            }]),
        };
        assert!(msg.parsed_changes().is_empty());
    }
}
