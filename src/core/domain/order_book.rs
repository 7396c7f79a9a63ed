//! Price-indexed order book for a single token.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::ids::TokenId;
use super::money::{Price, Volume};

/// Live order book for one token: `bids` descending by price, `asks`
/// ascending. A zero-size update deletes the level.
#[derive(Debug, Clone)]
pub struct OrderBook {
    token_id: TokenId,
    bids: BTreeMap<Price, Volume>,
    asks: BTreeMap<Price, Volume>,
    tick_size: Price,
    updated_at: DateTime<Utc>,
}

impl OrderBook {
    #[must_use]
    pub fn new(token_id: TokenId, tick_size: Price) -> Self {
        Self {
            token_id,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            tick_size,
            updated_at: Utc::now(),
        }
    }

    /// Build directly from full snapshots, as received from a `book`
    /// message. Existing levels are replaced wholesale.
    #[must_use]
    pub fn from_snapshot(
        token_id: TokenId,
        tick_size: Price,
        bids: impl IntoIterator<Item = (Price, Volume)>,
        asks: impl IntoIterator<Item = (Price, Volume)>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut book = Self::new(token_id, tick_size);
        for (price, size) in bids {
            book.set_level(Side::Bid, price, size);
        }
        for (price, size) in asks {
            book.set_level(Side::Ask, price, size);
        }
        book.updated_at = updated_at;
        book
    }

    #[must_use]
    pub const fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    #[must_use]
    pub const fn tick_size(&self) -> Price {
        self.tick_size
    }

    pub fn set_tick_size(&mut self, tick_size: Price) {
        self.tick_size = tick_size;
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a single price-level update (a `price_change` entry). A
    /// zero size removes the level; otherwise the level is inserted or
    /// replaced. Updates must be applied in arrival order — callers
    /// must not reorder the stream before calling this.
    pub fn set_level(&mut self, side: Side, price: Price, size: Volume) {
        let book = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        if size <= Volume::ZERO {
            book.remove(&price);
        } else {
            book.insert(price, size);
        }
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<(Price, Volume)> {
        self.bids.iter().next_back().map(|(p, s)| (*p, *s))
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<(Price, Volume)> {
        self.asks.iter().next().map(|(p, s)| (*p, *s))
    }

    #[must_use]
    pub fn mid(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid + ask) / Price::from(2)),
            _ => None,
        }
    }

    /// True once the book has both sides and no bid is ≥ any ask. A
    /// book failing this check is transiently inconsistent and must
    /// not be used for quoting decisions.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => bid < ask,
            _ => true,
        }
    }

    /// Best level holding at least `min_size`, falling back to the top
    /// level if none qualifies.
    #[must_use]
    pub fn best_bid_with_min_size(&self, min_size: Volume) -> Option<(Price, Volume)> {
        self.bids
            .iter()
            .rev()
            .find(|(_, size)| **size >= min_size)
            .map(|(p, s)| (*p, *s))
            .or_else(|| self.best_bid())
    }

    #[must_use]
    pub fn best_ask_with_min_size(&self, min_size: Volume) -> Option<(Price, Volume)> {
        self.asks
            .iter()
            .find(|(_, size)| **size >= min_size)
            .map(|(p, s)| (*p, *s))
            .or_else(|| self.best_ask())
    }

    #[must_use]
    pub fn bid_levels(&self) -> impl DoubleEndedIterator<Item = (&Price, &Volume)> {
        self.bids.iter()
    }

    #[must_use]
    pub fn ask_levels(&self) -> impl DoubleEndedIterator<Item = (&Price, &Volume)> {
        self.asks.iter()
    }
}

/// Which side of the book a level update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBook {
        OrderBook::new(TokenId::from("tok"), dec!(0.01))
    }

    #[test]
    fn best_bid_is_highest_price() {
        let mut b = book();
        b.set_level(Side::Bid, dec!(0.40), dec!(10));
        b.set_level(Side::Bid, dec!(0.45), dec!(5));
        assert_eq!(b.best_bid(), Some((dec!(0.45), dec!(5))));
    }

    #[test]
    fn best_ask_is_lowest_price() {
        let mut b = book();
        b.set_level(Side::Ask, dec!(0.55), dec!(10));
        b.set_level(Side::Ask, dec!(0.50), dec!(5));
        assert_eq!(b.best_ask(), Some((dec!(0.50), dec!(5))));
    }

    #[test]
    fn zero_size_update_deletes_level() {
        let mut b = book();
        b.set_level(Side::Bid, dec!(0.40), dec!(10));
        b.set_level(Side::Bid, dec!(0.40), dec!(0));
        assert_eq!(b.best_bid(), None);
    }

    #[test]
    fn mid_is_average_of_best_bid_and_ask() {
        let mut b = book();
        b.set_level(Side::Bid, dec!(0.40), dec!(10));
        b.set_level(Side::Ask, dec!(0.50), dec!(10));
        assert_eq!(b.mid(), Some(dec!(0.45)));
    }

    #[test]
    fn inconsistent_when_bid_crosses_ask() {
        let mut b = book();
        b.set_level(Side::Bid, dec!(0.60), dec!(10));
        b.set_level(Side::Ask, dec!(0.50), dec!(10));
        assert!(!b.is_consistent());
    }

    #[test]
    fn min_size_lookup_falls_back_to_top_level() {
        let mut b = book();
        b.set_level(Side::Bid, dec!(0.45), dec!(2));
        assert_eq!(b.best_bid_with_min_size(dec!(10)), Some((dec!(0.45), dec!(2))));
    }

    #[test]
    fn min_size_lookup_finds_qualifying_level_below_top() {
        let mut b = book();
        b.set_level(Side::Bid, dec!(0.45), dec!(2));
        b.set_level(Side::Bid, dec!(0.40), dec!(50));
        assert_eq!(b.best_bid_with_min_size(dec!(10)), Some((dec!(0.40), dec!(50))));
    }
}
