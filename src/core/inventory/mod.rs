//! Inventory Manager.
//!
//! Owns the authoritative per-token [`Position`], tracks size reserved by
//! orders that haven't filled yet, and answers "how much more can we buy"
//! for the Quote Engine's sizing decisions. Local state wins between
//! reconciliations: the position-sync cadence overwrites the authoritative
//! position and clears pending-buy reservations (`set_position`); the
//! order-reconciliation cadence separately rebuilds those reservations from
//! the venue's open-order snapshot via `reserve_pending_buy`/`release_pending_buy`.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::warn;

use crate::core::domain::{OrderSide, Position, Price, TokenId, Volume};
use crate::core::exchange::ApiPosition;

/// Per-token inventory: filled position plus size reserved by open orders.
struct InventoryEntry {
    position: Position,
    reserved_buy: Volume,
    reserved_sell: Volume,
}

impl InventoryEntry {
    fn flat(token_id: TokenId) -> Self {
        Self { position: Position::flat(token_id), reserved_buy: Volume::ZERO, reserved_sell: Volume::ZERO }
    }
}

pub struct InventoryManager {
    entries: RwLock<HashMap<TokenId, InventoryEntry>>,
}

impl Default for InventoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryManager {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    #[must_use]
    pub fn position(&self, token_id: &TokenId) -> Position {
        self.entries
            .read()
            .get(token_id)
            .map_or_else(|| Position::flat(token_id.clone()), |e| e.position.clone())
    }

    /// Size currently reserved against resting BUY orders for `token_id`.
    #[must_use]
    pub fn reserved_buy(&self, token_id: &TokenId) -> Volume {
        self.entries.read().get(token_id).map_or(Volume::ZERO, |e| e.reserved_buy)
    }

    /// Apply a confirmed fill to the local position, releasing the matching
    /// side's reservation by the filled size.
    pub fn update_from_fill(&self, token_id: &TokenId, side: OrderSide, size: Volume, price: Price, fee: Price) {
        let mut entries = self.entries.write();
        let entry = entries.entry(token_id.clone()).or_insert_with(|| InventoryEntry::flat(token_id.clone()));
        match side {
            OrderSide::Buy => {
                entry.position.apply_buy(size, price, fee);
                entry.reserved_buy = (entry.reserved_buy - size).max(Volume::ZERO);
            }
            OrderSide::Sell => {
                entry.position.apply_sell(size, price, fee);
                entry.reserved_sell = (entry.reserved_sell - size).max(Volume::ZERO);
            }
        }
    }

    /// Reserve size against an order we're about to place, so a second quote
    /// tick doesn't double-count capacity the first order already claimed.
    pub fn reserve_pending_buy(&self, token_id: &TokenId, side: OrderSide, size: Volume) {
        let mut entries = self.entries.write();
        let entry = entries.entry(token_id.clone()).or_insert_with(|| InventoryEntry::flat(token_id.clone()));
        match side {
            OrderSide::Buy => entry.reserved_buy += size,
            OrderSide::Sell => entry.reserved_sell += size,
        }
    }

    /// Release a reservation for an order that was cancelled, expired, or
    /// rejected before it filled.
    pub fn release_pending_buy(&self, token_id: &TokenId, side: OrderSide, size: Volume) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(token_id) {
            match side {
                OrderSide::Buy => entry.reserved_buy = (entry.reserved_buy - size).max(Volume::ZERO),
                OrderSide::Sell => entry.reserved_sell = (entry.reserved_sell - size).max(Volume::ZERO),
            }
        }
    }

    /// Zero both reservations for `token_id`, e.g. once a position-sync
    /// snapshot has superseded whatever open orders they were tracking.
    pub fn clear_pending_buys(&self, token_id: &TokenId) {
        if let Some(entry) = self.entries.write().get_mut(token_id) {
            entry.reserved_buy = Volume::ZERO;
            entry.reserved_sell = Volume::ZERO;
        }
    }

    /// Remaining room to buy before `max_position` is hit, net of existing
    /// position and outstanding buy reservations.
    #[must_use]
    pub fn available_for_new_buy(&self, token_id: &TokenId, max_position: Volume) -> Volume {
        let entries = self.entries.read();
        let Some(entry) = entries.get(token_id) else { return max_position };
        (max_position - entry.position.size() - entry.reserved_buy).max(Volume::ZERO)
    }

    /// Remaining room to sell: current long size minus what's already
    /// reserved against resting sell orders.
    #[must_use]
    pub fn available_to_sell(&self, token_id: &TokenId) -> Volume {
        let entries = self.entries.read();
        let Some(entry) = entries.get(token_id) else { return Volume::ZERO };
        (entry.position.size() - entry.reserved_sell).max(Volume::ZERO)
    }

    /// Overwrite one token's authoritative position from a venue snapshot,
    /// logging any local/venue mismatch, and clear its pending-buy
    /// reservations — the order-reconciliation cadence rebuilds them
    /// separately from the open-order snapshot.
    pub fn set_position(&self, token_id: &TokenId, size: Volume, avg_price: Price) {
        let mut entries = self.entries.write();
        let entry = entries.entry(token_id.clone()).or_insert_with(|| InventoryEntry::flat(token_id.clone()));
        if entry.position.size() != size || entry.position.avg_entry_price() != avg_price {
            warn!(
                token_id = %token_id,
                local_size = %entry.position.size(),
                venue_size = %size,
                "inventory reconciliation mismatch; adopting venue snapshot"
            );
        }
        entry.position.set_authoritative(size, avg_price);
        entry.reserved_buy = Volume::ZERO;
        entry.reserved_sell = Volume::ZERO;
    }

    /// Reconcile every reported position against the venue's authoritative
    /// snapshot. The venue always wins; pending-buy reservations are
    /// cleared for each token reported.
    pub fn force_reconcile_all(&self, reports: &[ApiPosition]) {
        for report in reports {
            self.set_position(&report.token_id, report.size, report.avg_price);
        }
    }

    #[must_use]
    pub fn total_exposure(&self) -> Price {
        self.entries.read().values().map(|e| e.position.size() * e.position.avg_entry_price()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fresh_token_has_full_buy_capacity() {
        let inv = InventoryManager::new();
        let token = TokenId::new("tok");
        assert_eq!(inv.available_for_new_buy(&token, dec!(100)), dec!(100));
    }

    #[test]
    fn reservation_reduces_available_capacity() {
        let inv = InventoryManager::new();
        let token = TokenId::new("tok");
        inv.reserve_pending_buy(&token, OrderSide::Buy, dec!(30));
        assert_eq!(inv.available_for_new_buy(&token, dec!(100)), dec!(70));
    }

    #[test]
    fn fill_reduces_reservation_and_updates_position() {
        let inv = InventoryManager::new();
        let token = TokenId::new("tok");
        inv.reserve_pending_buy(&token, OrderSide::Buy, dec!(30));
        inv.update_from_fill(&token, OrderSide::Buy, dec!(30), dec!(0.5), dec!(0.01));
        assert_eq!(inv.available_for_new_buy(&token, dec!(100)), dec!(70));
        assert_eq!(inv.position(&token).size(), dec!(30));
    }

    #[test]
    fn available_to_sell_nets_out_reserved_sell_size() {
        let inv = InventoryManager::new();
        let token = TokenId::new("tok");
        inv.update_from_fill(&token, OrderSide::Buy, dec!(50), dec!(0.5), dec!(0));
        inv.reserve_pending_buy(&token, OrderSide::Sell, dec!(20));
        assert_eq!(inv.available_to_sell(&token), dec!(30));
    }

    #[test]
    fn release_pending_buy_gives_back_capacity() {
        let inv = InventoryManager::new();
        let token = TokenId::new("tok");
        inv.reserve_pending_buy(&token, OrderSide::Buy, dec!(30));
        inv.release_pending_buy(&token, OrderSide::Buy, dec!(30));
        assert_eq!(inv.available_for_new_buy(&token, dec!(100)), dec!(100));
    }

    #[test]
    fn force_reconcile_adopts_venue_snapshot_on_mismatch() {
        let inv = InventoryManager::new();
        let token = TokenId::new("tok");
        inv.update_from_fill(&token, OrderSide::Buy, dec!(10), dec!(0.5), dec!(0));
        inv.force_reconcile_all(&[ApiPosition { token_id: token.clone(), size: dec!(15), avg_price: dec!(0.52) }]);
        assert_eq!(inv.position(&token).size(), dec!(15));
    }

    #[test]
    fn set_position_clears_pending_buy_reservations() {
        let inv = InventoryManager::new();
        let token = TokenId::new("tok");
        inv.reserve_pending_buy(&token, OrderSide::Buy, dec!(40));
        assert_eq!(inv.available_for_new_buy(&token, dec!(100)), dec!(60));
        inv.set_position(&token, dec!(10), dec!(0.5));
        assert_eq!(inv.reserved_buy(&token), Volume::ZERO);
        assert_eq!(inv.available_for_new_buy(&token, dec!(100)), dec!(90));
    }
}
