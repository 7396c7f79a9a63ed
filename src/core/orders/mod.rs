//! Order Manager.
//!
//! Sole writer to the venue's order endpoints. Holds a local mirror of open
//! orders derived from placement acks and, authoritatively, from the
//! user-channel feed — `update_order_state` is the only sync point that
//! moves the mirror's status/remaining_size. Venue errors are classified
//! into soft (expected, never counted toward the circuit breaker) and hard
//! (network/auth/malformed, counted as consecutive errors) per
//! [`crate::error::ExchangeError::is_soft`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::warn;

use crate::core::domain::{Order, OrderId, OrderStatus, TokenId, Volume};
use crate::core::exchange::{ApiOrder, OrderExecutor, OrderRequest, PlacedOrder};
use crate::core::inventory::InventoryManager;
use crate::core::risk::RiskManager;
use crate::error::ExchangeError;

/// Wraps an [`OrderExecutor`] with a local open-order mirror and the
/// soft/hard error taxonomy that feeds the circuit breaker. Also the sole
/// place that reserves/releases pending-buy inventory capacity against a
/// resting order's lifecycle.
pub struct OrderManager {
    executor: Arc<dyn OrderExecutor>,
    risk: Arc<RiskManager>,
    inventory: Arc<InventoryManager>,
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl OrderManager {
    #[must_use]
    pub fn new(executor: Arc<dyn OrderExecutor>, risk: Arc<RiskManager>, inventory: Arc<InventoryManager>) -> Self {
        Self { executor, risk, inventory, orders: RwLock::new(HashMap::new()) }
    }

    /// Place one order (always post-only except the wind-down taker-exit
    /// path, which builds its own [`OrderRequest`] with `post_only: false`).
    ///
    /// # Errors
    /// Returns the venue's classified error; hard errors are recorded
    /// against the circuit breaker, soft errors are not.
    pub async fn place_order(&self, request: OrderRequest) -> Result<Order, ExchangeError> {
        let token_id = request.token_id.clone();
        let side = request.side;
        let price = request.price;
        let size = request.size;
        let post_only = request.post_only;

        match self.executor.place_order(request).await {
            Ok(PlacedOrder { order_id }) => {
                self.risk.record_order_success();
                self.inventory.reserve_pending_buy(&token_id, side, size);
                let order = Order::new(order_id.clone(), token_id, side, price, size, post_only, Utc::now());
                self.orders.write().insert(order_id, order.clone());
                Ok(order)
            }
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Place several orders; each result is independent of the others'
    /// outcome.
    pub async fn place_orders_batch(&self, requests: Vec<OrderRequest>) -> Vec<Result<Order, ExchangeError>> {
        let meta: Vec<_> = requests.iter().map(|r| (r.token_id.clone(), r.side, r.price, r.size, r.post_only)).collect();
        let results = self.executor.place_orders_batch(requests).await;

        results
            .into_iter()
            .zip(meta)
            .map(|(result, (token_id, side, price, size, post_only))| match result {
                Ok(PlacedOrder { order_id }) => {
                    self.risk.record_order_success();
                    self.inventory.reserve_pending_buy(&token_id, side, size);
                    let order = Order::new(order_id.clone(), token_id, side, price, size, post_only, Utc::now());
                    self.orders.write().insert(order_id, order.clone());
                    Ok(order)
                }
                Err(err) => {
                    self.record_error(&err);
                    Err(err)
                }
            })
            .collect()
    }

    /// # Errors
    /// Returns the venue's classified error.
    pub async fn cancel_all_for_token(&self, token_id: &TokenId) -> Result<(), ExchangeError> {
        let result = self.executor.cancel_all_for_token(token_id).await;
        match &result {
            Ok(()) => self.risk.record_order_success(),
            Err(err) => self.record_error(err),
        }
        result
    }

    /// # Errors
    /// Returns the venue's classified error.
    pub async fn cancel_all(&self) -> Result<(), ExchangeError> {
        let result = self.executor.cancel_all().await;
        match &result {
            Ok(()) => self.risk.record_order_success(),
            Err(err) => self.record_error(err),
        }
        result
    }

    /// Apply a status/remaining-size transition observed from the
    /// user-channel feed — the sole sync point for the local mirror.
    /// Releases the order's pending-buy/sell reservation once it reaches a
    /// terminal non-fill status (cancelled, expired, rejected).
    pub fn update_order_state(&self, order_id: &OrderId, status: OrderStatus, remaining_size: Volume, ws_sequence: u64) {
        let release = {
            let mut orders = self.orders.write();
            let Some(order) = orders.get_mut(order_id) else {
                warn!(%order_id, "order update for unknown order, ignoring");
                return;
            };
            let token_id = order.token_id().clone();
            let side = order.side();
            let prior_remaining = order.remaining_size();
            order.apply_update(status, remaining_size, ws_sequence);
            let applied = order.ws_sequence() == Some(ws_sequence);
            (applied && status.is_terminal()).then_some((token_id, side, prior_remaining))
        };
        if let Some((token_id, side, prior_remaining)) = release {
            self.inventory.release_pending_buy(&token_id, side, prior_remaining);
        }
    }

    /// Replace the local mirror with the venue's truth, then rebuild
    /// pending-buy/sell reservations from each token's open orders so a
    /// sequence of missed or duplicated websocket updates can't leave a
    /// reservation permanently stuck. Called periodically by the
    /// orchestrator and once at startup.
    pub fn reconcile_with_api_orders(&self, api_orders: &[ApiOrder]) {
        {
            let mut orders = self.orders.write();
            orders.clear();
            for api in api_orders {
                let remaining = api.original_size - api.size_matched;
                let mut order = Order::new(
                    api.order_id.clone(),
                    api.token_id.clone(),
                    api.side,
                    api.price,
                    api.original_size,
                    true,
                    Utc::now(),
                );
                order.apply_update(OrderStatus::Live, remaining, 0);
                orders.insert(api.order_id.clone(), order);
            }
        }
        self.rebuild_reservations(api_orders);
    }

    /// Reconcile each token's local reserved-buy size against the snapshot's
    /// open BUY orders' remaining size, within a 0.01 tolerance: release the
    /// excess if local was higher, reserve the delta if the snapshot is
    /// higher. Sell-side reservations are left to the next fill/cancel.
    fn rebuild_reservations(&self, api_orders: &[ApiOrder]) {
        let mut snapshot_reserved_buy: HashMap<TokenId, Volume> = HashMap::new();
        for api in api_orders {
            if api.side == crate::core::domain::OrderSide::Buy {
                let remaining = api.original_size - api.size_matched;
                *snapshot_reserved_buy.entry(api.token_id.clone()).or_insert(Volume::ZERO) += remaining;
            }
        }

        let tolerance = Volume::new(1, 2);
        let mut seen = std::collections::HashSet::new();
        for (token_id, snapshot_size) in &snapshot_reserved_buy {
            seen.insert(token_id.clone());
            self.reconcile_token_reservation(token_id, *snapshot_size, tolerance);
        }
        for order in self.orders.read().values() {
            if seen.insert(order.token_id().clone()) {
                self.reconcile_token_reservation(order.token_id(), Volume::ZERO, tolerance);
            }
        }
    }

    fn reconcile_token_reservation(&self, token_id: &TokenId, snapshot_size: Volume, tolerance: Volume) {
        let local = self.inventory.reserved_buy(token_id);
        let delta = snapshot_size - local;
        if delta > tolerance {
            self.inventory.reserve_pending_buy(token_id, crate::core::domain::OrderSide::Buy, delta);
        } else if -delta > tolerance {
            self.inventory.release_pending_buy(token_id, crate::core::domain::OrderSide::Buy, -delta);
        }
    }

    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.read().get(order_id).cloned()
    }

    #[must_use]
    pub fn open_orders_for_token(&self, token_id: &TokenId) -> Vec<Order> {
        self.orders.read().values().filter(|o| o.token_id() == token_id && o.status().is_open()).cloned().collect()
    }

    #[must_use]
    pub fn open_order_count(&self) -> usize {
        self.orders.read().values().filter(|o| o.status().is_open()).count()
    }

    fn record_error(&self, err: &ExchangeError) {
        if !err.is_soft() {
            self.risk.record_order_error(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{OrderSide, Price};
    use crate::core::risk::RiskLimits;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct StubExecutor {
        place_result: Result<PlacedOrder, ExchangeError>,
    }

    #[async_trait]
    impl OrderExecutor for StubExecutor {
        async fn place_order(&self, _request: OrderRequest) -> Result<PlacedOrder, ExchangeError> {
            self.place_result.clone()
        }

        async fn place_orders_batch(&self, requests: Vec<OrderRequest>) -> Vec<Result<PlacedOrder, ExchangeError>> {
            requests.iter().map(|_| self.place_result.clone()).collect()
        }

        async fn cancel_all_for_token(&self, _token_id: &TokenId) -> Result<(), ExchangeError> {
            Ok(())
        }

        async fn cancel_all(&self) -> Result<(), ExchangeError> {
            Ok(())
        }

        async fn fetch_open_orders(&self) -> Result<Vec<ApiOrder>, ExchangeError> {
            Ok(vec![])
        }

        async fn fetch_positions(&self, _tokens: &[TokenId]) -> Result<Vec<crate::core::exchange::ApiPosition>, ExchangeError> {
            Ok(vec![])
        }
    }

    fn request() -> OrderRequest {
        OrderRequest { token_id: TokenId::new("tok"), side: OrderSide::Buy, price: dec!(0.45), size: dec!(10), post_only: true, neg_risk: false }
    }

    fn manager(place_result: Result<PlacedOrder, ExchangeError>) -> OrderManager {
        let executor: Arc<dyn OrderExecutor> = Arc::new(StubExecutor { place_result });
        let risk = Arc::new(RiskManager::new(RiskLimits::default(), Utc::now()));
        let inventory = Arc::new(InventoryManager::new());
        OrderManager::new(executor, risk, inventory)
    }

    #[tokio::test]
    async fn successful_place_adds_to_mirror() {
        let mgr = manager(Ok(PlacedOrder { order_id: OrderId::new("o1") }));
        let order = mgr.place_order(request()).await.unwrap();
        assert_eq!(mgr.order(order.order_id()).unwrap().status(), OrderStatus::Live);
        assert_eq!(mgr.open_order_count(), 1);
    }

    #[tokio::test]
    async fn soft_error_does_not_escalate_circuit_breaker() {
        let mgr = manager(Err(ExchangeError::InsufficientBalance));
        assert!(mgr.place_order(request()).await.is_err());
        assert_eq!(mgr.risk.breaker_state(), crate::core::domain::CircuitBreakerState::Normal);
    }

    #[tokio::test]
    async fn hard_error_counts_toward_circuit_breaker() {
        let mgr = manager(Err(ExchangeError::Http { status: 500, message: "boom".into() }));
        for _ in 0..6 {
            let _ = mgr.place_order(request()).await;
        }
        assert_eq!(mgr.risk.breaker_state(), crate::core::domain::CircuitBreakerState::Halted);
    }

    #[test]
    fn update_order_state_applies_in_order_transitions() {
        let mgr = manager(Ok(PlacedOrder { order_id: OrderId::new("o1") }));
        let order_id = OrderId::new("o1");
        mgr.orders.write().insert(
            order_id.clone(),
            Order::new(order_id.clone(), TokenId::new("tok"), OrderSide::Buy, dec!(0.45), dec!(10), true, Utc::now()),
        );
        mgr.update_order_state(&order_id, OrderStatus::Matched, dec!(4), 1);
        assert_eq!(mgr.order(&order_id).unwrap().remaining_size(), dec!(4));
    }

    #[test]
    fn reconcile_replaces_mirror_with_venue_truth() {
        let mgr = manager(Ok(PlacedOrder { order_id: OrderId::new("o1") }));
        let api = ApiOrder {
            order_id: OrderId::new("o2"),
            token_id: TokenId::new("tok"),
            side: OrderSide::Sell,
            price: dec!(0.55),
            original_size: dec!(20),
            size_matched: dec!(5),
        };
        mgr.reconcile_with_api_orders(&[api]);
        assert_eq!(mgr.open_order_count(), 1);
        assert_eq!(mgr.order(&OrderId::new("o2")).unwrap().remaining_size(), dec!(15));
    }

    #[tokio::test]
    async fn successful_placement_reserves_buy_capacity() {
        let mgr = manager(Ok(PlacedOrder { order_id: OrderId::new("o1") }));
        mgr.place_order(request()).await.unwrap();
        assert_eq!(mgr.inventory.reserved_buy(&TokenId::new("tok")), dec!(10));
    }

    #[test]
    fn cancelled_order_releases_its_reservation() {
        let mgr = manager(Ok(PlacedOrder { order_id: OrderId::new("o1") }));
        let order_id = OrderId::new("o1");
        let token = TokenId::new("tok");
        mgr.inventory.reserve_pending_buy(&token, OrderSide::Buy, dec!(10));
        mgr.orders.write().insert(order_id.clone(), Order::new(order_id.clone(), token.clone(), OrderSide::Buy, dec!(0.45), dec!(10), true, Utc::now()));
        mgr.update_order_state(&order_id, OrderStatus::Cancelled, dec!(10), 1);
        assert_eq!(mgr.inventory.reserved_buy(&token), Volume::ZERO);
    }

    #[test]
    fn reconcile_rebuilds_reservation_from_open_buy_snapshot() {
        let mgr = manager(Ok(PlacedOrder { order_id: OrderId::new("o1") }));
        let token = TokenId::new("tok");
        let api = ApiOrder {
            order_id: OrderId::new("o3"),
            token_id: token.clone(),
            side: OrderSide::Buy,
            price: dec!(0.45),
            original_size: dec!(40),
            size_matched: dec!(10),
        };
        mgr.reconcile_with_api_orders(&[api]);
        assert_eq!(mgr.inventory.reserved_buy(&token), dec!(30));
    }
}
