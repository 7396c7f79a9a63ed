//! Shared application state: the component handles the orchestrator wires
//! together every tick. Each [`crate::core::domain::MarketState`] remains
//! exclusively owned by the orchestrator; `AppState`
//! only holds the cross-cutting services every market's tick touches.

use std::sync::Arc;

use crate::core::inventory::InventoryManager;
use crate::core::ledger::EventLedger;
use crate::core::orders::OrderManager;
use crate::core::quote::QuoteEngine;
use crate::core::risk::RiskManager;
use crate::core::winddown::{RedemptionScheduler, WindDownEngine};

/// Shared service handles accessible from every per-market tick.
pub struct AppState {
    pub inventory: Arc<InventoryManager>,
    pub risk: Arc<RiskManager>,
    pub ledger: Arc<EventLedger>,
    pub orders: Arc<OrderManager>,
    pub quote_engine: Arc<QuoteEngine>,
    pub wind_down: Arc<WindDownEngine>,
    pub redemption: Arc<RedemptionScheduler>,
    /// Detect fills/decisions but never place real orders.
    pub dry_run: bool,
}

impl AppState {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inventory: Arc<InventoryManager>,
        risk: Arc<RiskManager>,
        ledger: Arc<EventLedger>,
        orders: Arc<OrderManager>,
        quote_engine: Arc<QuoteEngine>,
        wind_down: Arc<WindDownEngine>,
        redemption: Arc<RedemptionScheduler>,
        dry_run: bool,
    ) -> Self {
        Self { inventory, risk, ledger, orders, quote_engine, wind_down, redemption, dry_run }
    }
}
