//! Orchestrator: owns every [`MarketState`], runs the
//! startup sequence, drives the tick loop that walks each market through
//! the Quote Engine / Wind-Down Engine, routes market-data and user-channel
//! events, captures markouts, and shuts down gracefully on signal.

mod builder;
mod handler;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{error, info, warn};

use crate::app::config::Config;
use crate::app::state::AppState;
use crate::app::status_file::{StatusConfig, StatusWriter};
use crate::core::domain::{MarketState, Price, TokenId, Volume};
use crate::core::exchange::polymarket::{PolymarketDataStream, PolymarketUserStream};
use crate::core::exchange::{MarketDataStream, OrderExecutor, UserChannelStream};
use crate::core::inventory::InventoryManager;
use crate::core::ledger::{self, EventLedger};
use crate::core::orders::OrderManager;
use crate::core::quote::QuoteEngine;
use crate::core::risk::RiskManager;
use crate::core::service::notifier::NotifierRegistry;
use crate::core::service::store::SessionStore;
use crate::core::winddown::{RedemptionScheduler, WindDownEngine};
use crate::error::Result;

/// Pass/fail outcome of one named health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: &'static str,
    pub status: HealthStatus,
    pub message: String,
    pub critical: bool,
}

impl HealthCheck {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, HealthStatus::Pass)
    }
}

/// A startup health check is unhealthy if any *critical* check failed;
/// non-critical failures are surfaced but don't block startup.
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    checks: Vec<HealthCheck>,
}

impl HealthReport {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().filter(|c| c.critical).all(HealthCheck::is_ok)
    }

    #[must_use]
    pub fn checks(&self) -> &[HealthCheck] {
        &self.checks
    }
}

fn check(name: &'static str, ok: bool, critical: bool, fail_message: &str) -> HealthCheck {
    HealthCheck {
        name,
        status: if ok { HealthStatus::Pass } else { HealthStatus::Fail },
        message: if ok { "ok".to_string() } else { fail_message.to_string() },
        critical,
    }
}

/// Validate a [`Config`] is complete enough to start the engine, without
/// opening any network connection.
#[must_use]
pub fn health_check(config: &Config) -> HealthReport {
    let checks = vec![
        check("markets_configured", !config.markets.is_empty(), true, "no markets configured"),
        check("database_url", !config.database_url.is_empty(), true, "database_url is empty"),
        check(
            "polymarket_market_ws",
            !config.polymarket.ws_market_url.is_empty(),
            true,
            "polymarket.ws_market_url is empty",
        ),
        check(
            "polymarket_user_ws",
            !config.polymarket.ws_user_url.is_empty(),
            true,
            "polymarket.ws_user_url is empty",
        ),
        check("polymarket_rest", !config.polymarket.rest_url.is_empty(), true, "polymarket.rest_url is empty"),
        check("wallet_private_key", config.wallet.private_key.is_some(), true, "WALLET_PRIVATE_KEY is unset"),
    ];
    HealthReport { checks }
}

/// A fill's markout is sampled at several fixed horizons after it occurs;
/// this is one (token, horizon) observation still waiting for its due time.
struct PendingMarkout {
    token_id: TokenId,
    fill_price: Price,
    fill_side: crate::core::domain::OrderSide,
    due_at: DateTime<Utc>,
    horizon_secs: i64,
}

/// Ticks elapsed since the last periodic action, compared against a
/// configured interval — avoids pulling in a timer-per-concern.
struct Cadence {
    interval: chrono::Duration,
    last_run: DateTime<Utc>,
}

impl Cadence {
    fn new(interval_secs: i64, now: DateTime<Utc>) -> Self {
        Self { interval: chrono::Duration::seconds(interval_secs), last_run: now }
    }

    fn due(&mut self, now: DateTime<Utc>) -> bool {
        if now - self.last_run >= self.interval {
            self.last_run = now;
            true
        } else {
            false
        }
    }
}

/// The whole engine: every component wired together plus the per-token
/// state it exclusively owns.
pub struct App {
    config: Config,
    state: Arc<AppState>,
    executor: Arc<dyn OrderExecutor>,
    notifiers: NotifierRegistry,
    session_store: Arc<dyn SessionStore>,
    markets: RwLock<HashMap<TokenId, MarketState>>,
    pending_markouts: AsyncMutex<Vec<PendingMarkout>>,
    markout_horizons: Vec<i64>,
    status_writer: Option<StatusWriter>,
    /// `expected_start` of the most recent unresolved ws_sequence gap, if
    /// any, waiting for the next order-reconciliation pass to clear it.
    pending_ws_gap: RwLock<Option<u64>>,
}

impl App {
    /// # Errors
    /// Returns an error if the database pool, migrations, or the venue
    /// client fail to initialize.
    pub fn new(config: Config) -> Result<Self> {
        let now = Utc::now();

        let pool = ledger::create_pool(&config.database_url)?;
        ledger::run_migrations(&pool)?;
        let ledger = Arc::new(EventLedger::new(pool.clone())?);

        let risk = Arc::new(RiskManager::new(config.risk.clone().into(), now));
        let inventory = Arc::new(InventoryManager::new());
        let executor = builder::build_executor(&config)?;
        let orders = Arc::new(OrderManager::new(executor.clone(), risk.clone(), inventory.clone()));
        let quote_engine = Arc::new(QuoteEngine::new(config.quote.clone().into()));
        let transactor = builder::build_transactor(&config);
        let wind_down = Arc::new(WindDownEngine::new(config.wind_down.clone().into()));
        let redemption = Arc::new(RedemptionScheduler::new(config.wind_down.clone().into(), transactor));

        let state = Arc::new(AppState::new(inventory, risk, ledger, orders, quote_engine, wind_down, redemption, config.dry_run));
        let notifiers = builder::build_notifier_registry(&config);
        let session_store = builder::build_session_store(&config, &pool)?;

        let mut markets = HashMap::new();
        for market in &config.markets {
            markets.insert(
                market.token_id.clone(),
                MarketState::new(
                    market.token_id.clone(),
                    market.paired_token.clone(),
                    market.condition_id.clone(),
                    market.tick_size,
                    now,
                    market.market_end_time,
                ),
            );
        }

        let markout_horizons = config.markout.horizons_secs.clone();
        let status_writer = config.status_file.clone().map(|path| {
            StatusWriter::new(path, StatusConfig { markets: config.markets.len(), dry_run: config.dry_run })
        });

        Ok(Self {
            config,
            state,
            executor,
            notifiers,
            session_store,
            markets: RwLock::new(markets),
            pending_markouts: AsyncMutex::new(Vec::new()),
            markout_horizons,
            status_writer,
            pending_ws_gap: RwLock::new(None),
        })
    }

    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Run to completion (until a shutdown signal arrives).
    ///
    /// # Errors
    /// Returns an error if the market-data or user-channel streams fail to
    /// connect at startup.
    pub async fn run(self) -> Result<()> {
        let (_tx, rx) = watch::channel(false);
        self.run_with_shutdown(rx).await
    }

    /// # Errors
    /// Returns an error if the market-data or user-channel streams fail to
    /// connect at startup.
    pub async fn run_with_shutdown(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let mut market_data = PolymarketDataStream::new(self.config.polymarket.ws_market_url.clone());
        let mut user_channel = PolymarketUserStream::new(self.config.polymarket.clone());

        market_data.connect().await?;
        let token_ids: Vec<TokenId> = self.markets.read().keys().cloned().collect();
        market_data.subscribe(&token_ids).await?;
        user_channel.connect().await?;

        info!(markets = token_ids.len(), "orchestrator started");

        self.sync_positions().await;
        self.sync_orders().await;

        let now = Utc::now();
        let mut position_sync = Cadence::new(self.config.orchestrator.position_sync_interval_secs, now);
        let mut reconcile = Cadence::new(self.config.orchestrator.reconcile_interval_secs, now);
        let mut daily_summary = Cadence::new(self.config.orchestrator.daily_summary_interval_secs, now);

        let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(self.config.orchestrator.tick_interval_ms));

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping");
                        break;
                    }
                }
                _ = tick_interval.tick() => {
                    let now = Utc::now();
                    self.tick(now).await;
                    self.state.risk.maybe_auto_recover(now);
                    if position_sync.due(now) {
                        self.sync_positions().await;
                    }
                    if reconcile.due(now) || self.has_unresolved_ws_gap() {
                        self.sync_orders().await;
                    }
                    if daily_summary.due(now) {
                        self.emit_daily_summary(now);
                    }
                    self.update_status_file();
                }
                event = market_data.next_event() => {
                    match event {
                        Some(event) => self.handle_market_event(event),
                        None => {
                            warn!("market data stream ended");
                            break;
                        }
                    }
                }
                event = user_channel.next_event() => {
                    match event {
                        Some(event) => self.handle_user_event(event).await,
                        None => {
                            warn!("user channel stream ended");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(err) = self.executor.cancel_all().await {
            error!(error = %err, "failed to cancel open orders during shutdown");
        }

        Ok(())
    }

    /// True if the last WS sequence gap hasn't yet been cleared by an
    /// order-reconciliation pass.
    fn has_unresolved_ws_gap(&self) -> bool {
        self.pending_ws_gap.read().is_some()
    }

    /// 5s cadence: pull the venue's authoritative positions and overwrite
    /// the local mirror (and its pending-buy reservations) only where the
    /// venue's reported size has actually drifted from ours — a few cents
    /// of rounding noise between polls shouldn't churn reservations that
    /// the order-reconciliation cadence is already tracking precisely.
    async fn sync_positions(&self) {
        let size_change_threshold = Volume::new(1, 2);

        let token_ids: Vec<TokenId> = self.markets.read().keys().cloned().collect();
        match self.executor.fetch_positions(&token_ids).await {
            Ok(positions) => {
                for position in &positions {
                    let local = self.state.inventory.position(&position.token_id);
                    let drift = (local.size() - position.size).abs();
                    if drift >= size_change_threshold {
                        self.state.inventory.set_position(&position.token_id, position.size, position.avg_price);
                    }

                    if let Err(err) = self
                        .session_store
                        .save_position(crate::core::service::store::PositionSnapshot {
                            token_id: position.token_id.clone(),
                            size: position.size,
                            avg_entry_price: position.avg_price,
                            realized_pnl: self.state.inventory.position(&position.token_id).realized_pnl(),
                            recorded_at: Utc::now(),
                        })
                        .await
                    {
                        warn!(error = %err, "failed to persist position snapshot");
                    }
                }
            }
            Err(err) => warn!(error = %err, "failed to fetch positions for reconciliation"),
        }
    }

    /// 60s cadence, or immediately when a ws_sequence gap is unresolved:
    /// pull the venue's authoritative open orders, replace the local order
    /// mirror, and rebuild pending-buy reservations from it. A successful
    /// pass also clears any outstanding sequence-gap halt.
    async fn sync_orders(&self) {
        match self.executor.fetch_open_orders().await {
            Ok(api_orders) => {
                self.state.orders.reconcile_with_api_orders(&api_orders);
                if let Some(expected_start) = self.pending_ws_gap.write().take() {
                    let now = Utc::now();
                    if let Err(err) = self.state.ledger.resolve_gap(expected_start, now) {
                        warn!(error = %err, "failed to mark sequence gap resolved");
                    }
                    self.state.risk.record_ws_gap_resolved();
                }
            }
            Err(err) => warn!(error = %err, "failed to fetch open orders for reconciliation"),
        }
    }

    /// Refresh the optional external-monitoring status file, if configured.
    fn update_status_file(&self) {
        let Some(writer) = &self.status_writer else { return };

        let markets = self.markets.read();
        let markets_quoting = markets.values().filter(|m| m.is_quoting()).count();
        drop(markets);

        writer.update_runtime(
            markets_quoting,
            self.state.inventory.total_exposure(),
            self.config.risk.max_total_exposure,
            self.state.risk.breaker_state().as_str(),
        );

        let fills = self
            .state
            .ledger
            .summary()
            .map(|s| *s.by_type.get(crate::core::domain::EventType::Fill.as_str()).unwrap_or(&0))
            .unwrap_or_default();
        let realized_pnl: Price =
            self.markets.read().keys().map(|t| self.state.inventory.position(t).realized_pnl()).sum();
        writer.update_today(fills, realized_pnl);

        if let Err(err) = writer.write() {
            warn!(error = %err, "failed to write status file");
        }
    }

    fn emit_daily_summary(&self, now: DateTime<Utc>) {
        let fills = self
            .state
            .ledger
            .summary()
            .map(|s| *s.by_type.get(crate::core::domain::EventType::Fill.as_str()).unwrap_or(&0))
            .unwrap_or_default();
        let realized_pnl: Price =
            self.markets.read().keys().map(|t| self.state.inventory.position(t).realized_pnl()).sum();

        self.notifiers.notify_all(crate::core::service::notifier::Event::DailySummary(
            crate::core::service::notifier::SummaryEvent {
                date: now.date_naive(),
                fills,
                realized_pnl,
                total_exposure: self.state.inventory.total_exposure(),
                breaker_state: self.state.risk.breaker_state(),
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_no_markets() -> Config {
        toml::from_str(
            r#"
            markets = []
            database_url = "sqlite://:memory:"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn health_check_fails_when_no_markets_configured() {
        let report = health_check(&config_with_no_markets());
        assert!(!report.is_healthy());
    }

    #[test]
    fn health_check_passes_with_markets_and_wallet() {
        let mut config = config_with_no_markets();
        config.wallet.private_key = Some("0xabc".into());
        config.markets.push(crate::app::config::MarketConfig {
            token_id: TokenId::new("up"),
            paired_token: TokenId::new("down"),
            condition_id: crate::core::domain::MarketId::new("cond"),
            market_end_time: Utc::now() + chrono::Duration::days(1),
            tick_size: rust_decimal_macros::dec!(0.01),
        });
        assert!(health_check(&config).is_healthy());
    }

    #[test]
    fn health_report_checks_accessor_exposes_every_check() {
        let report = health_check(&config_with_no_markets());
        assert!(report.checks().iter().any(|c| c.name == "markets_configured"));
    }

    #[test]
    fn cadence_fires_once_per_interval() {
        let now = Utc::now();
        let mut cadence = Cadence::new(10, now);
        assert!(!cadence.due(now + chrono::Duration::seconds(5)));
        assert!(cadence.due(now + chrono::Duration::seconds(11)));
        assert!(!cadence.due(now + chrono::Duration::seconds(12)));
    }
}
