//! Builds the services `App::new` wires together from [`Config`] — the
//! executor, redemption transactor, notifier registry, and session store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing::{info, warn};

use crate::app::config::Config;
use crate::core::domain::{MarketId, OrderId, TokenId};
use crate::core::exchange::polymarket::PolymarketClient;
use crate::core::exchange::{
    ApiOrder, ApiPosition, OrderExecutor, OrderRequest, PlacedOrder, RedemptionError, RedemptionTransactor,
};
use crate::core::ledger::DbPool;
use crate::core::service::notifier::{LogNotifier, NotifierRegistry, ThrottledNotifier};
use crate::core::service::store::{MemoryStore, SessionStore, SqliteStore};
use crate::error::{ExchangeError, Result};

/// Places no real orders; logs what it would have done and returns a
/// synthetic order id.
struct DryRunExecutor;

#[async_trait]
impl OrderExecutor for DryRunExecutor {
    async fn place_order(&self, request: OrderRequest) -> std::result::Result<PlacedOrder, ExchangeError> {
        let order_id = OrderId::new(format!("dry-run-{}", uuid::Uuid::new_v4()));
        info!(token_id = %request.token_id, side = ?request.side, price = %request.price, size = %request.size, "dry run: would place order");
        Ok(PlacedOrder { order_id })
    }

    async fn place_orders_batch(
        &self,
        requests: Vec<OrderRequest>,
    ) -> Vec<std::result::Result<PlacedOrder, ExchangeError>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.place_order(request).await);
        }
        results
    }

    async fn cancel_all_for_token(&self, token_id: &TokenId) -> std::result::Result<(), ExchangeError> {
        info!(%token_id, "dry run: would cancel all orders for token");
        Ok(())
    }

    async fn cancel_all(&self) -> std::result::Result<(), ExchangeError> {
        info!("dry run: would cancel all open orders");
        Ok(())
    }

    async fn fetch_open_orders(&self) -> std::result::Result<Vec<ApiOrder>, ExchangeError> {
        Ok(Vec::new())
    }

    async fn fetch_positions(&self, _tokens: &[TokenId]) -> std::result::Result<Vec<ApiPosition>, ExchangeError> {
        Ok(Vec::new())
    }
}

/// # Errors
/// Returns an error if the real executor fails to build (dry-run never does).
pub fn build_executor(config: &Config) -> Result<Arc<dyn OrderExecutor>> {
    if config.dry_run {
        info!("dry run enabled: orders will be logged, not sent to the venue");
        return Ok(Arc::new(DryRunExecutor));
    }
    Ok(Arc::new(PolymarketClient::new(config.polymarket.clone())?))
}

/// On-chain redemption transactor internals are out of scope; this stub documents the contract a real
/// implementation must satisfy. It always reports "not yet resolved" so the
/// scheduler's retry/backoff machinery runs as designed without ever
/// claiming a redemption actually completed.
pub struct UnimplementedTransactor;

#[async_trait]
impl RedemptionTransactor for UnimplementedTransactor {
    async fn redeem(&self, condition_id: &MarketId) -> std::result::Result<String, RedemptionError> {
        warn!(%condition_id, "no RedemptionTransactor configured; on-chain redemption is out of scope for this engine");
        Err(RedemptionError::NotYetResolved)
    }
}

#[must_use]
pub fn build_transactor(_config: &Config) -> Arc<dyn RedemptionTransactor> {
    Arc::new(UnimplementedTransactor)
}

#[must_use]
pub fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));

    #[cfg(feature = "telegram")]
    {
        if config.telegram.enabled {
            if let Some(bot_token) = config.telegram.bot_token.clone() {
                let chat_id = config.telegram.chat_id.clone().unwrap_or_default();
                let telegram_config = crate::core::service::notifier::TelegramConfig {
                    bot_token,
                    chat_id,
                    notify_fills: config.telegram.notify_fills,
                    notify_halts: config.telegram.notify_halts,
                    notify_daily_summary: config.telegram.notify_daily_summary,
                };
                let notifier = crate::core::service::notifier::TelegramNotifier::new(telegram_config);
                registry.register(Box::new(ThrottledNotifier::new(notifier, Duration::seconds(30))));
                info!("telegram alerting enabled");
            } else {
                warn!("telegram.enabled is true but TELEGRAM_BOT_TOKEN is unset; skipping");
            }
        }
    }
    #[cfg(not(feature = "telegram"))]
    {
        if config.telegram.enabled {
            warn!("telegram.enabled is true but the telegram feature is not compiled in");
        }
    }

    registry
}

/// # Errors
/// Returns an error if the sqlite-backed store's schema can't be created.
pub fn build_session_store(config: &Config, pool: &DbPool) -> Result<Arc<dyn SessionStore>> {
    if config.dry_run {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(SqliteStore::new(pool.clone())?))
}
