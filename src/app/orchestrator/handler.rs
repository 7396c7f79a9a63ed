//! Per-tick and per-event handlers: folds market-data/user-channel events
//! into [`MarketState`]/the shared services, and drives the quote-or-wind-down
//! decision loop.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::core::domain::{EventSource, EventType, Side, TokenId};
use crate::core::exchange::{MarketEvent, OrderRequest, UserChannelEvent};
use crate::core::quote::QuoteDecision;
use crate::core::service::notifier::Event;
use crate::core::service::store::MarkoutSample;
use crate::core::winddown::{RedemptionState, WindDownAction};

use super::{App, PendingMarkout};

impl App {
    pub fn handle_market_event(&self, event: MarketEvent) {
        match event {
            MarketEvent::BookSnapshot { token_id, bids, asks } => {
                {
                    let mut markets = self.markets.write();
                    let Some(market) = markets.get_mut(&token_id) else { return };
                    for (price, size) in bids {
                        market.orderbook_mut().set_level(Side::Bid, price, size);
                    }
                    for (price, size) in asks {
                        market.orderbook_mut().set_level(Side::Ask, price, size);
                    }
                }
                self.state.risk.record_book_update(&token_id, Utc::now());
            }
            MarketEvent::BookDelta { token_id, side, price, size } => {
                {
                    let mut markets = self.markets.write();
                    let Some(market) = markets.get_mut(&token_id) else { return };
                    market.orderbook_mut().set_level(side, price, size);
                }
                self.state.risk.record_book_update(&token_id, Utc::now());
            }
            MarketEvent::TickSizeChanged { token_id, new_tick_size } => {
                let mut markets = self.markets.write();
                if let Some(market) = markets.get_mut(&token_id) {
                    market.orderbook_mut().set_tick_size(new_tick_size);
                }
            }
            MarketEvent::Disconnected { reason } => {
                warn!(%reason, "market data stream disconnected");
            }
        }
    }

    pub async fn handle_user_event(&self, event: UserChannelEvent) {
        match event {
            UserChannelEvent::MakerFill(trade) | UserChannelEvent::TakerFill(trade) => {
                self.state.inventory.update_from_fill(&trade.token_id, trade.side, trade.size, trade.price, trade.fee);

                if let Err(err) = self.state.ledger.append(
                    EventType::Fill,
                    EventSource::Websocket,
                    serde_json::json!({
                        "token_id": trade.token_id.as_str(),
                        "order_id": trade.order_id.as_str(),
                        "side": format!("{:?}", trade.side),
                        "price": trade.price.to_string(),
                        "size": trade.size.to_string(),
                        "fee": trade.fee.to_string(),
                    }),
                ) {
                    warn!(error = %err, "failed to append fill to event ledger");
                }

                self.notifiers.notify_all(Event::Fill {
                    token_id: trade.token_id.clone(),
                    side: trade.side,
                    price: trade.price,
                    size: trade.size,
                    fee: trade.fee,
                });

                self.queue_markouts(&trade.token_id, trade.price, trade.side, trade.timestamp).await;

                let position = self.state.inventory.position(&trade.token_id);
                if let Err(err) = self
                    .session_store
                    .save_position(crate::core::service::store::PositionSnapshot {
                        token_id: trade.token_id.clone(),
                        size: position.size(),
                        avg_entry_price: position.avg_entry_price(),
                        realized_pnl: position.realized_pnl(),
                        recorded_at: trade.timestamp,
                    })
                    .await
                {
                    warn!(error = %err, "failed to persist position snapshot after fill");
                }

                self.state.redemption.update_position_size(&trade.token_id, position.size());
            }
            UserChannelEvent::OrderUpdate(update) => {
                self.state.orders.update_order_state(&update.order_id, update.status, update.remaining_size, update.ws_sequence);
            }
            UserChannelEvent::SequenceGap(gap) => {
                let now = Utc::now();
                warn!(expected_start = gap.expected_start, expected_end = gap.expected_end, "ws sequence gap detected");
                if let Err(err) = self.state.ledger.record_gap(&crate::core::domain::GapInfo {
                    expected_start: gap.expected_start,
                    expected_end: gap.expected_end,
                    detected_at: now,
                    resolved_at: None,
                }) {
                    warn!(error = %err, "failed to record sequence gap");
                }
                *self.pending_ws_gap.write() = Some(gap.expected_start);
                self.state.risk.record_unresolved_ws_gap(now);
            }
            UserChannelEvent::Heartbeat | UserChannelEvent::SubscriptionAck => {}
        }
    }

    async fn queue_markouts(
        &self,
        token_id: &TokenId,
        fill_price: crate::core::domain::Price,
        fill_side: crate::core::domain::OrderSide,
        fill_time: DateTime<Utc>,
    ) {
        let mut pending = self.pending_markouts.lock().await;
        for &horizon_secs in &self.markout_horizons {
            pending.push(PendingMarkout {
                token_id: token_id.clone(),
                fill_price,
                fill_side,
                due_at: fill_time + chrono::Duration::seconds(horizon_secs),
                horizon_secs,
            });
        }
    }

    /// One pass over every tracked market: stale-feed halts, the
    /// quote-or-wind-down decision, and markout/redemption housekeeping.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let token_ids: Vec<TokenId> = self.markets.read().keys().cloned().collect();

        for token_id in &token_ids {
            if self.state.risk.is_stale(token_id, now) {
                self.state.risk.halt_market(token_id, "market data feed is stale", now);
                if let Err(err) = self.state.orders.cancel_all_for_token(token_id).await {
                    warn!(%token_id, error = %err, "failed to cancel orders for stale market");
                }
                continue;
            }

            self.tick_market(token_id, now).await;
        }

        self.flush_due_markouts(now).await;
        self.poll_redemptions(now).await;
    }

    async fn poll_redemptions(&self, now: DateTime<Utc>) {
        for token_id in self.state.redemption.markets_ready_for_check(now) {
            if let Err(err) = self.state.redemption.attempt_redemption(&token_id, now).await {
                warn!(%token_id, error = %err, "redemption attempt could not run");
                continue;
            }
            match self.state.redemption.state(&token_id) {
                Some(RedemptionState::Completed) => {
                    let tx_hash = self.state.redemption.tx_hash(&token_id).unwrap_or_default();
                    self.notifiers.notify_all(Event::RedemptionCompleted { token_id: token_id.clone(), tx_hash });
                    if let Some(writer) = &self.status_writer {
                        writer.record_redemption();
                    }
                }
                Some(RedemptionState::Failed) => {
                    let reason = self.state.redemption.error_message(&token_id).unwrap_or_default();
                    self.notifiers.notify_all(Event::RedemptionFailed { token_id: token_id.clone(), reason });
                }
                _ => {}
            }
        }
    }

    async fn tick_market(&self, token_id: &TokenId, now: DateTime<Utc>) {
        let (seconds_to_resolution, paired_token) = {
            let markets = self.markets.read();
            let Some(market) = markets.get(token_id) else { return };
            (market.seconds_to_resolution(now), market.paired_token().clone())
        };

        let position = self.state.inventory.position(token_id);
        let paired_position = self.state.inventory.position(&paired_token);
        let best_bid = self.markets.read().get(token_id).and_then(|m| m.orderbook().best_bid()).map(|(p, _)| p);

        let action = self.state.wind_down.decide(
            token_id,
            seconds_to_resolution,
            position.size(),
            paired_position.size(),
            position.avg_entry_price(),
            best_bid,
        );

        match action {
            WindDownAction::ContinueQuoting => self.tick_quote(token_id, &position).await,
            WindDownAction::EnterWindDown { first_entry, maker_sell } => {
                if first_entry {
                    if let Err(err) = self.state.orders.cancel_all_for_token(token_id).await {
                        warn!(%token_id, error = %err, "failed to cancel orders entering wind-down");
                    }
                    self.notifiers.notify_all(Event::WindDownEntered { token_id: token_id.clone() });
                }
                if let Some((price, size)) = maker_sell {
                    self.place_order(token_id, crate::core::domain::OrderSide::Sell, price, size, true).await;
                }
            }
            WindDownAction::TakerExit { dump } => {
                if let Some((price, size)) = dump {
                    self.place_order(token_id, crate::core::domain::OrderSide::Sell, price, size, false).await;
                }
            }
            WindDownAction::MarketEnded => {
                let condition_id = {
                    let markets = self.markets.read();
                    markets.get(token_id).map(|m| m.condition_id().clone())
                };
                if let Some(condition_id) = condition_id {
                    self.state.redemption.register_market(token_id.clone(), condition_id, now, position.size());
                }
            }
        }
    }

    async fn tick_quote(&self, token_id: &TokenId, position: &crate::core::domain::Position) {
        let risk_check = self.state.risk.check_order(token_id);
        if matches!(risk_check, crate::core::risk::RiskCheckResult::Blocked(_)) {
            if let Err(err) = self.state.orders.cancel_all_for_token(token_id).await {
                warn!(%token_id, error = %err, "failed to cancel orders while circuit breaker is blocking");
            }
            return;
        }

        let decision = {
            let mut markets = self.markets.write();
            let Some(market) = markets.get_mut(token_id) else { return };
            market.position_mut().set_authoritative(position.size(), position.avg_entry_price());
            self.state.quote_engine.decide(market, self.state.risk.position_limit_multiplier())
        };

        match decision {
            QuoteDecision::PlaceQuote(quote) => {
                if quote.has_bid() {
                    let available =
                        self.state.inventory.available_for_new_buy(token_id, self.state.quote_engine.max_position());
                    let bid_size = quote.bid_size().min(available);
                    if bid_size > crate::core::domain::Volume::ZERO {
                        self.place_order(token_id, crate::core::domain::OrderSide::Buy, quote.bid_price(), bid_size, true)
                            .await;
                    }
                }
                if quote.has_ask() {
                    self.place_order(token_id, crate::core::domain::OrderSide::Sell, quote.ask_price(), quote.ask_size(), true)
                        .await;
                }
                let mut markets = self.markets.write();
                if let Some(market) = markets.get_mut(token_id) {
                    market.set_last_quote(Some(quote));
                }
            }
            QuoteDecision::CancelAll => {
                if let Err(err) = self.state.orders.cancel_all_for_token(token_id).await {
                    warn!(%token_id, error = %err, "failed to cancel orders");
                }
                let mut markets = self.markets.write();
                if let Some(market) = markets.get_mut(token_id) {
                    market.set_last_quote(None);
                }
            }
            QuoteDecision::KeepCurrent => {}
        }
    }

    async fn place_order(
        &self,
        token_id: &TokenId,
        side: crate::core::domain::OrderSide,
        price: crate::core::domain::Price,
        size: crate::core::domain::Volume,
        post_only: bool,
    ) {
        let request = OrderRequest { token_id: token_id.clone(), side, price, size, post_only, neg_risk: false };
        if let Err(err) = self.state.orders.place_order(request).await {
            warn!(%token_id, error = %err, "order placement failed");
        }
    }

    async fn flush_due_markouts(&self, now: DateTime<Utc>) {
        let due: Vec<PendingMarkout> = {
            let mut pending = self.pending_markouts.lock().await;
            let (due, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut *pending).into_iter().partition(|m| m.due_at <= now);
            *pending = remaining;
            due
        };

        for markout in due {
            let mid = self.markets.read().get(&markout.token_id).and_then(|m| m.orderbook().mid());
            let Some(mid) = mid else { continue };

            let signed_pnl = match markout.fill_side {
                crate::core::domain::OrderSide::Buy => mid - markout.fill_price,
                crate::core::domain::OrderSide::Sell => markout.fill_price - mid,
            };

            let sample = MarkoutSample {
                token_id: markout.token_id.clone(),
                fill_price: markout.fill_price,
                horizon_secs: markout.horizon_secs,
                mid_at_horizon: mid,
                signed_pnl,
                recorded_at: now,
            };
            if let Err(err) = self.session_store.save_markout(sample).await {
                warn!(token_id = %markout.token_id, error = %err, "failed to persist markout sample");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::Config;
    use crate::core::domain::OrderSide;
    use rust_decimal_macros::dec;

    fn test_config() -> Config {
        let mut config: Config = toml::from_str(
            r#"
            database_url = "sqlite://:memory:"
            dry_run = true

            [[markets]]
            token_id = "up"
            paired_token = "down"
            condition_id = "cond-1"
            market_end_time = "2999-01-01T00:00:00Z"
            "#,
        )
        .unwrap();
        config.wallet.private_key = Some("0xabc".into());
        config
    }

    #[tokio::test]
    async fn book_snapshot_updates_market_and_marks_book_fresh() {
        let app = App::new(test_config()).unwrap();
        let token = TokenId::new("up");
        app.handle_market_event(MarketEvent::BookSnapshot {
            token_id: token.clone(),
            bids: vec![(dec!(0.45), dec!(100))],
            asks: vec![(dec!(0.55), dec!(100))],
        });
        assert!(!app.state.risk.is_stale(&token, Utc::now()));
        assert_eq!(app.markets.read().get(&token).unwrap().orderbook().best_bid(), Some((dec!(0.45), dec!(100))));
    }

    #[tokio::test]
    async fn maker_fill_updates_position_and_queues_markouts() {
        let app = App::new(test_config()).unwrap();
        let token = TokenId::new("up");
        let trade = crate::core::exchange::TradeUpdate {
            trade_id: "t1".into(),
            order_id: crate::core::domain::OrderId::new("o1"),
            token_id: token.clone(),
            side: OrderSide::Buy,
            price: dec!(0.45),
            size: dec!(10),
            fee: dec!(0),
            status: crate::core::exchange::TradeStatus::Confirmed,
            timestamp: Utc::now(),
            ws_sequence: 1,
        };
        app.handle_user_event(UserChannelEvent::MakerFill(trade)).await;

        assert_eq!(app.state.inventory.position(&token).size(), dec!(10));
        assert_eq!(app.pending_markouts.lock().await.len(), app.markout_horizons.len());
    }

    #[tokio::test]
    async fn flush_due_markouts_persists_sample_once_past_horizon() {
        let app = App::new(test_config()).unwrap();
        let token = TokenId::new("up");
        app.handle_market_event(MarketEvent::BookSnapshot {
            token_id: token.clone(),
            bids: vec![(dec!(0.45), dec!(100))],
            asks: vec![(dec!(0.55), dec!(100))],
        });

        let due_at = Utc::now() - chrono::Duration::seconds(1);
        app.pending_markouts.lock().await.push(PendingMarkout {
            token_id: token.clone(),
            fill_price: dec!(0.45),
            fill_side: OrderSide::Buy,
            due_at,
            horizon_secs: 1,
        });

        app.flush_due_markouts(Utc::now()).await;
        assert!(app.pending_markouts.lock().await.is_empty());

        let samples = app.session_store.markouts_for(&token).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].mid_at_horizon, dec!(0.50));
    }

    #[tokio::test]
    async fn stale_market_gets_halted_and_orders_cancelled() {
        let app = App::new(test_config()).unwrap();
        app.tick(Utc::now() + chrono::Duration::minutes(20)).await;
        let token = TokenId::new("up");
        assert!(app.state.risk.is_stale(&token, Utc::now() + chrono::Duration::minutes(20)));
        assert_eq!(app.state.orders.open_order_count(), 0);
    }
}
