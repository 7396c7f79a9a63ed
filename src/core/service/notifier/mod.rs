//! Alerts: fill / circuit-breaker / daily-summary notifications fanned out
//! to zero or more registered sinks.

#[cfg(feature = "telegram")]
mod telegram;

#[cfg(feature = "telegram")]
pub use telegram::{TelegramConfig, TelegramNotifier};

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Duration;

use crate::core::domain::{CircuitBreakerState, OrderSide, Price, TokenId, Volume};

/// Events the orchestrator fans out to every registered [`Notifier`].
#[derive(Debug, Clone)]
pub enum Event {
    Fill { token_id: TokenId, side: OrderSide, price: Price, size: Volume, fee: Price },
    CircuitBreakerTransition { from: CircuitBreakerState, to: CircuitBreakerState, reason: String },
    WindDownEntered { token_id: TokenId },
    RedemptionCompleted { token_id: TokenId, tx_hash: String },
    RedemptionFailed { token_id: TokenId, reason: String },
    DailySummary(SummaryEvent),
}

#[derive(Debug, Clone)]
pub struct SummaryEvent {
    pub date: chrono::NaiveDate,
    pub fills: u64,
    pub realized_pnl: Price,
    pub total_exposure: Price,
    pub breaker_state: CircuitBreakerState,
}

/// Implement to receive fanned-out [`Event`]s. Fire-and-forget: `notify`
/// is synchronous and must not block the tick loop.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Fans one event out to every registered notifier.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: Vec::new() }
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// No-op sink, used when no alerting channel is configured.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// Logs every event via `tracing`. Always registered.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{info, warn};
        match event {
            Event::Fill { token_id, side, price, size, fee } => {
                info!(%token_id, ?side, %price, %size, %fee, "fill");
            }
            Event::CircuitBreakerTransition { from, to, reason } => {
                warn!(from = from.as_str(), to = to.as_str(), %reason, "circuit breaker transition");
            }
            Event::WindDownEntered { token_id } => {
                info!(%token_id, "entered wind-down");
            }
            Event::RedemptionCompleted { token_id, tx_hash } => {
                info!(%token_id, %tx_hash, "redemption completed");
            }
            Event::RedemptionFailed { token_id, reason } => {
                warn!(%token_id, %reason, "redemption failed");
            }
            Event::DailySummary(s) => {
                info!(
                    date = %s.date,
                    fills = s.fills,
                    realized_pnl = %s.realized_pnl,
                    exposure = %s.total_exposure,
                    breaker = s.breaker_state.as_str(),
                    "daily summary"
                );
            }
        }
    }
}

/// Wraps another notifier and drops `Fill` events that arrive closer
/// together than `min_interval`; every other event passes through
/// unconditionally. Prevents a burst of small fills from flooding an
/// external channel (e.g. Telegram) while every fill still lands in the
/// log via a separately-registered [`LogNotifier`].
pub struct ThrottledNotifier<N> {
    inner: N,
    min_interval: Duration,
    last_fill_millis: AtomicI64,
}

impl<N: Notifier> ThrottledNotifier<N> {
    #[must_use]
    pub fn new(inner: N, min_interval: Duration) -> Self {
        Self { inner, min_interval, last_fill_millis: AtomicI64::new(i64::MIN) }
    }
}

impl<N: Notifier> Notifier for ThrottledNotifier<N> {
    fn notify(&self, event: Event) {
        if matches!(event, Event::Fill { .. }) {
            let now = chrono::Utc::now().timestamp_millis();
            let last = self.last_fill_millis.load(Ordering::Relaxed);
            if now - last < self.min_interval.num_milliseconds() {
                return;
            }
            self.last_fill_millis.store(now, Ordering::Relaxed);
        }
        self.inner.notify(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;
    use rust_decimal_macros::dec;

    struct CountingNotifier {
        count: Arc<AtomicUsize>,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, _event: Event) {
            self.count.fetch_add(1, AtomicOrdering::SeqCst);
        }
    }

    fn fill_event() -> Event {
        Event::Fill { token_id: TokenId::new("tok"), side: OrderSide::Buy, price: dec!(0.5), size: dec!(10), fee: dec!(0.01) }
    }

    #[test]
    fn registry_fans_out_to_every_notifier() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(CountingNotifier { count: count.clone() }));
        registry.register(Box::new(CountingNotifier { count: count.clone() }));
        registry.notify_all(Event::CircuitBreakerTransition {
            from: CircuitBreakerState::Normal,
            to: CircuitBreakerState::Warning,
            reason: "test".into(),
        });
        assert_eq!(count.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn null_notifier_does_not_panic() {
        NullNotifier.notify(fill_event());
    }

    #[test]
    fn throttle_drops_rapid_fills_but_passes_first() {
        let count = Arc::new(AtomicUsize::new(0));
        let throttled = ThrottledNotifier::new(CountingNotifier { count: count.clone() }, Duration::seconds(60));
        throttled.notify(fill_event());
        throttled.notify(fill_event());
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn throttle_never_drops_non_fill_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let throttled = ThrottledNotifier::new(CountingNotifier { count: count.clone() }, Duration::seconds(60));
        for _ in 0..3 {
            throttled.notify(Event::WindDownEntered { token_id: TokenId::new("tok") });
        }
        assert_eq!(count.load(AtomicOrdering::SeqCst), 3);
    }
}
