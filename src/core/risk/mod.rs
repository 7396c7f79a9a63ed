//! Risk management and circuit breaker.
//!
//! Tracks per-market and global risk state and derives the circuit breaker's
//! NORMAL/WARNING/HALTED/RECOVERING transitions from it. Feed staleness is
//! windowed per market: a single late tick doesn't trip anything, but no
//! fresh book update within the staleness window does.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::core::domain::{CircuitBreaker, CircuitBreakerState, Price, TokenId, Volume};
use crate::error::RiskError;

/// Global limits applied across every quoted market.
#[derive(Debug, Clone)]
pub struct RiskLimits {
    pub max_position_per_market: Volume,
    pub max_total_exposure: Volume,
    pub max_drawdown_per_market: Price,
    pub global_drawdown_halt: Price,
    pub consecutive_error_warning_threshold: u32,
    pub consecutive_error_halt_threshold: u32,
    /// How long a market's book may go without an update before it's stale.
    pub stale_feed_timeout: Duration,
    /// How long RECOVERING must hold before automatically resuming NORMAL.
    pub circuit_breaker_recovery: Duration,
    /// Unresolved WS sequence gaps tolerated before halting.
    pub ws_gap_reconcile_attempts: u32,
    /// Whether an unresolved WS gap run should halt at all.
    pub halt_on_ws_gaps: bool,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_per_market: Volume::from(1_000),
            max_total_exposure: Volume::from(10_000),
            max_drawdown_per_market: Price::new(20, 0),
            global_drawdown_halt: Price::new(100, 0),
            consecutive_error_warning_threshold: 3,
            consecutive_error_halt_threshold: 6,
            stale_feed_timeout: Duration::seconds(900),
            circuit_breaker_recovery: Duration::seconds(300),
            ws_gap_reconcile_attempts: 3,
            halt_on_ws_gaps: true,
        }
    }
}

/// Per-market risk bookkeeping: last book update time and running drawdown.
struct MarketRiskState {
    last_book_update: DateTime<Utc>,
    drawdown: Price,
    halted: bool,
    halt_reason: Option<String>,
}

impl MarketRiskState {
    fn new(now: DateTime<Utc>) -> Self {
        Self { last_book_update: now, drawdown: Price::ZERO, halted: false, halt_reason: None }
    }

    fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.last_book_update > window
    }
}

/// Global + per-market risk tracker and the circuit breaker it drives.
pub struct RiskManager {
    limits: RiskLimits,
    breaker: RwLock<CircuitBreaker>,
    markets: RwLock<HashMap<TokenId, MarketRiskState>>,
    consecutive_errors: RwLock<u32>,
    unresolved_ws_gap_attempts: RwLock<u32>,
}

/// Outcome of a pre-order risk check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskCheckResult {
    Allowed,
    Blocked(RiskError),
}

impl RiskManager {
    #[must_use]
    pub fn new(limits: RiskLimits, now: DateTime<Utc>) -> Self {
        Self {
            limits,
            breaker: RwLock::new(CircuitBreaker::new(now)),
            markets: RwLock::new(HashMap::new()),
            consecutive_errors: RwLock::new(0),
            unresolved_ws_gap_attempts: RwLock::new(0),
        }
    }

    #[must_use]
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    #[must_use]
    pub fn breaker_state(&self) -> CircuitBreakerState {
        self.breaker.read().state()
    }

    #[must_use]
    pub fn position_limit_multiplier(&self) -> Volume {
        self.breaker_state().position_limit_multiplier()
    }

    pub fn record_book_update(&self, token_id: &TokenId, now: DateTime<Utc>) {
        self.markets
            .write()
            .entry(token_id.clone())
            .and_modify(|m| m.last_book_update = now)
            .or_insert_with(|| MarketRiskState::new(now));
    }

    /// True if `token_id`'s book hasn't updated within the configured
    /// staleness window.
    #[must_use]
    pub fn is_stale(&self, token_id: &TokenId, now: DateTime<Utc>) -> bool {
        self.markets.read().get(token_id).map_or(true, |m| m.is_stale(now, self.limits.stale_feed_timeout))
    }

    pub fn halt_market(&self, token_id: &TokenId, reason: impl Into<String>, now: DateTime<Utc>) {
        let reason = reason.into();
        warn!(token_id = %token_id, reason = %reason, "market halted");
        self.markets
            .write()
            .entry(token_id.clone())
            .and_modify(|m| {
                m.halted = true;
                m.halt_reason = Some(reason.clone());
            })
            .or_insert_with(|| {
                let mut m = MarketRiskState::new(now);
                m.halted = true;
                m.halt_reason = Some(reason);
                m
            });
    }

    pub fn unhalt_market(&self, token_id: &TokenId) {
        if let Some(m) = self.markets.write().get_mut(token_id) {
            m.halted = false;
            m.halt_reason = None;
        }
    }

    /// Update the running drawdown for one market's position.
    pub fn record_drawdown(&self, token_id: &TokenId, drawdown: Price, now: DateTime<Utc>) {
        self.markets
            .write()
            .entry(token_id.clone())
            .and_modify(|m| m.drawdown = drawdown)
            .or_insert_with(|| {
                let mut m = MarketRiskState::new(now);
                m.drawdown = drawdown;
                m
            });
    }

    fn total_drawdown(&self) -> Price {
        self.markets.read().values().map(|m| m.drawdown).sum()
    }

    /// Soft venue errors never reach here; hard errors increment the
    /// consecutive-error counter that drives WARNING/HALTED transitions.
    pub fn record_order_error(&self, now: DateTime<Utc>) {
        let mut count = self.consecutive_errors.write();
        *count += 1;
        if *count >= self.limits.consecutive_error_halt_threshold {
            self.transition(CircuitBreakerState::Halted, "too many consecutive order errors", now);
        } else if *count >= self.limits.consecutive_error_warning_threshold {
            self.transition(CircuitBreakerState::Warning, "elevated order error rate", now);
        }
    }

    pub fn record_order_success(&self) {
        *self.consecutive_errors.write() = 0;
    }

    pub fn evaluate_drawdown(&self, now: DateTime<Utc>) {
        let total = self.total_drawdown();
        if total >= self.limits.global_drawdown_halt {
            self.transition(CircuitBreakerState::Halted, "global drawdown limit breached", now);
        }
    }

    pub fn transition(&self, state: CircuitBreakerState, reason: impl Into<String>, now: DateTime<Utc>) {
        let reason = reason.into();
        let mut breaker = self.breaker.write();
        if breaker.state() != state {
            info!(from = breaker.state().as_str(), to = state.as_str(), reason = %reason, "circuit breaker transition");
        }
        breaker.transition(state, Some(reason), now);
    }

    pub fn begin_recovery(&self, now: DateTime<Utc>) {
        self.transition(CircuitBreakerState::Recovering, "resuming after halt", now);
    }

    pub fn resume_normal(&self, now: DateTime<Utc>) {
        *self.consecutive_errors.write() = 0;
        self.transition(CircuitBreakerState::Normal, "risk conditions cleared", now);
    }

    /// Called once per tick: once RECOVERING has held for
    /// `circuit_breaker_recovery`, resume NORMAL automatically.
    pub fn maybe_auto_recover(&self, now: DateTime<Utc>) {
        let transitioned_at = {
            let breaker = self.breaker.read();
            if breaker.state() != CircuitBreakerState::Recovering {
                return;
            }
            breaker.transitioned_at()
        };
        if now - transitioned_at >= self.limits.circuit_breaker_recovery {
            self.resume_normal(now);
        }
    }

    /// Record one attempt at reconciling an unresolved WS sequence gap.
    /// Once `ws_gap_reconcile_attempts` attempts pass without resolution,
    /// halt the breaker (if `halt_on_ws_gaps` is enabled).
    pub fn record_unresolved_ws_gap(&self, now: DateTime<Utc>) {
        if !self.limits.halt_on_ws_gaps {
            return;
        }
        let mut attempts = self.unresolved_ws_gap_attempts.write();
        *attempts += 1;
        if *attempts >= self.limits.ws_gap_reconcile_attempts {
            self.transition(CircuitBreakerState::Halted, "unresolved websocket sequence gap", now);
        }
    }

    /// Reset the unresolved-gap counter once a gap is confirmed resolved.
    pub fn record_ws_gap_resolved(&self) {
        *self.unresolved_ws_gap_attempts.write() = 0;
    }

    /// Gate an order request before it reaches the Order Manager.
    #[must_use]
    pub fn check_order(&self, token_id: &TokenId) -> RiskCheckResult {
        let state = self.breaker_state();
        if !state.allows_new_orders() {
            return RiskCheckResult::Blocked(RiskError::Halted {
                state: state.as_str(),
                reason: self.breaker.read().reason().unwrap_or("circuit breaker active").to_string(),
            });
        }
        if let Some(m) = self.markets.read().get(token_id) {
            if m.halted {
                return RiskCheckResult::Blocked(RiskError::MarketHalted {
                    market_id: token_id.as_str().to_string(),
                    reason: m.halt_reason.clone().unwrap_or_default(),
                });
            }
        }
        RiskCheckResult::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn manager() -> RiskManager {
        RiskManager::new(RiskLimits::default(), Utc::now())
    }

    #[test]
    fn fresh_book_update_is_not_stale() {
        let rm = manager();
        let token = TokenId::new("tok");
        let now = Utc::now();
        rm.record_book_update(&token, now);
        assert!(!rm.is_stale(&token, now + Duration::minutes(1)));
    }

    #[test]
    fn book_goes_stale_after_window() {
        let rm = manager();
        let token = TokenId::new("tok");
        let now = Utc::now();
        rm.record_book_update(&token, now);
        assert!(rm.is_stale(&token, now + Duration::minutes(16)));
    }

    #[test]
    fn unknown_token_is_treated_as_stale() {
        let rm = manager();
        assert!(rm.is_stale(&TokenId::new("unseen"), Utc::now()));
    }

    #[test]
    fn consecutive_errors_escalate_to_warning_then_halted() {
        let rm = manager();
        let now = Utc::now();
        for _ in 0..3 {
            rm.record_order_error(now);
        }
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Warning);
        for _ in 0..3 {
            rm.record_order_error(now);
        }
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Halted);
    }

    #[test]
    fn success_resets_consecutive_error_counter() {
        let rm = manager();
        let now = Utc::now();
        rm.record_order_error(now);
        rm.record_order_error(now);
        rm.record_order_success();
        for _ in 0..2 {
            rm.record_order_error(now);
        }
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Normal);
    }

    #[test]
    fn halted_breaker_blocks_every_market() {
        let rm = manager();
        let now = Utc::now();
        rm.transition(CircuitBreakerState::Halted, "test", now);
        assert!(matches!(rm.check_order(&TokenId::new("tok")), RiskCheckResult::Blocked(_)));
    }

    #[test]
    fn individually_halted_market_blocks_even_when_normal() {
        let rm = manager();
        let now = Utc::now();
        let token = TokenId::new("tok");
        rm.halt_market(&token, "manual halt", now);
        assert!(matches!(rm.check_order(&token), RiskCheckResult::Blocked(_)));
    }

    #[test]
    fn global_drawdown_halts_when_threshold_breached() {
        let rm = manager();
        let now = Utc::now();
        rm.record_drawdown(&TokenId::new("a"), dec!(60), now);
        rm.record_drawdown(&TokenId::new("b"), dec!(60), now);
        rm.evaluate_drawdown(now);
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Halted);
    }

    #[test]
    fn recovering_auto_resumes_normal_after_timeout() {
        let rm = manager();
        let now = Utc::now();
        rm.begin_recovery(now);
        rm.maybe_auto_recover(now + Duration::seconds(60));
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Recovering);
        rm.maybe_auto_recover(now + Duration::seconds(301));
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Normal);
    }

    #[test]
    fn unresolved_ws_gaps_halt_after_configured_attempts() {
        let rm = manager();
        let now = Utc::now();
        rm.record_unresolved_ws_gap(now);
        rm.record_unresolved_ws_gap(now);
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Normal);
        rm.record_unresolved_ws_gap(now);
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Halted);
    }

    #[test]
    fn resolved_ws_gap_resets_the_counter() {
        let rm = manager();
        let now = Utc::now();
        rm.record_unresolved_ws_gap(now);
        rm.record_unresolved_ws_gap(now);
        rm.record_ws_gap_resolved();
        rm.record_unresolved_ws_gap(now);
        assert_eq!(rm.breaker_state(), CircuitBreakerState::Normal);
    }
}
