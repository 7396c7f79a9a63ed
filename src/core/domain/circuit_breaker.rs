//! Circuit-breaker state.
//!
//! This module holds the pure state value; the transition logic and the
//! per-market/global P&L tracking that drives it lives in [`crate::core::risk`].

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerState {
    Normal,
    Warning,
    Halted,
    Recovering,
}

impl CircuitBreakerState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Warning => "WARNING",
            Self::Halted => "HALTED",
            Self::Recovering => "RECOVERING",
        }
    }

    /// The Quote Engine multiplies its size output by this.
    #[must_use]
    pub fn position_limit_multiplier(self) -> rust_decimal::Decimal {
        use rust_decimal_macros::dec;
        match self {
            Self::Normal => dec!(1.0),
            Self::Warning => dec!(0.5),
            Self::Recovering => dec!(0.25),
            Self::Halted => dec!(0.0),
        }
    }

    #[must_use]
    pub const fn allows_new_orders(self) -> bool {
        !matches!(self, Self::Halted)
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitBreakerState,
    reason: Option<String>,
    transitioned_at: DateTime<Utc>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: CircuitBreakerState::Normal,
            reason: None,
            transitioned_at: now,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CircuitBreakerState {
        self.state
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    #[must_use]
    pub const fn transitioned_at(&self) -> DateTime<Utc> {
        self.transitioned_at
    }

    pub fn transition(&mut self, state: CircuitBreakerState, reason: Option<String>, now: DateTime<Utc>) {
        self.state = state;
        self.reason = reason;
        self.transitioned_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipliers_match_spec_table() {
        use rust_decimal_macros::dec;
        assert_eq!(CircuitBreakerState::Normal.position_limit_multiplier(), dec!(1.0));
        assert_eq!(CircuitBreakerState::Warning.position_limit_multiplier(), dec!(0.5));
        assert_eq!(CircuitBreakerState::Recovering.position_limit_multiplier(), dec!(0.25));
        assert_eq!(CircuitBreakerState::Halted.position_limit_multiplier(), dec!(0.0));
    }

    #[test]
    fn only_halted_blocks_new_orders() {
        assert!(CircuitBreakerState::Normal.allows_new_orders());
        assert!(CircuitBreakerState::Warning.allows_new_orders());
        assert!(CircuitBreakerState::Recovering.allows_new_orders());
        assert!(!CircuitBreakerState::Halted.allows_new_orders());
    }
}
