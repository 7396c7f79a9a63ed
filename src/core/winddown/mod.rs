//! Wind-Down & Redemption.
//!
//! Per-market end-of-life phase logic (ordinary quoting → wind-down →
//! taker-exit → market-ended) plus the post-resolution redemption
//! scheduler. Redemption attempts are serialised globally (one concurrent
//! on-chain attempt) via [`RedemptionScheduler`]'s internal mutex.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::core::domain::{MarketId, Price, TokenId, Volume};
use crate::core::exchange::RedemptionTransactor;

/// Tunables for the end-of-market phase boundaries and the redemption
/// poll loop.
#[derive(Debug, Clone)]
pub struct WindDownConfig {
    /// Seconds-to-resolution at which WIND_DOWN begins.
    pub wind_down_start_secs: i64,
    /// Seconds-to-resolution at which TAKER_EXIT begins.
    pub taker_exit_start_secs: i64,
    /// Best-bid threshold below which the excess token is presumed the
    /// losing side and is dumped at market during TAKER_EXIT.
    pub taker_price_threshold: Price,
    /// Delay after market end before the first redemption check.
    pub redemption_initial_delay: Duration,
    /// Interval between subsequent redemption checks.
    pub redemption_check_interval: Duration,
    /// Max checks before giving up (~10 minutes at the default interval).
    pub max_redemption_attempts: u32,
}

impl Default for WindDownConfig {
    fn default() -> Self {
        Self {
            wind_down_start_secs: 300,
            taker_exit_start_secs: 40,
            taker_price_threshold: rust_decimal_macros::dec!(0.25),
            redemption_initial_delay: Duration::seconds(60),
            redemption_check_interval: Duration::seconds(30),
            max_redemption_attempts: 20,
        }
    }
}

/// The end-of-market phase for one token, derived purely from
/// time-to-resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindDownPhase {
    Normal,
    WindDown,
    TakerExit,
    MarketEnded,
}

impl WindDownPhase {
    #[must_use]
    pub fn from_seconds_to_resolution(seconds_to_resolution: i64, config: &WindDownConfig) -> Self {
        if seconds_to_resolution <= 0 {
            Self::MarketEnded
        } else if seconds_to_resolution <= config.taker_exit_start_secs {
            Self::TakerExit
        } else if seconds_to_resolution <= config.wind_down_start_secs {
            Self::WindDown
        } else {
            Self::Normal
        }
    }
}

/// What the orchestrator should do for a token in a wind-down phase,
/// computed by [`WindDownEngine::decide`].
#[derive(Debug, Clone, PartialEq)]
pub enum WindDownAction {
    /// Ordinary quoting continues; C5 drives the decision.
    ContinueQuoting,
    /// Cancel all resting orders for the pair, then (if an excess position
    /// exists above avg entry) place a maker SELL at this price/size.
    /// `first_entry` is true only on the tick this token crosses into
    /// wind-down, so the orchestrator cancels the pair exactly once.
    EnterWindDown { first_entry: bool, maker_sell: Option<(Price, Volume)> },
    /// Cancel residual maker quotes; optionally dump the excess with a
    /// single non-post-only SELL at `price`.
    TakerExit { dump: Option<(Price, Volume)> },
    /// Resolution has passed; no trading, hand off to redemption.
    MarketEnded,
}

/// Computes per-token wind-down actions from time-to-resolution, the
/// excess over the paired token, and the current book.
pub struct WindDownEngine {
    config: WindDownConfig,
    entered_wind_down: Mutex<std::collections::HashSet<TokenId>>,
}

impl WindDownEngine {
    #[must_use]
    pub fn new(config: WindDownConfig) -> Self {
        Self { config, entered_wind_down: Mutex::new(std::collections::HashSet::new()) }
    }

    /// `position_size`/`paired_size` are this token's and its pair's
    /// current holdings; `avg_entry` is this token's average entry price;
    /// `best_bid` is the current best bid for this token, if any.
    #[must_use]
    pub fn decide(
        &self,
        token_id: &TokenId,
        seconds_to_resolution: i64,
        position_size: Volume,
        paired_size: Volume,
        avg_entry: Price,
        best_bid: Option<Price>,
    ) -> WindDownAction {
        let phase = WindDownPhase::from_seconds_to_resolution(seconds_to_resolution, &self.config);
        let excess = position_size - paired_size;

        match phase {
            WindDownPhase::Normal => {
                self.entered_wind_down.lock().remove(token_id);
                WindDownAction::ContinueQuoting
            }
            WindDownPhase::WindDown => {
                let first_entry = self.entered_wind_down.lock().insert(token_id.clone());
                let maker_sell = if excess > Volume::ZERO {
                    best_bid.filter(|bid| *bid > avg_entry).map(|bid| (bid, excess))
                } else {
                    None
                };
                WindDownAction::EnterWindDown { first_entry, maker_sell }
            }
            WindDownPhase::TakerExit => {
                let dump = if excess > Volume::ZERO {
                    best_bid.filter(|bid| *bid < self.config.taker_price_threshold).map(|bid| (bid, excess))
                } else {
                    None
                };
                WindDownAction::TakerExit { dump }
            }
            WindDownPhase::MarketEnded => WindDownAction::MarketEnded,
        }
    }
}

/// State of one market's redemption attempt, mirroring the original's PENDING/CHECKING/REDEEMING/
/// COMPLETED/FAILED/SKIPPED lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionState {
    Pending,
    Checking,
    Redeeming,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
struct RedemptionEntry {
    condition_id: MarketId,
    market_end_time: DateTime<Utc>,
    position_size: Volume,
    state: RedemptionState,
    last_check_time: Option<DateTime<Utc>>,
    check_count: u32,
    tx_hash: Option<String>,
    error_message: Option<String>,
}

/// Tracks every market awaiting redemption and serialises on-chain
/// redemption attempts through a single async mutex.
pub struct RedemptionScheduler {
    config: WindDownConfig,
    markets: Mutex<HashMap<TokenId, RedemptionEntry>>,
    redeem_lock: AsyncMutex<()>,
    transactor: Arc<dyn RedemptionTransactor>,
}

impl RedemptionScheduler {
    #[must_use]
    pub fn new(config: WindDownConfig, transactor: Arc<dyn RedemptionTransactor>) -> Self {
        Self { config, markets: Mutex::new(HashMap::new()), redeem_lock: AsyncMutex::new(()), transactor }
    }

    /// Register a market for redemption tracking once it hits
    /// [`WindDownPhase::MarketEnded`]. No-op if already tracked.
    pub fn register_market(&self, token_id: TokenId, condition_id: MarketId, market_end_time: DateTime<Utc>, position_size: Volume) {
        let mut markets = self.markets.lock();
        markets.entry(token_id).or_insert(RedemptionEntry {
            condition_id,
            market_end_time,
            position_size,
            state: RedemptionState::Pending,
            last_check_time: None,
            check_count: 0,
            tx_hash: None,
            error_message: None,
        });
    }

    pub fn update_position_size(&self, token_id: &TokenId, size: Volume) {
        if let Some(entry) = self.markets.lock().get_mut(token_id) {
            entry.position_size = size;
        }
    }

    #[must_use]
    pub fn state(&self, token_id: &TokenId) -> Option<RedemptionState> {
        self.markets.lock().get(token_id).map(|e| e.state)
    }

    /// Transaction hash recorded once a redemption completes.
    #[must_use]
    pub fn tx_hash(&self, token_id: &TokenId) -> Option<String> {
        self.markets.lock().get(token_id).and_then(|e| e.tx_hash.clone())
    }

    /// The most recent error recorded against a redemption attempt.
    #[must_use]
    pub fn error_message(&self, token_id: &TokenId) -> Option<String> {
        self.markets.lock().get(token_id).and_then(|e| e.error_message.clone())
    }

    /// Tokens whose redemption is due to be checked right now: past the
    /// initial delay, past the per-attempt interval, under the attempt
    /// cap, and not already terminal.
    #[must_use]
    pub fn markets_ready_for_check(&self, now: DateTime<Utc>) -> Vec<TokenId> {
        let mut markets = self.markets.lock();
        let mut ready = Vec::new();
        for (token_id, entry) in markets.iter_mut() {
            if matches!(entry.state, RedemptionState::Completed | RedemptionState::Skipped) {
                continue;
            }
            if entry.check_count >= self.config.max_redemption_attempts {
                if entry.state != RedemptionState::Failed {
                    entry.state = RedemptionState::Failed;
                    entry.error_message = Some(format!("exceeded max check attempts ({})", self.config.max_redemption_attempts));
                    warn!(%token_id, "redemption exceeded max check attempts");
                }
                continue;
            }
            if now < entry.market_end_time + self.config.redemption_initial_delay {
                continue;
            }
            if let Some(last) = entry.last_check_time {
                if now - last < self.config.redemption_check_interval {
                    continue;
                }
            }
            ready.push(token_id.clone());
        }
        ready
    }

    /// Attempt redemption for `token_id`. Serialised globally against
    /// every other in-flight redemption to avoid account-nonce conflicts.
    ///
    /// # Errors
    /// Returns an error only if no redemption state is registered for
    /// `token_id`; on-chain failures are recorded internally and surfaced
    /// via [`Self::state`] rather than propagated.
    pub async fn attempt_redemption(&self, token_id: &TokenId, now: DateTime<Utc>) -> Result<(), &'static str> {
        let condition_id = {
            let mut markets = self.markets.lock();
            let Some(entry) = markets.get_mut(token_id) else {
                return Err("no redemption state registered for token");
            };

            if entry.position_size <= Volume::ZERO {
                entry.state = RedemptionState::Skipped;
                info!(%token_id, "no position to redeem, skipping");
                return Ok(());
            }

            entry.state = RedemptionState::Redeeming;
            entry.last_check_time = Some(now);
            entry.check_count += 1;
            entry.condition_id.clone()
        };

        let _permit = self.redeem_lock.lock().await;
        match self.transactor.redeem(&condition_id).await {
            Ok(tx_hash) => {
                let mut markets = self.markets.lock();
                if let Some(entry) = markets.get_mut(token_id) {
                    entry.state = RedemptionState::Completed;
                    entry.tx_hash = Some(tx_hash.clone());
                }
                info!(%token_id, tx_hash, "redemption completed");
                Ok(())
            }
            Err(err) if err.is_retryable => {
                let mut markets = self.markets.lock();
                if let Some(entry) = markets.get_mut(token_id) {
                    entry.state = RedemptionState::Checking;
                    entry.error_message = Some(err.to_string());
                }
                Ok(())
            }
            Err(err) => {
                let mut markets = self.markets.lock();
                if let Some(entry) = markets.get_mut(token_id) {
                    entry.state = RedemptionState::Failed;
                    entry.error_message = Some(err.to_string());
                }
                warn!(%token_id, error = %err, "redemption failed");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> WindDownConfig {
        WindDownConfig::default()
    }

    #[test]
    fn phase_boundaries_match_seconds_to_resolution() {
        let c = config();
        assert_eq!(WindDownPhase::from_seconds_to_resolution(301, &c), WindDownPhase::Normal);
        assert_eq!(WindDownPhase::from_seconds_to_resolution(300, &c), WindDownPhase::WindDown);
        assert_eq!(WindDownPhase::from_seconds_to_resolution(40, &c), WindDownPhase::TakerExit);
        assert_eq!(WindDownPhase::from_seconds_to_resolution(0, &c), WindDownPhase::MarketEnded);
    }

    #[test]
    fn wind_down_places_maker_sell_only_above_avg_entry() {
        let engine = WindDownEngine::new(config());
        let token = TokenId::new("tok");
        let action = engine.decide(&token, 100, dec!(50), dec!(10), dec!(0.40), Some(dec!(0.45)));
        match action {
            WindDownAction::EnterWindDown { first_entry, maker_sell } => {
                assert!(first_entry);
                assert_eq!(maker_sell, Some((dec!(0.45), dec!(40))));
            }
            other => panic!("expected EnterWindDown, got {other:?}"),
        }
    }

    #[test]
    fn wind_down_skips_maker_sell_when_below_avg_entry() {
        let engine = WindDownEngine::new(config());
        let token = TokenId::new("tok");
        let action = engine.decide(&token, 100, dec!(50), dec!(10), dec!(0.60), Some(dec!(0.45)));
        assert_eq!(action, WindDownAction::EnterWindDown { first_entry: true, maker_sell: None });
    }

    #[test]
    fn taker_exit_dumps_excess_below_price_threshold() {
        let engine = WindDownEngine::new(config());
        let token = TokenId::new("tok");
        let action = engine.decide(&token, 20, dec!(50), dec!(10), dec!(0.40), Some(dec!(0.20)));
        assert_eq!(action, WindDownAction::TakerExit { dump: Some((dec!(0.20), dec!(40))) });
    }

    #[test]
    fn taker_exit_holds_when_above_price_threshold() {
        let engine = WindDownEngine::new(config());
        let token = TokenId::new("tok");
        let action = engine.decide(&token, 20, dec!(50), dec!(10), dec!(0.40), Some(dec!(0.30)));
        assert_eq!(action, WindDownAction::TakerExit { dump: None });
    }

    #[test]
    fn market_ended_is_terminal_no_trade_phase() {
        let engine = WindDownEngine::new(config());
        let token = TokenId::new("tok");
        assert_eq!(engine.decide(&token, 0, dec!(0), dec!(0), dec!(0), None), WindDownAction::MarketEnded);
    }

    struct NullTransactor;

    #[async_trait::async_trait]
    impl RedemptionTransactor for NullTransactor {
        async fn redeem(&self, _condition_id: &MarketId) -> Result<String, crate::core::exchange::RedemptionError> {
            Ok("0xdeadbeef".to_string())
        }
    }

    fn scheduler() -> RedemptionScheduler {
        RedemptionScheduler::new(config(), Arc::new(NullTransactor))
    }

    #[test]
    fn zero_position_is_skipped_without_redeeming() {
        let sched = scheduler();
        let token = TokenId::new("tok");
        let now = Utc::now();
        sched.register_market(token.clone(), MarketId::new("cond"), now, Volume::ZERO);
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(sched.attempt_redemption(&token, now)).unwrap();
        assert_eq!(sched.state(&token), Some(RedemptionState::Skipped));
    }

    #[test]
    fn successful_redemption_marks_completed() {
        let sched = scheduler();
        let token = TokenId::new("tok");
        let now = Utc::now();
        sched.register_market(token.clone(), MarketId::new("cond"), now, dec!(10));
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(sched.attempt_redemption(&token, now)).unwrap();
        assert_eq!(sched.state(&token), Some(RedemptionState::Completed));
    }

    #[test]
    fn not_ready_before_initial_delay_elapses() {
        let sched = scheduler();
        let token = TokenId::new("tok");
        let now = Utc::now();
        sched.register_market(token.clone(), MarketId::new("cond"), now, dec!(10));
        assert!(sched.markets_ready_for_check(now).is_empty());
        assert!(!sched.markets_ready_for_check(now + Duration::seconds(61)).is_empty());
    }
}
