//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides for sensitive values like `WALLET_PRIVATE_KEY` and the venue's
//! CLOB API credentials — those never live in the config file.

use std::path::{Path, PathBuf};

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::domain::{MarketId, Price, TokenId, Volume};
use crate::core::exchange::polymarket::PolymarketConfig;
use crate::core::quote::QuoteConfig;
use crate::core::risk::RiskLimits;
use crate::core::service::store::MarkoutConfig;
use crate::core::winddown::WindDownConfig;
use crate::error::{ConfigError, Result};

/// One market to quote: a complementary token pair sharing a
/// `condition_id`, with the timestamp the Wind-Down engine counts down to.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub token_id: TokenId,
    pub paired_token: TokenId,
    pub condition_id: MarketId,
    pub market_end_time: chrono::DateTime<chrono::Utc>,
    #[serde(default = "default_tick_size")]
    pub tick_size: Price,
}

fn default_tick_size() -> Price {
    Decimal::new(1, 2)
}

/// Risk limits as read from TOML; converted into [`RiskLimits`] at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSettings {
    #[serde(default = "default_max_position_per_market")]
    pub max_position_per_market: Volume,
    #[serde(default = "default_max_total_exposure")]
    pub max_total_exposure: Volume,
    #[serde(default = "default_max_drawdown_per_market")]
    pub max_drawdown_per_market: Price,
    #[serde(default = "default_global_drawdown_halt")]
    pub global_drawdown_halt: Price,
    #[serde(default = "default_consecutive_error_warning_threshold")]
    pub consecutive_error_warning_threshold: u32,
    #[serde(default = "default_consecutive_error_halt_threshold")]
    pub consecutive_error_halt_threshold: u32,
    /// Seconds a market's book may go without an update before it's stale.
    #[serde(default = "default_stale_feed_timeout_seconds")]
    pub stale_feed_timeout_seconds: i64,
    /// Seconds RECOVERING must hold before automatically resuming NORMAL.
    #[serde(default = "default_circuit_breaker_recovery_seconds")]
    pub circuit_breaker_recovery_seconds: i64,
    /// Unresolved WS sequence gaps tolerated before halting.
    #[serde(default = "default_ws_gap_reconcile_attempts")]
    pub ws_gap_reconcile_attempts: u32,
    #[serde(default = "default_true")]
    pub halt_on_ws_gaps: bool,
}

fn default_max_position_per_market() -> Volume {
    Volume::from(1_000)
}

fn default_max_total_exposure() -> Volume {
    Volume::from(10_000)
}

fn default_max_drawdown_per_market() -> Price {
    Price::new(20, 0)
}

fn default_global_drawdown_halt() -> Price {
    Price::new(100, 0)
}

const fn default_consecutive_error_warning_threshold() -> u32 {
    3
}

const fn default_consecutive_error_halt_threshold() -> u32 {
    6
}

const fn default_stale_feed_timeout_seconds() -> i64 {
    900
}

const fn default_circuit_breaker_recovery_seconds() -> i64 {
    300
}

const fn default_ws_gap_reconcile_attempts() -> u32 {
    3
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_position_per_market: default_max_position_per_market(),
            max_total_exposure: default_max_total_exposure(),
            max_drawdown_per_market: default_max_drawdown_per_market(),
            global_drawdown_halt: default_global_drawdown_halt(),
            consecutive_error_warning_threshold: default_consecutive_error_warning_threshold(),
            consecutive_error_halt_threshold: default_consecutive_error_halt_threshold(),
            stale_feed_timeout_seconds: default_stale_feed_timeout_seconds(),
            circuit_breaker_recovery_seconds: default_circuit_breaker_recovery_seconds(),
            ws_gap_reconcile_attempts: default_ws_gap_reconcile_attempts(),
            halt_on_ws_gaps: true,
        }
    }
}

impl From<RiskSettings> for RiskLimits {
    fn from(s: RiskSettings) -> Self {
        Self {
            max_position_per_market: s.max_position_per_market,
            max_total_exposure: s.max_total_exposure,
            max_drawdown_per_market: s.max_drawdown_per_market,
            global_drawdown_halt: s.global_drawdown_halt,
            consecutive_error_warning_threshold: s.consecutive_error_warning_threshold,
            consecutive_error_halt_threshold: s.consecutive_error_halt_threshold,
            stale_feed_timeout: Duration::seconds(s.stale_feed_timeout_seconds),
            circuit_breaker_recovery: Duration::seconds(s.circuit_breaker_recovery_seconds),
            ws_gap_reconcile_attempts: s.ws_gap_reconcile_attempts,
            halt_on_ws_gaps: s.halt_on_ws_gaps,
        }
    }
}

/// Quoting formula tunables as read from TOML; converted into
/// [`QuoteConfig`] at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSettings {
    #[serde(default = "default_min_reference_size")]
    pub min_reference_size: Volume,
    #[serde(default = "default_half_spread")]
    pub half_spread: Price,
    #[serde(default = "default_base_size")]
    pub base_size: Volume,
    #[serde(default = "default_max_position")]
    pub max_position: Volume,
    #[serde(default = "default_min_price")]
    pub min_price: Price,
    #[serde(default = "default_max_price")]
    pub max_price: Price,
    /// Half-width, in percentage points, of the rebate-eligible band.
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: Price,
    /// Cancel resting quotes outright during a momentum cooldown rather
    /// than just suppressing requotes.
    #[serde(default = "default_true")]
    pub cancel_on_momentum: bool,
}

fn default_min_reference_size() -> Volume {
    Decimal::from(50)
}

fn default_half_spread() -> Price {
    Decimal::new(1, 2)
}

fn default_base_size() -> Volume {
    Decimal::from(100)
}

fn default_max_position() -> Volume {
    Decimal::from(500)
}

fn default_min_price() -> Price {
    Decimal::new(10, 2)
}

fn default_max_price() -> Price {
    Decimal::new(90, 2)
}

fn default_max_spread_pct() -> Price {
    Decimal::from(10)
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            min_reference_size: default_min_reference_size(),
            half_spread: default_half_spread(),
            base_size: default_base_size(),
            max_position: default_max_position(),
            min_price: default_min_price(),
            max_price: default_max_price(),
            max_spread_pct: default_max_spread_pct(),
            cancel_on_momentum: true,
        }
    }
}

impl From<QuoteSettings> for QuoteConfig {
    fn from(s: QuoteSettings) -> Self {
        Self {
            min_reference_size: s.min_reference_size,
            half_spread: s.half_spread,
            base_size: s.base_size,
            max_position: s.max_position,
            min_price: s.min_price,
            max_price: s.max_price,
            max_spread_pct: s.max_spread_pct,
            cancel_on_momentum: s.cancel_on_momentum,
        }
    }
}

/// End-of-market phase boundaries and redemption poll cadence as read from
/// TOML; converted into [`WindDownConfig`] at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct WindDownSettings {
    #[serde(default = "default_wind_down_start_secs")]
    pub wind_down_start_secs: i64,
    #[serde(default = "default_taker_exit_start_secs")]
    pub taker_exit_start_secs: i64,
    #[serde(default = "default_taker_price_threshold")]
    pub taker_price_threshold: Price,
    #[serde(default = "default_redemption_initial_delay_secs")]
    pub redemption_initial_delay_secs: i64,
    #[serde(default = "default_redemption_check_interval_secs")]
    pub redemption_check_interval_secs: i64,
    #[serde(default = "default_max_redemption_attempts")]
    pub max_redemption_attempts: u32,
}

const fn default_wind_down_start_secs() -> i64 {
    300
}

const fn default_taker_exit_start_secs() -> i64 {
    40
}

fn default_taker_price_threshold() -> Price {
    Decimal::new(25, 2)
}

const fn default_redemption_initial_delay_secs() -> i64 {
    60
}

const fn default_redemption_check_interval_secs() -> i64 {
    30
}

const fn default_max_redemption_attempts() -> u32 {
    20
}

impl Default for WindDownSettings {
    fn default() -> Self {
        Self {
            wind_down_start_secs: default_wind_down_start_secs(),
            taker_exit_start_secs: default_taker_exit_start_secs(),
            taker_price_threshold: default_taker_price_threshold(),
            redemption_initial_delay_secs: default_redemption_initial_delay_secs(),
            redemption_check_interval_secs: default_redemption_check_interval_secs(),
            max_redemption_attempts: default_max_redemption_attempts(),
        }
    }
}

impl From<WindDownSettings> for WindDownConfig {
    fn from(s: WindDownSettings) -> Self {
        Self {
            wind_down_start_secs: s.wind_down_start_secs,
            taker_exit_start_secs: s.taker_exit_start_secs,
            taker_price_threshold: s.taker_price_threshold,
            redemption_initial_delay: chrono::Duration::seconds(s.redemption_initial_delay_secs),
            redemption_check_interval: chrono::Duration::seconds(s.redemption_check_interval_secs),
            max_redemption_attempts: s.max_redemption_attempts,
        }
    }
}

/// Markout-capture horizons; converted into [`MarkoutConfig`] at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkoutSettings {
    #[serde(default = "default_markout_horizons_secs")]
    pub horizons_secs: Vec<i64>,
}

fn default_markout_horizons_secs() -> Vec<i64> {
    vec![1, 5, 15, 30, 60]
}

impl Default for MarkoutSettings {
    fn default() -> Self {
        Self { horizons_secs: default_markout_horizons_secs() }
    }
}

impl From<MarkoutSettings> for MarkoutConfig {
    fn from(s: MarkoutSettings) -> Self {
        Self { horizons_secs: s.horizons_secs }
    }
}

/// Tick-loop cadence knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_position_sync_interval_secs")]
    pub position_sync_interval_secs: i64,
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: i64,
    #[serde(default = "default_daily_summary_interval_secs")]
    pub daily_summary_interval_secs: i64,
    /// Minimum time between requotes for a single market.
    #[serde(default = "default_min_refresh_interval_ms")]
    pub min_refresh_interval_ms: u64,
    /// Cap on new order placements per second across every market.
    #[serde(default = "default_global_refresh_cap_per_sec")]
    pub global_refresh_cap_per_sec: u32,
    /// Seconds between unresolved-WS-gap reconciliation attempts.
    #[serde(default = "default_ws_gap_recovery_interval_seconds")]
    pub ws_gap_recovery_interval_seconds: i64,
}

fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_position_sync_interval_secs() -> i64 {
    30
}

const fn default_reconcile_interval_secs() -> i64 {
    60
}

const fn default_daily_summary_interval_secs() -> i64 {
    86_400
}

const fn default_min_refresh_interval_ms() -> u64 {
    250
}

const fn default_global_refresh_cap_per_sec() -> u32 {
    20
}

const fn default_ws_gap_recovery_interval_seconds() -> i64 {
    5
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            position_sync_interval_secs: default_position_sync_interval_secs(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            daily_summary_interval_secs: default_daily_summary_interval_secs(),
            min_refresh_interval_ms: default_min_refresh_interval_ms(),
            global_refresh_cap_per_sec: default_global_refresh_cap_per_sec(),
            ws_gap_recovery_interval_seconds: default_ws_gap_recovery_interval_seconds(),
        }
    }
}

/// Wallet configuration for signing/authenticating orders. The private key
/// is loaded from `WALLET_PRIVATE_KEY` at runtime, never from the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    #[serde(skip)]
    pub private_key: Option<String>,
}

/// Telegram notification configuration (`core::service::notifier`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramAppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub notify_fills: bool,
    #[serde(default = "default_true")]
    pub notify_halts: bool,
    #[serde(default)]
    pub notify_daily_summary: bool,
    /// Bot token loaded from `TELEGRAM_BOT_TOKEN`, never from the file.
    #[serde(skip)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

const fn default_true() -> bool {
    true
}

/// WebSocket reconnection backoff (market-data and user-channel streams).
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), format: "pretty".into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub markets: Vec<MarketConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub quote: QuoteSettings,
    #[serde(default)]
    pub wind_down: WindDownSettings,
    #[serde(default)]
    pub polymarket: PolymarketConfig,
    #[serde(default)]
    pub telegram: TelegramAppConfig,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
    #[serde(default)]
    pub markout: MarkoutSettings,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    /// Detect fills/decisions but never place real orders.
    #[serde(default)]
    pub dry_run: bool,
    /// Enable status-file writing for external monitoring (e.g.
    /// `/var/run/quotekeeper/status.json`).
    #[serde(default)]
    pub status_file: Option<PathBuf>,
    /// SQLite database path for the event ledger and position store.
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    "quotekeeper.db".to_string()
}

impl Config {
    /// # Errors
    /// Returns an error if the file can't be read or parsed, or if
    /// required fields are missing after environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadFailed { path: path.as_ref().display().to_string(), reason: e.to_string() })?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidValue { field: "<root>", reason: e.to_string() })?;

        config.wallet.private_key = std::env::var("WALLET_PRIVATE_KEY").ok();
        config.polymarket.api_key = std::env::var("POLY_API_KEY").unwrap_or_default();
        config.polymarket.api_secret = std::env::var("POLY_API_SECRET").unwrap_or_default();
        config.polymarket.api_passphrase = std::env::var("POLY_PASSPHRASE").unwrap_or_default();
        config.telegram.bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok();

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.markets.is_empty() {
            return Err(ConfigError::MissingField { field: "markets" }.into());
        }
        if self.wallet.private_key.is_none() {
            return Err(ConfigError::MissingField { field: "WALLET_PRIVATE_KEY" }.into());
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.logging.level));
        match self.logging.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).init(),
            _ => fmt().with_env_filter(filter).init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_settings_default_matches_risk_limits_default() {
        let limits: RiskLimits = RiskSettings::default().into();
        assert_eq!(limits.max_position_per_market, RiskLimits::default().max_position_per_market);
    }

    #[test]
    fn quote_settings_convert_into_quote_config() {
        let cfg: QuoteConfig = QuoteSettings::default().into();
        assert_eq!(cfg.base_size, Decimal::from(100));
    }

    #[test]
    fn wind_down_settings_convert_seconds_into_durations() {
        let cfg: WindDownConfig = WindDownSettings::default().into();
        assert_eq!(cfg.redemption_initial_delay, chrono::Duration::seconds(60));
    }

    #[test]
    fn missing_markets_fails_validation() {
        let config = Config {
            markets: vec![],
            logging: LoggingConfig::default(),
            wallet: WalletConfig { private_key: Some("0xabc".into()) },
            risk: RiskSettings::default(),
            quote: QuoteSettings::default(),
            wind_down: WindDownSettings::default(),
            polymarket: PolymarketConfig::default(),
            telegram: TelegramAppConfig::default(),
            reconnection: ReconnectionConfig::default(),
            markout: MarkoutSettings::default(),
            orchestrator: OrchestratorSettings::default(),
            dry_run: true,
            status_file: None,
            database_url: default_database_url(),
        };
        assert!(config.validate().is_err());
    }
}
