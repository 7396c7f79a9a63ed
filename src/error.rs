//! Crate-wide error type.
//!
//! One aggregating `Error` for transport/parse/IO failures via `#[from]`,
//! plus focused sub-enums for each layer that convert into it. Every
//! fallible function in this crate returns `crate::error::Result<T>`.

use thiserror::Error;

use crate::core::domain::DomainError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration-layer errors: malformed or missing config values.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file {path}: {reason}")]
    ReadFailed { path: String, reason: String },
}

/// Risk/circuit-breaker errors: orders blocked by risk state.
#[derive(Error, Debug, Clone)]
pub enum RiskError {
    #[error("circuit breaker is {state} ({reason}) — no new orders may be submitted")]
    Halted { state: &'static str, reason: String },

    #[error("market {market_id} is individually halted: {reason}")]
    MarketHalted { market_id: String, reason: String },
}

/// Persistence errors. These are never fatal to the core —
/// callers log and swallow rather than propagate to their own caller.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("pool error: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

/// Venue (exchange) errors, classified into soft/hard per the order
/// manager's error taxonomy.
#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("order would cross the book")]
    WouldCross,

    #[error("token allowance too low")]
    AllowanceTooLow,

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("venue request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("malformed venue response: {0}")]
    Malformed(String),
}

impl ExchangeError {
    /// Soft errors are expected, transient, and never count toward the
    /// circuit breaker's consecutive-error counter.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ExchangeError::InsufficientBalance
                | ExchangeError::WouldCross
                | ExchangeError::AllowanceTooLow
                | ExchangeError::RateLimited { .. }
        )
    }
}
