//! Polymarket connection configuration.

use serde::{Deserialize, Serialize};

fn default_ws_market_url() -> String {
    "wss://ws-subscriptions-clob.polymarket.com/ws/market".to_string()
}

fn default_ws_user_url() -> String {
    "wss://ws-subscriptions-clob.polymarket.com/ws/user".to_string()
}

fn default_rest_url() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolymarketConfig {
    #[serde(default = "default_ws_market_url")]
    pub ws_market_url: String,
    #[serde(default = "default_ws_user_url")]
    pub ws_user_url: String,
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    /// API key / secret / passphrase for L2 (HMAC) auth. Loaded from the
    /// environment, never from the config file (see `app::config`).
    #[serde(skip)]
    pub api_key: String,
    #[serde(skip)]
    pub api_secret: String,
    #[serde(skip)]
    pub api_passphrase: String,
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            ws_market_url: default_ws_market_url(),
            ws_user_url: default_ws_user_url(),
            rest_url: default_rest_url(),
            http_timeout_seconds: default_http_timeout_seconds(),
            api_key: String::new(),
            api_secret: String::new(),
            api_passphrase: String::new(),
        }
    }
}
