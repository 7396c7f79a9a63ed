//! Polymarket CLOB REST client (C6): order placement, cancellation, and
//! reconciliation reads. Every private request is signed with an L2 HMAC
//! header derived from the API key/secret/passphrase issued at onboarding.

use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client as HttpClient;
use sha2::Sha256;
use tracing::{debug, info, warn};

use super::config::PolymarketConfig;
use crate::core::domain::{OrderId, OrderSide, TokenId};
use crate::core::exchange::{ApiOrder, ApiPosition, OrderExecutor, OrderRequest, PlacedOrder};
use crate::error::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// REST client implementing [`OrderExecutor`] against the Polymarket CLOB.
pub struct PolymarketClient {
    http: HttpClient,
    config: PolymarketConfig,
}

impl PolymarketClient {
    /// # Errors
    /// Returns an error if the inner HTTP client fails to build (invalid
    /// timeout or TLS configuration).
    pub fn new(config: PolymarketConfig) -> crate::error::Result<Self> {
        let http = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_seconds))
            .build()?;
        Ok(Self { http, config })
    }

    /// Builds the `POLY_SIGNATURE` header per Polymarket's L2 auth scheme:
    /// `base64(hmac_sha256(secret, timestamp + method + path + body))`.
    fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> crate::error::Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .map_err(|e| crate::error::Error::Execution(format!("invalid HMAC key: {e}")))?;
        mac.update(format!("{timestamp}{method}{path}{body}").as_bytes());
        let digest = mac.finalize().into_bytes();
        Ok(base64::engine::general_purpose::STANDARD.encode(digest))
    }

    fn l2_headers(
        &self,
        method: &str,
        path: &str,
        body: &str,
    ) -> crate::error::Result<Vec<(&'static str, String)>> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&timestamp, method, path, body)?;
        Ok(vec![
            ("POLY_API_KEY", self.config.api_key.clone()),
            ("POLY_PASSPHRASE", self.config.api_passphrase.clone()),
            ("POLY_TIMESTAMP", timestamp),
            ("POLY_SIGNATURE", signature),
        ])
    }

    fn classify_status(status: u16, message: &str) -> ExchangeError {
        match status {
            400 if message.to_lowercase().contains("balance") => ExchangeError::InsufficientBalance,
            400 if message.to_lowercase().contains("allowance") => ExchangeError::AllowanceTooLow,
            400 if message.to_lowercase().contains("cross") => ExchangeError::WouldCross,
            401 | 403 => ExchangeError::Auth(message.to_string()),
            429 => ExchangeError::RateLimited { retry_after_ms: 1_000 },
            _ => ExchangeError::Http { status, message: message.to_string() },
        }
    }
}

#[async_trait::async_trait]
impl OrderExecutor for PolymarketClient {
    async fn place_order(&self, request: OrderRequest) -> Result<PlacedOrder, ExchangeError> {
        let path = "/order";
        let body = serde_json::json!({
            "asset_id": request.token_id.as_str(),
            "side": if request.side == OrderSide::Buy { "BUY" } else { "SELL" },
            "price": request.price.to_string(),
            "size": request.size.to_string(),
            "post_only": request.post_only,
            "neg_risk": request.neg_risk,
        })
        .to_string();

        let headers = self
            .l2_headers("POST", path, &body)
            .map_err(|e| ExchangeError::Auth(e.to_string()))?;

        let mut req = self
            .http
            .post(format!("{}{path}", self.config.rest_url))
            .body(body);
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| ExchangeError::Http { status: 0, message: e.to_string() })?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &message));
        }

        #[derive(serde::Deserialize)]
        struct PlaceResponse {
            #[serde(rename = "orderID")]
            order_id: String,
        }
        let parsed: PlaceResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Malformed(e.to_string()))?;

        debug!(order_id = %parsed.order_id, token_id = %request.token_id, "order placed");
        Ok(PlacedOrder { order_id: OrderId::from(parsed.order_id) })
    }

    async fn place_orders_batch(&self, requests: Vec<OrderRequest>) -> Vec<Result<PlacedOrder, ExchangeError>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.place_order(request).await);
        }
        results
    }

    async fn cancel_all_for_token(&self, token_id: &TokenId) -> Result<(), ExchangeError> {
        let path = "/cancel-market-orders";
        let body = serde_json::json!({ "asset_id": token_id.as_str() }).to_string();
        let headers = self
            .l2_headers("DELETE", path, &body)
            .map_err(|e| ExchangeError::Auth(e.to_string()))?;

        let mut req = self
            .http
            .delete(format!("{}{path}", self.config.rest_url))
            .body(body);
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| ExchangeError::Http { status: 0, message: e.to_string() })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &message));
        }
        info!(token_id = %token_id, "cancelled all orders for token");
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), ExchangeError> {
        let path = "/cancel-all";
        let headers = self
            .l2_headers("DELETE", path, "")
            .map_err(|e| ExchangeError::Auth(e.to_string()))?;

        let mut req = self.http.delete(format!("{}{path}", self.config.rest_url));
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| ExchangeError::Http { status: 0, message: e.to_string() })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &message));
        }
        warn!("cancelled all open orders across every market");
        Ok(())
    }

    async fn fetch_open_orders(&self) -> Result<Vec<ApiOrder>, ExchangeError> {
        let path = "/orders";
        let headers = self
            .l2_headers("GET", path, "")
            .map_err(|e| ExchangeError::Auth(e.to_string()))?;

        let mut req = self.http.get(format!("{}{path}", self.config.rest_url));
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| ExchangeError::Http { status: 0, message: e.to_string() })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &message));
        }

        #[derive(serde::Deserialize)]
        struct OpenOrder {
            #[serde(rename = "orderID")]
            order_id: String,
            asset_id: String,
            side: String,
            price: String,
            original_size: String,
            size_matched: String,
        }
        let parsed: Vec<OpenOrder> = response.json().await.map_err(|e| ExchangeError::Malformed(e.to_string()))?;

        Ok(parsed
            .into_iter()
            .filter_map(|o| {
                Some(ApiOrder {
                    order_id: OrderId::from(o.order_id),
                    token_id: TokenId::from(o.asset_id),
                    side: if o.side.eq_ignore_ascii_case("BUY") { OrderSide::Buy } else { OrderSide::Sell },
                    price: o.price.parse().ok()?,
                    original_size: o.original_size.parse().ok()?,
                    size_matched: o.size_matched.parse().ok()?,
                })
            })
            .collect())
    }

    async fn fetch_positions(&self, tokens: &[TokenId]) -> Result<Vec<ApiPosition>, ExchangeError> {
        let path = "/positions";
        let headers = self
            .l2_headers("GET", path, "")
            .map_err(|e| ExchangeError::Auth(e.to_string()))?;

        let mut req = self.http.get(format!("{}{path}", self.config.rest_url));
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| ExchangeError::Http { status: 0, message: e.to_string() })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &message));
        }

        #[derive(serde::Deserialize)]
        struct PositionRow {
            asset_id: String,
            size: String,
            avg_price: String,
        }
        let parsed: Vec<PositionRow> = response.json().await.map_err(|e| ExchangeError::Malformed(e.to_string()))?;
        let wanted: std::collections::HashSet<&str> = tokens.iter().map(TokenId::as_str).collect();

        Ok(parsed
            .into_iter()
            .filter(|row| wanted.is_empty() || wanted.contains(row.asset_id.as_str()))
            .filter_map(|row| {
                Some(ApiPosition {
                    token_id: TokenId::from(row.asset_id),
                    size: row.size.parse().ok()?,
                    avg_price: row.avg_price.parse().ok()?,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PolymarketConfig {
        let mut config = PolymarketConfig::default();
        config.api_key = "key".into();
        config.api_secret = "c2VjcmV0".into();
        config.api_passphrase = "pass".into();
        config
    }

    #[test]
    fn signing_is_deterministic_for_identical_inputs() {
        let client = PolymarketClient::new(test_config()).unwrap();
        let a = client.sign("123", "POST", "/order", "{}").unwrap();
        let b = client.sign("123", "POST", "/order", "{}").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signing_differs_when_body_changes() {
        let client = PolymarketClient::new(test_config()).unwrap();
        let a = client.sign("123", "POST", "/order", "{}").unwrap();
        let b = client.sign("123", "POST", "/order", r#"{"x":1}"#).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn classify_status_maps_known_patterns() {
        assert!(matches!(
            PolymarketClient::classify_status(400, "insufficient balance"),
            ExchangeError::InsufficientBalance
        ));
        assert!(matches!(PolymarketClient::classify_status(429, "slow down"), ExchangeError::RateLimited { .. }));
        assert!(matches!(PolymarketClient::classify_status(401, "bad key"), ExchangeError::Auth(_)));
    }
}
