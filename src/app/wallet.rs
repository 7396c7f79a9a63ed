//! Wallet address derivation, used by the `wallet address` CLI command and
//! the config validator to confirm `WALLET_PRIVATE_KEY` resolves to an EOA
//! before the engine starts placing orders.
//!
//! On-chain approval/sweep flows are out of scope here, same boundary as
//! the C8 redemption transactor: this module only derives the address used
//! to sign CLOB orders and EIP-712 payloads, it never submits transactions.

use crate::app::Config;
use crate::error::{ConfigError, Result};

/// Wallet-related read-only operations surfaced to the CLI.
pub struct WalletService;

impl WalletService {
    /// Derive the wallet address for the configured private key.
    ///
    /// # Errors
    /// Returns an error if `WALLET_PRIVATE_KEY` is unset or malformed, or if
    /// the crate was built without the `polymarket` feature.
    pub fn wallet_address(config: &Config) -> Result<String> {
        let private_key = config.wallet.private_key.as_deref().ok_or(ConfigError::MissingField {
            field: "WALLET_PRIVATE_KEY",
        })?;
        Self::address_from_private_key(private_key)
    }

    #[cfg(feature = "polymarket")]
    fn address_from_private_key(private_key: &str) -> Result<String> {
        use std::str::FromStr;

        use alloy_signer_local::PrivateKeySigner;

        let signer = PrivateKeySigner::from_str(private_key).map_err(|e| ConfigError::InvalidValue {
            field: "WALLET_PRIVATE_KEY",
            reason: e.to_string(),
        })?;
        Ok(format!("{:?}", signer.address()))
    }

    #[cfg(not(feature = "polymarket"))]
    fn address_from_private_key(_private_key: &str) -> Result<String> {
        Err(ConfigError::InvalidValue {
            field: "WALLET_PRIVATE_KEY",
            reason: "wallet address derivation requires the 'polymarket' feature".to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{LoggingConfig, WalletConfig};
    use crate::core::exchange::polymarket::PolymarketConfig;

    fn test_config(private_key: Option<&str>) -> Config {
        Config {
            markets: vec![],
            logging: LoggingConfig::default(),
            wallet: WalletConfig { private_key: private_key.map(str::to_string) },
            risk: Default::default(),
            quote: Default::default(),
            wind_down: Default::default(),
            polymarket: PolymarketConfig::default(),
            telegram: Default::default(),
            reconnection: Default::default(),
            markout: Default::default(),
            orchestrator: Default::default(),
            dry_run: true,
            status_file: None,
            database_url: "test.db".to_string(),
        }
    }

    #[test]
    fn wallet_address_errors_without_private_key() {
        let config = test_config(None);
        assert!(WalletService::wallet_address(&config).is_err());
    }

    #[cfg(feature = "polymarket")]
    #[test]
    fn wallet_address_derives_from_private_key() {
        let config =
            test_config(Some("0x0000000000000000000000000000000000000000000000000000000000000001"));
        let address = WalletService::wallet_address(&config).unwrap();
        assert!(address.starts_with("0x"));
    }
}
