//! Handler for the `config` command group.

use std::fs;
use std::path::Path;

use crate::app::Config;
use crate::cli::output;
use crate::error::Result;

/// Default config template with documentation.
const CONFIG_TEMPLATE: &str = include_str!("../../config.toml.example");

/// Execute `config init`.
pub fn execute_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        eprintln!("Config file already exists: {}", path.display());
        eprintln!("Use --force to overwrite.");
        std::process::exit(1);
    }

    fs::write(path, CONFIG_TEMPLATE)?;
    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} with your markets and limits", path.display());
    println!("  2. Set WALLET_PRIVATE_KEY and POLY_API_KEY/POLY_API_SECRET/POLY_PASSPHRASE");
    println!("  3. Run: quotekeeper health-check -c {}", path.display());
    println!("  4. Run: quotekeeper run -c {}", path.display());
    Ok(())
}

/// Execute `config show`.
pub fn execute_show(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    output::section("Effective Configuration");

    output::field("Dry run", config.dry_run);
    output::field("Database", &config.database_url);
    output::field("Markets", config.markets.len());
    for market in &config.markets {
        output::field("  market", format!("{} / {}", market.token_id, market.paired_token));
    }
    println!();

    output::section("Polymarket");
    output::field("Market WS", &config.polymarket.ws_market_url);
    output::field("User WS", &config.polymarket.ws_user_url);
    output::field("REST", &config.polymarket.rest_url);
    println!();

    output::section("Risk");
    output::field("Max position / market", config.risk.max_position_per_market);
    output::field("Max total exposure", config.risk.max_total_exposure);
    output::field("Global drawdown halt", config.risk.global_drawdown_halt);
    println!();

    output::section("Wallet");
    if config.wallet.private_key.is_some() {
        output::success("Private key loaded from WALLET_PRIVATE_KEY");
    } else {
        output::warning("WALLET_PRIVATE_KEY not set");
    }
    println!();

    output::section("Notifications");
    output::field("Telegram", if config.telegram.enabled { "enabled" } else { "disabled" });

    Ok(())
}

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    println!("Validating: {}", path.display());
    println!();

    match Config::load(path) {
        Ok(config) => {
            output::success("Configuration file is valid");
            println!();

            let mut warnings = Vec::new();
            if config.wallet.private_key.is_none() {
                warnings.push("WALLET_PRIVATE_KEY not set (required for trading)");
            }
            if config.polymarket.api_key.is_empty() {
                warnings.push("POLY_API_KEY not set (required for order placement)");
            }
            if config.markets.is_empty() {
                warnings.push("no markets configured");
            }

            if !warnings.is_empty() {
                println!("Warnings:");
                for w in warnings {
                    output::warning(w);
                }
                println!();
            }

            println!("Run 'quotekeeper config show -c {}' to see resolved values", path.display());
        }
        Err(e) => {
            output::error("Configuration file is invalid");
            println!();
            println!("Error: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}
