//! Handler for the `run` command.

use crate::app::App;
use crate::cli::{banner, RunArgs};
use crate::error::{Error, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

fn map_app_result(result: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "Application exited with error");
            Err(e)
        }
        Err(e) => {
            error!(error = %e, "Application task join failed");
            Err(Error::Connection(e.to_string()))
        }
    }
}

/// Execute the run command.
pub async fn execute(
    args: &RunArgs,
    config_path: &std::path::Path,
    log_level: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let mut config = crate::app::Config::load(config_path)?;

    if let Some(level) = log_level {
        config.logging.level = level.to_string();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if dry_run {
        config.dry_run = true;
    }

    config.init_logging();

    if !args.no_banner {
        banner::print_banner();
    }

    info!(markets = config.markets.len(), dry_run = config.dry_run, "quotekeeper starting");

    let app = App::new(config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut app_handle = tokio::spawn(async move { app.run_with_shutdown(shutdown_rx).await });

    tokio::select! {
        result = &mut app_handle => {
            map_app_result(result)?;
            info!("quotekeeper stopped");
            return Ok(());
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received (Ctrl+C)");
            let _ = shutdown_tx.send(true);
        }
    }

    map_app_result(app_handle.await)?;
    info!("quotekeeper stopped");
    Ok(())
}
