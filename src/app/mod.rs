//! Application layer - orchestration, configuration, and shared state.

mod config;
mod orchestrator;
mod state;
mod status_file;
mod wallet;

pub use config::{Config, LoggingConfig, MarketConfig, WalletConfig};
pub use orchestrator::{health_check, App, HealthCheck, HealthReport, HealthStatus};
pub use state::AppState;
pub use status_file::{StatusConfig, StatusFile, StatusRuntime, StatusToday, StatusWriter};
pub use wallet::WalletService;
