//! Wallet operations CLI handlers.
//!
//! Command handlers are split by subcommand to keep each file focused.

mod address;

pub use address::execute_address;
