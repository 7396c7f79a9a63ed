//! Cross-cutting services: alerting and session-state persistence.
//! Risk, inventory and quoting live under `core::{risk,inventory,quote}` —
//! this module holds the services that sit outside the quoting hot path.

pub mod notifier;
pub mod store;

pub use notifier::{Event, LogNotifier, Notifier, NotifierRegistry, NullNotifier, SummaryEvent, ThrottledNotifier};
pub use store::{MarkoutSample, MemoryStore, PositionSnapshot, SessionStore, SqliteStore};

#[cfg(feature = "telegram")]
pub use notifier::{TelegramConfig, TelegramNotifier};
