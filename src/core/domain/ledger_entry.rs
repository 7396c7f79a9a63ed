//! Event-ledger entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    OrderUpdate,
    Fill,
    Reconciliation,
    GapDetected,
}

impl EventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderUpdate => "ORDER_UPDATE",
            Self::Fill => "FILL",
            Self::Reconciliation => "RECONCILIATION",
            Self::GapDetected => "GAP_DETECTED",
        }
    }
}

/// Which channel an event was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    Websocket,
    Api,
    System,
}

impl EventSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Websocket => "websocket",
            Self::Api => "api",
            Self::System => "system",
        }
    }
}

/// One entry in the append-only event ledger.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub sequence_number: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub source: EventSource,
}

/// A detected gap in a source's `ws_sequence` stream.
#[derive(Debug, Clone)]
pub struct GapInfo {
    pub expected_start: u64,
    pub expected_end: u64,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl GapInfo {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.expected_end - self.expected_start
    }
}
