//! Session-state persistence: position snapshots and markout
//! samples, kept independent of the append-only event ledger (`core::ledger`)
//! so a markout backfill or position-history query never competes with the
//! ledger's sequence-number invariants.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::domain::{Price, TokenId, Volume};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub token_id: TokenId,
    pub size: Volume,
    pub avg_entry_price: Price,
    pub realized_pnl: Price,
    pub recorded_at: DateTime<Utc>,
}

/// One markout observation: the signed P&L of a fill relative to the mid
/// price `horizon_secs` later.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkoutSample {
    pub token_id: TokenId,
    pub fill_price: Price,
    pub horizon_secs: i64,
    pub mid_at_horizon: Price,
    pub signed_pnl: Price,
    pub recorded_at: DateTime<Utc>,
}

/// Horizons markouts are sampled at after each fill.
#[derive(Debug, Clone)]
pub struct MarkoutConfig {
    pub horizons_secs: Vec<i64>,
}

impl Default for MarkoutConfig {
    fn default() -> Self {
        Self { horizons_secs: vec![1, 5, 15, 30, 60] }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_position(&self, snapshot: PositionSnapshot) -> Result<()>;
    async fn save_markout(&self, sample: MarkoutSample) -> Result<()>;
    async fn latest_position(&self, token_id: &TokenId) -> Result<Option<PositionSnapshot>>;
    async fn markouts_for(&self, token_id: &TokenId) -> Result<Vec<MarkoutSample>>;
}
