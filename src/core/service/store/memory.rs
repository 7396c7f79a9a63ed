//! In-memory [`SessionStore`], used for tests and dry-run sessions that
//! don't need position/markout history to survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{MarkoutSample, PositionSnapshot, SessionStore};
use crate::core::domain::TokenId;
use crate::error::Result;

#[derive(Default)]
pub struct MemoryStore {
    positions: RwLock<HashMap<TokenId, PositionSnapshot>>,
    markouts: RwLock<HashMap<TokenId, Vec<MarkoutSample>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_position(&self, snapshot: PositionSnapshot) -> Result<()> {
        self.positions.write().insert(snapshot.token_id.clone(), snapshot);
        Ok(())
    }

    async fn save_markout(&self, sample: MarkoutSample) -> Result<()> {
        self.markouts.write().entry(sample.token_id.clone()).or_default().push(sample);
        Ok(())
    }

    async fn latest_position(&self, token_id: &TokenId) -> Result<Option<PositionSnapshot>> {
        Ok(self.positions.read().get(token_id).cloned())
    }

    async fn markouts_for(&self, token_id: &TokenId) -> Result<Vec<MarkoutSample>> {
        Ok(self.markouts.read().get(token_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> PositionSnapshot {
        PositionSnapshot {
            token_id: TokenId::new("tok"),
            size: dec!(10),
            avg_entry_price: dec!(0.5),
            realized_pnl: dec!(0),
            recorded_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = MemoryStore::new();
        let snap = snapshot();
        store.save_position(snap.clone()).await.unwrap();
        let loaded = store.latest_position(&TokenId::new("tok")).await.unwrap();
        assert_eq!(loaded, Some(snap));
    }

    #[tokio::test]
    async fn missing_token_returns_none() {
        let store = MemoryStore::new();
        assert!(store.latest_position(&TokenId::new("unseen")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn markouts_accumulate_per_token() {
        let store = MemoryStore::new();
        let token = TokenId::new("tok");
        for horizon in [1, 5, 15] {
            store
                .save_markout(MarkoutSample {
                    token_id: token.clone(),
                    fill_price: dec!(0.5),
                    horizon_secs: horizon,
                    mid_at_horizon: dec!(0.51),
                    signed_pnl: dec!(0.01),
                    recorded_at: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.markouts_for(&token).await.unwrap().len(), 3);
    }
}
