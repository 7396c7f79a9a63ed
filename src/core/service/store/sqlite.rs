//! SQLite-backed [`SessionStore`]. Shares the event ledger's connection
//! pool type but owns its own tables — position/markout history is
//! mutable session state, not the ledger's append-only fact log.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::RunQueryDsl;

use super::{MarkoutSample, PositionSnapshot, SessionStore};
use crate::core::domain::TokenId;
use crate::core::ledger::DbPool;
use crate::error::{Error, Result};

pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// # Errors
    /// Returns an error if the tables can't be created.
    pub fn new(pool: DbPool) -> Result<Self> {
        let store = Self { pool };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        diesel::sql_query(
            "CREATE TABLE IF NOT EXISTS position_snapshots (
                token_id TEXT PRIMARY KEY,
                size TEXT NOT NULL,
                avg_entry_price TEXT NOT NULL,
                realized_pnl TEXT NOT NULL,
                recorded_at BIGINT NOT NULL
            )",
        )
        .execute(&mut conn)
        .map_err(Error::Diesel)?;
        diesel::sql_query(
            "CREATE TABLE IF NOT EXISTS markout_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_id TEXT NOT NULL,
                fill_price TEXT NOT NULL,
                horizon_secs BIGINT NOT NULL,
                mid_at_horizon TEXT NOT NULL,
                signed_pnl TEXT NOT NULL,
                recorded_at BIGINT NOT NULL
            )",
        )
        .execute(&mut conn)
        .map_err(Error::Diesel)?;
        Ok(())
    }
}

#[derive(QueryableByName)]
struct PositionRow {
    #[diesel(sql_type = Text)]
    token_id: String,
    #[diesel(sql_type = Text)]
    size: String,
    #[diesel(sql_type = Text)]
    avg_entry_price: String,
    #[diesel(sql_type = Text)]
    realized_pnl: String,
    #[diesel(sql_type = BigInt)]
    recorded_at: i64,
}

#[derive(QueryableByName)]
struct MarkoutRow {
    #[diesel(sql_type = Text)]
    token_id: String,
    #[diesel(sql_type = Text)]
    fill_price: String,
    #[diesel(sql_type = BigInt)]
    horizon_secs: i64,
    #[diesel(sql_type = Text)]
    mid_at_horizon: String,
    #[diesel(sql_type = Text)]
    signed_pnl: String,
    #[diesel(sql_type = BigInt)]
    recorded_at: i64,
}

fn parse_decimal(s: &str) -> Result<rust_decimal::Decimal> {
    s.parse().map_err(|_| Error::Store(crate::error::StoreError::Query(format!("invalid decimal: {s}"))))
}

#[async_trait::async_trait]
impl SessionStore for SqliteStore {
    async fn save_position(&self, snapshot: PositionSnapshot) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        diesel::sql_query(
            "INSERT INTO position_snapshots (token_id, size, avg_entry_price, realized_pnl, recorded_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(token_id) DO UPDATE SET
                size = excluded.size,
                avg_entry_price = excluded.avg_entry_price,
                realized_pnl = excluded.realized_pnl,
                recorded_at = excluded.recorded_at",
        )
        .bind::<Text, _>(snapshot.token_id.as_str())
        .bind::<Text, _>(snapshot.size.to_string())
        .bind::<Text, _>(snapshot.avg_entry_price.to_string())
        .bind::<Text, _>(snapshot.realized_pnl.to_string())
        .bind::<BigInt, _>(snapshot.recorded_at.timestamp_millis())
        .execute(&mut conn)
        .map_err(Error::Diesel)?;
        Ok(())
    }

    async fn save_markout(&self, sample: MarkoutSample) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        diesel::sql_query(
            "INSERT INTO markout_samples (token_id, fill_price, horizon_secs, mid_at_horizon, signed_pnl, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind::<Text, _>(sample.token_id.as_str())
        .bind::<Text, _>(sample.fill_price.to_string())
        .bind::<BigInt, _>(sample.horizon_secs)
        .bind::<Text, _>(sample.mid_at_horizon.to_string())
        .bind::<Text, _>(sample.signed_pnl.to_string())
        .bind::<BigInt, _>(sample.recorded_at.timestamp_millis())
        .execute(&mut conn)
        .map_err(Error::Diesel)?;
        Ok(())
    }

    async fn latest_position(&self, token_id: &TokenId) -> Result<Option<PositionSnapshot>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let rows: Vec<PositionRow> = diesel::sql_query("SELECT * FROM position_snapshots WHERE token_id = ?")
            .bind::<Text, _>(token_id.as_str())
            .load(&mut conn)
            .map_err(Error::Diesel)?;
        rows.into_iter()
            .next()
            .map(|r| {
                Ok(PositionSnapshot {
                    token_id: TokenId::new(r.token_id),
                    size: parse_decimal(&r.size)?,
                    avg_entry_price: parse_decimal(&r.avg_entry_price)?,
                    realized_pnl: parse_decimal(&r.realized_pnl)?,
                    recorded_at: chrono::DateTime::from_timestamp_millis(r.recorded_at).unwrap_or_default(),
                })
            })
            .transpose()
    }

    async fn markouts_for(&self, token_id: &TokenId) -> Result<Vec<MarkoutSample>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let rows: Vec<MarkoutRow> =
            diesel::sql_query("SELECT * FROM markout_samples WHERE token_id = ? ORDER BY recorded_at ASC")
                .bind::<Text, _>(token_id.as_str())
                .load(&mut conn)
                .map_err(Error::Diesel)?;
        rows.into_iter()
            .map(|r| {
                Ok(MarkoutSample {
                    token_id: TokenId::new(r.token_id),
                    fill_price: parse_decimal(&r.fill_price)?,
                    horizon_secs: r.horizon_secs,
                    mid_at_horizon: parse_decimal(&r.mid_at_horizon)?,
                    signed_pnl: parse_decimal(&r.signed_pnl)?,
                    recorded_at: chrono::DateTime::from_timestamp_millis(r.recorded_at).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store() -> SqliteStore {
        let pool = crate::core::ledger::create_pool("sqlite://:memory:").unwrap();
        SqliteStore::new(pool).unwrap()
    }

    #[tokio::test]
    async fn save_then_load_position_roundtrips() {
        let store = store();
        let token = TokenId::new("tok");
        store
            .save_position(PositionSnapshot {
                token_id: token.clone(),
                size: dec!(10),
                avg_entry_price: dec!(0.5),
                realized_pnl: dec!(0),
                recorded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        let loaded = store.latest_position(&token).await.unwrap().unwrap();
        assert_eq!(loaded.size, dec!(10));
    }

    #[tokio::test]
    async fn upsert_replaces_previous_snapshot() {
        let store = store();
        let token = TokenId::new("tok");
        for size in [dec!(10), dec!(20)] {
            store
                .save_position(PositionSnapshot {
                    token_id: token.clone(),
                    size,
                    avg_entry_price: dec!(0.5),
                    realized_pnl: dec!(0),
                    recorded_at: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }
        let loaded = store.latest_position(&token).await.unwrap().unwrap();
        assert_eq!(loaded.size, dec!(20));
    }

    #[tokio::test]
    async fn markouts_are_ordered_by_recorded_at() {
        let store = store();
        let token = TokenId::new("tok");
        for horizon in [5, 1] {
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
        assert_eq!(store.markouts_for(&token).await.unwrap().len(), 2);
    }
}
