//! Event Ledger: append-only fact log of every order
//! submission, fill, cancellation, reconnection and circuit-breaker
//! transition, with monotonic sequence numbers, range queries, and
//! sequence-gap detection.

pub mod model;
pub mod schema;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::core::domain::{EventSource, EventType, GapInfo, LedgerEntry};
use crate::error::Result;

use model::{GapRow, LedgerEntryRow, NewGapRow, NewLedgerEntryRow};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder().max_size(5).build(manager).map_err(|e| crate::error::Error::Connection(e.to_string()))
}

/// # Errors
/// Returns an error if migrations fail to apply.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| crate::error::Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS).map_err(|e| crate::error::Error::Connection(e.to_string()))?;
    Ok(())
}

/// Aggregate counts for an operator-facing summary, with a per-source
/// breakdown alongside the per-type one.
#[derive(Debug, Clone, Default)]
pub struct LedgerSummary {
    pub total_events: u64,
    pub by_type: HashMap<&'static str, u64>,
    pub by_source: HashMap<&'static str, u64>,
    pub unresolved_gaps: u64,
}

/// Append-only event log backed by SQLite via Diesel + r2d2.
pub struct EventLedger {
    pool: DbPool,
    next_sequence: AtomicU64,
}

impl EventLedger {
    /// # Errors
    /// Returns an error if the last sequence number can't be read.
    pub fn new(pool: DbPool) -> Result<Self> {
        let mut conn = pool.get().map_err(|e| crate::error::Error::Connection(e.to_string()))?;
        let last: Option<i64> = schema::ledger_entries::table
            .select(diesel::dsl::max(schema::ledger_entries::sequence_number))
            .first(&mut conn)
            .map_err(crate::error::Error::Diesel)?;
        let next = last.map_or(1, |n| n as u64 + 1);
        Ok(Self { pool, next_sequence: AtomicU64::new(next) })
    }

    /// Append one event, assigning it the next monotonic sequence number.
    ///
    /// # Errors
    /// Persistence failures here are never fatal to the caller —
    /// but `append` still returns the error so the caller can log it.
    pub fn append(&self, event_type: EventType, source: EventSource, payload: serde_json::Value) -> Result<LedgerEntry> {
        let sequence_number = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let timestamp = Utc::now();
        let entry = LedgerEntry { sequence_number, event_type, timestamp, payload: payload.clone(), source };

        let mut conn = self.pool.get().map_err(|e| crate::error::Error::Connection(e.to_string()))?;
        let row = NewLedgerEntryRow {
            sequence_number: sequence_number as i64,
            event_type: event_type.as_str().to_string(),
            event_source: source.as_str().to_string(),
            timestamp: timestamp.to_rfc3339(),
            payload: payload.to_string(),
        };
        diesel::insert_into(schema::ledger_entries::table).values(&row).execute(&mut conn).map_err(crate::error::Error::Diesel)?;

        Ok(entry)
    }

    /// Events with `sequence_number` in `[from, to]`, ascending.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn range(&self, from: u64, to: u64) -> Result<Vec<LedgerEntry>> {
        let mut conn = self.pool.get().map_err(|e| crate::error::Error::Connection(e.to_string()))?;
        let rows: Vec<LedgerEntryRow> = schema::ledger_entries::table
            .filter(schema::ledger_entries::sequence_number.ge(from as i64))
            .filter(schema::ledger_entries::sequence_number.le(to as i64))
            .order(schema::ledger_entries::sequence_number.asc())
            .load(&mut conn)
            .map_err(crate::error::Error::Diesel)?;
        Ok(rows.into_iter().filter_map(row_to_entry).collect())
    }

    /// Record a detected gap in an upstream ws_sequence.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_gap(&self, gap: &GapInfo) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| crate::error::Error::Connection(e.to_string()))?;
        let row = NewGapRow {
            expected_start: gap.expected_start as i64,
            expected_end: gap.expected_end as i64,
            detected_at: gap.detected_at.to_rfc3339(),
            resolved_at: gap.resolved_at.map(|t| t.to_rfc3339()),
        };
        diesel::insert_into(schema::ledger_gaps::table).values(&row).execute(&mut conn).map_err(crate::error::Error::Diesel)?;
        Ok(())
    }

    /// Mark the most recent unresolved gap starting at `expected_start` as
    /// resolved.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn resolve_gap(&self, expected_start: u64, resolved_at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| crate::error::Error::Connection(e.to_string()))?;
        diesel::update(
            schema::ledger_gaps::table
                .filter(schema::ledger_gaps::expected_start.eq(expected_start as i64))
                .filter(schema::ledger_gaps::resolved_at.is_null()),
        )
        .set(schema::ledger_gaps::resolved_at.eq(Some(resolved_at.to_rfc3339())))
        .execute(&mut conn)
        .map_err(crate::error::Error::Diesel)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the summary query fails.
    pub fn summary(&self) -> Result<LedgerSummary> {
        let mut conn = self.pool.get().map_err(|e| crate::error::Error::Connection(e.to_string()))?;
        let rows: Vec<LedgerEntryRow> = schema::ledger_entries::table.load(&mut conn).map_err(crate::error::Error::Diesel)?;
        let gaps: Vec<GapRow> = schema::ledger_gaps::table
            .filter(schema::ledger_gaps::resolved_at.is_null())
            .load(&mut conn)
            .map_err(crate::error::Error::Diesel)?;

        let mut summary = LedgerSummary { total_events: rows.len() as u64, unresolved_gaps: gaps.len() as u64, ..Default::default() };
        for row in &rows {
            if let Some(event_type) = parse_event_type(&row.event_type) {
                *summary.by_type.entry(event_type.as_str()).or_insert(0) += 1;
            }
            if let Some(source) = parse_event_source(&row.event_source) {
                *summary.by_source.entry(source.as_str()).or_insert(0) += 1;
            }
        }
        Ok(summary)
    }
}

fn parse_event_type(s: &str) -> Option<EventType> {
    match s {
        "ORDER_UPDATE" => Some(EventType::OrderUpdate),
        "FILL" => Some(EventType::Fill),
        "RECONCILIATION" => Some(EventType::Reconciliation),
        "GAP_DETECTED" => Some(EventType::GapDetected),
        _ => None,
    }
}

fn parse_event_source(s: &str) -> Option<EventSource> {
    match s {
        "websocket" => Some(EventSource::Websocket),
        "api" => Some(EventSource::Api),
        "system" => Some(EventSource::System),
        _ => None,
    }
}

fn row_to_entry(row: LedgerEntryRow) -> Option<LedgerEntry> {
    Some(LedgerEntry {
        sequence_number: row.sequence_number as u64,
        event_type: parse_event_type(&row.event_type)?,
        timestamp: DateTime::parse_from_rfc3339(&row.timestamp).ok()?.with_timezone(&Utc),
        payload: serde_json::from_str(&row.payload).ok()?,
        source: parse_event_source(&row.event_source)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> EventLedger {
        let pool = create_pool(":memory:").unwrap();
        run_migrations(&pool).unwrap();
        EventLedger::new(pool).unwrap()
    }

    #[test]
    fn sequence_numbers_are_monotonic() {
        let l = ledger();
        let a = l.append(EventType::OrderUpdate, EventSource::Websocket, serde_json::json!({})).unwrap();
        let b = l.append(EventType::Fill, EventSource::Websocket, serde_json::json!({})).unwrap();
        assert_eq!(b.sequence_number, a.sequence_number + 1);
    }

    #[test]
    fn range_returns_only_requested_window() {
        let l = ledger();
        for _ in 0..5 {
            l.append(EventType::OrderUpdate, EventSource::Api, serde_json::json!({})).unwrap();
        }
        let entries = l.range(2, 3).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence_number, 2);
    }

    #[test]
    fn summary_counts_by_type_and_source() {
        let l = ledger();
        l.append(EventType::Fill, EventSource::Websocket, serde_json::json!({})).unwrap();
        l.append(EventType::Fill, EventSource::Api, serde_json::json!({})).unwrap();
        let summary = l.summary().unwrap();
        assert_eq!(summary.total_events, 2);
        assert_eq!(summary.by_type[EventType::Fill.as_str()], 2);
    }

    #[test]
    fn gap_resolution_clears_unresolved_count() {
        let l = ledger();
        let now = Utc::now();
        l.record_gap(&GapInfo { expected_start: 10, expected_end: 12, detected_at: now, resolved_at: None }).unwrap();
        assert_eq!(l.summary().unwrap().unresolved_gaps, 1);
        l.resolve_gap(10, now).unwrap();
        assert_eq!(l.summary().unwrap().unresolved_gaps, 0);
    }
}
