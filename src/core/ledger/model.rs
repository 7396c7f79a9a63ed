//! Diesel row types for the event ledger.

use diesel::prelude::*;

use super::schema::{ledger_entries, ledger_gaps};

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = ledger_entries)]
pub struct NewLedgerEntryRow {
    pub sequence_number: i64,
    pub event_type: String,
    pub event_source: String,
    pub timestamp: String,
    pub payload: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = ledger_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LedgerEntryRow {
    pub sequence_number: i64,
    pub event_type: String,
    pub event_source: String,
    pub timestamp: String,
    pub payload: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = ledger_gaps)]
pub struct NewGapRow {
    pub expected_start: i64,
    pub expected_end: i64,
    pub detected_at: String,
    pub resolved_at: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = ledger_gaps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GapRow {
    pub id: i32,
    pub expected_start: i64,
    pub expected_end: i64,
    pub detected_at: String,
    pub resolved_at: Option<String>,
}
