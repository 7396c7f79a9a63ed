//! Status file for external monitoring.
//!
//! Writes a JSON status file that external tools can poll to monitor
//! the health and activity of the running engine.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;

/// Current status file format version.
const STATUS_VERSION: &str = "1";

/// Top-level status file structure.
#[derive(Debug, Clone, Serialize)]
pub struct StatusFile {
    /// Schema version for forward compatibility.
    pub version: String,
    /// When the process started.
    pub started_at: DateTime<Utc>,
    /// Process ID.
    pub pid: u32,
    /// Static configuration snapshot.
    pub config: StatusConfig,
    /// Runtime state (positions, exposure, circuit breaker).
    pub runtime: StatusRuntime,
    /// Today's activity counters.
    pub today: StatusToday,
    /// When this file was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Static configuration snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusConfig {
    /// Number of token pairs being quoted.
    pub markets: usize,
    /// Whether running in dry-run mode.
    pub dry_run: bool,
}

/// Runtime state information.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusRuntime {
    /// Number of markets currently quoting.
    pub markets_quoting: usize,
    /// Current total exposure in dollars.
    pub exposure_current: Decimal,
    /// Maximum allowed exposure.
    pub exposure_max: Decimal,
    /// Circuit breaker state ("normal", "warning", "halted", "recovering").
    pub breaker_state: String,
}

/// Today's activity counters (reset daily).
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusToday {
    /// Fills received.
    pub fills: u64,
    /// Realized P&L in dollars.
    pub realized_pnl: Decimal,
    /// Redemptions completed.
    pub redemptions_completed: u64,
}

/// Writer for the status file.
///
/// Thread-safe wrapper that manages atomic updates to the status file.
pub struct StatusWriter {
    path: PathBuf,
    status: Mutex<StatusFile>,
}

impl StatusWriter {
    /// Create a new status writer.
    #[must_use]
    pub fn new(path: PathBuf, config: StatusConfig) -> Self {
        let now = Utc::now();
        let status = StatusFile {
            version: STATUS_VERSION.to_string(),
            started_at: now,
            pid: std::process::id(),
            config,
            runtime: StatusRuntime::default(),
            today: StatusToday::default(),
            updated_at: now,
        };

        Self { path, status: Mutex::new(status) }
    }

    /// Write the current status to the file atomically.
    ///
    /// Uses write-to-temp-then-rename pattern for atomicity.
    /// Creates parent directory if it doesn't exist.
    #[allow(clippy::result_large_err)]
    pub fn write(&self) -> Result<()> {
        let json = {
            let mut status = self.status.lock();
            status.updated_at = Utc::now();
            serde_json::to_string_pretty(&*status)?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, &self.path).map_err(cleanup_and_err)?;

        Ok(())
    }

    /// Update runtime state.
    pub fn update_runtime(
        &self,
        markets_quoting: usize,
        exposure_current: Decimal,
        exposure_max: Decimal,
        breaker_state: &str,
    ) {
        let mut status = self.status.lock();
        status.runtime.markets_quoting = markets_quoting;
        status.runtime.exposure_current = exposure_current;
        status.runtime.exposure_max = exposure_max;
        status.runtime.breaker_state = breaker_state.to_string();
    }

    /// Overwrite today's activity counters with freshly computed totals.
    pub fn update_today(&self, fills: u64, realized_pnl: Decimal) {
        let mut status = self.status.lock();
        status.today.fills = fills;
        status.today.realized_pnl = realized_pnl;
    }

    /// Record a completed redemption.
    pub fn record_redemption(&self) {
        let mut status = self.status.lock();
        status.today.redemptions_completed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_config() -> StatusConfig {
        StatusConfig { markets: 2, dry_run: false }
    }

    #[test]
    fn status_file_serializes_expected_fields() {
        let status = StatusFile {
            version: "1".to_string(),
            started_at: Utc::now(),
            pid: 12345,
            config: test_config(),
            runtime: StatusRuntime::default(),
            today: StatusToday::default(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&status).unwrap();
        assert!(json.contains("\"version\": \"1\""));
        assert!(json.contains("\"pid\": 12345"));
        assert!(json.contains("\"markets\": 2"));
    }

    #[test]
    fn status_writer_update_runtime_tracks_latest_values() {
        let path = PathBuf::from("/tmp/quotekeeper_test_status.json");
        let writer = StatusWriter::new(path, test_config());

        writer.update_runtime(3, dec!(1000), dec!(10000), "normal");

        let status = writer.status.lock();
        assert_eq!(status.runtime.markets_quoting, 3);
        assert_eq!(status.runtime.exposure_current, dec!(1000));
        assert_eq!(status.runtime.breaker_state, "normal");
    }

    #[test]
    fn status_writer_update_today_overwrites_counters() {
        let path = PathBuf::from("/tmp/quotekeeper_test_status.json");
        let writer = StatusWriter::new(path, test_config());

        writer.update_today(2, dec!(4.25));

        let status = writer.status.lock();
        assert_eq!(status.today.fills, 2);
        assert_eq!(status.today.realized_pnl, dec!(4.25));
    }

    #[test]
    fn status_writer_writes_file_atomically() {
        let temp_dir = std::env::temp_dir();
        let path = temp_dir.join("quotekeeper_test_status_write.json");

        let writer = StatusWriter::new(path.clone(), test_config());
        writer.update_runtime(1, dec!(500), dec!(5000), "warning");
        writer.update_today(1, dec!(1.50));

        writer.write().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"markets_quoting\": 1"));
        assert!(content.contains("\"fills\": 1"));

        let _ = fs::remove_file(&path);
    }
}
