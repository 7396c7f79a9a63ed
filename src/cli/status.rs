//! Handler for the `status` command.

use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Duration, Utc};

use crate::app::StatusFile;

/// Default path for the status file.
const DEFAULT_STATUS_PATH: &str = "/var/run/quotekeeper/status.json";

/// Execute the status command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    if let Some(status) = try_read_status_file(DEFAULT_STATUS_PATH) {
        display_rich_status(&status, version);
    } else {
        display_basic_status(version);
    }
}

/// Try to read the status file and return parsed status if valid.
fn try_read_status_file(path: &str) -> Option<StatusFile> {
    let path = Path::new(path);
    let content = fs::read_to_string(path).ok()?;
    let status: StatusFile = serde_json::from_str(&content).ok()?;

    if !is_pid_alive(status.pid) {
        return None;
    }
    if status.updated_at < Utc::now() - Duration::minutes(5) {
        return None;
    }

    Some(status)
}

/// Check if a process with the given PID is still running.
fn is_pid_alive(pid: u32) -> bool {
    let result = unsafe { libc::kill(pid as i32, 0) };
    if result == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Format uptime as "3d 14h 22m" style.
fn format_uptime(started_at: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(started_at);

    let total_minutes = duration.num_minutes();
    if total_minutes < 0 {
        return "just started".to_string();
    }

    let days = duration.num_days();
    let hours = duration.num_hours() % 24;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Display rich status output from the status file.
fn display_rich_status(status: &StatusFile, version: &str) {
    let uptime = format_uptime(status.started_at);

    println!();
    println!("quotekeeper v{version}");
    println!("────────────────────────────────────────────────────────");
    println!("Status:      ● running (pid {})", status.pid);
    println!("Uptime:      {uptime}");
    println!("Markets:     {} configured, {} quoting", status.config.markets, status.runtime.markets_quoting);
    println!("Dry run:     {}", status.config.dry_run);
    println!();
    println!("Breaker:     {}", status.runtime.breaker_state);
    println!("Exposure:    ${} / ${} max", status.runtime.exposure_current, status.runtime.exposure_max);
    println!(
        "Today:       {} fills, ${} realized, {} redemptions",
        status.today.fills, status.today.realized_pnl, status.today.redemptions_completed
    );
    println!();
}

/// Display basic systemd status (fallback).
fn display_basic_status(version: &str) {
    let output = Command::new("systemctl").args(["is-active", "quotekeeper"]).output();

    let status = match output {
        Ok(out) => {
            let status_str = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if status_str == "active" {
                "● running"
            } else if status_str == "inactive" {
                "○ stopped"
            } else {
                "? unknown"
            }
        }
        Err(_) => "? systemd not available",
    };

    let pid = Command::new("systemctl")
        .args(["show", "quotekeeper", "--property=MainPID", "--value"])
        .output()
        .ok()
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|p| p != "0" && !p.is_empty());

    println!();
    println!("quotekeeper v{version}");
    println!("────────────────────────────────────────────────────────");

    if let Some(ref p) = pid {
        println!("Status:      {status} (pid {p})");
    } else {
        println!("Status:      {status}");
    }

    println!();
    println!("Use 'quotekeeper logs' to view logs");
    println!("Use 'sudo systemctl start quotekeeper' to start");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn format_uptime_minutes_only() {
        let now = Utc::now();
        assert_eq!(format_uptime(now - Duration::minutes(45)), "45m");
    }

    #[test]
    fn format_uptime_hours_and_minutes() {
        let now = Utc::now();
        assert_eq!(format_uptime(now - Duration::hours(3) - Duration::minutes(22)), "3h 22m");
    }

    #[test]
    fn format_uptime_days_hours_minutes() {
        let now = Utc::now();
        assert_eq!(format_uptime(now - Duration::days(2) - Duration::hours(5) - Duration::minutes(10)), "2d 5h 10m");
    }

    #[test]
    fn format_uptime_just_started() {
        let now = Utc::now();
        assert_eq!(format_uptime(now + Duration::minutes(5)), "just started");
    }

    #[test]
    fn is_pid_alive_current_process() {
        assert!(is_pid_alive(std::process::id()));
    }

    #[test]
    fn is_pid_alive_nonexistent() {
        assert!(!is_pid_alive(999_999_999));
    }
}
