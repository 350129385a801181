//! Append-only record of every `rig` invocation, one JSON object per line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the command finished
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "crew add", "sling")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,

    /// Directory the command ran from
    pub cwd: String,
}

impl ActionLog {
    pub fn new(
        command: &str,
        args: serde_json::Value,
        error: Option<String>,
        duration: Duration,
        cwd: &Path,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            command: command.to_string(),
            args,
            success: error.is_none(),
            error,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            user: current_user(),
            cwd: cwd.to_string_lossy().to_string(),
        }
    }
}

/// Append `entry` to the log at `path`. `None` means logging is off.
///
/// Never fails the command: problems are reported as a warning on stderr.
pub fn log_action(path: Option<&Path>, entry: &ActionLog) {
    let Some(path) = path else {
        return;
    };
    if let Err(e) = write_log_entry(path, entry) {
        eprintln!("Warning: Failed to write action log: {}", e);
    }
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
