//! Output conventions shared by every command.
//!
//! Each operation returns a value implementing [`CommandResult`]; `main`
//! prints either its JSON or its human form.

use serde::Serialize;
use std::path::Path;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Serialize a result, falling back to an error object.
pub fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "failed to serialize output: {}"}}"#, e))
}

/// Replace the home directory prefix with `~` for display.
pub fn condense_home(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

/// Emoji for a worker: polecats are cats, crew are people.
pub fn worker_icon(worker: &str) -> &'static str {
    if crate::polecat::is_polecat(worker) {
        "🐱"
    } else {
        "👤"
    }
}
