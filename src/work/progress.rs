//! Parsing `progress.md`.
//!
//! The document is edited by hand and by agents, so the parser is lenient:
//! it picks out what it recognizes and reports suspicious lines as
//! warnings instead of failing.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// One checklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub done: bool,
    pub description: String,
}

/// A line that looked like a checklist entry but could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based line number in the document
    pub line: usize,
    pub text: String,
}

/// Structured view of a progress document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseWarning>,
}

impl Progress {
    /// Description of the first task not yet done.
    pub fn current_task(&self) -> Option<&str> {
        self.tasks
            .iter()
            .find(|task| !task.done)
            .map(|task| task.description.as_str())
    }
}

struct Patterns {
    status: Regex,
    assigned: Regex,
    checklist: Regex,
    notes: Regex,
    task: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        status: Regex::new(r"(?i)^##\s*Status:\s*(.+)$").expect("Invalid regex"),
        assigned: Regex::new(r"(?i)^##\s*Assigned to:\s*(.*)$").expect("Invalid regex"),
        checklist: Regex::new(r"(?i)^##\s*Checklist\s*$").expect("Invalid regex"),
        notes: Regex::new(r"(?i)^##\s*Notes\s*$").expect("Invalid regex"),
        task: Regex::new(r"^-\s*\[(.)\]\s*(.+)$").expect("Invalid regex"),
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Checklist,
    Notes,
}

/// Parse a progress document. Never fails.
pub fn parse_progress(content: &str) -> Progress {
    let p = patterns();
    let mut progress = Progress::default();
    let mut section = Section::Other;
    let mut notes = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if let Some(caps) = p.status.captures(line) {
            progress.status = non_empty(&caps[1]);
            continue;
        }
        if let Some(caps) = p.assigned.captures(line) {
            progress.assigned_to = non_empty(&caps[1]);
            continue;
        }
        if p.checklist.is_match(line) {
            section = Section::Checklist;
            continue;
        }
        if p.notes.is_match(line) {
            section = Section::Notes;
            continue;
        }

        match section {
            Section::Checklist => {
                if let Some(caps) = p.task.captures(line) {
                    progress.tasks.push(Task {
                        done: caps[1].eq_ignore_ascii_case("x"),
                        description: caps[2].trim().to_string(),
                    });
                } else if line.trim_start().starts_with("- [") {
                    progress.warnings.push(ParseWarning {
                        line: index + 1,
                        text: line.to_string(),
                    });
                }
            }
            Section::Notes => {
                if !line.trim().is_empty() {
                    notes.push(line);
                }
            }
            Section::Other => {}
        }
    }

    progress.notes = notes.join("\n");
    progress
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
