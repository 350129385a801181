//! Rig - map repositories to tmux sessions, crew worktrees and polecats.
//!
//! This library provides the core functionality for the `rig` CLI tool:
//! resolving which repository a command applies to, keeping worker
//! worktrees and sessions in step, and tracking file-based work items.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod crew;
pub mod git;
pub mod naming;
pub mod polecat;
pub mod prompt;
pub mod rigs;
pub mod sling;
pub mod tmux;
pub mod work;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use config::Settings;
use git::WorktreeBackend;
use prompt::Prompt;
use tmux::SessionBackend;

/// Everything an operation needs from the outside world.
///
/// Built once in `main` and passed by reference; no component reads
/// process-wide state on its own.
#[derive(Clone, Copy)]
pub struct Ctx<'a> {
    pub settings: &'a Settings,
    pub git: &'a dyn WorktreeBackend,
    pub sessions: &'a dyn SessionBackend,
    pub prompt: &'a dyn Prompt,
}

impl<'a> Ctx<'a> {
    pub fn new(
        settings: &'a Settings,
        git: &'a dyn WorktreeBackend,
        sessions: &'a dyn SessionBackend,
        prompt: &'a dyn Prompt,
    ) -> Self {
        Self {
            settings,
            git,
            sessions,
            prompt,
        }
    }
}

/// Library-level error type for rig operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Repo not found: {}", .0.display())]
    RepositoryNotFound(PathBuf),

    #[error("Crew workspace not found: {}\nUse '{hint}' first", .path.display())]
    WorkspaceNotFound { path: PathBuf, hint: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(
        "Could not infer rig. Use --rig=<repo> or run from within a repo in {} or {}",
        .repos_root.display(),
        .workers_root.display()
    )]
    AmbiguousContext {
        repos_root: PathBuf,
        workers_root: PathBuf,
    },

    #[error("Could not find base branch (tried: {})", .tried.join(", "))]
    NoBaseBranch { tried: Vec<String> },

    #[error("Failed to create session: {0}")]
    SessionCreationFailed(String),

    #[error("Failed to create worktree: {0}")]
    WorktreeCreationFailed(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Formula not found: {name}\n{}", available_formulas(.available))]
    FormulaNotFound { name: String, available: Vec<String> },

    #[error("Work path must be in format 'work/<name>', got: {0}")]
    InvalidWorkPath(String),

    #[error("Work directory not found: work/{0}\nRun 'rig work create {0}' first")]
    WorkItemNotFound(String),

    #[error("Feature branch not found: {branch}\nRun 'rig work create {work}' first")]
    BranchNotFound { branch: String, work: String },

    #[error("git: {0}")]
    Git(String),

    #[error("tmux: {0}")]
    Tmux(String),

    #[error("Config error: {0}")]
    Config(String),
}

fn available_formulas(available: &[String]) -> String {
    if available.is_empty() {
        "No formulas available".to_string()
    } else {
        format!("Available formulas: {}", available.join(", "))
    }
}

/// Result type alias for rig operations.
pub type Result<T> = std::result::Result<T, Error>;
