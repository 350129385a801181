//! Canonical names and paths for repositories, workers and work items.
//!
//! Everything here is pure: the same inputs always give the same outputs and
//! nothing touches the filesystem. Callers validate names before building
//! paths from them.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Separates the repository from the worker in a worker session name.
pub const SESSION_SEPARATOR: char = '@';

/// Suffix of a persistent worker's own branch (`<worker>/work`).
pub const WORK_BRANCH_SUFFIX: &str = "/work";

/// Prefix of a work item's feature branch (`feat/<item>`).
pub const FEATURE_BRANCH_PREFIX: &str = "feat/";

/// Directory (relative to a checkout) holding work item documents.
pub const WORK_DIR: &str = "work";

/// Directory (relative to `work/`) holding formula documents.
pub const FORMULA_DIR: &str = "formula";

/// Formula used when none is named.
pub const DEFAULT_FORMULA: &str = "build";

/// Longest accepted worker or work item name.
pub const MAX_NAME_LEN: usize = 50;

const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', SESSION_SEPARATOR];

/// Validate a worker or work item name.
///
/// Fails closed: a bad name is rejected, never rewritten.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName("name cannot be empty".to_string()));
    }
    if name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(Error::InvalidName(format!(
            "name cannot contain special characters (/, \\, :, {}): {}",
            SESSION_SEPARATOR, name
        )));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Err(Error::InvalidName(format!(
            "name cannot start with . or -: {}",
            name
        )));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidName(format!(
            "name too long (max {} chars): {}",
            MAX_NAME_LEN, name
        )));
    }
    Ok(())
}

/// `<repos_root>/<repo>`
pub fn repo_path(repos_root: &Path, repo: &str) -> PathBuf {
    repos_root.join(repo)
}

/// `<workers_root>/<repo>/<worker>`
pub fn worker_path(workers_root: &Path, repo: &str, worker: &str) -> PathBuf {
    workers_root.join(repo).join(worker)
}

/// A repository session is named after the repository itself.
pub fn repo_session_name(repo: &str) -> String {
    repo.to_string()
}

/// `<repo>@<worker>`
pub fn worker_session_name(repo: &str, worker: &str) -> String {
    format!("{}{}{}", repo, SESSION_SEPARATOR, worker)
}

/// Split `<repo>@<worker>` back into its parts.
///
/// Returns `None` for repository sessions (no separator).
pub fn split_session_name(session: &str) -> Option<(&str, &str)> {
    session.split_once(SESSION_SEPARATOR)
}

/// tmux silently turns `.` into `_` in session names. Apply the same
/// rewrite before comparing a name we built with one tmux reports.
pub fn normalize_session_name(name: &str) -> String {
    name.replace('.', "_")
}

/// `<worker>/work`
pub fn work_branch_name(worker: &str) -> String {
    format!("{}{}", worker, WORK_BRANCH_SUFFIX)
}

/// `feat/<item>`
pub fn feature_branch_name(work_item: &str) -> String {
    format!("{}{}", FEATURE_BRANCH_PREFIX, work_item)
}

/// `feat/build-frontend` -> `build-frontend`
pub fn work_item_from_branch(branch: &str) -> Option<&str> {
    branch
        .strip_prefix(FEATURE_BRANCH_PREFIX)
        .filter(|name| !name.is_empty())
}

/// `<checkout>/work/<item>`
pub fn work_item_dir(checkout: &Path, work_item: &str) -> PathBuf {
    checkout.join(WORK_DIR).join(work_item)
}

/// `<checkout>/work/formula`
pub fn formula_dir(checkout: &Path) -> PathBuf {
    checkout.join(WORK_DIR).join(FORMULA_DIR)
}

/// `<checkout>/work/formula/<formula>.md`
pub fn formula_path(checkout: &Path, formula: &str) -> PathBuf {
    formula_dir(checkout).join(format!("{}.md", formula))
}

/// Parse a `work/<name>` reference as typed on the command line.
///
/// A single trailing slash is tolerated (shell completion adds one).
pub fn parse_work_reference(reference: &str) -> Result<String> {
    let trimmed = reference.strip_suffix('/').unwrap_or(reference);
    match trimmed.split('/').collect::<Vec<_>>().as_slice() {
        [WORK_DIR, name] if !name.is_empty() => Ok((*name).to_string()),
        _ => Err(Error::InvalidWorkPath(reference.to_string())),
    }
}
