//! Version-control worktree backend.
//!
//! Orchestration code talks to git only through [`WorktreeBackend`]. The
//! production implementation is [`GitCli`], which shells out to `git`;
//! tests substitute an in-memory double.

mod cli;

pub use cli::GitCli;

use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Branch names tried, in order, after the remote default and the
/// configured default.
pub const COMMON_BASE_BRANCHES: &[&str] = &["main", "master", "develop"];

/// A worktree registered with a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    pub path: PathBuf,
    /// Checked-out branch, `None` when HEAD is detached.
    pub branch: Option<String>,
}

/// Worktree and branch operations.
///
/// Every method names the repository (or checkout) it acts on; nothing
/// depends on the process working directory.
pub trait WorktreeBackend {
    /// Whether `refs/heads/<branch>` exists.
    fn branch_exists(&self, repo: &Path, branch: &str) -> bool;

    /// The branch `origin/HEAD` points at, if recorded.
    fn default_remote_branch(&self, repo: &Path) -> Option<String>;

    /// Create a worktree on a new branch started from `from`.
    fn create_worktree(&self, repo: &Path, path: &Path, new_branch: &str, from: &str)
    -> Result<()>;

    /// Create a worktree on a branch that already exists.
    fn create_worktree_from_branch(&self, repo: &Path, path: &Path, branch: &str) -> Result<()>;

    /// Remove a worktree, discarding local changes.
    fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<()>;

    /// Drop metadata for worktrees whose directories are gone.
    fn prune_worktrees(&self, repo: &Path) -> Result<()>;

    fn delete_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Branch checked out at `path` (empty when detached).
    fn current_branch(&self, path: &Path) -> Result<String>;

    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()>;

    /// Top level of the repository containing `path`.
    fn repository_root(&self, path: &Path) -> Result<PathBuf>;

    fn is_repository(&self, path: &Path) -> bool;

    fn list_worktrees(&self, repo: &Path) -> Result<Vec<Worktree>>;

    /// Create `branch` from `from` and check it out in `repo`.
    fn create_branch_and_checkout(&self, repo: &Path, branch: &str, from: &str) -> Result<()>;

    /// Porcelain status for `paths` (empty when clean).
    fn pending_changes(&self, repo: &Path, paths: &[&Path]) -> Result<String>;

    /// Stage `paths` and commit them with `message`.
    fn commit_paths(&self, repo: &Path, paths: &[&Path], message: &str) -> Result<()>;

    /// Whether `path` is one of the worktrees registered with `repo`.
    fn worktree_is_registered(&self, repo: &Path, path: &Path) -> bool {
        self.list_worktrees(repo)
            .map(|worktrees| worktrees.iter().any(|wt| same_path(&wt.path, path)))
            .unwrap_or(false)
    }
}

/// Pick the branch new work starts from.
///
/// Order: the remote default (if it also exists locally), the configured
/// default, then [`COMMON_BASE_BRANCHES`].
pub fn resolve_base_branch(
    git: &dyn WorktreeBackend,
    repo: &Path,
    configured: &str,
) -> Result<String> {
    if let Some(remote) = git.default_remote_branch(repo) {
        if git.branch_exists(repo, &remote) {
            return Ok(remote);
        }
    }

    let mut tried = vec!["origin/HEAD".to_string()];
    for candidate in std::iter::once(configured).chain(COMMON_BASE_BRANCHES.iter().copied()) {
        if tried.iter().any(|t| t == candidate) {
            continue;
        }
        if git.branch_exists(repo, candidate) {
            return Ok(candidate.to_string());
        }
        tried.push(candidate.to_string());
    }

    Err(Error::NoBaseBranch { tried })
}

/// Parse `git worktree list --porcelain`.
pub fn parse_worktree_porcelain(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(done) = current.take() {
                worktrees.push(done);
            }
            current = Some(Worktree {
                path: PathBuf::from(path),
                branch: None,
            });
        } else if let Some(branch) = line.strip_prefix("branch ") {
            if let Some(wt) = current.as_mut() {
                let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);
                wt.branch = Some(branch.to_string());
            }
        }
    }
    if let Some(done) = current {
        worktrees.push(done);
    }

    worktrees
}

/// The worktree that has `branch` checked out.
pub fn worktree_for_branch<'a>(worktrees: &'a [Worktree], branch: &str) -> Option<&'a Worktree> {
    worktrees
        .iter()
        .find(|wt| wt.branch.as_deref() == Some(branch))
}

/// Compare two paths, looking through symlinks where the paths exist.
///
/// git reports canonical paths (`/private/tmp` on macOS), while rig builds
/// them from the configured roots. A missing leaf is resolved through its
/// parent.
pub fn same_path(a: &Path, b: &Path) -> bool {
    a == b || canonical(a) == canonical(b)
}

fn canonical(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => canonical(parent).join(name),
        _ => path.to_path_buf(),
    }
}
