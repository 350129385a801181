//! Crew workspaces: one git worktree plus one tmux session per worker.
//!
//! A workspace can drift out of step with git or tmux (directory deleted by
//! hand, session killed, worktree never registered). Every operation here
//! looks at all three before acting.

use crate::commands::{CommandResult, condense_home, json, worker_icon};
use crate::context::{SessionWorkspace, session_workspace};
use crate::git::resolve_base_branch;
use crate::naming::{
    FEATURE_BRANCH_PREFIX, normalize_session_name, repo_path,
    validate_name, work_branch_name, worker_path, worker_session_name,
};
use crate::polecat::{self, file_name, sorted_subdirs};
use crate::tmux::SessionSpec;
use crate::{Ctx, Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// How `add` or `start` got the worker running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerAction {
    /// New worktree on a new branch
    Created,
    /// New worktree on a branch that already existed
    CreatedFromExistingBranch,
    /// Worktree was there, session had to be recreated
    SessionRecreated,
    /// Worktree and session were both there
    Attached,
}

/// Result of `crew add` and `crew start`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerOutcome {
    pub repo: String,
    pub worker: String,
    pub path: PathBuf,
    pub session: String,
    pub branch: String,
    pub action: WorkerAction,
}

impl CommandResult for WorkerOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let what = match self.action {
            WorkerAction::Created | WorkerAction::CreatedFromExistingBranch => "created",
            WorkerAction::SessionRecreated => "resumed",
            WorkerAction::Attached => "attached",
        };
        format!(
            "✓ {} {} on {} {} ({}, branch {})",
            worker_icon(&self.worker),
            self.worker,
            self.repo,
            what,
            condense_home(&self.path),
            self.branch
        )
    }
}

/// Which of the divergent states `remove` cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Removed {
    /// Registered worktree with its directory
    Worktree,
    /// Session whose worktree was already gone
    SessionOnly,
    /// Worktree metadata whose directory was already gone
    DetachedMetadata,
    /// Directory git did not know about
    DanglingDirectory,
}

/// Result of `crew remove`.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveOutcome {
    pub repo: String,
    pub worker: String,
    pub path: PathBuf,
    pub removed: Removed,
    pub session_killed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_deleted: Option<String>,
}

impl CommandResult for RemoveOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.session_killed {
            lines.push(format!(
                "✓ Session killed: {}",
                worker_session_name(&self.repo, &self.worker)
            ));
        }
        if let Some(branch) = &self.branch_deleted {
            lines.push(format!("✓ Branch deleted: {}", branch));
        }
        lines.push(match self.removed {
            Removed::Worktree => format!(
                "✓ Crew workspace removed: {} on {}",
                self.worker, self.repo
            ),
            Removed::SessionOnly => "✓ Orphaned session removed (no worktree)".to_string(),
            Removed::DetachedMetadata => format!(
                "✓ Stale worktree metadata pruned for {} on {}",
                self.worker, self.repo
            ),
            Removed::DanglingDirectory => {
                format!("✓ Unregistered directory deleted: {}", self.path.display())
            }
        });
        lines.join("\n")
    }
}

/// Create a workspace for `worker` on `repo` (or resume it) and attach.
pub fn add(ctx: &Ctx<'_>, repo: &str, worker: &str) -> Result<WorkerOutcome> {
    validate_name(worker)?;
    let settings = ctx.settings;
    let repo_dir = repo_path(&settings.repos_root, repo);
    if !ctx.git.is_repository(&repo_dir) {
        return Err(Error::RepositoryNotFound(repo_dir));
    }

    let path = worker_path(&settings.workers_root, repo, worker);
    let session = worker_session_name(repo, worker);
    let branch = work_branch_name(worker);

    if path.exists() {
        let action = if ctx.sessions.exists(&session) {
            ctx.prompt.note(&format!(
                "Crew workspace already exists and session is running\nAttaching to existing session: {}",
                session
            ));
            WorkerAction::Attached
        } else {
            if !ctx.git.worktree_is_registered(&repo_dir, &path) {
                ctx.prompt.warn(&format!(
                    "{} exists but is not a registered worktree of {}",
                    path.display(),
                    repo
                ));
            }
            ctx.prompt
                .note("Crew workspace exists but session is not running\nRecreating session...");
            let current = ctx
                .git
                .current_branch(&path)
                .ok()
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| branch.clone());
            create_session(ctx, repo, worker, &current, &path)?;
            ctx.prompt.note(&format!("✓ Session recreated: {}", session));
            WorkerAction::SessionRecreated
        };
        ctx.sessions.attach(&session)?;
        return Ok(WorkerOutcome {
            repo: repo.to_string(),
            worker: worker.to_string(),
            path,
            session,
            branch,
            action,
        });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let reuse_branch = ctx.git.branch_exists(&repo_dir, &branch);
    if reuse_branch {
        ctx.prompt.note(&format!("Branch {} already exists", branch));
        if !ctx.prompt.confirm("Use existing branch?", true) {
            return Err(Error::Cancelled(
                "delete the branch first or use a different crew name".to_string(),
            ));
        }
    }

    ctx.prompt.note(&format!(
        "Creating crew workspace for {} on {}\n  Repo: {}\n  Workspace: {}",
        worker,
        repo,
        repo_dir.display(),
        path.display()
    ));

    let created = if reuse_branch {
        ctx.git.create_worktree_from_branch(&repo_dir, &path, &branch)
    } else {
        let base = resolve_base_branch(ctx.git, &repo_dir, &settings.default_branch)?;
        ctx.prompt
            .note(&format!("  Branch: {} (from {})", branch, base));
        ctx.git.create_worktree(&repo_dir, &path, &branch, &base)
    };
    if let Err(e) = created {
        rollback(ctx, &repo_dir, &path, &branch, !reuse_branch);
        return Err(Error::WorktreeCreationFailed(e.to_string()));
    }
    tracing::info!(repo, worker, path = %path.display(), "created worktree");
    ctx.prompt
        .note(&format!("✓ Crew workspace created: {}", path.display()));

    if let Err(e) = create_session(ctx, repo, worker, &branch, &path) {
        ctx.prompt
            .note("Session creation failed, cleaning up worktree...");
        rollback(ctx, &repo_dir, &path, &branch, !reuse_branch);
        return Err(e);
    }
    ctx.prompt.note(&format!("✓ Session created: {}", session));

    ctx.sessions.attach(&session)?;
    Ok(WorkerOutcome {
        repo: repo.to_string(),
        worker: worker.to_string(),
        path,
        session,
        branch,
        action: if reuse_branch {
            WorkerAction::CreatedFromExistingBranch
        } else {
            WorkerAction::Created
        },
    })
}

/// Attach to an existing workspace, recreating its session if needed.
pub fn start(ctx: &Ctx<'_>, repo: &str, worker: &str) -> Result<WorkerOutcome> {
    validate_name(worker)?;
    let path = worker_path(&ctx.settings.workers_root, repo, worker);
    let session = worker_session_name(repo, worker);
    let expected = work_branch_name(worker);

    if !path.exists() {
        return Err(Error::WorkspaceNotFound {
            path,
            hint: format!("rig crew add {} --rig={}", worker, repo),
        });
    }

    let mut branch = ctx.git.current_branch(&path).unwrap_or_default();
    // polecats and reassigned crew legitimately sit on feature branches
    if !branch.is_empty() && branch != expected && !branch.starts_with(FEATURE_BRANCH_PREFIX) {
        ctx.prompt.note(&format!(
            "Workspace is on branch '{}', expected '{}'",
            branch, expected
        ));
        if ctx.prompt.confirm(&format!("Switch to {}?", expected), true) {
            ctx.git.checkout_branch(&path, &expected)?;
            ctx.prompt
                .note(&format!("✓ Switched to branch {}", expected));
            branch = expected.clone();
        }
    }
    if branch.is_empty() {
        branch = expected;
    }

    let action = if ctx.sessions.exists(&session) {
        WorkerAction::Attached
    } else {
        ctx.prompt.note("Session doesn't exist, recreating...");
        create_session(ctx, repo, worker, &branch, &path)?;
        ctx.prompt.note(&format!("✓ Session created: {}", session));
        WorkerAction::SessionRecreated
    };

    ctx.sessions.attach(&session)?;
    Ok(WorkerOutcome {
        repo: repo.to_string(),
        worker: worker.to_string(),
        path,
        session,
        branch,
        action,
    })
}

/// Remove a workspace, reconciling whatever state it is in.
pub fn remove(ctx: &Ctx<'_>, repo: &str, worker: &str) -> Result<RemoveOutcome> {
    validate_name(worker)?;
    let settings = ctx.settings;
    let repo_dir = repo_path(&settings.repos_root, repo);
    if !ctx.git.is_repository(&repo_dir) {
        return Err(Error::RepositoryNotFound(repo_dir));
    }

    let path = worker_path(&settings.workers_root, repo, worker);
    let session = worker_session_name(repo, worker);
    let branch = work_branch_name(worker);
    let outcome = |removed, session_killed, branch_deleted| RemoveOutcome {
        repo: repo.to_string(),
        worker: worker.to_string(),
        path: path.clone(),
        removed,
        session_killed,
        branch_deleted,
    };

    let dir_exists = path.exists();
    let mut registered = ctx.git.worktree_is_registered(&repo_dir, &path);
    let mut detached = false;

    if registered && !dir_exists {
        ctx.prompt.note(
            "Worktree is in detached state (git knows about it but directory is gone)\nCleaning up git worktree metadata...",
        );
        if let Err(e) = ctx.git.remove_worktree(&repo_dir, &path) {
            tracing::debug!(error = %e, "detached worktree: remove failed, relying on prune");
        }
        prune(ctx, &repo_dir);
        registered = false;
        detached = true;
    }

    if !dir_exists && !registered {
        if ctx.sessions.exists(&session) {
            ctx.prompt
                .note("Only session exists (no worktree), killing it...");
            ctx.sessions.kill(&session)?;
            let removed = if detached {
                Removed::DetachedMetadata
            } else {
                Removed::SessionOnly
            };
            return Ok(outcome(removed, true, None));
        }
        if detached {
            return Ok(outcome(Removed::DetachedMetadata, false, None));
        }
        return Err(Error::NotFound(format!(
            "crew workspace not found: {}",
            path.display()
        )));
    }

    warn_if_inside(ctx, &session);

    if !registered {
        ctx.prompt.warn(&format!(
            "{} exists but is not a registered worktree of {}",
            path.display(),
            repo
        ));
        if !ctx
            .prompt
            .confirm(&format!("Delete directory {}?", path.display()), false)
        {
            return Err(Error::Cancelled(format!(
                "left {} in place",
                path.display()
            )));
        }
        let killed = kill_if_live(ctx, &session)?;
        fs::remove_dir_all(&path)?;
        prune(ctx, &repo_dir);
        remove_dir_if_empty(ctx, path.parent());
        return Ok(outcome(Removed::DanglingDirectory, killed, None));
    }

    // asked before the kill so the question is seen even from inside the session
    let delete_branch = ctx.git.branch_exists(&repo_dir, &branch)
        && ctx
            .prompt
            .confirm(&format!("Delete branch {}?", branch), true);

    let killed = kill_if_live(ctx, &session)?;

    ctx.prompt
        .note(&format!("Removing worktree: {}", path.display()));
    ctx.git.remove_worktree(&repo_dir, &path)?;
    prune(ctx, &repo_dir);
    tracing::info!(repo, worker, "removed worktree");

    let branch_deleted = if delete_branch {
        ctx.git.delete_branch(&repo_dir, &branch)?;
        Some(branch)
    } else {
        None
    };

    remove_dir_if_empty(ctx, path.parent());
    Ok(outcome(Removed::Worktree, killed, branch_deleted))
}

pub(crate) fn create_session(
    ctx: &Ctx<'_>,
    repo: &str,
    worker: &str,
    branch: &str,
    path: &Path,
) -> Result<()> {
    let spec = SessionSpec::worker(
        &worker_session_name(repo, worker),
        repo,
        worker,
        branch,
        path.to_path_buf(),
        &ctx.settings.agent_command,
    );
    ctx.sessions.create(&spec).map_err(|e| match e {
        Error::SessionCreationFailed(_) => e,
        other => Error::SessionCreationFailed(other.to_string()),
    })
}

/// Undo a half-finished `add`. Every step is best-effort.
fn rollback(ctx: &Ctx<'_>, repo_dir: &Path, path: &Path, branch: &str, delete_branch: bool) {
    if let Err(e) = ctx.git.remove_worktree(repo_dir, path) {
        tracing::debug!(error = %e, "rollback: no worktree to remove");
    }
    if path.exists() {
        if let Err(e) = fs::remove_dir_all(path) {
            tracing::warn!(error = %e, path = %path.display(), "rollback: failed to delete directory");
        }
    }
    prune(ctx, repo_dir);
    if delete_branch && ctx.git.branch_exists(repo_dir, branch) {
        if let Err(e) = ctx.git.delete_branch(repo_dir, branch) {
            tracing::warn!(error = %e, branch, "rollback: failed to delete branch");
        }
    }
}

pub(crate) fn prune(ctx: &Ctx<'_>, repo_dir: &Path) {
    if let Err(e) = ctx.git.prune_worktrees(repo_dir) {
        tracing::warn!(error = %e, "worktree prune failed");
    }
}

fn kill_if_live(ctx: &Ctx<'_>, session: &str) -> Result<bool> {
    if !ctx.sessions.exists(session) {
        return Ok(false);
    }
    ctx.prompt.note(&format!("Killing session: {}", session));
    ctx.sessions.kill(session)?;
    Ok(true)
}

fn warn_if_inside(ctx: &Ctx<'_>, session: &str) {
    let inside = ctx
        .sessions
        .current_session_name()
        .map(|current| normalize_session_name(&current) == normalize_session_name(session))
        .unwrap_or(false);
    if inside && ctx.sessions.exists(session) {
        ctx.prompt.warn(&format!(
            "You are currently in session '{}' - removing it will disconnect you",
            session
        ));
    }
}

pub(crate) fn remove_dir_if_empty(ctx: &Ctx<'_>, dir: Option<&Path>) {
    let Some(dir) = dir else {
        return;
    };
    let empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty && fs::remove_dir(dir).is_ok() {
        ctx.prompt
            .note(&format!("Removed empty directory: {}", dir.display()));
    }
}

/// One worker directory.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerEntry {
    pub name: String,
    pub path: PathBuf,
    pub branch: String,
    pub running: bool,
}

/// Workers of one repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoWorkers {
    pub repo: String,
    pub workers: Vec<WorkerEntry>,
}

/// Result of `crew ls`.
#[derive(Debug, Clone, Serialize)]
pub struct CrewList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub repos: Vec<RepoWorkers>,
}

impl CommandResult for CrewList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.repos.is_empty() {
            let head = match &self.filter {
                Some(name) => format!("No workspaces found for: {}", name),
                None => "No crew workspaces found".to_string(),
            };
            return format!("{}\n\nCreate one with: rig crew add <name>", head);
        }
        let mut lines = Vec::new();
        for group in &self.repos {
            lines.push(format!("🏗️  {}", group.repo));
            for w in &group.workers {
                let state = if w.running { "running" } else { "stopped" };
                lines.push(format!(
                    "  {} {:<18} {:<26} [{}]",
                    worker_icon(&w.name),
                    w.name,
                    w.branch,
                    state
                ));
            }
            lines.push(String::new());
        }
        lines.join("\n").trim_end().to_string()
    }
}

/// Every worker directory grouped by repository, optionally only `filter`.
pub fn list(ctx: &Ctx<'_>, filter: Option<&str>) -> Result<CrewList> {
    let root = &ctx.settings.workers_root;
    let mut repos = Vec::new();
    if root.exists() {
        for repo_dir in sorted_subdirs(root)? {
            let repo = file_name(&repo_dir);
            let Ok(worker_dirs) = sorted_subdirs(&repo_dir) else {
                continue;
            };
            let workers: Vec<WorkerEntry> = worker_dirs
                .into_iter()
                .map(|path| (file_name(&path), path))
                .filter(|(name, _)| filter.is_none_or(|f| f == name))
                .map(|(name, path)| WorkerEntry {
                    branch: branch_or_unknown(ctx, &path),
                    running: ctx.sessions.exists(&worker_session_name(&repo, &name)),
                    name,
                    path,
                })
                .collect();
            if !workers.is_empty() {
                repos.push(RepoWorkers { repo, workers });
            }
        }
    }
    Ok(CrewList {
        filter: filter.map(String::from),
        repos,
    })
}

/// A live worker session.
#[derive(Debug, Clone, Serialize)]
pub struct CrewSession {
    pub session: String,
    pub repo: String,
    pub worker: String,
    pub path: PathBuf,
    pub branch: String,
}

/// Result of `crew status`.
#[derive(Debug, Clone, Serialize)]
pub struct CrewStatus {
    pub sessions: Vec<CrewSession>,
}

impl CommandResult for CrewStatus {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec!["👥 Active Crew Sessions".to_string(), String::new()];
        if self.sessions.is_empty() {
            lines.push("  No active crew sessions".to_string());
        }
        for s in &self.sessions {
            lines.push(format!("  {} {}", worker_icon(&s.worker), s.session));
            lines.push(format!("      {}", condense_home(&s.path)));
            lines.push(format!("      {}", s.branch));
            lines.push(String::new());
        }
        lines.join("\n").trim_end().to_string()
    }
}

/// Live `<repo>@<worker>` sessions whose workspace directory exists.
pub fn status(ctx: &Ctx<'_>) -> CrewStatus {
    CrewStatus {
        sessions: live_worker_sessions(ctx),
    }
}

pub(crate) fn live_worker_sessions(ctx: &Ctx<'_>) -> Vec<CrewSession> {
    ctx.sessions
        .list()
        .into_iter()
        .filter_map(|session| {
            let SessionWorkspace { repo, worker, path } =
                session_workspace(ctx.settings, &session)?;
            Some(CrewSession {
                repo,
                worker,
                branch: branch_or_unknown(ctx, &path),
                path,
                session,
            })
        })
        .collect()
}

/// Result of `crew prune`.
#[derive(Debug, Clone, Serialize)]
pub struct PruneOutcome {
    pub found: Vec<String>,
    pub removed: Vec<String>,
    pub cancelled: bool,
}

impl CommandResult for PruneOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.found.is_empty() {
            "No polecats found".to_string()
        } else if self.cancelled {
            "Cancelled".to_string()
        } else {
            format!("✓ Removed {} polecat(s)", self.removed.len())
        }
    }
}

/// Remove every polecat workspace after one confirmation.
pub fn prune_polecats(ctx: &Ctx<'_>) -> Result<PruneOutcome> {
    let polecats = polecat::list(&ctx.settings.workers_root)?;
    let found: Vec<String> = polecats
        .iter()
        .map(|p| worker_session_name(&p.repo, &p.name))
        .collect();
    if polecats.is_empty() {
        return Ok(PruneOutcome {
            found,
            removed: Vec::new(),
            cancelled: false,
        });
    }

    let mut listing = vec![format!("Found {} polecat(s):", polecats.len())];
    listing.extend(
        polecats
            .iter()
            .map(|p| format!("  - 🐱 {} (rig: {})", p.name, p.repo)),
    );
    ctx.prompt.note(&listing.join("\n"));

    if !ctx
        .prompt
        .confirm("Remove these workspaces and worktrees?", false)
    {
        return Ok(PruneOutcome {
            found,
            removed: Vec::new(),
            cancelled: true,
        });
    }

    let mut removed = Vec::new();
    for p in &polecats {
        ctx.prompt.note(&format!("Removing 🐱 {}...", p.name));
        let repo_dir = repo_path(&ctx.settings.repos_root, &p.repo);
        let session = worker_session_name(&p.repo, &p.name);

        if ctx.sessions.exists(&session) {
            match ctx.sessions.kill(&session) {
                Ok(()) => ctx
                    .prompt
                    .note(&format!("  ✓ Killed session: {}", session)),
                Err(e) => ctx.prompt.warn(&format!("failed to kill {}: {}", session, e)),
            }
        }
        match ctx.git.remove_worktree(&repo_dir, &p.path) {
            Ok(()) => ctx
                .prompt
                .note(&format!("  ✓ Removed worktree: {}", p.path.display())),
            Err(e) => ctx.prompt.warn(&format!(
                "failed to remove worktree {}: {}",
                p.path.display(),
                e
            )),
        }
        prune(ctx, &repo_dir);
        remove_dir_if_empty(ctx, p.path.parent());
        if !p.path.exists() {
            removed.push(session);
        }
    }

    Ok(PruneOutcome {
        found,
        removed,
        cancelled: false,
    })
}

fn branch_or_unknown(ctx: &Ctx<'_>, path: &Path) -> String {
    ctx.git
        .current_branch(path)
        .ok()
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::WorktreeBackend;
    use crate::testing::Fixture;
    use crate::tmux::SessionBackend;

    #[test]
    fn test_add_creates_worktree_branch_and_session() {
        let fx = Fixture::new();
        let repo = fx.repo("app");

        let out = add(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.action, WorkerAction::Created);
        assert_eq!(out.path, fx.worker_dir("app", "tracy"));
        assert!(out.path.exists());
        assert!(fx.git.has_branch(&repo, "tracy/work"));
        assert!(fx.git.worktree_is_registered(&repo, &out.path));
        assert!(fx.sessions.exists("app@tracy"));
        assert_eq!(fx.sessions.attached(), vec!["app@tracy"]);
    }

    #[test]
    fn test_add_twice_is_idempotent() {
        let fx = Fixture::new();
        let repo = fx.repo("app");

        add(&fx.ctx(), "app", "tracy").unwrap();
        let second = add(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(second.action, WorkerAction::Attached);
        assert_eq!(fx.git.linked_worktrees(&repo).len(), 1);
        assert_eq!(fx.sessions.created().len(), 1);
        assert_eq!(fx.sessions.attached().len(), 2);
    }

    #[test]
    fn test_add_recreates_missing_session_only() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        fx.sessions.kill("app@tracy").unwrap();

        let out = add(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.action, WorkerAction::SessionRecreated);
        assert!(fx.sessions.exists("app@tracy"));
        assert_eq!(fx.git.linked_worktrees(&repo).len(), 1);
    }

    #[test]
    fn test_add_rejects_bad_name_and_missing_repo() {
        let fx = Fixture::new();
        fx.repo("app");
        assert!(matches!(
            add(&fx.ctx(), "app", "a@b"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            add(&fx.ctx(), "ghost", "tracy"),
            Err(Error::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_add_existing_branch_declined_is_cancelled() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        fx.git.add_branch(&repo, "tracy/work");
        fx.prompt.answer(&[false]);

        let err = add(&fx.ctx(), "app", "tracy").unwrap_err();

        assert!(matches!(err, Error::Cancelled(_)));
        assert!(!fx.worker_dir("app", "tracy").exists());
        assert!(fx.git.has_branch(&repo, "tracy/work"));
    }

    #[test]
    fn test_add_existing_branch_reused() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        fx.git.add_branch(&repo, "tracy/work");

        let out = add(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.action, WorkerAction::CreatedFromExistingBranch);
        assert_eq!(fx.prompt.questions(), vec!["Use existing branch?"]);
    }

    #[test]
    fn test_add_session_failure_rolls_back_worktree() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        fx.sessions.set_fail_create(true);

        let err = add(&fx.ctx(), "app", "tracy").unwrap_err();

        assert!(matches!(err, Error::SessionCreationFailed(_)));
        assert!(!fx.worker_dir("app", "tracy").exists());
        assert!(fx.git.linked_worktrees(&repo).is_empty());
        assert!(!fx.git.has_branch(&repo, "tracy/work"));
    }

    #[test]
    fn test_add_session_failure_keeps_reused_branch() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        fx.git.add_branch(&repo, "tracy/work");
        fx.sessions.set_fail_create(true);

        add(&fx.ctx(), "app", "tracy").unwrap_err();

        assert!(fx.git.has_branch(&repo, "tracy/work"));
        assert!(fx.git.linked_worktrees(&repo).is_empty());
    }

    #[test]
    fn test_add_worktree_failure_is_reported() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        fx.git.set_fail_create_worktree(true);

        let err = add(&fx.ctx(), "app", "tracy").unwrap_err();

        assert!(matches!(err, Error::WorktreeCreationFailed(_)));
        assert!(!fx.git.has_branch(&repo, "tracy/work"));
        assert!(fx.sessions.created().is_empty());
    }

    #[test]
    fn test_add_without_base_branch() {
        let fx = Fixture::new();
        let path = fx.settings.repos_root.join("app");
        fs::create_dir_all(&path).unwrap();
        fx.git.add_repo(path, &["feature"]);

        let err = add(&fx.ctx(), "app", "tracy").unwrap_err();
        assert!(matches!(err, Error::NoBaseBranch { .. }));
    }

    #[test]
    fn test_start_requires_workspace() {
        let fx = Fixture::new();
        fx.repo("app");
        let err = start(&fx.ctx(), "app", "tracy").unwrap_err();
        assert!(err.to_string().contains("rig crew add tracy --rig=app"));
    }

    #[test]
    fn test_start_offers_branch_switch() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        let path = fx.worker_dir("app", "tracy");
        fx.git.add_branch(&repo, "experiment");
        fx.git.checkout_branch(&path, "experiment").unwrap();
        fx.sessions.kill("app@tracy").unwrap();

        let out = start(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.branch, "tracy/work");
        assert_eq!(out.action, WorkerAction::SessionRecreated);
        assert_eq!(fx.git.current_branch(&path).unwrap(), "tracy/work");
    }

    #[test]
    fn test_start_declined_switch_keeps_branch() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        let path = fx.worker_dir("app", "tracy");
        fx.git.add_branch(&repo, "experiment");
        fx.git.checkout_branch(&path, "experiment").unwrap();
        fx.prompt.answer(&[false]);

        let out = start(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.branch, "experiment");
        assert_eq!(out.action, WorkerAction::Attached);
    }

    #[test]
    fn test_start_on_feature_branch_does_not_ask() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        let path = fx.worker_dir("app", "polecat_ava");
        fs::create_dir_all(&path).unwrap();
        fx.git.register_worktree(&repo, &path, "feat/login");

        start(&fx.ctx(), "app", "polecat_ava").unwrap();
        assert!(fx.prompt.questions().is_empty());
    }

    #[test]
    fn test_remove_full_workspace() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();

        let out = remove(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.removed, Removed::Worktree);
        assert!(out.session_killed);
        assert_eq!(out.branch_deleted.as_deref(), Some("tracy/work"));
        assert!(!fx.worker_dir("app", "tracy").exists());
        assert!(!fx.settings.workers_root.join("app").exists());
        assert!(!fx.git.has_branch(&repo, "tracy/work"));
    }

    #[test]
    fn test_remove_keeps_branch_when_declined() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        fx.prompt.answer(&[false]);

        let out = remove(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.branch_deleted, None);
        assert!(fx.git.has_branch(&repo, "tracy/work"));
    }

    #[test]
    fn test_remove_then_add_recreates() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        remove(&fx.ctx(), "app", "tracy").unwrap();

        let out = add(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.action, WorkerAction::Created);
        assert_eq!(fx.git.linked_worktrees(&repo).len(), 1);
    }

    #[test]
    fn test_remove_session_only() {
        let fx = Fixture::new();
        fx.repo("app");
        fx.sessions.add("app@tracy");

        let out = remove(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.removed, Removed::SessionOnly);
        assert!(!fx.sessions.exists("app@tracy"));
    }

    #[test]
    fn test_remove_nothing_is_not_found() {
        let fx = Fixture::new();
        fx.repo("app");
        assert!(matches!(
            remove(&fx.ctx(), "app", "tracy"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_detached_worktree_then_add() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        fx.sessions.kill("app@tracy").unwrap();
        let path = fx.worker_dir("app", "tracy");
        fs::remove_dir_all(&path).unwrap();

        let out = remove(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.removed, Removed::DetachedMetadata);
        assert!(!fx.git.worktree_is_registered(&repo, &path));
        let again = add(&fx.ctx(), "app", "tracy").unwrap();
        assert_eq!(again.action, WorkerAction::CreatedFromExistingBranch);
    }

    #[test]
    fn test_remove_detached_worktree_falls_back_to_prune() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        fx.sessions.kill("app@tracy").unwrap();
        let path = fx.worker_dir("app", "tracy");
        fs::remove_dir_all(&path).unwrap();
        fx.git.set_fail_remove_worktree(true);

        let out = remove(&fx.ctx(), "app", "tracy").unwrap();

        assert_eq!(out.removed, Removed::DetachedMetadata);
        assert!(!fx.git.worktree_is_registered(&repo, &path));
    }

    #[test]
    fn test_remove_dangling_directory_needs_confirmation() {
        let fx = Fixture::new();
        fx.repo("app");
        let path = fx.worker_dir("app", "tracy");
        fs::create_dir_all(&path).unwrap();

        let err = remove(&fx.ctx(), "app", "tracy").unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        assert!(path.exists());

        fx.prompt.answer(&[true]);
        let out = remove(&fx.ctx(), "app", "tracy").unwrap();
        assert_eq!(out.removed, Removed::DanglingDirectory);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_from_inside_session_warns() {
        let fx = Fixture::new();
        fx.repo("my.app");
        add(&fx.ctx(), "my.app", "tracy").unwrap();
        fx.sessions.set_current("my_app@tracy");

        remove(&fx.ctx(), "my.app", "tracy").unwrap();

        assert!(
            fx.prompt
                .warnings()
                .iter()
                .any(|w| w.contains("disconnect you"))
        );
    }

    #[test]
    fn test_remove_surfaces_worktree_failure() {
        let fx = Fixture::new();
        fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        fx.git.set_fail_remove_worktree(true);

        assert!(matches!(
            remove(&fx.ctx(), "app", "tracy"),
            Err(Error::Git(_))
        ));
    }

    #[test]
    fn test_list_groups_and_filters() {
        let fx = Fixture::new();
        fx.repo("app");
        fx.repo("api");
        add(&fx.ctx(), "app", "tracy").unwrap();
        add(&fx.ctx(), "api", "tracy").unwrap();
        add(&fx.ctx(), "api", "sam").unwrap();
        fx.sessions.kill("api@sam").unwrap();

        let all = list(&fx.ctx(), None).unwrap();
        let repos: Vec<&str> = all.repos.iter().map(|r| r.repo.as_str()).collect();
        assert_eq!(repos, vec!["api", "app"]);
        let sam = &all.repos[0].workers[0];
        assert_eq!((sam.name.as_str(), sam.running), ("sam", false));
        assert_eq!(sam.branch, "sam/work");

        let filtered = list(&fx.ctx(), Some("sam")).unwrap();
        assert_eq!(filtered.repos.len(), 1);
        assert!(list(&fx.ctx(), Some("nobody")).unwrap().to_human().contains("No workspaces found for: nobody"));
    }

    #[test]
    fn test_status_ignores_sessions_without_workspace() {
        let fx = Fixture::new();
        fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        fx.sessions.add("app@ghost");
        fx.sessions.add("app");

        let status = status(&fx.ctx());
        assert_eq!(status.sessions.len(), 1);
        assert_eq!(status.sessions[0].worker, "tracy");
    }

    #[test]
    fn test_status_matches_dotted_repository() {
        let fx = Fixture::new();
        fx.repo("my.app");
        add(&fx.ctx(), "my.app", "tracy").unwrap();
        assert!(fx.sessions.list().contains(&"my_app@tracy".to_string()));

        let status = status(&fx.ctx());
        assert_eq!(status.sessions.len(), 1);
        assert_eq!(status.sessions[0].repo, "my.app");
        assert_eq!(status.sessions[0].worker, "tracy");
        assert_eq!(status.sessions[0].path, fx.worker_dir("my.app", "tracy"));
    }

    #[test]
    fn test_prune_declined_keeps_polecats() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        let path = fx.worker_dir("app", "polecat_emma");
        fx.git.add_branch(&repo, "feat/x");
        fx.git.create_worktree_from_branch(&repo, &path, "feat/x").unwrap();

        let out = prune_polecats(&fx.ctx()).unwrap();
        assert!(out.cancelled);
        assert!(path.exists());
    }

    #[test]
    fn test_prune_removes_only_polecats() {
        let fx = Fixture::new();
        let repo = fx.repo("app");
        add(&fx.ctx(), "app", "tracy").unwrap();
        fx.git.add_branch(&repo, "feat/x");
        let polecat = fx.worker_dir("app", "polecat_emma");
        fx.git.create_worktree_from_branch(&repo, &polecat, "feat/x").unwrap();
        fx.sessions.add("app@polecat_emma");
        fx.prompt.answer(&[true]);

        let out = prune_polecats(&fx.ctx()).unwrap();

        assert_eq!(out.removed, vec!["app@polecat_emma"]);
        assert!(!polecat.exists());
        assert!(fx.worker_dir("app", "tracy").exists());
        assert!(!fx.sessions.exists("app@polecat_emma"));
        assert!(fx.sessions.exists("app@tracy"));
    }

    #[test]
    fn test_prune_with_no_polecats() {
        let fx = Fixture::new();
        let out = prune_polecats(&fx.ctx()).unwrap();
        assert_eq!(out.to_human(), "No polecats found");
        assert!(fx.prompt.questions().is_empty());
    }
}
