//! Handing a work item to someone: `rig sling work/<name>`.
//!
//! The hook is generated and committed on the feature branch in the source
//! checkout, which then goes back to its base branch so the feature branch
//! is free to be checked out in a worker's worktree.

use crate::commands::{CommandResult, condense_home, json, worker_icon};
use crate::crew;
use crate::git::resolve_base_branch;
use crate::naming::{
    DEFAULT_FORMULA, feature_branch_name, parse_work_reference, validate_name, work_item_dir,
    worker_path, worker_session_name,
};
use crate::polecat::{self, file_name};
use crate::work::{self, Assignment, HookWrite, checkout_root, hook_path};
use crate::{Ctx, Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Typed into a new polecat's agent before the hook command.
pub const ASSIGNMENT_MESSAGE: &str =
    "# YOUR WORK ASSIGNMENT: Run the command 'rig hook' to see your instructions";

/// Command the agent runs to read its instructions.
pub const HOOK_COMMAND: &str = "rig hook";

const ENTER: &str = "C-m";

/// Who receives the work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// A new polecat with its own worktree and session
    Polecat,
    /// The caller, in the current session
    Current,
    /// An existing crew member
    Crew(String),
}

/// Parsed `rig sling` arguments.
#[derive(Debug, Clone)]
pub struct SlingRequest {
    pub reference: String,
    pub formula: Option<String>,
    pub mode: Mode,
}

/// Delays around the keystrokes sent to a new polecat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlingTiming {
    /// Wait for the agent to start before typing
    pub startup: Duration,
    /// Pause between keystroke batches
    pub keystroke: Duration,
}

impl Default for SlingTiming {
    fn default() -> Self {
        Self {
            startup: Duration::from_secs(2),
            keystroke: Duration::from_millis(100),
        }
    }
}

impl SlingTiming {
    /// No delays at all.
    pub fn immediate() -> Self {
        Self {
            startup: Duration::ZERO,
            keystroke: Duration::ZERO,
        }
    }
}

/// Where the work ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignee {
    Current,
    Crew {
        worker: String,
        path: PathBuf,
    },
    Polecat {
        worker: String,
        path: PathBuf,
        session: String,
    },
}

/// Result of `rig sling`.
#[derive(Debug, Clone, Serialize)]
pub struct SlingOutcome {
    pub work_item: String,
    pub repo: String,
    pub branch: String,
    pub formula: String,
    pub hook: HookWrite,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub base_branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
    pub assignee: Assignee,
}

impl CommandResult for SlingOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match self.hook {
            HookWrite::Written => {
                lines.push(format!("✓ Created hook: work/{}/hook.md", self.work_item))
            }
            HookWrite::Kept => {
                lines.push(format!("✓ Using existing hook: work/{}/hook.md", self.work_item))
            }
        }
        if let Some(message) = &self.commit {
            lines.push(format!("✓ Committed changes: \"{}\"", message));
        }
        if let Some(previous) = &self.replaced {
            lines.push(format!("✓ Released previous assignee: {}", previous));
        }
        match &self.assignee {
            Assignee::Current => {
                lines.push("✓ Hook ready in current workspace".to_string());
                lines.push(String::new());
                lines.push("To start working, run this command in your agent session:".to_string());
                lines.push(format!("  {}", HOOK_COMMAND));
                lines.push(String::new());
                lines.push("This will display your work instructions. Follow them to begin.".to_string());
            }
            Assignee::Crew { worker, path } => {
                lines.push(format!("✓ Workspace ready: {}", condense_home(path)));
                lines.push(format!("✓ Branch: {}", self.branch));
                lines.push(String::new());
                lines.push(format!(
                    "To start working, paste this command into {}'s agent session:",
                    worker
                ));
                lines.push(format!("  {}", HOOK_COMMAND));
                lines.push(String::new());
                lines.push(
                    "This will display the work instructions. Ask them to follow the instructions."
                        .to_string(),
                );
            }
            Assignee::Polecat {
                worker,
                path,
                session,
            } => {
                lines.push(format!("✓ Created polecat: {} {}", worker_icon(worker), worker));
                lines.push(format!("✓ Workspace: {}", condense_home(path)));
                lines.push(format!("✓ Session: {}", session));
                lines.push(format!("✓ Branch: {}", self.branch));
                lines.push(String::new());
                lines.push(format!(
                    "Session started. Sent '{}' command to the agent.",
                    HOOK_COMMAND
                ));
            }
        }
        lines.join("\n")
    }
}

/// Assign a work item from the repository checkout containing `cwd`.
pub fn sling(
    ctx: &Ctx<'_>,
    cwd: &Path,
    request: &SlingRequest,
    timing: SlingTiming,
) -> Result<SlingOutcome> {
    let work_item = parse_work_reference(&request.reference)?;
    let checkout = checkout_root(ctx, cwd)?;
    let repo = file_name(&checkout);
    let branch = feature_branch_name(&work_item);
    let item_dir = work_item_dir(&checkout, &work_item);

    if !item_dir.exists() {
        return Err(Error::WorkItemNotFound(work_item));
    }
    if !ctx.git.branch_exists(&checkout, &branch) {
        return Err(Error::BranchNotFound {
            branch,
            work: work_item,
        });
    }

    let formula = request
        .formula
        .clone()
        .unwrap_or_else(|| DEFAULT_FORMULA.to_string());

    // a polecat taking over has to free the branch before it can be checked out here
    let released = match &request.mode {
        Mode::Polecat => release_previous(ctx, &checkout, &repo, &work_item, &formula)?,
        _ => None,
    };

    let current = ctx.git.current_branch(&checkout)?;
    if current != branch {
        ctx.prompt.note(&format!("Switching to {}...", branch));
        ctx.git.checkout_branch(&checkout, &branch)?;
    }

    let hook = work::generate_hook(&checkout, &work_item, &formula)?;
    if hook == HookWrite::Kept {
        warn_if_other_formula(ctx, &checkout, &work_item, &formula);
    }

    let commit = commit_work_files(ctx, &checkout, &work_item, &item_dir)?
        .or_else(|| released.as_ref().and_then(|r| r.commit.clone()));
    let replaced = released.map(|r| r.worker);

    let base_branch = resolve_base_branch(ctx.git, &checkout, &ctx.settings.default_branch)?;
    ctx.prompt
        .note(&format!("Switching to {}...", base_branch));
    ctx.git.checkout_branch(&checkout, &base_branch)?;

    let assignee = match &request.mode {
        Mode::Current => Assignee::Current,
        Mode::Crew(worker) => to_crew(ctx, &repo, worker, &branch)?,
        Mode::Polecat => to_polecat(ctx, &checkout, &repo, &branch, timing)?,
    };
    tracing::info!(work_item = %work_item, repo = %repo, "work slung");

    Ok(SlingOutcome {
        work_item,
        repo,
        branch,
        formula,
        hook,
        commit,
        base_branch,
        replaced,
        assignee,
    })
}

/// A worker whose assignment was taken over.
#[derive(Debug)]
struct Released {
    worker: String,
    /// Work files committed from its worktree before removal
    commit: Option<String>,
}

/// Ask before taking a work item away from its current worker, then remove
/// that worker's worktree and session.
///
/// Nothing is removed until the formula is known to exist on the feature
/// branch and the worktree's uncommitted changes are either committed or
/// explicitly given up.
fn release_previous(
    ctx: &Ctx<'_>,
    checkout: &Path,
    repo: &str,
    work_item: &str,
    formula: &str,
) -> Result<Option<Released>> {
    let workers_root = &ctx.settings.workers_root;
    let Assignment::Assigned { worker, path } =
        work::assignment(ctx.git, checkout, workers_root, work_item)?
    else {
        return Ok(None);
    };

    ctx.prompt.warn(&format!(
        "work/{} is already assigned to {} {}\n   Workspace: {}",
        work_item,
        worker_icon(&worker),
        worker,
        path.display()
    ));
    if !ctx.prompt.confirm("Reassign to new polecat?", false) {
        return Err(Error::Cancelled(format!(
            "work/{} stays with {}",
            work_item, worker
        )));
    }

    let mut commit = None;
    if path.exists() {
        work::require_formula(&path, formula)?;
        commit = commit_work_files(ctx, &path, work_item, &work_item_dir(&path, work_item))?;
        confirm_discard(ctx, &path, &worker)?;
    } else {
        work::require_formula(checkout, formula)?;
    }

    let session = worker_session_name(repo, &worker);
    if ctx.sessions.exists(&session) {
        ctx.sessions.kill(&session)?;
    }
    ctx.git.remove_worktree(checkout, &path)?;
    crew::prune(ctx, checkout);
    crew::remove_dir_if_empty(ctx, path.parent());
    tracing::info!(worker = %worker, "released previous assignee");
    Ok(Some(Released { worker, commit }))
}

/// Uncommitted changes outside the work files are lost with the worktree.
fn confirm_discard(ctx: &Ctx<'_>, path: &Path, worker: &str) -> Result<()> {
    let pending = ctx.git.pending_changes(path, &[])?;
    if pending.trim().is_empty() {
        return Ok(());
    }
    ctx.prompt.warn(&format!(
        "Uncommitted changes in {}'s workspace:\n{}",
        worker,
        pending.trim_end()
    ));
    if !ctx.prompt.confirm("Discard them and reassign?", false) {
        return Err(Error::Cancelled(format!(
            "commit or stash the changes in {} first",
            path.display()
        )));
    }
    Ok(())
}

fn warn_if_other_formula(ctx: &Ctx<'_>, checkout: &Path, work_item: &str, formula: &str) {
    let reference = format!("work/formula/{}.md", formula);
    let same = fs::read_to_string(hook_path(checkout, work_item))
        .map(|text| text.contains(&reference))
        .unwrap_or(false);
    if !same {
        ctx.prompt.warn(&format!(
            "work/{}/hook.md already exists and was kept; delete it to regenerate with formula '{}'",
            work_item, formula
        ));
    }
}

fn commit_work_files(
    ctx: &Ctx<'_>,
    checkout: &Path,
    work_item: &str,
    item_dir: &Path,
) -> Result<Option<String>> {
    let pending = ctx.git.pending_changes(checkout, &[item_dir])?;
    if pending.trim().is_empty() {
        return Ok(None);
    }

    ctx.prompt.note(&format!(
        "Uncommitted changes in work directory:\n{}",
        pending.trim_end()
    ));
    if !ctx.prompt.confirm("Commit these changes before slinging?", true) {
        return Err(Error::Cancelled(
            "please commit your changes before slinging".to_string(),
        ));
    }

    let message = format!("Update work files for {}", work_item);
    ctx.git.commit_paths(checkout, &[item_dir], &message)?;
    Ok(Some(message))
}

fn to_crew(ctx: &Ctx<'_>, repo: &str, worker: &str, branch: &str) -> Result<Assignee> {
    validate_name(worker)?;
    let path = worker_path(&ctx.settings.workers_root, repo, worker);
    if !path.exists() {
        return Err(Error::WorkspaceNotFound {
            path,
            hint: format!("rig crew add {} --rig={}", worker, repo),
        });
    }

    if let Ok(current) = ctx.git.current_branch(&path) {
        if current != branch {
            ctx.prompt.warn(&format!(
                "{} is on branch '{}', expected '{}'",
                worker, current, branch
            ));
            if ctx.prompt.confirm("Checkout feature branch?", true) {
                ctx.git.checkout_branch(&path, branch)?;
                ctx.prompt
                    .note(&format!("✓ Checked out branch: {}", branch));
            }
        }
    }

    Ok(Assignee::Crew {
        worker: worker.to_string(),
        path,
    })
}

fn to_polecat(
    ctx: &Ctx<'_>,
    checkout: &Path,
    repo: &str,
    branch: &str,
    timing: SlingTiming,
) -> Result<Assignee> {
    let workers_root = &ctx.settings.workers_root;
    let worker = polecat::generate_name(&polecat::worker_names(workers_root, repo));
    let path = worker_path(workers_root, repo, &worker);
    if path.exists() {
        return Err(Error::WorktreeCreationFailed(format!(
            "{} already exists (every polecat name is taken); run 'rig crew prune' first",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Err(e) = ctx.git.create_worktree_from_branch(checkout, &path, branch) {
        crew::remove_dir_if_empty(ctx, path.parent());
        return Err(Error::WorktreeCreationFailed(e.to_string()));
    }

    let session = worker_session_name(repo, &worker);
    if let Err(e) = crew::create_session(ctx, repo, &worker, branch, &path) {
        if let Err(cleanup) = ctx.git.remove_worktree(checkout, &path) {
            tracing::warn!(error = %cleanup, "rollback: failed to remove polecat worktree");
        }
        crew::prune(ctx, checkout);
        crew::remove_dir_if_empty(ctx, path.parent());
        return Err(e);
    }
    tracing::info!(worker = %worker, session = %session, "polecat started");

    thread::sleep(timing.startup);
    let target = ctx.sessions.agent_target(&session);
    for keys in [ASSIGNMENT_MESSAGE, ENTER, HOOK_COMMAND, ENTER] {
        ctx.sessions.send_keys(&target, keys);
        thread::sleep(timing.keystroke);
    }

    Ok(Assignee::Polecat {
        worker,
        path,
        session,
    })
}
