//! File-based work items.
//!
//! A work item `<name>` is a directory `work/<name>/` holding four markdown
//! documents, committed on its own `feat/<name>` branch. Whoever has that
//! branch checked out is working on it; nothing else records assignment.

pub mod progress;
pub mod templates;

pub use progress::{ParseWarning, Progress, Task, parse_progress};

use crate::commands::{CommandResult, json, worker_icon};
use crate::git::{WorktreeBackend, resolve_base_branch, same_path, worktree_for_branch};
use crate::naming::{
    FORMULA_DIR, WORK_DIR, feature_branch_name, formula_dir, formula_path, validate_name,
    work_item_dir, work_item_from_branch,
};
use crate::polecat::{file_name, sorted_subdirs};
use crate::{Ctx, Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Instruction document generated by `rig sling`.
pub const HOOK_FILE: &str = "hook.md";

/// Progress document inside a work item.
pub const PROGRESS_FILE: &str = "progress.md";

/// Status shown when a work item has no readable progress document.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// `<checkout>/work/<item>/hook.md`
pub fn hook_path(checkout: &Path, work_item: &str) -> PathBuf {
    work_item_dir(checkout, work_item).join(HOOK_FILE)
}

/// What [`scaffold`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scaffold {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub formula_installed: bool,
}

/// Create `work/<item>/` with its starter documents and make sure the
/// formula directory has the default formula. Existing files are kept.
pub fn scaffold(checkout: &Path, work_item: &str) -> Result<Scaffold> {
    let dir = work_item_dir(checkout, work_item);
    fs::create_dir_all(&dir)?;
    fs::create_dir_all(formula_dir(checkout))?;

    let documents = [
        ("spec.md", templates::spec(work_item)),
        ("design.md", templates::design(work_item)),
        ("breakdown.md", templates::breakdown(work_item)),
        (PROGRESS_FILE, templates::progress(work_item)),
    ];

    let mut result = Scaffold::default();
    for (file, content) in documents {
        let path = dir.join(file);
        if path.exists() {
            result.skipped.push(file.to_string());
            continue;
        }
        fs::write(&path, content)?;
        result.created.push(file.to_string());
    }
    result.formula_installed = ensure_default_formula(checkout)?;

    Ok(result)
}

/// Write the default formula unless the formula directory already has any.
/// Returns whether it was written.
pub fn ensure_default_formula(checkout: &Path) -> Result<bool> {
    if !list_formulas(checkout)?.is_empty() {
        return Ok(false);
    }
    fs::create_dir_all(formula_dir(checkout))?;
    fs::write(
        formula_path(checkout, crate::naming::DEFAULT_FORMULA),
        templates::DEFAULT_FORMULA,
    )?;
    Ok(true)
}

/// Formula names (file stems of `work/formula/*.md`), sorted.
pub fn list_formulas(checkout: &Path) -> Result<Vec<String>> {
    let dir = formula_dir(checkout);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                path.file_stem().map(|s| s.to_string_lossy().to_string())
            } else {
                None
            }
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Fail with the available names unless `checkout` has `formula`.
pub fn require_formula(checkout: &Path, formula: &str) -> Result<()> {
    let available = list_formulas(checkout)?;
    if available.iter().any(|name| name == formula) {
        return Ok(());
    }
    Err(Error::FormulaNotFound {
        name: formula.to_string(),
        available,
    })
}

/// Whether [`generate_hook`] wrote the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookWrite {
    Written,
    /// A hook was already there and was left alone
    Kept,
}

/// Write `work/<item>/hook.md` pointing at `formula`.
///
/// An existing hook is never replaced; delete it to regenerate.
pub fn generate_hook(checkout: &Path, work_item: &str, formula: &str) -> Result<HookWrite> {
    require_formula(checkout, formula)?;

    let path = hook_path(checkout, work_item);
    if path.exists() {
        return Ok(HookWrite::Kept);
    }
    fs::write(&path, templates::hook(work_item, formula))?;
    Ok(HookWrite::Written)
}

/// Read and parse a progress document.
pub fn read_progress(path: &Path) -> Result<Progress> {
    let content = fs::read_to_string(path)?;
    Ok(parse_progress(&content))
}

/// Who has a work item's feature branch checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Assignment {
    Unassigned,
    Assigned { worker: String, path: PathBuf },
    /// Checked out in the repository's own checkout
    CheckedOutInSource,
}

/// Derive a work item's assignment from the repository's worktrees.
pub fn assignment(
    git: &dyn WorktreeBackend,
    repo_dir: &Path,
    workers_root: &Path,
    work_item: &str,
) -> Result<Assignment> {
    let worktrees = git.list_worktrees(repo_dir)?;
    let branch = feature_branch_name(work_item);
    let Some(wt) = worktree_for_branch(&worktrees, &branch) else {
        return Ok(Assignment::Unassigned);
    };
    if same_path(&wt.path, repo_dir) {
        return Ok(Assignment::CheckedOutInSource);
    }
    Ok(Assignment::Assigned {
        worker: worker_of(workers_root, &wt.path),
        path: wt.path.clone(),
    })
}

/// `<workers_root>/<repo>/<worker>` -> `<worker>`
fn worker_of(workers_root: &Path, path: &Path) -> String {
    path.strip_prefix(workers_root)
        .ok()
        .and_then(|rel| rel.components().nth(1))
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .unwrap_or_else(|| file_name(path))
}

/// Repository root of `cwd`, as every work command needs one.
pub(crate) fn checkout_root(ctx: &Ctx<'_>, cwd: &Path) -> Result<PathBuf> {
    ctx.git.repository_root(cwd).map_err(|e| {
        tracing::debug!(error = %e, "repository root lookup failed");
        Error::NotFound(format!("git repository at {}", cwd.display()))
    })
}

/// Result of `work create`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub work_item: String,
    pub checkout: PathBuf,
    pub branch: String,
    pub branch_created: bool,
    pub files: Scaffold,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl CommandResult for CreateOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.files.skipped.is_empty() {
            lines.push(format!("✓ Created work directory: work/{}/", self.work_item));
        } else {
            lines.push("✓ Skipped existing files, created missing ones".to_string());
        }
        if self.branch_created {
            lines.push(format!("✓ Created feature branch: {}", self.branch));
        } else {
            lines.push(format!("✓ Using existing branch: {}", self.branch));
        }
        if self.files.formula_installed {
            lines.push(format!("✓ Installed default formula: work/{}/", FORMULA_DIR));
        }
        if let Some(message) = &self.commit {
            lines.push(format!("✓ Initial commit: \"{}\"", message));
        }
        lines.push(String::new());
        lines.push("Next steps:".to_string());
        lines.push(format!("  1. Edit work/{}/spec.md", self.work_item));
        lines.push(format!("  2. When ready: rig sling work/{}", self.work_item));
        lines.push(String::new());
        lines.push(format!("You are now on branch: {}", self.branch));
        lines.join("\n")
    }
}

/// Scaffold a work item in the repository containing `cwd` and put the
/// checkout on its feature branch.
pub fn create(ctx: &Ctx<'_>, cwd: &Path, work_item: &str) -> Result<CreateOutcome> {
    validate_name(work_item)?;
    let checkout = checkout_root(ctx, cwd)?;
    let branch = feature_branch_name(work_item);

    let item_dir = work_item_dir(&checkout, work_item);
    let existed = item_dir.exists();
    if existed {
        ctx.prompt
            .warn(&format!("work/{}/ already exists", work_item));
    }
    let branch_exists = ctx.git.branch_exists(&checkout, &branch);
    if branch_exists {
        ctx.prompt
            .warn(&format!("Branch {} already exists", branch));
    }

    let files = scaffold(&checkout, work_item)?;

    if branch_exists {
        ctx.git.checkout_branch(&checkout, &branch)?;
    } else {
        let base = resolve_base_branch(ctx.git, &checkout, &ctx.settings.default_branch)?;
        ctx.git.create_branch_and_checkout(&checkout, &branch, &base)?;
        tracing::info!(branch = %branch, base = %base, "created feature branch");
    }

    let mut commit = None;
    if !existed {
        let message = format!("Initialize work: {}", work_item);
        let formulas = formula_dir(&checkout);
        match ctx
            .git
            .commit_paths(&checkout, &[&item_dir, &formulas], &message)
        {
            Ok(()) => commit = Some(message),
            Err(e) => ctx
                .prompt
                .warn(&format!("failed to create initial commit: {}", e)),
        }
    }

    Ok(CreateOutcome {
        work_item: work_item.to_string(),
        checkout,
        branch,
        branch_created: !branch_exists,
        files,
        commit,
    })
}

/// One in-flight work item.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveWork {
    pub work_item: String,
    pub status: String,
    pub assigned_to: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseWarning>,
}

/// Work items of one repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoWork {
    pub repo: String,
    pub items: Vec<ActiveWork>,
}

/// Result of `work status`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkStatus {
    pub repos: Vec<RepoWork>,
}

impl CommandResult for WorkStatus {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec!["💼 Active Work".to_string(), String::new()];
        if self.repos.is_empty() {
            lines.push("No active work found".to_string());
            lines.push(String::new());
            lines.push("Create work with: rig work create <name>".to_string());
            lines.push("Assign work with: rig sling work/<name>".to_string());
            return lines.join("\n");
        }
        for group in &self.repos {
            lines.push(format!("🏗️  {}", group.repo));
            for item in &group.items {
                lines.push(format!(
                    "  {:<20} [{:<14}] {} {:<18} {}",
                    item.work_item,
                    item.status,
                    worker_icon(&item.assigned_to),
                    item.assigned_to,
                    item.branch
                ));
                if let Some(task) = &item.current_task {
                    lines.push(format!("    → {}", task));
                }
                for warning in &item.warnings {
                    lines.push(format!(
                        "    ! {} line {}: {}",
                        PROGRESS_FILE, warning.line, warning.text
                    ));
                }
            }
            lines.push(String::new());
        }
        lines.join("\n").trim_end().to_string()
    }
}

/// Scan every worker checkout for a feature branch and report its progress.
pub fn status(ctx: &Ctx<'_>) -> Result<WorkStatus> {
    let root = &ctx.settings.workers_root;
    let mut repos = Vec::new();
    if !root.exists() {
        return Ok(WorkStatus { repos });
    }

    for repo_dir in sorted_subdirs(root)? {
        let Ok(workers) = sorted_subdirs(&repo_dir) else {
            continue;
        };
        let items: Vec<ActiveWork> = workers
            .iter()
            .filter_map(|worker_dir| active_work(ctx, worker_dir))
            .collect();
        if !items.is_empty() {
            repos.push(RepoWork {
                repo: file_name(&repo_dir),
                items,
            });
        }
    }

    Ok(WorkStatus { repos })
}

fn active_work(ctx: &Ctx<'_>, worker_dir: &Path) -> Option<ActiveWork> {
    let branch = ctx.git.current_branch(worker_dir).ok()?;
    let work_item = work_item_from_branch(&branch)?.to_string();
    let progress_file = work_item_dir(worker_dir, &work_item).join(PROGRESS_FILE);

    let (status, current_task, warnings) = match read_progress(&progress_file) {
        Ok(progress) => (
            progress
                .status
                .clone()
                .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
            progress.current_task().map(String::from),
            progress.warnings,
        ),
        Err(e) => {
            tracing::debug!(error = %e, path = %progress_file.display(), "no progress document");
            (UNKNOWN_STATUS.to_string(), None, Vec::new())
        }
    };

    Some(ActiveWork {
        work_item,
        status,
        assigned_to: file_name(worker_dir),
        branch,
        current_task,
        warnings,
    })
}

/// Result of `hook`.
#[derive(Debug, Clone, Serialize)]
pub struct HookView {
    pub work_item: String,
    pub path: PathBuf,
    pub content: String,
}

impl CommandResult for HookView {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "🪝 Hook: {}\n\n{}",
            self.work_item,
            self.content.trim_end()
        )
    }
}

/// The hook of the work item checked out in `cwd`.
pub fn read_hook(ctx: &Ctx<'_>, cwd: &Path) -> Result<HookView> {
    let checkout = checkout_root(ctx, cwd)?;
    let branch = ctx.git.current_branch(&checkout)?;
    let Some(work_item) = work_item_from_branch(&branch) else {
        return Err(Error::NotFound(format!(
            "work item for branch '{}' (expected feat/<name>)",
            branch
        )));
    };

    let path = hook_path(&checkout, work_item);
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "hook for {}/{}\nRun 'rig sling {}/{}' to create one",
            WORK_DIR, work_item, WORK_DIR, work_item
        )));
    }
    let content = fs::read_to_string(&path)?;
    Ok(HookView {
        work_item: work_item.to_string(),
        path,
        content,
    })
}
