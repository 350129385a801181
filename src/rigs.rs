//! Repository sessions ("rigs") and the commands that look across every
//! live session.

use crate::commands::{CommandResult, condense_home, json, worker_icon};
use crate::context::{
    ContextSource, SessionWorkspace, resolve_repository, session_repository, session_workspace,
};
use crate::naming::{normalize_session_name, repo_path, repo_session_name, split_session_name};
use crate::polecat::{file_name, sorted_subdirs};
use crate::tmux::SessionSpec;
use crate::{Ctx, Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What a live session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionClass {
    /// Named after a repository under the repositories root
    Repository { repo: String, path: PathBuf },
    /// `<repo>@<worker>` with an existing workspace
    Worker {
        repo: String,
        worker: String,
        path: PathBuf,
    },
}

/// Classify a session name. `None` for sessions rig did not create.
///
/// Names are matched the way tmux reports them, so `my_app@tracy` belongs
/// to the workspace `my.app/tracy`.
pub fn classify(ctx: &Ctx<'_>, session: &str) -> Option<SessionClass> {
    if split_session_name(session).is_some() {
        let SessionWorkspace { repo, worker, path } = session_workspace(ctx.settings, session)?;
        return Some(SessionClass::Worker { repo, worker, path });
    }
    let repo = session_repository(ctx, session)?;
    Some(SessionClass::Repository {
        path: repo_path(&ctx.settings.repos_root, &repo),
        repo,
    })
}

/// Result of `up`.
#[derive(Debug, Clone, Serialize)]
pub struct UpOutcome {
    pub repo: String,
    pub path: PathBuf,
    pub session: String,
    pub created: bool,
}

impl CommandResult for UpOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("✓ Rig created: {}", self.repo)
        } else {
            format!("✓ Attached to rig: {}", self.repo)
        }
    }
}

/// Bring up a repository session, creating it if needed, and attach.
pub fn up(ctx: &Ctx<'_>, explicit: Option<&str>, cwd: &Path) -> Result<UpOutcome> {
    let repo = inferred(ctx, explicit, cwd)?;
    let path = repo_path(&ctx.settings.repos_root, &repo);
    if !ctx.git.is_repository(&path) {
        return Err(Error::RepositoryNotFound(path));
    }

    let session = repo_session_name(&repo);
    let created = !ctx.sessions.exists(&session);
    if created {
        ctx.prompt.note(&format!(
            "Creating new rig: {}\nRepo: {}",
            repo,
            path.display()
        ));
        let spec = SessionSpec::repository(
            &session,
            &repo,
            path.clone(),
            &ctx.settings.agent_command,
        );
        ctx.sessions.create(&spec)?;
        tracing::info!(repo = %repo, "rig session created");
    } else {
        ctx.prompt
            .note(&format!("Switching to existing rig: {}", repo));
    }

    ctx.sessions.attach(&session)?;
    Ok(UpOutcome {
        repo,
        path,
        session,
        created,
    })
}

/// Result of `down`.
#[derive(Debug, Clone, Serialize)]
pub struct DownOutcome {
    pub repo: String,
    pub session: String,
}

impl CommandResult for DownOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("✓ Rig shut down: {}", self.repo)
    }
}

/// Kill a repository's session.
pub fn down(ctx: &Ctx<'_>, explicit: Option<&str>, cwd: &Path) -> Result<DownOutcome> {
    let repo = inferred(ctx, explicit, cwd)?;
    let session = repo_session_name(&repo);
    if !ctx.sessions.exists(&session) {
        return Err(Error::NotFound(format!("rig session {}", session)));
    }
    ctx.sessions.kill(&session)?;
    tracing::info!(repo = %repo, "rig session killed");
    Ok(DownOutcome { repo, session })
}

fn inferred(ctx: &Ctx<'_>, explicit: Option<&str>, cwd: &Path) -> Result<String> {
    let resolved = resolve_repository(ctx, explicit, cwd)?;
    if resolved.source != ContextSource::Explicit {
        ctx.prompt.note(&format!(
            "Inferred rig: {} (from {})",
            resolved.repo, resolved.source
        ));
    }
    Ok(resolved.repo)
}

/// One repository under the repositories root.
#[derive(Debug, Clone, Serialize)]
pub struct RepoEntry {
    pub name: String,
    pub running: bool,
}

/// Result of `list`.
#[derive(Debug, Clone, Serialize)]
pub struct RepoList {
    pub repos: Vec<RepoEntry>,
}

impl CommandResult for RepoList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec!["🏗️  Available Repos".to_string(), String::new()];
        if self.repos.is_empty() {
            lines.push("  No git repos found".to_string());
        }
        for repo in &self.repos {
            let marker = if repo.running { " [running]" } else { "" };
            lines.push(format!("  {}{}", repo.name, marker));
        }
        lines.push(String::new());
        lines.push(format!("Total: {} repos", self.repos.len()));
        lines.join("\n")
    }
}

/// Repositories under the repositories root.
pub fn list(ctx: &Ctx<'_>) -> Result<RepoList> {
    let root = &ctx.settings.repos_root;
    if !root.is_dir() {
        return Err(Error::NotFound(format!(
            "repositories directory {}",
            root.display()
        )));
    }
    let repos = sorted_subdirs(root)?
        .into_iter()
        .filter(|path| ctx.git.is_repository(path))
        .map(|path| {
            let name = file_name(&path);
            RepoEntry {
                running: ctx.sessions.exists(&repo_session_name(&name)),
                name,
            }
        })
        .collect();
    Ok(RepoList { repos })
}

/// A live repository session.
#[derive(Debug, Clone, Serialize)]
pub struct RigSession {
    pub session: String,
    pub path: PathBuf,
    pub branch: String,
    pub current: bool,
}

/// A live worker session.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSession {
    pub session: String,
    pub repo: String,
    pub worker: String,
    pub path: PathBuf,
    pub branch: String,
    pub current: bool,
}

/// Result of `status`.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub rigs: Vec<RigSession>,
    pub crew: Vec<WorkerSession>,
}

impl CommandResult for Status {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let hint = [
            String::new(),
            "Start a rig with: rig up <name>".to_string(),
            "Start crew with: rig crew add <name>".to_string(),
        ];
        if self.rigs.is_empty() && self.crew.is_empty() {
            let mut lines = vec!["No active rigs or crew".to_string()];
            lines.extend(hint);
            return lines.join("\n");
        }

        let marker = |current: bool| if current { "✓" } else { " " };
        let mut lines = vec!["🏗️  Active Rigs".to_string(), String::new()];
        if self.rigs.is_empty() {
            lines.push("  No active rigs".to_string());
            lines.push(String::new());
        }
        for rig in &self.rigs {
            lines.push(format!("  {} {}", marker(rig.current), rig.session));
            lines.push(format!(
                "      {:<50} 🌿 {}",
                condense_home(&rig.path),
                rig.branch
            ));
            lines.push(String::new());
        }

        lines.push("👥 Crew".to_string());
        lines.push(String::new());
        if self.crew.is_empty() {
            lines.push("  No active crew".to_string());
        }
        for w in &self.crew {
            lines.push(format!(
                "  {} {} {}",
                marker(w.current),
                worker_icon(&w.worker),
                w.session
            ));
            lines.push(format!(
                "      {:<50} 🌿 {}",
                condense_home(&w.path),
                w.branch
            ));
            lines.push(String::new());
        }
        lines.join("\n").trim_end().to_string()
    }
}

/// Every live session rig knows about, with path and branch.
pub fn status(ctx: &Ctx<'_>) -> Status {
    let current = ctx
        .sessions
        .current_session_name()
        .map(|name| normalize_session_name(&name));
    let is_current =
        |session: &str| current.as_deref() == Some(normalize_session_name(session).as_str());

    let mut rigs = Vec::new();
    let mut crew = Vec::new();
    for session in ctx.sessions.list() {
        match classify(ctx, &session) {
            Some(SessionClass::Repository { path, .. }) => rigs.push(RigSession {
                branch: branch_or_unknown(ctx, &path),
                current: is_current(&session),
                path,
                session,
            }),
            Some(SessionClass::Worker { repo, worker, path }) => crew.push(WorkerSession {
                branch: branch_or_unknown(ctx, &path),
                current: is_current(&session),
                repo,
                worker,
                path,
                session,
            }),
            None => tracing::debug!(session = %session, "ignoring unrelated session"),
        }
    }
    Status { rigs, crew }
}

fn branch_or_unknown(ctx: &Ctx<'_>, path: &Path) -> String {
    ctx.git
        .current_branch(path)
        .ok()
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Result of `switch` and `at`.
#[derive(Debug, Clone, Serialize)]
pub struct Attached {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl CommandResult for Attached {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match &self.session {
            Some(name) => format!("Attached to {}", name),
            None => "Attached".to_string(),
        }
    }
}

/// Attach to a named session.
pub fn switch(ctx: &Ctx<'_>, session: &str) -> Result<Attached> {
    if !ctx.sessions.exists(session) {
        return Err(Error::NotFound(format!("session {}", session)));
    }
    ctx.sessions.attach(session)?;
    Ok(Attached {
        session: Some(session.to_string()),
    })
}

/// Attach to a named session, or to tmux's default one.
pub fn at(ctx: &Ctx<'_>, session: Option<&str>) -> Result<Attached> {
    match session {
        Some(name) => switch(ctx, name),
        None => {
            ctx.sessions.attach_default()?;
            Ok(Attached { session: None })
        }
    }
}

/// Which sessions `killall` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KillScope {
    #[default]
    Rigs,
    RigsAndCrew,
    CrewOnly,
}

impl KillScope {
    fn includes(self, class: &SessionClass) -> bool {
        matches!(
            (self, class),
            (KillScope::Rigs | KillScope::RigsAndCrew, SessionClass::Repository { .. })
                | (KillScope::RigsAndCrew | KillScope::CrewOnly, SessionClass::Worker { .. })
        )
    }
}

/// Result of `killall`.
#[derive(Debug, Clone, Serialize)]
pub struct KillReport {
    pub killed: Vec<String>,
}

impl CommandResult for KillReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.killed.is_empty() {
            return "No matching sessions to kill".to_string();
        }
        let mut lines: Vec<String> = self
            .killed
            .iter()
            .map(|s| format!("  Killed: {}", s))
            .collect();
        lines.push(format!("Killed {} session(s)", self.killed.len()));
        lines.join("\n")
    }
}

/// Kill every classified session within `scope`.
pub fn killall(ctx: &Ctx<'_>, scope: KillScope) -> KillReport {
    let mut killed = Vec::new();
    for session in ctx.sessions.list() {
        let Some(class) = classify(ctx, &session) else {
            continue;
        };
        if !scope.includes(&class) {
            continue;
        }
        match ctx.sessions.kill(&session) {
            Ok(()) => killed.push(session),
            Err(e) => ctx.prompt.warn(&format!("failed to kill {}: {}", session, e)),
        }
    }
    KillReport { killed }
}
