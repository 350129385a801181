//! In-memory test doubles for the backends and the prompt.

use crate::config::Settings;
use crate::git::{Worktree, WorktreeBackend, same_path};
use crate::naming::normalize_session_name;
use crate::prompt::Prompt;
use crate::tmux::{SessionBackend, SessionSpec};
use crate::{Ctx, Error, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Default)]
struct RepoState {
    branches: BTreeSet<String>,
    head: String,
    remote_default: Option<String>,
    worktrees: Vec<Worktree>,
}

#[derive(Debug, Default)]
struct GitState {
    repos: BTreeMap<PathBuf, RepoState>,
    /// `git status --porcelain` output per checkout or worktree
    pending: BTreeMap<PathBuf, String>,
    commits: BTreeMap<PathBuf, Vec<String>>,
    fail_create_worktree: bool,
    fail_remove_worktree: bool,
}

/// Simulated git: branches, HEADs and registered worktrees per repository.
///
/// Creating a worktree creates its directory; removing it deletes the
/// directory, the way `git worktree` does.
#[derive(Debug, Default)]
pub struct FakeGit {
    state: RefCell<GitState>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository. The first branch is checked out.
    pub fn add_repo(&self, path: impl Into<PathBuf>, branches: &[&str]) -> PathBuf {
        let path = path.into();
        let repo = RepoState {
            branches: branches.iter().map(|b| b.to_string()).collect(),
            head: branches.first().map(|b| b.to_string()).unwrap_or_default(),
            ..RepoState::default()
        };
        self.state.borrow_mut().repos.insert(path.clone(), repo);
        path
    }

    pub fn add_branch(&self, repo: &Path, branch: &str) {
        self.with_repo(repo, |r| {
            r.branches.insert(branch.to_string());
        });
    }

    pub fn set_remote_default(&self, repo: &Path, branch: &str) {
        self.with_repo(repo, |r| r.remote_default = Some(branch.to_string()));
    }

    /// Uncommitted changes in a checkout or a linked worktree.
    pub fn set_pending(&self, checkout: &Path, status: &str) {
        self.state
            .borrow_mut()
            .pending
            .insert(checkout.to_path_buf(), status.to_string());
    }

    /// Register a worktree without touching the filesystem.
    pub fn register_worktree(&self, repo: &Path, path: &Path, branch: &str) {
        self.with_repo(repo, |r| {
            r.branches.insert(branch.to_string());
            r.worktrees.push(Worktree {
                path: path.to_path_buf(),
                branch: Some(branch.to_string()),
            });
        });
    }

    pub fn set_fail_create_worktree(&self, fail: bool) {
        self.state.borrow_mut().fail_create_worktree = fail;
    }

    pub fn set_fail_remove_worktree(&self, fail: bool) {
        self.state.borrow_mut().fail_remove_worktree = fail;
    }

    pub fn has_branch(&self, repo: &Path, branch: &str) -> bool {
        self.branch_exists(repo, branch)
    }

    pub fn head(&self, repo: &Path) -> String {
        self.state
            .borrow()
            .repos
            .get(repo)
            .map(|r| r.head.clone())
            .unwrap_or_default()
    }

    pub fn commits(&self, checkout: &Path) -> Vec<String> {
        self.state
            .borrow()
            .commits
            .get(checkout)
            .cloned()
            .unwrap_or_default()
    }

    /// Linked worktrees only (the main checkout is excluded).
    pub fn linked_worktrees(&self, repo: &Path) -> Vec<Worktree> {
        self.state
            .borrow()
            .repos
            .get(repo)
            .map(|r| r.worktrees.clone())
            .unwrap_or_default()
    }

    fn with_repo<T>(&self, repo: &Path, f: impl FnOnce(&mut RepoState) -> T) -> T {
        let mut state = self.state.borrow_mut();
        let entry = state.repos.entry(repo.to_path_buf()).or_default();
        f(entry)
    }

    fn checked_out_anywhere(repo: &Path, state: &RepoState, branch: &str) -> Option<PathBuf> {
        if state.head == branch {
            return Some(repo.to_path_buf());
        }
        state
            .worktrees
            .iter()
            .find(|wt| wt.branch.as_deref() == Some(branch))
            .map(|wt| wt.path.clone())
    }

    fn is_checkout(state: &GitState, path: &Path) -> bool {
        state.repos.contains_key(path)
            || state
                .repos
                .values()
                .any(|r| r.worktrees.iter().any(|wt| same_path(&wt.path, path)))
    }

    fn repo_error(repo: &Path) -> Error {
        Error::Git(format!("not a git repository: {}", repo.display()))
    }
}

impl WorktreeBackend for FakeGit {
    fn branch_exists(&self, repo: &Path, branch: &str) -> bool {
        self.state
            .borrow()
            .repos
            .get(repo)
            .map(|r| r.branches.contains(branch))
            .unwrap_or(false)
    }

    fn default_remote_branch(&self, repo: &Path) -> Option<String> {
        self.state
            .borrow()
            .repos
            .get(repo)
            .and_then(|r| r.remote_default.clone())
    }

    fn create_worktree(
        &self,
        repo: &Path,
        path: &Path,
        new_branch: &str,
        from: &str,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_create_worktree {
            return Err(Error::Git("injected worktree failure".to_string()));
        }
        let r = state.repos.get_mut(repo).ok_or_else(|| Self::repo_error(repo))?;
        if r.branches.contains(new_branch) {
            return Err(Error::Git(format!("branch '{}' already exists", new_branch)));
        }
        if !r.branches.contains(from) {
            return Err(Error::Git(format!("invalid reference: {}", from)));
        }
        if path.exists() {
            return Err(Error::Git(format!("'{}' already exists", path.display())));
        }
        fs::create_dir_all(path)?;
        r.branches.insert(new_branch.to_string());
        r.worktrees.push(Worktree {
            path: path.to_path_buf(),
            branch: Some(new_branch.to_string()),
        });
        Ok(())
    }

    fn create_worktree_from_branch(&self, repo: &Path, path: &Path, branch: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_create_worktree {
            return Err(Error::Git("injected worktree failure".to_string()));
        }
        let r = state.repos.get_mut(repo).ok_or_else(|| Self::repo_error(repo))?;
        if !r.branches.contains(branch) {
            return Err(Error::Git(format!("invalid reference: {}", branch)));
        }
        if let Some(other) = Self::checked_out_anywhere(repo, r, branch) {
            return Err(Error::Git(format!(
                "'{}' is already checked out at '{}'",
                branch,
                other.display()
            )));
        }
        if path.exists() {
            return Err(Error::Git(format!("'{}' already exists", path.display())));
        }
        fs::create_dir_all(path)?;
        r.worktrees.push(Worktree {
            path: path.to_path_buf(),
            branch: Some(branch.to_string()),
        });
        Ok(())
    }

    fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_remove_worktree {
            return Err(Error::Git("injected remove failure".to_string()));
        }
        let r = state.repos.get_mut(repo).ok_or_else(|| Self::repo_error(repo))?;
        let before = r.worktrees.len();
        r.worktrees.retain(|wt| !same_path(&wt.path, path));
        if r.worktrees.len() == before {
            return Err(Error::Git(format!("'{}' is not a working tree", path.display())));
        }
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    fn prune_worktrees(&self, repo: &Path) -> Result<()> {
        self.with_repo(repo, |r| r.worktrees.retain(|wt| wt.path.exists()));
        Ok(())
    }

    fn delete_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let r = state.repos.get_mut(repo).ok_or_else(|| Self::repo_error(repo))?;
        if Self::checked_out_anywhere(repo, r, branch).is_some() {
            return Err(Error::Git(format!("branch '{}' is checked out", branch)));
        }
        if !r.branches.remove(branch) {
            return Err(Error::Git(format!("branch '{}' not found", branch)));
        }
        Ok(())
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        let state = self.state.borrow();
        for (repo, r) in &state.repos {
            if repo == path {
                return Ok(r.head.clone());
            }
            if let Some(wt) = r.worktrees.iter().find(|wt| same_path(&wt.path, path)) {
                return Ok(wt.branch.clone().unwrap_or_default());
            }
        }
        Err(Self::repo_error(path))
    }

    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        for (repo, r) in state.repos.iter_mut() {
            let is_main = repo == path;
            let index = r.worktrees.iter().position(|wt| same_path(&wt.path, path));
            if !is_main && index.is_none() {
                continue;
            }
            if !r.branches.contains(branch) {
                return Err(Error::Git(format!("pathspec '{}' did not match", branch)));
            }
            if let Some(other) = Self::checked_out_anywhere(repo, r, branch) {
                if !same_path(&other, path) {
                    return Err(Error::Git(format!(
                        "'{}' is already checked out at '{}'",
                        branch,
                        other.display()
                    )));
                }
            }
            match index {
                Some(i) => r.worktrees[i].branch = Some(branch.to_string()),
                None => r.head = branch.to_string(),
            }
            return Ok(());
        }
        Err(Self::repo_error(path))
    }

    fn repository_root(&self, path: &Path) -> Result<PathBuf> {
        let state = self.state.borrow();
        for (repo, r) in &state.repos {
            if let Some(wt) = r.worktrees.iter().find(|wt| path.starts_with(&wt.path)) {
                return Ok(wt.path.clone());
            }
            if path.starts_with(repo) {
                return Ok(repo.clone());
            }
        }
        Err(Self::repo_error(path))
    }

    fn is_repository(&self, path: &Path) -> bool {
        let state = self.state.borrow();
        state.repos.contains_key(path)
            || state
                .repos
                .values()
                .any(|r| r.worktrees.iter().any(|wt| wt.path == path && path.exists()))
    }

    fn list_worktrees(&self, repo: &Path) -> Result<Vec<Worktree>> {
        let state = self.state.borrow();
        let r = state.repos.get(repo).ok_or_else(|| Self::repo_error(repo))?;
        let mut worktrees = vec![Worktree {
            path: repo.to_path_buf(),
            branch: Some(r.head.clone()),
        }];
        worktrees.extend(r.worktrees.iter().cloned());
        Ok(worktrees)
    }

    fn create_branch_and_checkout(&self, repo: &Path, branch: &str, from: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let r = state.repos.get_mut(repo).ok_or_else(|| Self::repo_error(repo))?;
        if r.branches.contains(branch) {
            return Err(Error::Git(format!("branch '{}' already exists", branch)));
        }
        if !r.branches.contains(from) {
            return Err(Error::Git(format!("invalid reference: {}", from)));
        }
        r.branches.insert(branch.to_string());
        r.head = branch.to_string();
        Ok(())
    }

    fn pending_changes(&self, repo: &Path, paths: &[&Path]) -> Result<String> {
        let state = self.state.borrow();
        if !Self::is_checkout(&state, repo) {
            return Err(Self::repo_error(repo));
        }
        let status = state.pending.get(repo).map(String::as_str).unwrap_or("");
        let lines: Vec<&str> = status
            .lines()
            .filter(|line| {
                let file = repo.join(line.get(3..).unwrap_or("").trim());
                paths.is_empty() || paths.iter().any(|p| file.starts_with(p))
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn commit_paths(&self, repo: &Path, paths: &[&Path], message: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !Self::is_checkout(&state, repo) {
            return Err(Self::repo_error(repo));
        }
        if let Some(status) = state.pending.get_mut(repo) {
            let rest: Vec<&str> = status
                .lines()
                .filter(|line| {
                    let file = repo.join(line.get(3..).unwrap_or("").trim());
                    !paths.iter().any(|p| file.starts_with(p))
                })
                .collect();
            *status = rest.join("\n");
        }
        state
            .commits
            .entry(repo.to_path_buf())
            .or_default()
            .push(message.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    live: BTreeSet<String>,
    created: Vec<SessionSpec>,
    current: Option<String>,
    fail_create: bool,
    attached: Vec<String>,
    killed: Vec<String>,
    keys: Vec<(String, String)>,
}

/// Simulated tmux server.
#[derive(Debug, Default)]
pub struct FakeSessions {
    state: RefCell<SessionState>,
}

impl FakeSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str) {
        self.state
            .borrow_mut()
            .live
            .insert(normalize_session_name(name));
    }

    pub fn set_current(&self, name: &str) {
        self.add(name);
        self.state.borrow_mut().current = Some(normalize_session_name(name));
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.state.borrow_mut().fail_create = fail;
    }

    pub fn created(&self) -> Vec<SessionSpec> {
        self.state.borrow().created.clone()
    }

    pub fn attached(&self) -> Vec<String> {
        self.state.borrow().attached.clone()
    }

    pub fn killed(&self) -> Vec<String> {
        self.state.borrow().killed.clone()
    }

    pub fn keys(&self) -> Vec<(String, String)> {
        self.state.borrow().keys.clone()
    }
}

impl SessionBackend for FakeSessions {
    fn exists(&self, name: &str) -> bool {
        self.state
            .borrow()
            .live
            .contains(&normalize_session_name(name))
    }

    fn list(&self) -> Vec<String> {
        self.state.borrow().live.iter().cloned().collect()
    }

    fn create(&self, spec: &SessionSpec) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return Err(Error::SessionCreationFailed(
                "injected session failure".to_string(),
            ));
        }
        let name = normalize_session_name(&spec.name);
        if !state.live.insert(name.clone()) {
            return Err(Error::SessionCreationFailed(format!(
                "duplicate session: {}",
                name
            )));
        }
        state.created.push(spec.clone());
        Ok(())
    }

    fn kill(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let name = normalize_session_name(name);
        if !state.live.remove(&name) {
            return Err(Error::Tmux(format!("can't find session: {}", name)));
        }
        state.killed.push(name);
        Ok(())
    }

    fn attach(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let name = normalize_session_name(name);
        if !state.live.contains(&name) {
            return Err(Error::Tmux(format!("can't find session: {}", name)));
        }
        state.attached.push(name);
        Ok(())
    }

    fn attach_default(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.current.is_some() {
            return Err(Error::Tmux("already in a tmux session".to_string()));
        }
        state.attached.push(String::new());
        Ok(())
    }

    fn current_session_name(&self) -> Option<String> {
        self.state.borrow().current.clone()
    }

    fn send_keys(&self, target: &str, keys: &str) {
        self.state
            .borrow_mut()
            .keys
            .push((target.to_string(), keys.to_string()));
    }

    fn agent_target(&self, session: &str) -> String {
        format!("{}:agent", normalize_session_name(session))
    }
}

/// Prompt that answers from a script and records what it was told.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<bool>>,
    questions: RefCell<Vec<String>>,
    notes: RefCell<Vec<String>>,
    warnings: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue answers; once exhausted every question gets its default.
    pub fn answer(&self, answers: &[bool]) {
        self.answers.borrow_mut().extend(answers.iter().copied());
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str, default_yes: bool) -> bool {
        self.questions.borrow_mut().push(question.to_string());
        self.answers.borrow_mut().pop_front().unwrap_or(default_yes)
    }

    fn note(&self, message: &str) {
        self.notes.borrow_mut().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}

/// Roots in a temp dir plus fresh doubles.
pub struct Fixture {
    pub tmp: TempDir,
    pub settings: Settings,
    pub git: FakeGit,
    pub sessions: FakeSessions,
    pub prompt: ScriptedPrompt,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::new(tmp.path().join("git"), tmp.path().join("crew"));
        fs::create_dir_all(&settings.repos_root).unwrap();
        fs::create_dir_all(&settings.workers_root).unwrap();
        Self {
            tmp,
            settings,
            git: FakeGit::new(),
            sessions: FakeSessions::new(),
            prompt: ScriptedPrompt::new(),
        }
    }

    pub fn ctx(&self) -> Ctx<'_> {
        Ctx::new(&self.settings, &self.git, &self.sessions, &self.prompt)
    }

    /// Create `<repos_root>/<name>` on disk and register it on `main`.
    pub fn repo(&self, name: &str) -> PathBuf {
        let path = self.settings.repos_root.join(name);
        fs::create_dir_all(&path).unwrap();
        self.git.add_repo(path, &["main"])
    }

    pub fn worker_dir(&self, repo: &str, worker: &str) -> PathBuf {
        self.settings.workers_root.join(repo).join(worker)
    }
}
