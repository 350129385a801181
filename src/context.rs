//! Working out which repository a command applies to.

use crate::config::Settings;
use crate::naming::{normalize_session_name, repo_path, split_session_name, worker_path};
use crate::polecat::{file_name, sorted_subdirs};
use crate::{Ctx, Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Where a repository name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Explicit,
    RepositoryDirectory,
    WorkerDirectory,
    Session,
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ContextSource::Explicit => "argument",
            ContextSource::RepositoryDirectory => "current directory",
            ContextSource::WorkerDirectory => "crew directory",
            ContextSource::Session => "tmux session",
        };
        f.write_str(text)
    }
}

/// A resolved repository name and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub repo: String,
    pub source: ContextSource,
}

/// Resolve the repository for a command. First match wins:
///
/// 1. `explicit`, verbatim (the caller checks it exists)
/// 2. `cwd` inside the repositories root: the enclosing repository's name
/// 3. `cwd` inside the workers root: the first path segment below the root
/// 4. the current tmux session: `<repo>@<worker>`, or a bare repository name
pub fn resolve_repository(ctx: &Ctx<'_>, explicit: Option<&str>, cwd: &Path) -> Result<Resolved> {
    if let Some(repo) = explicit.filter(|name| !name.is_empty()) {
        return Ok(Resolved {
            repo: repo.to_string(),
            source: ContextSource::Explicit,
        });
    }

    let settings = ctx.settings;

    if relative_to(&settings.repos_root, cwd).is_some() {
        match ctx.git.repository_root(cwd) {
            Ok(root) => {
                if let Some(name) = root.file_name() {
                    return Ok(Resolved {
                        repo: name.to_string_lossy().to_string(),
                        source: ContextSource::RepositoryDirectory,
                    });
                }
            }
            Err(e) => tracing::debug!(error = %e, "cwd under repos root is not in a repository"),
        }
    }

    if let Some(rel) = relative_to(&settings.workers_root, cwd) {
        if let Some(Component::Normal(first)) = rel.components().next() {
            return Ok(Resolved {
                repo: first.to_string_lossy().to_string(),
                source: ContextSource::WorkerDirectory,
            });
        }
    }

    if let Some(session) = ctx.sessions.current_session_name() {
        if let Some((repo, _)) = split_session_name(&session) {
            let repo = directory_for_session_part(&settings.workers_root, repo)
                .or_else(|| directory_for_session_part(&settings.repos_root, repo))
                .unwrap_or_else(|| repo.to_string());
            return Ok(Resolved {
                repo,
                source: ContextSource::Session,
            });
        }
        if let Some(repo) = session_repository(ctx, &session) {
            return Ok(Resolved {
                repo,
                source: ContextSource::Session,
            });
        }
    }

    Err(Error::AmbiguousContext {
        repos_root: settings.repos_root.clone(),
        workers_root: settings.workers_root.clone(),
    })
}

/// The directory under `root` that a name reported by tmux refers to.
///
/// tmux rewrites `.` to `_` in session names, so `my_app` finds `my.app`.
/// An exact match wins over a normalized one.
pub(crate) fn directory_for_session_part(root: &Path, part: &str) -> Option<String> {
    if !part.is_empty() && root.join(part).is_dir() {
        return Some(part.to_string());
    }
    let wanted = normalize_session_name(part);
    sorted_subdirs(root)
        .ok()?
        .iter()
        .map(|dir| file_name(dir))
        .find(|name| normalize_session_name(name) == wanted)
}

/// A live `<repo>@<worker>` session mapped back to its workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionWorkspace {
    pub repo: String,
    pub worker: String,
    pub path: PathBuf,
}

/// The workspace behind a worker session, if its directory exists.
pub(crate) fn session_workspace(settings: &Settings, session: &str) -> Option<SessionWorkspace> {
    let (repo, worker) = split_session_name(session)?;
    let repo = directory_for_session_part(&settings.workers_root, repo)?;
    let worker = directory_for_session_part(&settings.workers_root.join(&repo), worker)?;
    Some(SessionWorkspace {
        path: worker_path(&settings.workers_root, &repo, &worker),
        repo,
        worker,
    })
}

/// The repository behind a bare session name, if it is a real repository.
pub(crate) fn session_repository(ctx: &Ctx<'_>, session: &str) -> Option<String> {
    let root = &ctx.settings.repos_root;
    let repo = directory_for_session_part(root, session)?;
    ctx.git
        .is_repository(&repo_path(root, &repo))
        .then_some(repo)
}

/// `path` relative to `root` when it lies strictly below it.
///
/// Tries the paths as given and with symlinks resolved, so a root under
/// `/tmp` still matches a cwd reported as `/private/tmp`.
fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    let direct = strict_suffix(root, path);
    if direct.is_some() {
        return direct;
    }
    let root = root.canonicalize().ok()?;
    let path = path.canonicalize().ok()?;
    strict_suffix(&root, &path)
}

fn strict_suffix(root: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(root)
        .ok()
        .filter(|rel| rel.components().next().is_some())
        .map(Path::to_path_buf)
}
