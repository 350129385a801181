//! `git` command-line implementation of [`WorktreeBackend`].

use super::{Worktree, WorktreeBackend, parse_worktree_porcelain};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Shells out to the `git` binary on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn output(&self, dir: &Path, args: &[&str]) -> Result<Output> {
        tracing::debug!(dir = %dir.display(), ?args, "git");
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| Error::Git(format!("failed to run git: {}", e)))
    }

    /// Run and require success; the error carries git's own output.
    fn run(&self, dir: &Path, args: &[&str], what: &str) -> Result<String> {
        let output = self.output(dir, args)?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }
        let mut detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if detail.is_empty() {
            detail = String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
        Err(Error::Git(format!("{}: {}", what, detail)))
    }

    fn succeeds(&self, dir: &Path, args: &[&str]) -> bool {
        self.output(dir, args)
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl WorktreeBackend for GitCli {
    fn branch_exists(&self, repo: &Path, branch: &str) -> bool {
        let reference = format!("refs/heads/{}", branch);
        self.succeeds(repo, &["show-ref", "--verify", "--quiet", &reference])
    }

    fn default_remote_branch(&self, repo: &Path) -> Option<String> {
        let output = self
            .run(repo, &["symbolic-ref", "refs/remotes/origin/HEAD"], "symbolic-ref")
            .ok()?;
        let branch = output
            .trim()
            .strip_prefix("refs/remotes/origin/")?
            .to_string();
        (!branch.is_empty()).then_some(branch)
    }

    fn create_worktree(
        &self,
        repo: &Path,
        path: &Path,
        new_branch: &str,
        from: &str,
    ) -> Result<()> {
        let path = path_arg(path);
        self.run(
            repo,
            &["worktree", "add", &path, "-b", new_branch, from],
            "failed to create worktree",
        )
        .map(|_| ())
    }

    fn create_worktree_from_branch(&self, repo: &Path, path: &Path, branch: &str) -> Result<()> {
        let path = path_arg(path);
        self.run(
            repo,
            &["worktree", "add", &path, branch],
            "failed to create worktree from existing branch",
        )
        .map(|_| ())
    }

    fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<()> {
        let path = path_arg(path);
        self.run(
            repo,
            &["worktree", "remove", &path, "--force"],
            "failed to remove worktree",
        )
        .map(|_| ())
    }

    fn prune_worktrees(&self, repo: &Path) -> Result<()> {
        self.run(repo, &["worktree", "prune"], "failed to prune worktrees")
            .map(|_| ())
    }

    fn delete_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        self.run(repo, &["branch", "-D", branch], "failed to delete branch")
            .map(|_| ())
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        self.run(
            path,
            &["branch", "--show-current"],
            "failed to read current branch",
        )
        .map(|out| out.trim().to_string())
    }

    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()> {
        self.run(path, &["checkout", branch], "failed to checkout branch")
            .map(|_| ())
    }

    fn repository_root(&self, path: &Path) -> Result<PathBuf> {
        self.run(path, &["rev-parse", "--show-toplevel"], "not a git repository")
            .map(|out| PathBuf::from(out.trim()))
    }

    fn is_repository(&self, path: &Path) -> bool {
        path.join(".git").exists()
    }

    fn list_worktrees(&self, repo: &Path) -> Result<Vec<Worktree>> {
        let output = self.run(
            repo,
            &["worktree", "list", "--porcelain"],
            "failed to list worktrees",
        )?;
        Ok(parse_worktree_porcelain(&output))
    }

    fn create_branch_and_checkout(&self, repo: &Path, branch: &str, from: &str) -> Result<()> {
        self.run(
            repo,
            &["checkout", "-b", branch, from],
            "failed to create feature branch",
        )
        .map(|_| ())
    }

    fn pending_changes(&self, repo: &Path, paths: &[&Path]) -> Result<String> {
        let mut args = vec!["status".to_string(), "--porcelain".to_string(), "--".to_string()];
        args.extend(paths.iter().map(|p| path_arg(p)));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(repo, &args, "failed to check status")
            .map(|out| out.trim().to_string())
    }

    fn commit_paths(&self, repo: &Path, paths: &[&Path], message: &str) -> Result<()> {
        let mut add = vec!["add".to_string(), "--".to_string()];
        add.extend(paths.iter().map(|p| path_arg(p)));
        let add: Vec<&str> = add.iter().map(String::as_str).collect();
        self.run(repo, &add, "failed to stage files")?;
        self.run(repo, &["commit", "-m", message], "failed to commit")
            .map(|_| ())
    }
}
