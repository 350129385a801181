//! Common test utilities for rig integration tests.
//!
//! Provides `TestEnv`, an isolated home directory holding the repositories
//! root, the workers root and the config file, so tests never touch the
//! user's `~/git`, `~/crew` or tmux server.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

const GIT_IDENTITY: &[(&str, &str)] = &[
    ("GIT_AUTHOR_NAME", "Rig Test"),
    ("GIT_AUTHOR_EMAIL", "rig@example.com"),
    ("GIT_COMMITTER_NAME", "Rig Test"),
    ("GIT_COMMITTER_EMAIL", "rig@example.com"),
];

/// `true` when a `git` binary is on PATH. Tests that need real repositories
/// return early otherwise.
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// A test environment with its own home directory.
///
/// Layout:
/// - `<home>/git`: repositories root (`RIGS_BASE`)
/// - `<home>/crew`: workers root (`CREW_BASE`)
/// - `<home>/config.kdl`: config file (`RIG_CONFIG`), absent unless written
pub struct TestEnv {
    pub home: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let env = Self {
            home: TempDir::new().unwrap(),
        };
        fs::create_dir_all(env.repos_root()).unwrap();
        fs::create_dir_all(env.workers_root()).unwrap();
        env
    }

    pub fn repos_root(&self) -> PathBuf {
        self.home.path().join("git")
    }

    pub fn workers_root(&self) -> PathBuf {
        self.home.path().join("crew")
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.path().join("config.kdl")
    }

    pub fn write_config(&self, contents: &str) {
        fs::write(self.config_path(), contents).unwrap();
    }

    /// A Command for the rig binary running in the test home.
    ///
    /// The action log is off and tmux uses a private socket directory.
    pub fn rig(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rig"));
        cmd.current_dir(self.home.path());
        cmd.env("HOME", self.home.path());
        cmd.env("RIGS_BASE", self.repos_root());
        cmd.env("CREW_BASE", self.workers_root());
        cmd.env("RIG_CONFIG", self.config_path());
        cmd.env("RIG_ACTION_LOG", "off");
        cmd.env("TMUX_TMPDIR", self.home.path());
        cmd.env_remove("TMUX");
        cmd.env_remove("RIG_USE_CC");
        cmd.env_remove("RIG_DEFAULT_BRANCH");
        cmd.env_remove("RIG_LOG");
        for (key, value) in GIT_IDENTITY {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run git in `dir`, panicking on failure. Returns trimmed stdout.
    pub fn git(&self, dir: &Path, args: &[&str]) -> String {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("HOME", self.home.path())
            .envs(GIT_IDENTITY.iter().copied())
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Create `<repos_root>/<name>` as a repository on `main` with one commit.
    pub fn init_repo(&self, name: &str) -> PathBuf {
        let dir = self.repos_root().join(name);
        fs::create_dir_all(&dir).unwrap();
        self.git(&dir, &["init", "-q"]);
        self.git(&dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        fs::write(dir.join("README.md"), format!("# {}\n", name)).unwrap();
        self.git(&dir, &["add", "README.md"]);
        self.git(&dir, &["commit", "-q", "-m", "Initial commit"]);
        dir
    }

    /// Add a worktree for `worker` at `<workers_root>/<repo>/<worker>` on `branch`,
    /// creating the branch from `main` when `create` is set.
    pub fn add_worktree(&self, repo: &str, worker: &str, branch: &str, create: bool) -> PathBuf {
        let repo_dir = self.repos_root().join(repo);
        let path = self.workers_root().join(repo).join(worker);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let path_arg = path.to_string_lossy().to_string();
        if create {
            self.git(&repo_dir, &["worktree", "add", "-q", "-b", branch, &path_arg, "main"]);
        } else {
            self.git(&repo_dir, &["worktree", "add", "-q", &path_arg, branch]);
        }
        path
    }

    pub fn current_branch(&self, dir: &Path) -> String {
        self.git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}
