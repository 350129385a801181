//! Names for polecats, the one-shot workers created by `rig sling`.

use crate::Result;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Every polecat name carries this prefix.
pub const POLECAT_PREFIX: &str = "polecat_";

pub(crate) const NAMES: &[&str] = &[
    "emma", "olivia", "ava", "sophia", "mia", "charlotte", "amelia", "harper", "evelyn", "abigail",
    "ella", "scarlett", "grace", "chloe", "lily", "zoe", "maya", "lucy", "isabella", "aria",
    "aurora", "violet", "nova", "hazel",
];

/// Check if a worker name follows the polecat naming convention.
pub fn is_polecat(name: &str) -> bool {
    name.starts_with(POLECAT_PREFIX)
}

/// Pick a polecat name not already present in `used`.
///
/// When every pool name is taken the pick falls back to the whole pool and
/// may collide with an existing worker; the caller must check the path.
pub fn generate_name<S: AsRef<str>>(used: &[S]) -> String {
    generate_name_from(NAMES, used, &mut rand::thread_rng())
}

pub(crate) fn generate_name_from<S: AsRef<str>, R: Rng + ?Sized>(
    pool: &[&str],
    used: &[S],
    rng: &mut R,
) -> String {
    let taken: HashSet<&str> = used
        .iter()
        .filter_map(|name| name.as_ref().strip_prefix(POLECAT_PREFIX))
        .collect();

    let available: Vec<&str> = pool
        .iter()
        .copied()
        .filter(|name| !taken.contains(name))
        .collect();

    let candidates = if available.is_empty() {
        pool
    } else {
        available.as_slice()
    };

    let base = candidates.choose(rng).copied().unwrap_or("polecat");
    format!("{}{}", POLECAT_PREFIX, base)
}

/// A polecat found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolecatDir {
    pub name: String,
    pub repo: String,
    pub path: PathBuf,
}

/// Find polecat worktree directories under every repository in the workers root.
pub fn list(workers_root: &Path) -> Result<Vec<PolecatDir>> {
    let mut polecats = Vec::new();
    if !workers_root.exists() {
        return Ok(polecats);
    }

    for repo_dir in sorted_subdirs(workers_root)? {
        let repo = file_name(&repo_dir);
        let Ok(workers) = sorted_subdirs(&repo_dir) else {
            continue;
        };
        for worker_dir in workers {
            let name = file_name(&worker_dir);
            if is_polecat(&name) {
                polecats.push(PolecatDir {
                    name,
                    repo: repo.clone(),
                    path: worker_dir,
                });
            }
        }
    }

    Ok(polecats)
}

/// Names of every worker directory for one repository (the exclusion set
/// for new polecat names).
pub fn worker_names(workers_root: &Path, repo: &str) -> Vec<String> {
    sorted_subdirs(&workers_root.join(repo))
        .map(|dirs| dirs.iter().map(|dir| file_name(dir)).collect())
        .unwrap_or_default()
}

pub(crate) fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    Ok(dirs)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
