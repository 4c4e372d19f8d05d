//! core::paths
//!
//! Centralized path routing for braid storage locations.
//!
//! All durable state lives under `<common_dir>/braid/`, so linked worktrees
//! of the same repository share one config, one lock, and one continuation
//! record. No code outside this module computes `*.join("braid")` paths.
//!
//! Layout:
//! - `config.toml` - repository configuration (trunk, remote)
//! - `lock` - exclusive lock file
//! - `continue.json` - persisted continuation after a rebase conflict

use std::path::{Path, PathBuf};

use crate::git::RepoInfo;

/// Path routing for braid storage.
///
/// Repo-scoped storage always uses `common_dir`; for a linked worktree that
/// is the parent repository's git dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BraidPaths {
    /// Per-worktree .git directory. Equals `common_dir` for normal repos;
    /// `.git/worktrees/<name>/` for linked worktrees.
    pub git_dir: PathBuf,

    /// Shared git directory (refs, objects, config).
    pub common_dir: PathBuf,
}

impl BraidPaths {
    pub fn new(git_dir: PathBuf, common_dir: PathBuf) -> Self {
        Self {
            git_dir,
            common_dir,
        }
    }

    pub fn from_repo_info(info: &RepoInfo) -> Self {
        Self {
            git_dir: info.git_dir.clone(),
            common_dir: info.common_dir.clone(),
        }
    }

    /// Root braid directory under `common_dir`.
    pub fn braid_dir(&self) -> PathBuf {
        self.common_dir.join("braid")
    }

    /// `<common_dir>/braid/config.toml`
    pub fn config_path(&self) -> PathBuf {
        self.braid_dir().join("config.toml")
    }

    /// `<common_dir>/braid/lock`
    pub fn lock_path(&self) -> PathBuf {
        self.braid_dir().join("lock")
    }

    /// `<common_dir>/braid/continue.json`
    pub fn continuation_path(&self) -> PathBuf {
        self.braid_dir().join("continue.json")
    }

    /// Whether this is a linked worktree (common_dir != git_dir).
    pub fn is_worktree(&self) -> bool {
        self.git_dir != self.common_dir
    }

    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    /// Create `<common_dir>/braid/` if needed.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.braid_dir())
    }
}
