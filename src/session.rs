//! session
//!
//! One `Session` is constructed per invocation. It discovers the repository,
//! loads the braid configuration, takes the exclusive repository lock, and
//! builds the [`MetaCache`] the command handlers operate on. Dropping the
//! session releases the lock.
//!
//! Stale continuation records are cleared here: if no rebase is in progress
//! when the session opens, whatever `continue.json` says is left over from an
//! aborted-outside-braid rebase and must not influence this run.

use std::path::Path;
use std::rc::Rc;

use crate::core::config::RepoConfig;
use crate::core::errors::CoreError;
use crate::core::lock::{LockError, RepoLock};
use crate::core::paths::BraidPaths;
use crate::core::types::BranchName;
use crate::engine::cache::MetaCache;
use crate::engine::continuation::ContinueStore;
use crate::engine::meta::{GitRefStore, RefStore};
use crate::git::{Git, Vcs};
use crate::ui::Verbosity;

/// Per-invocation knobs, built from the CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub verbosity: Verbosity,
    /// Stamp rebased commits with their author date during restacks.
    pub committer_date_is_author_date: bool,
}

impl SessionOptions {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            ..Self::default()
        }
    }
}

pub struct Session {
    pub cache: MetaCache,
    pub continue_store: ContinueStore,
    pub paths: BraidPaths,
    pub config: RepoConfig,
    pub verbosity: Verbosity,
    /// Held for the whole invocation; released on drop.
    _lock: RepoLock,
}

impl Session {
    /// Open an initialized repository.
    pub fn open(cwd: &Path, options: SessionOptions) -> Result<Self, CoreError> {
        let mut git = Git::open(cwd)?;
        git.set_committer_date_is_author_date(options.committer_date_is_author_date);
        let paths = BraidPaths::from_repo_info(git.info());
        let config = RepoConfig::load(&paths.config_path())?.ok_or(CoreError::NotInitialized)?;
        Self::build(git, paths, config, options.verbosity)
    }

    /// Initialize the repository for braid and open a session over it.
    /// `trunk` defaults to the currently checked-out branch.
    pub fn init(
        cwd: &Path,
        trunk: Option<&str>,
        remote: Option<&str>,
        options: SessionOptions,
    ) -> Result<Self, CoreError> {
        let git = Git::open(cwd)?;
        let paths = BraidPaths::from_repo_info(git.info());

        let trunk = match trunk {
            Some(name) => BranchName::new(name)
                .map_err(|e| CoreError::precondition(format!("invalid trunk name: {e}")))?,
            None => git.current_branch()?.ok_or(CoreError::Detached)?,
        };
        // The trunk must resolve before we write any state.
        git.sha_or_err(trunk.as_str())?;

        let mut config = RepoConfig::new(trunk);
        if let Some(remote) = remote {
            config.remote = remote.to_string();
        }
        paths.ensure_dirs()?;
        config.save(&paths.config_path())?;
        Self::build(git, paths, config, options.verbosity)
    }

    fn build(
        git: Git,
        paths: BraidPaths,
        config: RepoConfig,
        verbosity: Verbosity,
    ) -> Result<Self, CoreError> {
        let lock = RepoLock::acquire(&paths).map_err(|e| match e {
            LockError::AlreadyLocked => CoreError::ConcurrentExecution,
            other => CoreError::precondition(other.to_string()),
        })?;

        let continue_store = ContinueStore::new(paths.continuation_path());
        let current_branch_override = if git.rebase_in_progress() {
            continue_store
                .load()?
                .and_then(|data| data.current_branch_override)
        } else {
            continue_store.clear()?;
            None
        };

        let vcs: Rc<dyn Vcs> = Rc::new(git);
        let store: Rc<dyn RefStore> = Rc::new(GitRefStore::new(vcs.clone()));
        let cache = MetaCache::new(
            vcs,
            store,
            config.trunk.clone(),
            config.remote.clone(),
            current_branch_override,
        )?;

        Ok(Self {
            cache,
            continue_store,
            paths,
            config,
            verbosity,
            _lock: lock,
        })
    }
}
