//! core::errors
//!
//! Error taxonomy for the engine.
//!
//! Precondition failures abort before any mutation. Subprocess failures
//! bubble up with the captured output attached. Rebase conflicts are NOT
//! errors in this crate: the engine returns them as outcome values, and
//! only the command layer converts an unresolved conflict into
//! [`CoreError::RebaseConflict`] after the continuation has been persisted.

use crate::core::config::ConfigError;
use crate::core::types::BranchName;
use crate::engine::meta::StoreError;
use crate::git::GitError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An operation's preconditions were not met. Nothing was mutated.
    #[error("{0}")]
    Precondition(String),

    #[error("branch '{0}' is not tracked; track it with `bd track {0}`")]
    UntrackedBranch(BranchName),

    /// Tracked, but the recorded fork point no longer matches the parent's
    /// history and could not be auto-repaired.
    #[error("branch '{0}' has an invalid parent; re-track it with `bd track {0}`")]
    InvalidParent(BranchName),

    #[error("cannot perform this operation on the trunk branch")]
    BadTrunkOperation,

    #[error("not currently on a branch (detached HEAD)")]
    Detached,

    #[error("branch '{0}' does not exist")]
    UnknownBranch(BranchName),

    /// Another process holds the repository lock.
    #[error("another braid command is already running in this repository")]
    ConcurrentExecution,

    /// `continue` was invoked but there is nothing to resume.
    #[error("no rebase in progress; there is nothing to continue")]
    NothingToContinue,

    /// A rebase is in progress but it was not started by us, or the
    /// persisted continuation is missing required fields.
    #[error("the rebase in progress was not started by braid; run `git rebase --continue` to finish it")]
    ForeignRebase,

    /// A rebase stopped on conflicts. The continuation has already been
    /// persisted; the user resolves and runs `bd continue`.
    #[error("rebase stopped on a conflict; resolve it and run `bd continue`")]
    RebaseConflict,

    #[error("repository is not initialized for braid; run `bd init`")]
    NotInitialized,

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }
}
