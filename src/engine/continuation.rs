//! engine::continuation
//!
//! Cross-process continuation of interrupted rebases.
//!
//! A conflicted rebase suspends the process; the user resolves the conflict
//! and runs `bd continue` in a fresh process with an empty cache. Everything
//! needed to finish the original operation is persisted as one JSON record
//! at `<common_dir>/braid/continue.json` and reloaded on the next
//! invocation. A record found while no rebase is in progress is stale and
//! gets discarded at session start.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::CoreError;
use crate::core::types::{BranchName, Oid};
use crate::engine::cache::{ContinueResult, MetaCache};
use crate::engine::{restack, sync};
use crate::ui::output;
use crate::ui::Verbosity;

/// Durable record of an interrupted multi-step operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationData {
    /// The fork point to record for the in-progress branch once its
    /// conflict resolves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebased_branch_base: Option<Oid>,

    /// Remaining ordered tail of a multi-branch restack.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches_to_restack: Vec<BranchName>,

    /// Remote branches still pending a fetch/rebase step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches_to_sync: Vec<BranchName>,

    /// The branch the next process should treat as current; the live
    /// checkout is detached mid-rebase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_branch_override: Option<BranchName>,
}

/// File-backed store for the continuation record.
pub struct ContinueStore {
    path: PathBuf,
}

impl ContinueStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Option<ContinuationData>, CoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let data = serde_json::from_str(&contents)
            .map_err(|err| CoreError::precondition(format!("corrupt continuation record: {err}")))?;
        Ok(Some(data))
    }

    pub fn save(&self, data: &ContinuationData) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)
            .map_err(|err| CoreError::precondition(format!("unserializable continuation: {err}")))?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Resume a suspended operation after the user resolved (or thinks they
/// resolved) a conflict.
pub fn continue_op(
    cache: &mut MetaCache,
    store: &ContinueStore,
    verbosity: Verbosity,
    add_all: bool,
) -> Result<(), CoreError> {
    if !cache.rebase_in_progress() {
        store.clear()?;
        return Err(CoreError::NothingToContinue);
    }
    if add_all {
        cache.add_all()?;
    }

    let data = store.load()?.unwrap_or_default();
    let Some(base) = data.rebased_branch_base.clone() else {
        // The rebase was started outside our restack flow.
        store.clear()?;
        return Err(CoreError::ForeignRebase);
    };

    match cache.continue_rebase(base.clone())? {
        ContinueResult::Conflict => {
            store.save(&ContinuationData {
                rebased_branch_base: Some(base),
                ..data
            })?;
            restack::print_conflict_status(cache, "Rebase conflict is not yet resolved.", verbosity)?;
            return Err(CoreError::RebaseConflict);
        }
        ContinueResult::Done(branch) => {
            output::print(
                format!("Resolved rebase conflict for '{branch}'."),
                verbosity,
            );
        }
    }

    if !data.branches_to_sync.is_empty() {
        let base_branch = cache.current_branch_precondition()?;
        sync::get_branches_from_remote(
            cache,
            store,
            verbosity,
            &data.branches_to_sync,
            &base_branch,
            &data.branches_to_restack,
        )?;
    }
    if !data.branches_to_restack.is_empty() {
        restack::restack_branches(cache, store, verbosity, &data.branches_to_restack)?;
    }
    store.clear()?;
    Ok(())
}
