//! engine::sync
//!
//! Pulling a downstack of branches from the remote.
//!
//! Branches are processed top-down, each fetched relative to the one before
//! it so chained fetch-base bookkeeping works (the base of a non-trunk child
//! is the previous fetch's head). A branch unknown locally is materialized
//! from the fetch; a known, tracked branch is rebased onto its fetched
//! counterpart under the usual conflict contract.

use crate::core::errors::CoreError;
use crate::core::types::BranchName;
use crate::engine::cache::{MetaCache, RestackResult};
use crate::engine::continuation::{ContinuationData, ContinueStore};
use crate::engine::restack::print_conflict_status;
use crate::ui::output;
use crate::ui::Verbosity;

/// Fetch and reconcile `downstack` (ordered parent-before-child, starting
/// just above `base`). `pending_restack` is carried into the continuation
/// if a rebase conflicts, so an interrupted sync still finishes its restack
/// phase after `bd continue`.
pub fn get_branches_from_remote(
    cache: &mut MetaCache,
    store: &ContinueStore,
    verbosity: Verbosity,
    downstack: &[BranchName],
    base: &BranchName,
    pending_restack: &[BranchName],
) -> Result<(), CoreError> {
    let mut parent = base.clone();
    let mut remaining = downstack.to_vec();
    while !remaining.is_empty() {
        let branch = remaining.remove(0);
        cache.fetch_branch(&branch, &parent)?;

        if !cache.branch_exists(&branch) {
            cache.checkout_branch_from_fetched(&branch, &parent)?;
            output::print(
                format!("Synced new branch '{branch}' from remote."),
                verbosity,
            );
        } else if !cache.is_branch_tracked(&branch)? {
            return Err(CoreError::UntrackedBranch(branch));
        } else if cache.branch_matches_fetched(&branch)? {
            cache.checkout_branch(&branch)?;
            output::print(format!("'{branch}' is up to date."), verbosity);
        } else {
            match cache.rebase_branch_onto_fetched(&branch)? {
                RestackResult::Conflict {
                    rebased_branch_base,
                } => {
                    store.save(&ContinuationData {
                        rebased_branch_base: Some(rebased_branch_base),
                        branches_to_restack: pending_restack.to_vec(),
                        branches_to_sync: remaining,
                        current_branch_override: cache.current_branch().cloned(),
                    })?;
                    print_conflict_status(
                        cache,
                        &format!("Hit a conflict while syncing '{branch}'."),
                        verbosity,
                    )?;
                    return Err(CoreError::RebaseConflict);
                }
                _ => {
                    output::print(format!("Synced '{branch}' from remote."), verbosity);
                }
            }
        }
        parent = branch;
    }
    Ok(())
}
