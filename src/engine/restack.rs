//! engine::restack
//!
//! Multi-branch restack over an ordered queue.
//!
//! The queue comes from a scope computation and is already ordered
//! parent-before-child; a child's new base is only correct once its parent
//! has been brought up to date, so no reordering is permitted. The first
//! conflict stops processing: the remaining tail is persisted and the
//! process exits, leaving resumption to `bd continue`.

use crate::core::errors::CoreError;
use crate::core::types::BranchName;
use crate::engine::cache::{MetaCache, RestackResult};
use crate::engine::continuation::{ContinuationData, ContinueStore};
use crate::ui::output;
use crate::ui::Verbosity;

pub fn restack_branches(
    cache: &mut MetaCache,
    store: &ContinueStore,
    verbosity: Verbosity,
    branches: &[BranchName],
) -> Result<(), CoreError> {
    let mut queue = branches.to_vec();
    while !queue.is_empty() {
        let branch = queue.remove(0);
        match cache.restack_branch(&branch) {
            Err(CoreError::UntrackedBranch(_)) | Err(CoreError::InvalidParent(_)) => {
                output::warn(
                    format!("Skipping '{branch}': it is not tracked."),
                    verbosity,
                );
            }
            Err(err) => return Err(err),
            Ok(RestackResult::Unneeded) => {
                output::print(
                    format!("'{branch}' does not need to be restacked."),
                    verbosity,
                );
            }
            Ok(RestackResult::Done) => {
                let parent = cache.parent_precondition(&branch)?;
                output::print(format!("Restacked '{branch}' on '{parent}'."), verbosity);
            }
            Ok(RestackResult::Conflict {
                rebased_branch_base,
            }) => {
                store.save(&ContinuationData {
                    rebased_branch_base: Some(rebased_branch_base),
                    branches_to_restack: queue,
                    branches_to_sync: Vec::new(),
                    current_branch_override: cache.current_branch().cloned(),
                })?;
                print_conflict_status(
                    cache,
                    &format!("Hit a conflict while restacking '{branch}'."),
                    verbosity,
                )?;
                return Err(CoreError::RebaseConflict);
            }
        }
    }
    Ok(())
}

/// Tell the user where the conflict stands and how to proceed.
pub fn print_conflict_status(
    cache: &MetaCache,
    message: &str,
    verbosity: Verbosity,
) -> Result<(), CoreError> {
    output::print(message, verbosity);
    let unmerged = cache.unmerged_files()?;
    if !unmerged.is_empty() {
        output::print("Unmerged files:", verbosity);
        for file in unmerged {
            output::print(format!("  {file}"), verbosity);
        }
    }
    output::print(
        "Resolve the conflicts, stage the changes, and run `bd continue`.",
        verbosity,
    );
    output::print("To give up, run `bd abort`.", verbosity);
    Ok(())
}
