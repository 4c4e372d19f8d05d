//! fold command - Fold the current branch into its parent

use anyhow::Result;

use crate::cli::commands::open_session;
use crate::cli::Context;
use crate::engine::restack::restack_branches;
use crate::engine::scope::ScopeSpec;
use crate::ui::output;

/// Fold the current branch into its parent and restack the branches that sat
/// on top of it.
pub fn fold(ctx: &Context, keep: bool) -> Result<()> {
    let mut session = open_session(ctx)?;
    let folded = session.cache.current_branch_or_err()?;
    let parent = session.cache.parent_precondition(&folded)?;

    session.cache.fold_current_branch(keep)?;
    let survivor = session.cache.current_branch_or_err()?;
    output::print(
        format!("Folded '{folded}' into '{parent}'."),
        session.verbosity,
    );

    let queue = session
        .cache
        .relative_stack(&survivor, ScopeSpec::UPSTACK_EXCLUSIVE)?;
    restack_branches(
        &mut session.cache,
        &session.continue_store,
        session.verbosity,
        &queue,
    )?;
    Ok(())
}
