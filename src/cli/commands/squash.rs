//! squash command - Squash the current branch into one commit

use anyhow::Result;

use crate::cli::commands::open_session;
use crate::cli::Context;
use crate::engine::restack::restack_branches;
use crate::engine::scope::ScopeSpec;
use crate::git::CommitOpts;
use crate::ui::output;

/// Squash all commits unique to the current branch into a single commit,
/// then restack its descendants.
pub fn squash(ctx: &Context, message: Option<&str>) -> Result<()> {
    let mut session = open_session(ctx)?;
    let branch = session.cache.current_branch_or_err()?;

    session.cache.squash_current_branch(&CommitOpts {
        message: message.map(str::to_string),
        // Reuse the oldest commit's message unless one was given.
        no_edit: message.is_none(),
        ..CommitOpts::default()
    })?;
    output::print(format!("Squashed '{branch}'."), session.verbosity);

    let queue = session
        .cache
        .relative_stack(&branch, ScopeSpec::UPSTACK_EXCLUSIVE)?;
    restack_branches(
        &mut session.cache,
        &session.continue_store,
        session.verbosity,
        &queue,
    )?;
    Ok(())
}
