//! move command - Reparent a branch onto another branch

use anyhow::Result;

use crate::cli::commands::{branch_arg, open_session};
use crate::cli::Context;
use crate::engine::restack::restack_branches;
use crate::engine::scope::ScopeSpec;
use crate::ui::output;

/// Set a new parent for a branch, then rebase the branch and its descendants
/// onto the new parent's tip.
pub fn move_branch(ctx: &Context, onto: &str, source: Option<&str>) -> Result<()> {
    let mut session = open_session(ctx)?;
    let onto = branch_arg(onto)?;
    let branch = match source {
        Some(name) => branch_arg(name)?,
        None => session.cache.current_branch_or_err()?,
    };

    session.cache.set_parent(&branch, &onto)?;
    output::print(
        format!("Moved '{branch}' onto '{onto}'."),
        session.verbosity,
    );

    let queue = session.cache.relative_stack(&branch, ScopeSpec::UPSTACK)?;
    restack_branches(
        &mut session.cache,
        &session.continue_store,
        session.verbosity,
        &queue,
    )?;
    Ok(())
}
