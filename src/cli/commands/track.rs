//! track / untrack commands - Manage which branches braid tracks

use anyhow::Result;

use crate::cli::commands::{branch_arg, open_session};
use crate::cli::Context;
use crate::ui::output;

/// Start tracking a branch with the given parent (trunk by default).
pub fn track(ctx: &Context, branch: Option<&str>, parent: Option<&str>) -> Result<()> {
    let mut session = open_session(ctx)?;
    let branch = match branch {
        Some(name) => branch_arg(name)?,
        None => session.cache.current_branch_or_err()?,
    };
    let parent = match parent {
        Some(name) => branch_arg(name)?,
        None => session.cache.trunk().clone(),
    };

    session.cache.track_branch(&branch, &parent)?;
    output::print(
        format!("Tracking '{branch}' with parent '{parent}'."),
        session.verbosity,
    );
    Ok(())
}

/// Stop tracking a branch. The git branch itself is left alone.
pub fn untrack(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let mut session = open_session(ctx)?;
    let branch = match branch {
        Some(name) => branch_arg(name)?,
        None => session.cache.current_branch_or_err()?,
    };

    session.cache.untrack_branch(&branch)?;
    output::print(format!("Stopped tracking '{branch}'."), session.verbosity);
    Ok(())
}
