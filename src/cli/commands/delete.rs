//! delete command - Delete a branch and splice its children

use anyhow::Result;

use crate::cli::commands::{branch_arg, open_session};
use crate::cli::Context;
use crate::ui::output;

/// Delete a branch. Children are reparented onto the deleted branch's
/// parent; if the branch is checked out, the parent is checked out first.
pub fn delete(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let mut session = open_session(ctx)?;
    let branch = match branch {
        Some(name) => branch_arg(name)?,
        None => session.cache.current_branch_or_err()?,
    };

    session.cache.delete_branch(&branch)?;
    output::print(format!("Deleted branch '{branch}'."), session.verbosity);
    Ok(())
}
