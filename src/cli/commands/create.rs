//! create command - Create a new tracked branch on top of the current one

use anyhow::{bail, Result};

use crate::cli::commands::{branch_arg, open_session};
use crate::cli::Context;
use crate::git::CommitOpts;
use crate::ui::output;

/// Create a new branch stacked on the current branch, optionally committing
/// staged changes onto it.
pub fn create(ctx: &Context, name: &str, message: Option<&str>, all: bool) -> Result<()> {
    let mut session = open_session(ctx)?;
    let branch = branch_arg(name)?;

    session.cache.checkout_new_branch(&branch)?;
    if all {
        session.cache.add_all()?;
    }
    if let Some(message) = message {
        if !session.cache.detect_staged_changes()? {
            bail!("nothing staged to commit on '{branch}'");
        }
        session.cache.commit(&CommitOpts {
            message: Some(message.to_string()),
            ..CommitOpts::default()
        })?;
    }

    output::print(format!("Created branch '{branch}'."), session.verbosity);
    Ok(())
}
