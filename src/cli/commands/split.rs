//! split command - Split the current branch at commit boundaries

use anyhow::{bail, Result};

use crate::cli::commands::{branch_arg, open_session};
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::ui::output;

/// Split the current branch into several branches. `names` and `points` are
/// supplied newest-first: each point counts commits back from the tip.
pub fn split(ctx: &Context, names: &[String], points: &[usize]) -> Result<()> {
    if names.len() != points.len() {
        bail!(
            "got {} --name values but {} --at values; each split needs both",
            names.len(),
            points.len()
        );
    }

    let mut session = open_session(ctx)?;
    let branch = session.cache.current_branch_or_err()?;
    let names: Vec<BranchName> = names
        .iter()
        .map(|name| branch_arg(name))
        .collect::<Result<_>>()?;

    // The user lists pieces newest-first; the cache wants the names walked
    // oldest-first.
    let oldest_first: Vec<BranchName> = names.iter().rev().cloned().collect();
    session.cache.apply_split(&branch, &oldest_first, points)?;
    output::print(
        format!(
            "Split '{}' into {}.",
            branch,
            names
                .iter()
                .map(|n| format!("'{n}'"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        session.verbosity,
    );
    Ok(())
}
