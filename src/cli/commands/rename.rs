//! rename command - Rename the current branch

use anyhow::Result;

use crate::cli::commands::{branch_arg, open_session};
use crate::cli::Context;
use crate::ui::output;

/// Rename the current branch, carrying its tracking metadata over. PR
/// linkage is cleared, since the PR tracks the old name.
pub fn rename(ctx: &Context, new_name: &str) -> Result<()> {
    let mut session = open_session(ctx)?;
    let old_name = session.cache.current_branch_or_err()?;
    let new_name = branch_arg(new_name)?;

    session.cache.rename_current_branch(&new_name)?;
    output::print(
        format!("Renamed '{old_name}' to '{new_name}'."),
        session.verbosity,
    );
    Ok(())
}
