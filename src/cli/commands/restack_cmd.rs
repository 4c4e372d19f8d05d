//! restack command - Realign branches with their parents' tips

use anyhow::Result;

use crate::cli::commands::branch_arg;
use crate::cli::Context;
use crate::engine::restack::restack_branches;
use crate::engine::scope::ScopeSpec;
use crate::session::{Session, SessionOptions};

/// Restack branches around `branch` (the current branch by default). The
/// scope flags pick which slice of the stack is processed; the default is
/// the whole stack containing the branch.
pub fn restack(
    ctx: &Context,
    branch: Option<&str>,
    only: bool,
    upstack: bool,
    downstack: bool,
    committer_date_is_author_date: bool,
) -> Result<()> {
    let options = SessionOptions {
        verbosity: ctx.verbosity,
        committer_date_is_author_date,
    };
    let mut session = Session::open(&ctx.cwd()?, options)?;

    let branch = match branch {
        Some(name) => branch_arg(name)?,
        None => session.cache.current_branch_or_err()?,
    };
    let scope = if only {
        ScopeSpec {
            recursive_parents: false,
            current_branch: true,
            recursive_children: false,
        }
    } else if upstack {
        ScopeSpec::UPSTACK
    } else if downstack {
        ScopeSpec::DOWNSTACK
    } else {
        ScopeSpec::STACK
    };

    let queue = session.cache.relative_stack(&branch, scope)?;
    restack_branches(
        &mut session.cache,
        &session.continue_store,
        session.verbosity,
        &queue,
    )?;
    Ok(())
}
