//! get command - Fetch a branch and reconcile its downstack with the remote

use anyhow::Result;

use crate::cli::commands::{branch_arg, open_session};
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::engine::cache::PullResult;
use crate::engine::restack::restack_branches;
use crate::engine::scope::ScopeSpec;
use crate::engine::sync::get_branches_from_remote;
use crate::ui::output;

/// Pull trunk, then fetch `branch` and every tracked ancestor between trunk
/// and it, reconciling each with its remote counterpart. Descendants of the
/// target are restacked afterwards.
pub fn get(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let mut session = open_session(ctx)?;
    let branch = match branch {
        Some(name) => branch_arg(name)?,
        None => session.cache.current_branch_or_err()?,
    };

    match session.cache.pull_trunk()? {
        PullResult::Done => output::print(
            format!("Pulled trunk '{}'.", session.cache.trunk()),
            session.verbosity,
        ),
        PullResult::Unneeded => output::debug(
            format!("Trunk '{}' is up to date.", session.cache.trunk()),
            session.verbosity,
        ),
    }

    // For a branch we already track, walk its recorded downstack so chained
    // fetch bases line up. A branch unknown locally is fetched as a direct
    // trunk child; its real parent can be recorded with `bd move` later.
    let (downstack, pending_restack): (Vec<BranchName>, Vec<BranchName>) =
        if session.cache.branch_exists(&branch)
            && session.cache.is_branch_tracked(&branch)?
        {
            (
                session.cache.relative_stack(&branch, ScopeSpec::DOWNSTACK)?,
                session
                    .cache
                    .relative_stack(&branch, ScopeSpec::UPSTACK_EXCLUSIVE)?,
            )
        } else {
            (vec![branch.clone()], Vec::new())
        };

    let trunk = session.cache.trunk().clone();
    get_branches_from_remote(
        &mut session.cache,
        &session.continue_store,
        session.verbosity,
        &downstack,
        &trunk,
        &pending_restack,
    )?;

    if !pending_restack.is_empty() {
        restack_branches(
            &mut session.cache,
            &session.continue_store,
            session.verbosity,
            &pending_restack,
        )?;
    }
    Ok(())
}
