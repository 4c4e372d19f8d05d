//! continue / abort commands - Resume or abandon a paused operation

use anyhow::Result;

use crate::cli::commands::open_session;
use crate::cli::Context;
use crate::core::errors::CoreError;
use crate::engine::continuation;
use crate::ui::output;

/// Resume the interrupted operation after the user resolved the conflict.
pub fn continue_op(ctx: &Context, all: bool) -> Result<()> {
    let mut session = open_session(ctx)?;
    continuation::continue_op(
        &mut session.cache,
        &session.continue_store,
        session.verbosity,
        all,
    )?;
    Ok(())
}

/// Abort the in-progress rebase, discard the paused operation, and return to
/// the branch the operation started from.
pub fn abort(ctx: &Context) -> Result<()> {
    let mut session = open_session(ctx)?;
    if !session.cache.rebase_in_progress() {
        return Err(CoreError::NothingToContinue.into());
    }

    let data = session.continue_store.load()?;
    session.cache.abort_rebase()?;
    if let Some(branch) = data.and_then(|d| d.current_branch_override) {
        if session.cache.branch_exists(&branch) {
            session.cache.checkout_branch(&branch)?;
        }
    }
    session.continue_store.clear()?;
    output::print("Aborted the in-progress rebase.", session.verbosity);
    Ok(())
}
