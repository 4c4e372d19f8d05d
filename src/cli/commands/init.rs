//! init command - Initialize braid in a repository

use anyhow::Result;

use crate::cli::Context;
use crate::session::{Session, SessionOptions};
use crate::ui::output;

/// Initialize braid tracking in the repository, writing the trunk and remote
/// configuration.
pub fn init(ctx: &Context, trunk: Option<&str>, remote: Option<&str>) -> Result<()> {
    let session = Session::init(
        &ctx.cwd()?,
        trunk,
        remote,
        SessionOptions::new(ctx.verbosity),
    )?;
    output::print(
        format!(
            "Initialized braid with trunk '{}' and remote '{}'.",
            session.config.trunk, session.config.remote
        ),
        session.verbosity,
    );
    Ok(())
}
