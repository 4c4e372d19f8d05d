//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! Each command handler validates its arguments, opens a [`Session`], calls
//! into the engine, and formats output. Handlers do not perform repository
//! mutations directly.

mod completion;
mod create;
mod delete;
mod fold;
mod get;
mod init;
mod log_cmd;
mod move_cmd;
mod recovery;
mod rename;
mod restack_cmd;
mod split;
mod squash;
mod track;

pub use completion::completion;
pub use create::create;
pub use delete::delete;
pub use fold::fold;
pub use get::get;
pub use init::init;
pub use log_cmd::log;
pub use move_cmd::move_branch;
pub use recovery::{abort, continue_op};
pub use rename::rename;
pub use restack_cmd::restack;
pub use split::split;
pub use squash::squash;
pub use track::{track, untrack};

use anyhow::{Context as _, Result};

use crate::cli::args::Command;
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::session::{Session, SessionOptions};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { trunk, remote } => init::init(ctx, trunk.as_deref(), remote.as_deref()),
        Command::Create { name, message, all } => {
            create::create(ctx, &name, message.as_deref(), all)
        }
        Command::Track { branch, parent } => {
            track::track(ctx, branch.as_deref(), parent.as_deref())
        }
        Command::Untrack { branch } => track::untrack(ctx, branch.as_deref()),
        Command::Move { onto, source } => move_cmd::move_branch(ctx, &onto, source.as_deref()),
        Command::Rename { name } => rename::rename(ctx, &name),
        Command::Fold { keep } => fold::fold(ctx, keep),
        Command::Split { names, points } => split::split(ctx, &names, &points),
        Command::Squash { message } => squash::squash(ctx, message.as_deref()),
        Command::Delete { branch } => delete::delete(ctx, branch.as_deref()),
        Command::Restack {
            branch,
            only,
            upstack,
            downstack,
            committer_date_is_author_date,
        } => restack_cmd::restack(
            ctx,
            branch.as_deref(),
            only,
            upstack,
            downstack,
            committer_date_is_author_date,
        ),
        Command::Continue { all } => recovery::continue_op(ctx, all),
        Command::Abort => recovery::abort(ctx),
        Command::Get { branch } => get::get(ctx, branch.as_deref()),
        Command::Log => log_cmd::log(ctx),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Open the session for a command, with default options.
fn open_session(ctx: &Context) -> Result<Session> {
    Session::open(&ctx.cwd()?, SessionOptions::new(ctx.verbosity))
        .context("failed to open repository")
}

/// Parse a user-supplied branch name.
fn branch_arg(name: &str) -> Result<BranchName> {
    BranchName::new(name).with_context(|| format!("invalid branch name '{name}'"))
}
