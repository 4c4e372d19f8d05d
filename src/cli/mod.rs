//! cli
//!
//! Command-line interface layer for Braid.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT perform repository mutations directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers that open a [`crate::session::Session`] and drive the
//! [`crate::engine`]. All repository state changes flow through the session's
//! metadata cache.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::Result;

use crate::ui::Verbosity;

/// Per-invocation context derived from the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub cwd: Option<PathBuf>,
    pub verbosity: Verbosity,
}

impl Context {
    /// Directory to discover the repository from.
    pub fn cwd(&self) -> Result<PathBuf> {
        Ok(match &self.cwd {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        })
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = Context {
        cwd: cli.cwd.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    commands::dispatch(cli.command, &ctx)
}
