//! Git subprocess layer.
//!
//! Everything that touches a repository goes through the [`Vcs`] trait. The
//! production implementation ([`Git`]) shells out to the `git` binary via
//! [`exec::GitExecutor`]; tests use [`fake::FakeVcs`], an in-memory repository
//! simulation.

pub mod exec;
pub mod fake;
pub mod interface;

pub use exec::{CommandOutput, CommandRequest, ExecError, Executor, GitExecutor};
pub use interface::{CommitOpts, Git, GitError, RebaseOpts, RebaseOutcome, RepoInfo, Vcs};
