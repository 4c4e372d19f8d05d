//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug output
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Braid - stacked branch management for Git
#[derive(Parser, Debug)]
#[command(name = "bd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if bd was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize braid in this repository
    #[command(
        name = "init",
        long_about = "Initialize braid tracking in a git repository.\n\n\
            This is the first command to run in a new repository. It records the \
            trunk branch (usually 'main' or 'master') that all stacks are built \
            on, and the remote used for fetching and pushing.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Initialize with the currently checked-out branch as trunk
    bd init

    # Specify trunk and remote explicitly
    bd init --trunk develop --remote upstream"
    )]
    Init {
        /// Trunk branch (defaults to the current branch)
        #[arg(long)]
        trunk: Option<String>,

        /// Remote to fetch from and push to
        #[arg(long)]
        remote: Option<String>,
    },

    /// Create a new branch stacked on the current branch
    #[command(
        name = "create",
        visible_alias = "c",
        long_about = "Create a new branch stacked on top of the current branch.\n\n\
            The new branch is tracked immediately, with the current branch as its \
            parent and the parent's tip as its fork point. Optionally stage and \
            commit changes in the same step.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Create a new branch
    bd create my-feature

    # Stage everything and commit in one step
    bd create my-feature -a -m \"implement feature\"

BUILDING A STACK:
    bd create part-1 -a -m \"first part\"
    bd create part-2 -a -m \"second part\"
    bd log"
    )]
    Create {
        /// Name for the new branch
        name: String,

        /// Commit message (commits staged changes onto the new branch)
        #[arg(short, long)]
        message: Option<String>,

        /// Stage all changes before committing
        #[arg(short, long)]
        all: bool,
    },

    /// Start tracking an existing branch
    #[command(
        name = "track",
        long_about = "Start tracking an existing git branch.\n\n\
            Tracking records the branch's parent and its fork point (the \
            merge-base with the parent), making it part of a stack. Use this for \
            branches created with plain git.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Track the current branch under trunk
    bd track

    # Track with an explicit parent
    bd track --parent feature-base

    # Track a branch created outside braid
    git checkout -b my-feature main
    bd track --parent main"
    )]
    Track {
        /// Branch to track (defaults to current)
        branch: Option<String>,

        /// Parent branch (defaults to trunk)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Stop tracking a branch
    #[command(
        name = "untrack",
        long_about = "Stop tracking a branch.\n\n\
            The branch still exists in git, but braid no longer manages its \
            parent relationship. Descendants that pointed through it are left \
            needing re-tracking."
    )]
    Untrack {
        /// Branch to untrack (defaults to current)
        branch: Option<String>,
    },

    /// Reparent a branch onto another branch
    #[command(
        name = "move",
        long_about = "Move a branch onto a different parent.\n\n\
            Changes the recorded parent of a branch and rebases the branch (and \
            its descendants) onto the new parent's tip.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Move the current branch onto a different parent
    bd move --onto feature-base

    # Move a specific branch
    bd move --onto main --source experiment"
    )]
    Move {
        /// Target parent branch
        #[arg(long)]
        onto: String,

        /// Branch to move (defaults to current)
        #[arg(long)]
        source: Option<String>,
    },

    /// Rename the current branch
    #[command(
        name = "rename",
        long_about = "Rename the current branch.\n\n\
            Tracking information and stack relationships are preserved. Any \
            recorded PR linkage is cleared, since the PR tracks the old name."
    )]
    Rename {
        /// New name for the branch
        name: String,
    },

    /// Fold the current branch into its parent
    #[command(
        name = "fold",
        long_about = "Fold the current branch into its parent branch.\n\n\
            The parent takes the current branch's content, the current branch is \
            deleted, and its children become children of the parent. With \
            --keep, the combined branch keeps the current branch's name instead.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Fold current branch into parent
    bd fold

    # Keep the current branch's name
    bd fold --keep"
    )]
    Fold {
        /// Keep the current branch's name
        #[arg(long)]
        keep: bool,
    },

    /// Split the current branch at chosen commit boundaries
    #[command(
        name = "split",
        long_about = "Split the current branch into multiple branches at commit \
            boundaries.\n\n\
            Each --at value counts commits back from the branch tip (newest \
            first); each split point gets the matching --name. Reusing the \
            original branch name for one of the pieces keeps its PR linkage.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Split a 3-commit branch into a tip piece (1 commit, keeping the
    # original name) and a base piece (2 commits)
    bd split --name my-feature --at 0 --name my-feature-base --at 1"
    )]
    Split {
        /// Names for the split branches, newest first
        #[arg(long = "name", required = true)]
        names: Vec<String>,

        /// Commits back from the tip for each split point, newest first
        #[arg(long = "at", required = true)]
        points: Vec<usize>,
    },

    /// Squash all commits of the current branch into one
    #[command(
        name = "squash",
        long_about = "Squash all commits unique to the current branch into a \
            single commit, then restack descendants.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Squash with a new message
    bd squash -m \"feat: implement user authentication\""
    )]
    Squash {
        /// Commit message for the squashed commit
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Delete a branch
    #[command(
        name = "delete",
        visible_alias = "d",
        long_about = "Delete a branch from git and from tracking.\n\n\
            Children of the deleted branch are reparented onto the deleted \
            branch's parent. If the deleted branch is checked out, the parent is \
            checked out first."
    )]
    Delete {
        /// Branch to delete (defaults to current)
        branch: Option<String>,
    },

    /// Rebase branches onto their parents' tips
    #[command(
        name = "restack",
        visible_alias = "rs",
        long_about = "Rebase tracked branches so each sits on its parent's \
            current tip.\n\n\
            When a branch changes, its children's recorded fork points no longer \
            match the parent tip. Restack walks the affected branches \
            parent-before-child and rebases each one that has drifted. By \
            default the whole stack containing the branch is restacked.",
        after_help = "\
WORKFLOW EXAMPLES:
    # After amending a branch, realign the whole stack
    bd restack

    # Only the current branch
    bd restack --only

    # The current branch and its descendants
    bd restack --upstack

HANDLING CONFLICTS:
    If a rebase conflicts, braid pauses:
    1. Resolve conflicts in your editor
    2. git add <resolved files>
    3. bd continue

    To give up: bd abort"
    )]
    Restack {
        /// Branch to restack from (defaults to current)
        branch: Option<String>,

        /// Only restack this branch
        #[arg(long, conflicts_with_all = ["upstack", "downstack"])]
        only: bool,

        /// Restack this branch and its descendants
        #[arg(long, conflicts_with = "downstack")]
        upstack: bool,

        /// Restack this branch and its ancestors
        #[arg(long)]
        downstack: bool,

        /// Stamp rebased commits with their author date
        #[arg(long)]
        committer_date_is_author_date: bool,
    },

    /// Continue a paused operation after resolving conflicts
    #[command(
        name = "continue",
        long_about = "Continue a paused operation after resolving conflicts.\n\n\
            Finishes the in-progress rebase, records the branch's new fork \
            point, and resumes any queued sync and restack work from the \
            interrupted command.",
        after_help = "\
WORKFLOW EXAMPLES:
    # After resolving conflicts
    git add <resolved-files>
    bd continue

    # Stage all changes and continue in one step
    bd continue --all"
    )]
    Continue {
        /// Stage all changes before continuing
        #[arg(short, long)]
        all: bool,
    },

    /// Abort a paused operation
    #[command(
        name = "abort",
        long_about = "Abort the in-progress rebase and discard the paused \
            operation, returning to the branch that was checked out when the \
            operation started."
    )]
    Abort,

    /// Fetch a branch and its ancestors from the remote
    #[command(
        name = "get",
        long_about = "Fetch a branch from the remote and reconcile the local \
            stack with it.\n\n\
            Pulls trunk first, then walks the branch's downstack from trunk \
            upward: branches unknown locally are created from the fetched \
            commits; known branches are rebased onto their fetched tips. \
            Descendants of the target are restacked afterwards.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Pull a teammate's branch
    bd get their-feature

    # Refresh a local stacked branch from the remote
    bd get my-feature"
    )]
    Get {
        /// Branch to fetch (defaults to current)
        branch: Option<String>,
    },

    /// Display tracked branches in stack layout
    #[command(
        name = "log",
        visible_alias = "l",
        long_about = "Display tracked branches as a tree rooted at trunk.\n\n\
            The current branch is marked with a filled circle; branches whose \
            fork point no longer matches their parent's tip are marked as \
            needing a restack.",
        after_help = "\
READING THE OUTPUT:
    ◯ main 1a2b3c4
      ◯ part-1 5d6e7f8
        ◯ part-2 9a0b1c2 (needs restack)
          ◉ part-3 3d4e5f6       <- you are here"
    )]
    Log,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate a shell completion script.\n\n\
            Outputs a completion script for the specified shell on stdout.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    bd completion bash >> ~/.bashrc

    # Fish
    bd completion fish > ~/.config/fish/completions/bd.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
