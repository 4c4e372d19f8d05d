//! git::interface
//!
//! The single doorway to the version-control system.
//!
//! All repository reads and writes flow through the [`Vcs`] trait. No other
//! module spawns `git` directly; the production implementation ([`Git`])
//! translates each typed operation into one subcommand run through
//! [`crate::git::exec::Executor`] and normalizes failures into [`GitError`].
//!
//! Rebase outcomes deserve a note: a rebase that stops on conflicts exits
//! non-zero *and* leaves a rebase in progress. That combination is reported
//! as [`RebaseOutcome::Conflict`], a first-class value, never an error —
//! callers drive the continuation protocol from it.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::exec::{CommandOutput, CommandRequest, ExecError, Executor, GitExecutor};
use crate::core::types::{BranchName, Oid, RefName, TypeError, FETCH_BASE_REF, METADATA_REF_PREFIX};

/// Errors from version-control operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a git repository.
    #[error("not a git repository (or any parent): {path}")]
    NotARepo { path: PathBuf },

    /// A revision that was required to exist could not be resolved.
    #[error("could not resolve revision: {rev}")]
    MissingRevision { rev: String },

    /// Subprocess-level failure (non-zero exit, spawn failure, signal).
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Git produced output we could not parse into domain types.
    #[error("unexpected git output: {0}")]
    UnexpectedOutput(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Outcome of a rebase-family operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseOutcome {
    Done,
    /// The rebase stopped on conflicts and is waiting in the worktree.
    Conflict,
}

/// Arguments for rebasing a branch's commit range onto a new base.
#[derive(Debug, Clone)]
pub struct RebaseOpts {
    /// The branch whose commits are replayed.
    pub branch: BranchName,
    /// Where the commits land: a ref name or revision.
    pub onto: String,
    /// Exclusive lower bound of the replayed range (the old fork point).
    pub from: Oid,
}

/// Arguments for creating or amending a commit on the current branch.
#[derive(Debug, Clone, Default)]
pub struct CommitOpts {
    pub message: Option<String>,
    pub amend: bool,
    pub no_edit: bool,
    /// Skip commit hooks (`--no-verify`).
    pub no_verify: bool,
}

/// Typed, high-level version-control operations.
///
/// The metadata cache and the engines are written against this trait; tests
/// substitute [`crate::git::fake::FakeVcs`]. All methods are synchronous and
/// may mutate shared repository state (working tree, HEAD), so callers must
/// never interleave them across threads.
pub trait Vcs {
    // -- queries ---------------------------------------------------------
    fn current_branch(&self) -> Result<Option<BranchName>, GitError>;
    /// Resolve a revision to a commit id, `None` if it does not exist.
    fn resolve(&self, rev: &str) -> Result<Option<Oid>, GitError>;
    fn sha_or_err(&self, rev: &str) -> Result<Oid, GitError>;
    fn merge_base(&self, a: &str, b: &str) -> Result<Oid, GitError>;
    fn is_ancestor(&self, ancestor: &Oid, descendant: &str) -> Result<bool, GitError>;
    /// All local branches with their tip revisions.
    fn list_branches(&self) -> Result<Vec<(BranchName, Oid)>, GitError>;
    /// Commit ids in `(from, to]`, newest first.
    fn commit_range(&self, from: &Oid, to: &Oid) -> Result<Vec<Oid>, GitError>;
    fn is_diff_empty(&self, base: &Oid, branch: &BranchName) -> Result<bool, GitError>;
    fn is_merged_into(&self, branch: &BranchName, trunk: &BranchName) -> Result<bool, GitError>;

    // -- checkout and branch manipulation --------------------------------
    fn switch_branch(&self, name: &BranchName) -> Result<(), GitError>;
    fn switch_new_branch(&self, name: &BranchName) -> Result<(), GitError>;
    /// `switch --force -C <name> <oid>`: (re)create and check out.
    fn force_switch_new_branch(&self, name: &BranchName, oid: &Oid) -> Result<(), GitError>;
    fn force_create_branch(&self, name: &BranchName, oid: &Oid) -> Result<(), GitError>;
    /// Rename the currently checked-out branch.
    fn move_branch(&self, new_name: &BranchName) -> Result<(), GitError>;
    fn delete_branch(&self, name: &BranchName) -> Result<(), GitError>;

    // -- rebase ----------------------------------------------------------
    fn rebase(&self, opts: &RebaseOpts) -> Result<RebaseOutcome, GitError>;
    fn rebase_interactive(&self, branch: &BranchName, base: &Oid)
        -> Result<RebaseOutcome, GitError>;
    fn rebase_continue(&self) -> Result<RebaseOutcome, GitError>;
    fn rebase_abort(&self) -> Result<(), GitError>;
    fn rebase_in_progress(&self) -> bool;
    fn unmerged_files(&self) -> Result<Vec<String>, GitError>;

    // -- worktree / commits ----------------------------------------------
    fn detect_staged_changes(&self) -> Result<bool, GitError>;
    fn add_all(&self) -> Result<(), GitError>;
    fn commit(&self, opts: &CommitOpts) -> Result<(), GitError>;
    fn soft_reset(&self, oid: &Oid) -> Result<(), GitError>;

    // -- remote ----------------------------------------------------------
    fn fetch_branch(&self, remote: &str, branch: &BranchName) -> Result<(), GitError>;
    fn read_fetch_head(&self) -> Result<Oid, GitError>;
    fn read_fetch_base(&self) -> Result<Oid, GitError>;
    fn write_fetch_base(&self, oid: &Oid) -> Result<(), GitError>;
    fn set_remote_tracking(
        &self,
        remote: &str,
        branch: &BranchName,
        sha: &Oid,
    ) -> Result<(), GitError>;
    fn remote_sha(&self, remote: &str, branch: &BranchName) -> Result<Option<Oid>, GitError>;
    fn push_branch(
        &self,
        remote: &str,
        branch: &BranchName,
        no_verify: bool,
    ) -> Result<(), GitError>;
    fn pull_branch(&self, remote: &str, branch: &BranchName) -> Result<(), GitError>;
    fn prune_remote(&self, remote: &str) -> Result<(), GitError>;

    // -- metadata refs (the persistent ref store's storage primitive) ----
    fn read_metadata_blob(&self, branch: &BranchName) -> Result<Option<String>, GitError>;
    fn write_metadata_blob(&self, branch: &BranchName, json: &str) -> Result<(), GitError>;
    fn delete_metadata_ref(&self, branch: &BranchName) -> Result<(), GitError>;
    fn list_metadata_refs(&self) -> Result<Vec<BranchName>, GitError>;
}

/// Locations of the repository on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Per-worktree git directory (`.git/worktrees/<name>` for linked trees).
    pub git_dir: PathBuf,
    /// Shared git directory holding refs and objects.
    pub common_dir: PathBuf,
    /// Root of the working tree.
    pub work_dir: PathBuf,
}

/// Production [`Vcs`] implementation over the `git` subprocess.
#[derive(Debug)]
pub struct Git {
    exec: GitExecutor,
    info: RepoInfo,
    /// Stamp rebased commits with their author date (`bd restack` option).
    committer_date_is_author_date: bool,
}

impl Git {
    /// Discover the repository containing `cwd` and open it.
    pub fn open(cwd: &Path) -> Result<Self, GitError> {
        let exec = GitExecutor::new(cwd);
        let output = exec.run(CommandRequest::new([
            "rev-parse",
            "--show-toplevel",
            "--absolute-git-dir",
            "--git-common-dir",
        ]))?;
        if !output.success() {
            return Err(GitError::NotARepo {
                path: cwd.to_path_buf(),
            });
        }
        let lines = output.lines();
        let [work_dir, git_dir, common_dir] = lines.as_slice() else {
            return Err(GitError::UnexpectedOutput(output.stdout));
        };
        let work_dir = PathBuf::from(work_dir);
        let git_dir = PathBuf::from(git_dir);
        // --git-common-dir can come back relative to the worktree root.
        let common_dir = {
            let raw = PathBuf::from(common_dir);
            if raw.is_absolute() {
                raw
            } else {
                work_dir.join(raw)
            }
        };
        Ok(Self {
            // Run subsequent commands from the worktree root so pathless
            // subcommands (add, diff) see the whole tree.
            exec: GitExecutor::new(&work_dir),
            info: RepoInfo {
                git_dir,
                common_dir,
                work_dir,
            },
            committer_date_is_author_date: false,
        })
    }

    pub fn info(&self) -> &RepoInfo {
        &self.info
    }

    pub fn set_committer_date_is_author_date(&mut self, value: bool) {
        self.committer_date_is_author_date = value;
    }

    fn run<I, S>(&self, args: I) -> Result<CommandOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        Ok(self.exec.run(CommandRequest::new(args))?)
    }

    fn must<I, S>(&self, args: I) -> Result<CommandOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        Ok(self.run(args)?.expect_success()?)
    }

    /// Shared conflict detection for the rebase family: non-zero exit with
    /// a rebase left in progress is a conflict, anything else non-zero is a
    /// genuine command failure.
    fn rebase_outcome(&self, output: CommandOutput) -> Result<RebaseOutcome, GitError> {
        if output.success() {
            return Ok(RebaseOutcome::Done);
        }
        if self.rebase_in_progress() {
            return Ok(RebaseOutcome::Conflict);
        }
        output.expect_success()?;
        unreachable!("expect_success returns Err for non-zero exits");
    }
}

impl Vcs for Git {
    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let output = self.must(["branch", "--show-current"])?;
        if output.stdout.is_empty() {
            Ok(None)
        } else {
            Ok(Some(BranchName::new(output.stdout)?))
        }
    }

    fn resolve(&self, rev: &str) -> Result<Option<Oid>, GitError> {
        let output = self.run([
            "rev-parse",
            "--verify",
            "--quiet",
            &format!("{rev}^{{commit}}"),
        ])?;
        if output.success() {
            Ok(Some(Oid::new(output.stdout)?))
        } else {
            Ok(None)
        }
    }

    fn sha_or_err(&self, rev: &str) -> Result<Oid, GitError> {
        self.resolve(rev)?.ok_or_else(|| GitError::MissingRevision {
            rev: rev.to_string(),
        })
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Oid, GitError> {
        let output = self.must(["merge-base", a, b])?;
        Ok(Oid::new(output.stdout)?)
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &str) -> Result<bool, GitError> {
        let output = self.run([
            "merge-base",
            "--is-ancestor",
            ancestor.as_str(),
            descendant,
        ])?;
        match output.status {
            0 => Ok(true),
            1 => Ok(false),
            _ => {
                output.expect_success()?;
                unreachable!()
            }
        }
    }

    fn list_branches(&self) -> Result<Vec<(BranchName, Oid)>, GitError> {
        let output = self.must([
            "for-each-ref",
            "refs/heads",
            "--format=%(objectname) %(refname:short)",
        ])?;
        output
            .lines()
            .into_iter()
            .map(|line| {
                let (oid, name) = line
                    .split_once(' ')
                    .ok_or_else(|| GitError::UnexpectedOutput(line.clone()))?;
                Ok((BranchName::new(name)?, Oid::new(oid)?))
            })
            .collect()
    }

    fn commit_range(&self, from: &Oid, to: &Oid) -> Result<Vec<Oid>, GitError> {
        let output = self.must(["log", "--format=%H", &format!("{from}..{to}")])?;
        output
            .lines()
            .into_iter()
            .map(|line| Ok(Oid::new(line)?))
            .collect()
    }

    fn is_diff_empty(&self, base: &Oid, branch: &BranchName) -> Result<bool, GitError> {
        let output = self.run(["diff", "--quiet", base.as_str(), branch.as_str()])?;
        match output.status {
            0 => Ok(true),
            1 => Ok(false),
            _ => {
                output.expect_success()?;
                unreachable!()
            }
        }
    }

    fn is_merged_into(&self, branch: &BranchName, trunk: &BranchName) -> Result<bool, GitError> {
        let tip = self.sha_or_err(branch.as_str())?;
        if self.is_ancestor(&tip, trunk.as_str())? {
            return Ok(true);
        }
        // Catch squash merges: every commit already applied upstream shows
        // up with a '-' marker in `git cherry`.
        let output = self.must(["cherry", trunk.as_str(), branch.as_str()])?;
        let lines = output.lines();
        Ok(!lines.is_empty() && lines.iter().all(|l| l.starts_with('-')))
    }

    fn switch_branch(&self, name: &BranchName) -> Result<(), GitError> {
        self.must(["switch", name.as_str()]).map(|_| ())
    }

    fn switch_new_branch(&self, name: &BranchName) -> Result<(), GitError> {
        self.must(["switch", "-c", name.as_str()]).map(|_| ())
    }

    fn force_switch_new_branch(&self, name: &BranchName, oid: &Oid) -> Result<(), GitError> {
        self.must(["switch", "--force", "-C", name.as_str(), oid.as_str()])
            .map(|_| ())
    }

    fn force_create_branch(&self, name: &BranchName, oid: &Oid) -> Result<(), GitError> {
        self.must(["branch", "--force", name.as_str(), oid.as_str()])
            .map(|_| ())
    }

    fn move_branch(&self, new_name: &BranchName) -> Result<(), GitError> {
        self.must(["branch", "--move", new_name.as_str()]).map(|_| ())
    }

    fn delete_branch(&self, name: &BranchName) -> Result<(), GitError> {
        self.must(["branch", "-D", name.as_str()]).map(|_| ())
    }

    fn rebase(&self, opts: &RebaseOpts) -> Result<RebaseOutcome, GitError> {
        let mut args = vec!["rebase".to_string()];
        if self.committer_date_is_author_date {
            args.push("--committer-date-is-author-date".into());
        }
        args.extend([
            "--onto".into(),
            opts.onto.clone(),
            opts.from.to_string(),
            opts.branch.to_string(),
        ]);
        let output = self.run(args)?;
        self.rebase_outcome(output)
    }

    fn rebase_interactive(
        &self,
        branch: &BranchName,
        base: &Oid,
    ) -> Result<RebaseOutcome, GitError> {
        let output = self.run(["rebase", "--interactive", base.as_str(), branch.as_str()])?;
        self.rebase_outcome(output)
    }

    fn rebase_continue(&self) -> Result<RebaseOutcome, GitError> {
        // GIT_EDITOR=true keeps git from opening an editor for each
        // replayed commit message.
        let output = self.exec.run(
            CommandRequest::new(["rebase", "--continue"]).with_env("GIT_EDITOR", "true"),
        )?;
        self.rebase_outcome(output)
    }

    fn rebase_abort(&self) -> Result<(), GitError> {
        self.must(["rebase", "--abort"]).map(|_| ())
    }

    fn rebase_in_progress(&self) -> bool {
        let git_dir = &self.info.git_dir;
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    fn unmerged_files(&self) -> Result<Vec<String>, GitError> {
        let output = self.must(["diff", "--name-only", "--diff-filter=U"])?;
        Ok(output.lines())
    }

    fn detect_staged_changes(&self) -> Result<bool, GitError> {
        let output = self.run(["diff", "--cached", "--quiet"])?;
        match output.status {
            0 => Ok(false),
            1 => Ok(true),
            _ => {
                output.expect_success()?;
                unreachable!()
            }
        }
    }

    fn add_all(&self) -> Result<(), GitError> {
        self.must(["add", "--all"]).map(|_| ())
    }

    fn commit(&self, opts: &CommitOpts) -> Result<(), GitError> {
        let mut args = vec!["commit".to_string()];
        if let Some(message) = &opts.message {
            args.push("--message".into());
            args.push(message.clone());
        }
        if opts.amend {
            args.push("--amend".into());
        }
        if opts.no_edit {
            args.push("--no-edit".into());
        }
        if opts.no_verify {
            args.push("--no-verify".into());
        }
        self.must(args).map(|_| ())
    }

    fn soft_reset(&self, oid: &Oid) -> Result<(), GitError> {
        self.must(["reset", "--soft", oid.as_str()]).map(|_| ())
    }

    fn fetch_branch(&self, remote: &str, branch: &BranchName) -> Result<(), GitError> {
        self.must(["fetch", remote, branch.as_str()]).map(|_| ())
    }

    fn read_fetch_head(&self) -> Result<Oid, GitError> {
        self.sha_or_err("FETCH_HEAD")
    }

    fn read_fetch_base(&self) -> Result<Oid, GitError> {
        self.sha_or_err(FETCH_BASE_REF)
    }

    fn write_fetch_base(&self, oid: &Oid) -> Result<(), GitError> {
        self.must(["update-ref", FETCH_BASE_REF, oid.as_str()])
            .map(|_| ())
    }

    fn set_remote_tracking(
        &self,
        remote: &str,
        branch: &BranchName,
        sha: &Oid,
    ) -> Result<(), GitError> {
        self.must([
            "update-ref",
            &format!("refs/remotes/{remote}/{branch}"),
            sha.as_str(),
        ])
        .map(|_| ())
    }

    fn remote_sha(&self, remote: &str, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.resolve(&format!("refs/remotes/{remote}/{branch}"))
    }

    fn push_branch(
        &self,
        remote: &str,
        branch: &BranchName,
        no_verify: bool,
    ) -> Result<(), GitError> {
        let mut args = vec![
            "push".to_string(),
            "--force-with-lease".into(),
            remote.to_string(),
            branch.to_string(),
        ];
        if no_verify {
            args.push("--no-verify".into());
        }
        self.must(args).map(|_| ())
    }

    fn pull_branch(&self, remote: &str, branch: &BranchName) -> Result<(), GitError> {
        self.must(["pull", "--ff-only", remote, branch.as_str()])
            .map(|_| ())
    }

    fn prune_remote(&self, remote: &str) -> Result<(), GitError> {
        // Pruning is opportunistic; a missing remote is not fatal.
        self.run(["remote", "prune", remote]).map(|_| ())
    }

    fn read_metadata_blob(&self, branch: &BranchName) -> Result<Option<String>, GitError> {
        let refname = RefName::for_metadata(branch);
        let output = self.run(["cat-file", "blob", refname.as_str()])?;
        if output.success() {
            Ok(Some(output.stdout))
        } else {
            Ok(None)
        }
    }

    fn write_metadata_blob(&self, branch: &BranchName, json: &str) -> Result<(), GitError> {
        let blob = self
            .exec
            .run(CommandRequest::new(["hash-object", "-w", "--stdin"]).with_stdin(json))?
            .expect_success()?;
        let oid = Oid::new(blob.stdout)?;
        let refname = RefName::for_metadata(branch);
        self.must(["update-ref", refname.as_str(), oid.as_str()])
            .map(|_| ())
    }

    fn delete_metadata_ref(&self, branch: &BranchName) -> Result<(), GitError> {
        let refname = RefName::for_metadata(branch);
        self.must(["update-ref", "-d", refname.as_str()]).map(|_| ())
    }

    fn list_metadata_refs(&self) -> Result<Vec<BranchName>, GitError> {
        let output = self.must([
            "for-each-ref",
            METADATA_REF_PREFIX.trim_end_matches('/'),
            "--format=%(refname)",
        ])?;
        Ok(output
            .lines()
            .into_iter()
            .filter_map(|line| RefName::new(line).ok()?.metadata_branch())
            .collect())
    }
}
