//! git::fake
//!
//! In-memory [`Vcs`] implementation for tests.
//!
//! `FakeVcs` simulates just enough of a repository to exercise the metadata
//! cache and the restack/continuation engines: a synthetic commit graph
//! (parent links only, no trees), local and remote branches, metadata refs,
//! and a rebase state machine with programmable conflicts. Commit ids are
//! minted from a counter, so tests are fully deterministic.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use super::exec::ExecError;
use super::interface::{CommitOpts, GitError, RebaseOpts, RebaseOutcome, Vcs};
use crate::core::types::{BranchName, Oid, FETCH_BASE_REF};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Head {
    Branch(BranchName),
    Detached(Oid),
    Unborn,
}

#[derive(Debug, Clone)]
struct PendingRebase {
    branch: BranchName,
    onto: Oid,
}

#[derive(Debug, Default)]
struct State {
    /// Commit id -> parent commit ids.
    commits: HashMap<Oid, Vec<Oid>>,
    branches: BTreeMap<BranchName, Oid>,
    head: Option<Head>,
    metadata: BTreeMap<BranchName, String>,
    remote_branches: BTreeMap<BranchName, Oid>,
    remote_tracking: BTreeMap<String, Oid>,
    fetch_head: Option<Oid>,
    fetch_base: Option<Oid>,
    rebase: Option<PendingRebase>,
    /// Branches whose next rebase stops on a conflict.
    conflict_branches: BTreeSet<BranchName>,
    /// How many further `rebase --continue` calls stay conflicted.
    continue_conflicts: u32,
    staged_changes: bool,
    fail_next_commit: bool,
    next_commit: u64,
}

/// In-memory fake repository.
pub struct FakeVcs {
    state: RefCell<State>,
}

impl Default for FakeVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVcs {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                head: Some(Head::Unborn),
                ..State::default()
            }),
        }
    }

    fn mint(state: &mut State, parents: Vec<Oid>) -> Oid {
        state.next_commit += 1;
        let oid = Oid::new(format!("{:040x}", state.next_commit)).expect("minted oid is hex");
        state.commits.insert(oid.clone(), parents);
        oid
    }

    /// Create the root branch with a single commit and check it out.
    pub fn init_trunk(&self, name: &str) -> Oid {
        let mut state = self.state.borrow_mut();
        let branch = BranchName::new(name).expect("test branch name");
        let root = Self::mint(&mut state, vec![]);
        state.branches.insert(branch.clone(), root.clone());
        state.head = Some(Head::Branch(branch));
        root
    }

    /// Create a branch pointing at `oid` without checking it out.
    pub fn create_branch_at(&self, name: &str, oid: &Oid) {
        let mut state = self.state.borrow_mut();
        let branch = BranchName::new(name).expect("test branch name");
        state.branches.insert(branch, oid.clone());
    }

    /// Advance a branch by one synthetic commit; returns the new tip.
    pub fn add_commit(&self, name: &str) -> Oid {
        let mut state = self.state.borrow_mut();
        let branch = BranchName::new(name).expect("test branch name");
        let tip = state.branches[&branch].clone();
        let new_tip = Self::mint(&mut state, vec![tip]);
        state.branches.insert(branch, new_tip.clone());
        new_tip
    }

    /// Mint a commit on top of `parent` without moving any branch.
    pub fn orphan_commit(&self, parent: &Oid) -> Oid {
        let mut state = self.state.borrow_mut();
        Self::mint(&mut state, vec![parent.clone()])
    }

    pub fn tip(&self, name: &str) -> Oid {
        let branch = BranchName::new(name).expect("test branch name");
        self.state.borrow().branches[&branch].clone()
    }

    /// Make the next rebase of `name` stop on a conflict.
    pub fn conflict_on_rebase_of(&self, name: &str) {
        let branch = BranchName::new(name).expect("test branch name");
        self.state.borrow_mut().conflict_branches.insert(branch);
    }

    /// Make the next `n` `rebase --continue` calls report the conflict as
    /// still unresolved.
    pub fn keep_continue_conflicted(&self, n: u32) {
        self.state.borrow_mut().continue_conflicts = n;
    }

    /// Publish a branch on the simulated remote.
    pub fn set_remote_branch(&self, name: &str, oid: &Oid) {
        let branch = BranchName::new(name).expect("test branch name");
        self.state
            .borrow_mut()
            .remote_branches
            .insert(branch, oid.clone());
    }

    /// The tip of a branch as the simulated remote currently sees it.
    pub fn remote_tip(&self, name: &str) -> Option<Oid> {
        let branch = BranchName::new(name).expect("test branch name");
        self.state.borrow().remote_branches.get(&branch).cloned()
    }

    pub fn set_staged_changes(&self, value: bool) {
        self.state.borrow_mut().staged_changes = value;
    }

    pub fn fail_next_commit(&self) {
        self.state.borrow_mut().fail_next_commit = true;
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        let branch = BranchName::new(name).expect("test branch name");
        self.state.borrow().branches.contains_key(&branch)
    }

    pub fn metadata_ref_exists(&self, name: &str) -> bool {
        let branch = BranchName::new(name).expect("test branch name");
        self.state.borrow().metadata.contains_key(&branch)
    }

    fn resolve_in(state: &State, rev: &str) -> Option<Oid> {
        if rev == "FETCH_HEAD" {
            return state.fetch_head.clone();
        }
        if rev == FETCH_BASE_REF {
            return state.fetch_base.clone();
        }
        if let Some(suffix) = rev.strip_prefix("@~") {
            let n: usize = suffix.parse().ok()?;
            return Self::walk_first_parent(state, Self::head_commit(state)?, n);
        }
        if rev == "@" {
            return Self::head_commit(state);
        }
        if let Ok(branch) = BranchName::new(rev) {
            if let Some(oid) = state.branches.get(&branch) {
                return Some(oid.clone());
            }
        }
        let oid = Oid::new(rev).ok()?;
        state.commits.contains_key(&oid).then_some(oid)
    }

    fn head_commit(state: &State) -> Option<Oid> {
        match state.head.as_ref()? {
            Head::Branch(branch) => state.branches.get(branch).cloned(),
            Head::Detached(oid) => Some(oid.clone()),
            Head::Unborn => None,
        }
    }

    fn walk_first_parent(state: &State, start: Oid, n: usize) -> Option<Oid> {
        let mut current = start;
        for _ in 0..n {
            current = state.commits.get(&current)?.first()?.clone();
        }
        Some(current)
    }

    fn ancestors(state: &State, start: &Oid) -> HashSet<Oid> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(oid) = queue.pop_front() {
            if seen.insert(oid.clone()) {
                if let Some(parents) = state.commits.get(&oid) {
                    queue.extend(parents.iter().cloned());
                }
            }
        }
        seen
    }

    fn missing(rev: &str) -> GitError {
        GitError::MissingRevision {
            rev: rev.to_string(),
        }
    }

    fn command_failed(args: &[&str], stderr: &str) -> GitError {
        GitError::Exec(ExecError::CommandFailed {
            args: args.iter().map(|a| a.to_string()).collect(),
            status: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }
}

impl Vcs for FakeVcs {
    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        Ok(match self.state.borrow().head.as_ref() {
            Some(Head::Branch(branch)) => Some(branch.clone()),
            _ => None,
        })
    }

    fn resolve(&self, rev: &str) -> Result<Option<Oid>, GitError> {
        Ok(Self::resolve_in(&self.state.borrow(), rev))
    }

    fn sha_or_err(&self, rev: &str) -> Result<Oid, GitError> {
        self.resolve(rev)?.ok_or_else(|| Self::missing(rev))
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Oid, GitError> {
        let state = self.state.borrow();
        let a_oid = Self::resolve_in(&state, a).ok_or_else(|| Self::missing(a))?;
        let b_oid = Self::resolve_in(&state, b).ok_or_else(|| Self::missing(b))?;
        let a_ancestors = Self::ancestors(&state, &a_oid);
        // BFS from b: the first commit also reachable from a is the
        // nearest common ancestor (sufficient for tree-shaped test graphs).
        let mut queue = VecDeque::from([b_oid]);
        let mut seen = HashSet::new();
        while let Some(oid) = queue.pop_front() {
            if a_ancestors.contains(&oid) {
                return Ok(oid);
            }
            if seen.insert(oid.clone()) {
                if let Some(parents) = state.commits.get(&oid) {
                    queue.extend(parents.iter().cloned());
                }
            }
        }
        Err(Self::missing(a))
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &str) -> Result<bool, GitError> {
        let state = self.state.borrow();
        let target =
            Self::resolve_in(&state, descendant).ok_or_else(|| Self::missing(descendant))?;
        Ok(Self::ancestors(&state, &target).contains(ancestor))
    }

    fn list_branches(&self) -> Result<Vec<(BranchName, Oid)>, GitError> {
        Ok(self
            .state
            .borrow()
            .branches
            .iter()
            .map(|(name, oid)| (name.clone(), oid.clone()))
            .collect())
    }

    fn commit_range(&self, from: &Oid, to: &Oid) -> Result<Vec<Oid>, GitError> {
        let state = self.state.borrow();
        let mut result = Vec::new();
        let mut current = to.clone();
        while &current != from {
            result.push(current.clone());
            match state.commits.get(&current).and_then(|p| p.first()) {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }
        Ok(result)
    }

    fn is_diff_empty(&self, base: &Oid, branch: &BranchName) -> Result<bool, GitError> {
        let state = self.state.borrow();
        let tip = state
            .branches
            .get(branch)
            .ok_or_else(|| Self::missing(branch.as_str()))?;
        Ok(tip == base)
    }

    fn is_merged_into(&self, branch: &BranchName, trunk: &BranchName) -> Result<bool, GitError> {
        let tip = self.sha_or_err(branch.as_str())?;
        self.is_ancestor(&tip, trunk.as_str())
    }

    fn switch_branch(&self, name: &BranchName) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        if !state.branches.contains_key(name) {
            return Err(Self::missing(name.as_str()));
        }
        state.head = Some(Head::Branch(name.clone()));
        Ok(())
    }

    fn switch_new_branch(&self, name: &BranchName) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        if state.branches.contains_key(name) {
            return Err(Self::command_failed(
                &["switch", "-c"],
                "branch already exists",
            ));
        }
        let at = Self::head_commit(&state).ok_or_else(|| Self::missing("HEAD"))?;
        state.branches.insert(name.clone(), at);
        state.head = Some(Head::Branch(name.clone()));
        Ok(())
    }

    fn force_switch_new_branch(&self, name: &BranchName, oid: &Oid) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        state.branches.insert(name.clone(), oid.clone());
        state.head = Some(Head::Branch(name.clone()));
        Ok(())
    }

    fn force_create_branch(&self, name: &BranchName, oid: &Oid) -> Result<(), GitError> {
        self.state
            .borrow_mut()
            .branches
            .insert(name.clone(), oid.clone());
        Ok(())
    }

    fn move_branch(&self, new_name: &BranchName) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        let Some(Head::Branch(current)) = state.head.clone() else {
            return Err(Self::command_failed(&["branch", "--move"], "detached HEAD"));
        };
        let tip = state
            .branches
            .remove(&current)
            .ok_or_else(|| Self::missing(current.as_str()))?;
        state.branches.insert(new_name.clone(), tip);
        state.head = Some(Head::Branch(new_name.clone()));
        Ok(())
    }

    fn delete_branch(&self, name: &BranchName) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        state
            .branches
            .remove(name)
            .ok_or_else(|| Self::missing(name.as_str()))?;
        Ok(())
    }

    fn rebase(&self, opts: &RebaseOpts) -> Result<RebaseOutcome, GitError> {
        let mut state = self.state.borrow_mut();
        let onto =
            Self::resolve_in(&state, &opts.onto).ok_or_else(|| Self::missing(&opts.onto))?;
        let tip = state
            .branches
            .get(&opts.branch)
            .cloned()
            .ok_or_else(|| Self::missing(opts.branch.as_str()))?;

        if state.conflict_branches.remove(&opts.branch) {
            state.rebase = Some(PendingRebase {
                branch: opts.branch.clone(),
                onto,
            });
            // Mid-rebase HEAD is detached at the replay point.
            state.head = Some(Head::Detached(tip));
            return Ok(RebaseOutcome::Conflict);
        }

        let new_tip = if tip == opts.from {
            // No commits of our own: the branch lands exactly on the base.
            onto
        } else {
            Self::mint(&mut state, vec![onto])
        };
        state.branches.insert(opts.branch.clone(), new_tip);
        state.head = Some(Head::Branch(opts.branch.clone()));
        Ok(RebaseOutcome::Done)
    }

    fn rebase_interactive(
        &self,
        branch: &BranchName,
        base: &Oid,
    ) -> Result<RebaseOutcome, GitError> {
        self.rebase(&RebaseOpts {
            branch: branch.clone(),
            onto: base.to_string(),
            from: base.clone(),
        })
    }

    fn rebase_continue(&self) -> Result<RebaseOutcome, GitError> {
        let mut state = self.state.borrow_mut();
        if state.rebase.is_none() {
            return Err(Self::command_failed(
                &["rebase", "--continue"],
                "no rebase in progress",
            ));
        }
        if state.continue_conflicts > 0 {
            state.continue_conflicts -= 1;
            return Ok(RebaseOutcome::Conflict);
        }
        let pending = state.rebase.take().expect("checked above");
        let new_tip = Self::mint(&mut state, vec![pending.onto]);
        state.branches.insert(pending.branch.clone(), new_tip);
        state.head = Some(Head::Branch(pending.branch));
        Ok(RebaseOutcome::Done)
    }

    fn rebase_abort(&self) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        match state.rebase.take() {
            Some(pending) => {
                state.head = Some(Head::Branch(pending.branch));
                Ok(())
            }
            None => Err(Self::command_failed(
                &["rebase", "--abort"],
                "no rebase in progress",
            )),
        }
    }

    fn rebase_in_progress(&self) -> bool {
        self.state.borrow().rebase.is_some()
    }

    fn unmerged_files(&self) -> Result<Vec<String>, GitError> {
        Ok(if self.rebase_in_progress() {
            vec!["conflicted.txt".to_string()]
        } else {
            Vec::new()
        })
    }

    fn detect_staged_changes(&self) -> Result<bool, GitError> {
        Ok(self.state.borrow().staged_changes)
    }

    fn add_all(&self) -> Result<(), GitError> {
        self.state.borrow_mut().staged_changes = true;
        Ok(())
    }

    fn commit(&self, opts: &CommitOpts) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        if state.fail_next_commit {
            state.fail_next_commit = false;
            return Err(Self::command_failed(&["commit"], "hook rejected commit"));
        }
        let Some(Head::Branch(branch)) = state.head.clone() else {
            return Err(Self::command_failed(&["commit"], "detached HEAD"));
        };
        let tip = state.branches[&branch].clone();
        let new_tip = if opts.amend {
            let parents = state.commits[&tip].clone();
            Self::mint(&mut state, parents)
        } else {
            Self::mint(&mut state, vec![tip])
        };
        state.branches.insert(branch, new_tip);
        state.staged_changes = false;
        Ok(())
    }

    fn soft_reset(&self, oid: &Oid) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        let Some(Head::Branch(branch)) = state.head.clone() else {
            return Err(Self::command_failed(&["reset", "--soft"], "detached HEAD"));
        };
        state.branches.insert(branch, oid.clone());
        Ok(())
    }

    fn fetch_branch(&self, _remote: &str, branch: &BranchName) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        let oid = state
            .remote_branches
            .get(branch)
            .cloned()
            .ok_or_else(|| Self::missing(branch.as_str()))?;
        state.fetch_head = Some(oid);
        Ok(())
    }

    fn read_fetch_head(&self) -> Result<Oid, GitError> {
        self.state
            .borrow()
            .fetch_head
            .clone()
            .ok_or_else(|| Self::missing("FETCH_HEAD"))
    }

    fn read_fetch_base(&self) -> Result<Oid, GitError> {
        self.state
            .borrow()
            .fetch_base
            .clone()
            .ok_or_else(|| Self::missing(FETCH_BASE_REF))
    }

    fn write_fetch_base(&self, oid: &Oid) -> Result<(), GitError> {
        self.state.borrow_mut().fetch_base = Some(oid.clone());
        Ok(())
    }

    fn set_remote_tracking(
        &self,
        remote: &str,
        branch: &BranchName,
        sha: &Oid,
    ) -> Result<(), GitError> {
        self.state
            .borrow_mut()
            .remote_tracking
            .insert(format!("{remote}/{branch}"), sha.clone());
        Ok(())
    }

    fn remote_sha(&self, remote: &str, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        Ok(self
            .state
            .borrow()
            .remote_tracking
            .get(&format!("{remote}/{branch}"))
            .cloned())
    }

    fn push_branch(
        &self,
        remote: &str,
        branch: &BranchName,
        _no_verify: bool,
    ) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        let tip = state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| Self::missing(branch.as_str()))?;
        state.remote_branches.insert(branch.clone(), tip.clone());
        state
            .remote_tracking
            .insert(format!("{remote}/{branch}"), tip);
        Ok(())
    }

    fn pull_branch(&self, _remote: &str, branch: &BranchName) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        if let Some(remote_tip) = state.remote_branches.get(branch).cloned() {
            state.branches.insert(branch.clone(), remote_tip);
        }
        Ok(())
    }

    fn prune_remote(&self, _remote: &str) -> Result<(), GitError> {
        Ok(())
    }

    fn read_metadata_blob(&self, branch: &BranchName) -> Result<Option<String>, GitError> {
        Ok(self.state.borrow().metadata.get(branch).cloned())
    }

    fn write_metadata_blob(&self, branch: &BranchName, json: &str) -> Result<(), GitError> {
        self.state
            .borrow_mut()
            .metadata
            .insert(branch.clone(), json.to_string());
        Ok(())
    }

    fn delete_metadata_ref(&self, branch: &BranchName) -> Result<(), GitError> {
        self.state.borrow_mut().metadata.remove(branch);
        Ok(())
    }

    fn list_metadata_refs(&self) -> Result<Vec<BranchName>, GitError> {
        Ok(self.state.borrow().metadata.keys().cloned().collect())
    }
}
