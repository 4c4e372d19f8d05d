//! engine::cache
//!
//! The branch metadata cache.
//!
//! An arena of branch records indexed by name, built once per process by
//! [`loader`](crate::engine::loader) and mutated in memory afterwards. Parent
//! pointers are authoritative; each record's `children` set is derived and
//! maintained incrementally by the single update funnel ([`MetaCache`]'s
//! `update_meta`), which also persists every parent-pointer edit to the ref
//! store and revalidates previously-indeterminate children.
//!
//! Rebase conflicts are ordinary return values here ([`RestackResult`]), not
//! errors: callers persist a continuation and surface them to the user.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::core::errors::CoreError;
use crate::core::types::{BranchName, Oid};
use crate::engine::loader;
use crate::engine::meta::{BranchEntry, PrInfo, RefStore};
use crate::engine::scope::ScopeSpec;
use crate::git::{CommitOpts, RebaseOpts, RebaseOutcome, Vcs};

/// Parent pointer plus fork point for a tracked branch.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedMeta {
    pub parent: BranchName,
    /// The parent revision this branch was last based on.
    pub fork_point: Oid,
    pub pr_info: Option<PrInfo>,
}

/// Validation state of one branch. Parent fields only exist on variants
/// that actually have a usable parent.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchState {
    /// The designated root branch.
    Trunk,
    /// Parent pointer recorded and consistent with repository history.
    Valid(TrackedMeta),
    /// No usable parent recorded (new branch, or parent was removed).
    Untracked,
    /// Parent is a known branch but the recorded fork point no longer
    /// matches its history; the carried fields are stale.
    InvalidParent(TrackedMeta),
}

impl BranchState {
    pub fn parent(&self) -> Option<&BranchName> {
        match self {
            BranchState::Valid(meta) | BranchState::InvalidParent(meta) => Some(&meta.parent),
            BranchState::Trunk | BranchState::Untracked => None,
        }
    }

    pub fn pr_info(&self) -> Option<&PrInfo> {
        match self {
            BranchState::Valid(meta) | BranchState::InvalidParent(meta) => meta.pr_info.as_ref(),
            BranchState::Trunk | BranchState::Untracked => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, BranchState::Valid(_))
    }
}

/// One record in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedBranch {
    /// The commit the branch currently points to.
    pub revision: Oid,
    /// Branches whose parent pointer names this branch. Derived; may
    /// contain non-VALID children, which queries filter out.
    pub children: BTreeSet<BranchName>,
    pub state: BranchState,
}

/// Outcome of a restack-style rebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestackResult {
    Done,
    Unneeded,
    Conflict {
        /// The fork point to record for the branch once the conflict is
        /// resolved.
        rebased_branch_base: Oid,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinueResult {
    /// The rebase finished; the named branch was updated.
    Done(BranchName),
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullResult {
    Done,
    Unneeded,
}

/// In-memory view of the stack forest, exclusively owned by one process.
pub struct MetaCache {
    vcs: Rc<dyn Vcs>,
    store: Rc<dyn RefStore>,
    trunk: BranchName,
    remote: String,
    branches: std::collections::BTreeMap<BranchName, CachedBranch>,
    current: Option<BranchName>,
}

impl MetaCache {
    pub fn new(
        vcs: Rc<dyn Vcs>,
        store: Rc<dyn RefStore>,
        trunk: BranchName,
        remote: String,
        current_branch_override: Option<BranchName>,
    ) -> Result<Self, CoreError> {
        let branches = loader::load_branches(vcs.as_ref(), store.as_ref(), &trunk)?;
        let current = match current_branch_override {
            Some(branch) => Some(branch),
            None => vcs.current_branch()?,
        };
        Ok(Self {
            vcs,
            store,
            trunk,
            remote,
            branches,
            current,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn trunk(&self) -> &BranchName {
        &self.trunk
    }

    pub fn is_trunk(&self, branch: &BranchName) -> bool {
        branch == &self.trunk
    }

    pub fn branch_exists(&self, branch: &BranchName) -> bool {
        self.branches.contains_key(branch)
    }

    pub fn is_branch_tracked(&self, branch: &BranchName) -> Result<bool, CoreError> {
        Ok(self.record(branch)?.state.is_valid())
    }

    pub fn state(&self, branch: &BranchName) -> Result<&BranchState, CoreError> {
        Ok(&self.record(branch)?.state)
    }

    pub fn current_branch(&self) -> Option<&BranchName> {
        self.current.as_ref()
    }

    pub fn current_branch_or_err(&self) -> Result<BranchName, CoreError> {
        let branch = self.current.clone().ok_or(CoreError::Detached)?;
        self.record(&branch)?;
        Ok(branch)
    }

    /// Current branch, required to be tracked (or trunk).
    pub fn current_branch_precondition(&self) -> Result<BranchName, CoreError> {
        let branch = self.current_branch_or_err()?;
        self.assert_valid_or_trunk(&branch)?;
        Ok(branch)
    }

    pub fn revision(&self, branch: &BranchName) -> Result<&Oid, CoreError> {
        Ok(&self.record(branch)?.revision)
    }

    pub fn base_revision(&self, branch: &BranchName) -> Result<Oid, CoreError> {
        Ok(self.valid_meta(branch)?.fork_point)
    }

    pub fn parent(&self, branch: &BranchName) -> Result<Option<&BranchName>, CoreError> {
        Ok(self.record(branch)?.state.parent())
    }

    pub fn parent_precondition(&self, branch: &BranchName) -> Result<BranchName, CoreError> {
        Ok(self.valid_meta(branch)?.parent)
    }

    /// VALID children of a branch, in name order.
    pub fn children(&self, branch: &BranchName) -> Result<Vec<BranchName>, CoreError> {
        Ok(self
            .record(branch)?
            .children
            .iter()
            .filter(|child| {
                self.branches
                    .get(*child)
                    .is_some_and(|record| record.state.is_valid())
            })
            .cloned()
            .collect())
    }

    /// All VALID descendants, parent-before-child.
    pub fn recursive_children(&self, branch: &BranchName) -> Vec<BranchName> {
        let mut result = Vec::new();
        if let Ok(children) = self.children(branch) {
            for child in children {
                result.push(child.clone());
                result.extend(self.recursive_children(&child));
            }
        }
        result
    }

    /// Ancestors of a branch excluding trunk, ordered topmost-first.
    pub fn recursive_parents_excluding_trunk(&self, branch: &BranchName) -> Vec<BranchName> {
        match self.branches.get(branch).and_then(|r| r.state.parent()) {
            Some(parent) if parent != &self.trunk => {
                let mut result = self.recursive_parents_excluding_trunk(parent);
                result.push(parent.clone());
                result
            }
            _ => Vec::new(),
        }
    }

    /// Ordered branch list for a bulk operation, parent-before-child.
    /// Trunk is only included if `branch` is trunk itself.
    pub fn relative_stack(
        &self,
        branch: &BranchName,
        scope: ScopeSpec,
    ) -> Result<Vec<BranchName>, CoreError> {
        self.assert_valid_or_trunk(branch)?;
        let mut result = Vec::new();
        if scope.recursive_parents {
            result.extend(self.recursive_parents_excluding_trunk(branch));
        }
        if scope.current_branch {
            result.push(branch.clone());
        }
        if scope.recursive_children {
            result.extend(self.recursive_children(branch));
        }
        Ok(result)
    }

    /// A branch needs no restack iff it is trunk, or VALID with a fork point
    /// equal to its parent's current revision.
    pub fn is_branch_fixed(&self, branch: &BranchName) -> Result<bool, CoreError> {
        match &self.record(branch)?.state {
            BranchState::Trunk => Ok(true),
            BranchState::Valid(meta) => {
                Ok(self.record(&meta.parent)?.revision == meta.fork_point)
            }
            BranchState::Untracked | BranchState::InvalidParent(_) => Ok(false),
        }
    }

    pub fn is_branch_empty(&self, branch: &BranchName) -> Result<bool, CoreError> {
        let meta = self.valid_meta(branch)?;
        Ok(self.vcs.is_diff_empty(&meta.fork_point, branch)?)
    }

    pub fn is_merged_into_trunk(&self, branch: &BranchName) -> Result<bool, CoreError> {
        self.record(branch)?;
        Ok(self.vcs.is_merged_into(branch, &self.trunk)?)
    }

    pub fn branch_matches_remote(&self, branch: &BranchName) -> Result<bool, CoreError> {
        self.assert_valid_or_trunk(branch)?;
        let revision = self.record(branch)?.revision.clone();
        Ok(self.vcs.remote_sha(&self.remote, branch)? == Some(revision))
    }

    /// Commits unique to a branch, newest first. For trunk, just its tip.
    pub fn commits_of(&self, branch: &BranchName) -> Result<Vec<Oid>, CoreError> {
        self.assert_valid_or_trunk(branch)?;
        let record = self.record(branch)?;
        match &record.state {
            BranchState::Trunk => Ok(vec![record.revision.clone()]),
            BranchState::Valid(meta) => {
                Ok(self.vcs.commit_range(&meta.fork_point, &record.revision)?)
            }
            _ => unreachable!("asserted valid or trunk"),
        }
    }

    pub fn pr_info(&self, branch: &BranchName) -> Option<&PrInfo> {
        self.branches.get(branch).and_then(|r| r.state.pr_info())
    }

    /// Merge fields into a branch's PR info. No-op unless the branch is VALID.
    pub fn upsert_pr_info(&mut self, branch: &BranchName, info: PrInfo) -> Result<(), CoreError> {
        let Some(record) = self.branches.get(branch) else {
            return Ok(());
        };
        let BranchState::Valid(meta) = record.state.clone() else {
            return Ok(());
        };
        let revision = record.revision.clone();
        let mut merged = meta.pr_info.clone().unwrap_or_default();
        merged.merge_from(info);
        self.update_meta(
            branch,
            revision,
            TrackedMeta {
                pr_info: Some(merged),
                ..meta
            },
        )
    }

    pub fn clear_pr_info(&mut self, branch: &BranchName) -> Result<(), CoreError> {
        let Some(record) = self.branches.get(branch) else {
            return Ok(());
        };
        let BranchState::Valid(meta) = record.state.clone() else {
            return Ok(());
        };
        let revision = record.revision.clone();
        self.update_meta(
            branch,
            revision,
            TrackedMeta {
                pr_info: None,
                ..meta
            },
        )
    }

    // ------------------------------------------------------------------
    // Pass-throughs the command layer needs
    // ------------------------------------------------------------------

    pub fn rebase_in_progress(&self) -> bool {
        self.vcs.rebase_in_progress()
    }

    pub fn detect_staged_changes(&self) -> Result<bool, CoreError> {
        Ok(self.vcs.detect_staged_changes()?)
    }

    pub fn unmerged_files(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.vcs.unmerged_files()?)
    }

    pub fn add_all(&self) -> Result<(), CoreError> {
        Ok(self.vcs.add_all()?)
    }

    pub fn abort_rebase(&self) -> Result<(), CoreError> {
        Ok(self.vcs.rebase_abort()?)
    }

    // ------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------

    pub fn checkout_branch(&mut self, branch: &BranchName) -> Result<(), CoreError> {
        if self.current.as_ref() == Some(branch) {
            return Ok(());
        }
        self.record(branch)?;
        self.vcs.switch_branch(branch)?;
        self.current = Some(branch.clone());
        Ok(())
    }

    /// Create a branch forking from the current branch at its current
    /// revision and check it out.
    pub fn checkout_new_branch(&mut self, branch: &BranchName) -> Result<(), CoreError> {
        let parent = self.current_branch_or_err()?;
        self.assert_valid_or_trunk(&parent)?;
        self.validate_new_parent(branch, &parent)?;
        let parent_revision = self.record(&parent)?.revision.clone();
        self.vcs.switch_new_branch(branch)?;
        self.update_meta(
            branch,
            parent_revision.clone(),
            TrackedMeta {
                parent,
                fork_point: parent_revision,
                pr_info: None,
            },
        )?;
        self.current = Some(branch.clone());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Start tracking an existing branch under `parent`, with its fork point
    /// set to the merge-base of the two.
    pub fn track_branch(
        &mut self,
        branch: &BranchName,
        parent: &BranchName,
    ) -> Result<(), CoreError> {
        self.validate_new_parent(branch, parent)?;
        let revision = self.record(branch)?.revision.clone();
        let pr_info = self.record(branch)?.state.pr_info().cloned();
        self.assert_valid_or_trunk(parent)?;
        let fork_point = self.vcs.merge_base(branch.as_str(), parent.as_str())?;
        self.update_meta(
            branch,
            revision,
            TrackedMeta {
                parent: parent.clone(),
                fork_point,
                pr_info,
            },
        )
    }

    /// Delete a branch's persisted entry and demote it to untracked. Every
    /// descendant that was VALID becomes INVALID_PARENT; descendants already
    /// untracked stay as they are.
    pub fn untrack_branch(&mut self, branch: &BranchName) -> Result<(), CoreError> {
        self.valid_meta(branch)?;
        self.store.delete(branch)?;
        let record = self.branches.get_mut(branch).expect("checked above");
        record.state = BranchState::Untracked;
        let mut pending: Vec<BranchName> = record.children.iter().cloned().collect();

        while let Some(child) = pending.pop() {
            let Some(record) = self.branches.get_mut(&child) else {
                continue;
            };
            if let BranchState::Valid(meta) = record.state.clone() {
                record.state = BranchState::InvalidParent(meta);
            }
            pending.extend(record.children.iter().cloned());
        }
        Ok(())
    }

    pub fn set_parent(
        &mut self,
        branch: &BranchName,
        parent: &BranchName,
    ) -> Result<(), CoreError> {
        self.validate_new_parent(branch, parent)?;
        let meta = self.valid_meta(branch)?;
        if &meta.parent == parent {
            return Ok(());
        }
        self.assert_valid_or_trunk(parent)?;
        let revision = self.record(branch)?.revision.clone();
        self.update_meta(
            branch,
            revision,
            TrackedMeta {
                parent: parent.clone(),
                ..meta
            },
        )
    }

    // ------------------------------------------------------------------
    // Tree mutations
    // ------------------------------------------------------------------

    /// Rename the current branch, carrying its subtree along. PR info does
    /// not survive the rename since any open PR tracks the old name.
    pub fn rename_current_branch(&mut self, new_name: &BranchName) -> Result<(), CoreError> {
        let current = self.current_branch_or_err()?;
        if &current == new_name {
            return Ok(());
        }
        let meta = self.valid_meta(&current)?;
        let revision = self.record(&current)?.revision.clone();

        self.vcs.move_branch(new_name)?;
        self.update_meta(
            new_name,
            revision,
            TrackedMeta {
                parent: meta.parent.clone(),
                fork_point: meta.fork_point.clone(),
                pr_info: None,
            },
        )?;

        for child in self.children(&current)? {
            self.set_parent(&child, new_name)?;
        }

        self.remove_child(&meta.parent, &current);
        self.branches.remove(&current);
        self.store.delete(&current)?;
        self.current = Some(new_name.clone());
        Ok(())
    }

    /// Merge the current branch with its parent. With `keep` the current
    /// branch's name survives and absorbs the parent; otherwise the parent
    /// absorbs the current branch.
    pub fn fold_current_branch(&mut self, keep: bool) -> Result<(), CoreError> {
        let current = self.current_branch_or_err()?;
        let meta = self.valid_meta(&current)?;
        let parent = meta.parent.clone();
        let parent_meta = self.valid_meta(&parent)?;

        if keep {
            let revision = self.record(&current)?.revision.clone();
            self.update_meta(
                &current,
                revision,
                TrackedMeta {
                    parent: parent_meta.parent.clone(),
                    fork_point: parent_meta.fork_point.clone(),
                    pr_info: meta.pr_info.clone(),
                },
            )?;
            for child in self.children(&parent)? {
                if child != current {
                    self.set_parent(&child, &current)?;
                }
            }
            self.delete_all_branch_data(&parent)?;
        } else {
            let revision = self.record(&current)?.revision.clone();
            self.vcs.force_switch_new_branch(&parent, &revision)?;
            self.update_meta(&parent, revision, parent_meta)?;
            for child in self.children(&current)? {
                self.set_parent(&child, &parent)?;
            }
            self.checkout_branch(&parent)?;
            self.delete_all_branch_data(&current)?;
        }
        Ok(())
    }

    /// Delete a branch, splicing its children onto its own parent.
    pub fn delete_branch(&mut self, branch: &BranchName) -> Result<(), CoreError> {
        let meta = self.valid_meta(branch)?;
        if self.current.as_ref() == Some(branch) {
            self.checkout_branch(&meta.parent)?;
        }
        for child in self.children(branch)? {
            self.set_parent(&child, &meta.parent)?;
        }
        self.delete_all_branch_data(branch)
    }

    /// Cut a branch's history into a chain of new branches.
    ///
    /// `branch_points` reference commits newest-to-oldest (as the user sees
    /// them) while `branch_names` run oldest-to-newest, so the points are
    /// reversed before walking. HEAD must be on `branch_to_split`'s tip so
    /// `@~n` addresses the split boundaries.
    pub fn apply_split(
        &mut self,
        branch_to_split: &BranchName,
        branch_names: &[BranchName],
        branch_points: &[usize],
    ) -> Result<(), CoreError> {
        if branch_names.len() != branch_points.len() {
            return Err(CoreError::precondition("invalid number of branch names"));
        }
        let meta = self.valid_meta(branch_to_split)?;
        let original_children = self.children(branch_to_split)?;

        let mut reversed_points: Vec<usize> = branch_points.to_vec();
        reversed_points.reverse();

        let mut last_name = meta.parent.clone();
        let mut last_revision = meta.fork_point.clone();
        for (name, point) in branch_names.iter().zip(&reversed_points) {
            let revision = self.vcs.sha_or_err(&format!("@~{point}"))?;
            self.vcs.force_create_branch(name, &revision)?;
            self.update_meta(
                name,
                revision.clone(),
                TrackedMeta {
                    parent: last_name.clone(),
                    fork_point: last_revision.clone(),
                    pr_info: if name == branch_to_split {
                        meta.pr_info.clone()
                    } else {
                        None
                    },
                },
            )?;
            last_name = name.clone();
            last_revision = revision;
        }

        if &last_name != branch_to_split {
            for child in original_children {
                self.set_parent(&child, &last_name)?;
            }
        }
        if !branch_names.contains(branch_to_split) {
            self.delete_all_branch_data(branch_to_split)?;
        }
        self.vcs.switch_branch(&last_name)?;
        self.current = Some(last_name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Commit operations
    // ------------------------------------------------------------------

    pub fn commit(&mut self, opts: &CommitOpts) -> Result<(), CoreError> {
        let branch = self.current_branch_or_err()?;
        self.valid_meta(&branch)?;
        self.vcs.commit(opts)?;
        let revision = self.vcs.sha_or_err(branch.as_str())?;
        self.branches.get_mut(&branch).expect("checked above").revision = revision;
        Ok(())
    }

    /// Squash the current branch's commits down to one. If the amend fails
    /// (e.g. a hook rejects it), the branch is restored to its pre-squash
    /// revision on a best-effort basis and the original error is surfaced.
    pub fn squash_current_branch(&mut self, opts: &CommitOpts) -> Result<(), CoreError> {
        let branch = self.current_branch_or_err()?;
        let meta = self.valid_meta(&branch)?;
        let revision = self.record(&branch)?.revision.clone();
        let range = self.vcs.commit_range(&meta.fork_point, &revision)?;
        let Some(oldest) = range.last() else {
            return Err(CoreError::precondition(format!(
                "branch '{branch}' has no commits to squash"
            )));
        };
        self.vcs.soft_reset(oldest)?;
        if let Err(err) = self.vcs.commit(&CommitOpts {
            amend: true,
            ..opts.clone()
        }) {
            let _ = self.vcs.soft_reset(&revision);
            return Err(err.into());
        }
        let new_revision = self.vcs.sha_or_err(branch.as_str())?;
        self.branches.get_mut(&branch).expect("checked above").revision = new_revision;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Restack
    // ------------------------------------------------------------------

    /// Rebase a branch onto its parent's current revision.
    pub fn restack_branch(&mut self, branch: &BranchName) -> Result<RestackResult, CoreError> {
        self.assert_valid_or_trunk(branch)?;
        if self.is_branch_fixed(branch)? {
            return Ok(RestackResult::Unneeded);
        }
        let meta = self.valid_meta(branch)?;
        let new_base = self.record(&meta.parent)?.revision.clone();

        let outcome = self.vcs.rebase(&RebaseOpts {
            branch: branch.clone(),
            onto: meta.parent.to_string(),
            from: meta.fork_point.clone(),
        })?;
        match outcome {
            RebaseOutcome::Conflict => Ok(RestackResult::Conflict {
                rebased_branch_base: new_base,
            }),
            RebaseOutcome::Done => {
                self.handle_successful_rebase(branch, new_base)?;
                Ok(RestackResult::Done)
            }
        }
    }

    /// Rebase a branch onto its own fork point, for reordering or editing
    /// its commits. The fork point does not change on success.
    pub fn rebase_interactive(&mut self, branch: &BranchName) -> Result<RestackResult, CoreError> {
        let meta = self.valid_meta(branch)?;
        let outcome = self.vcs.rebase_interactive(branch, &meta.fork_point)?;
        match outcome {
            RebaseOutcome::Conflict => Ok(RestackResult::Conflict {
                rebased_branch_base: meta.fork_point,
            }),
            RebaseOutcome::Done => {
                self.handle_successful_rebase(branch, meta.fork_point)?;
                Ok(RestackResult::Done)
            }
        }
    }

    /// Continue a suspended rebase, recording `base` as the fork point of
    /// whatever branch the repository lands on.
    pub fn continue_rebase(&mut self, base: Oid) -> Result<ContinueResult, CoreError> {
        if self.vcs.rebase_continue()? == RebaseOutcome::Conflict {
            return Ok(ContinueResult::Conflict);
        }
        let branch = self
            .vcs
            .current_branch()?
            .ok_or_else(|| CoreError::precondition("must be on a branch after a rebase"))?;
        self.valid_meta(&branch)?;
        self.handle_successful_rebase(&branch, base)?;
        Ok(ContinueResult::Done(branch))
    }

    // ------------------------------------------------------------------
    // Remote operations
    // ------------------------------------------------------------------

    pub fn push_branch(&self, branch: &BranchName, no_verify: bool) -> Result<(), CoreError> {
        self.valid_meta(branch)?;
        Ok(self.vcs.push_branch(&self.remote, branch, no_verify)?)
    }

    /// Fast-forward trunk from the remote, restoring the original checkout
    /// whether or not the pull succeeds.
    pub fn pull_trunk(&mut self) -> Result<PullResult, CoreError> {
        self.vcs.prune_remote(&self.remote)?;
        let current = self.current_branch_or_err()?;
        let trunk = self.trunk.clone();
        let old_revision = self.record(&trunk)?.revision.clone();

        let result = (|| -> Result<PullResult, CoreError> {
            self.vcs.switch_branch(&trunk)?;
            self.vcs.pull_branch(&self.remote, &trunk)?;
            let new_revision = self.vcs.sha_or_err(trunk.as_str())?;
            self.branches
                .get_mut(&trunk)
                .expect("trunk is always cached")
                .revision = new_revision.clone();
            Ok(if old_revision == new_revision {
                PullResult::Unneeded
            } else {
                PullResult::Done
            })
        })();
        let restore = self.vcs.switch_branch(&current);
        let result = result?;
        restore?;
        Ok(result)
    }

    /// Fetch a remote branch, recording its tip as `FETCH_HEAD` and its base
    /// in the fetch-base ref. For a trunk child the base is the merge-base
    /// of the fetched tip and trunk; for a stacked branch it is the head of
    /// the previous fetch, supporting chained fetches in one pass.
    pub fn fetch_branch(
        &self,
        branch: &BranchName,
        parent: &BranchName,
    ) -> Result<(), CoreError> {
        self.assert_valid_or_trunk(parent)?;
        if self.is_trunk(parent) {
            self.vcs.fetch_branch(&self.remote, branch)?;
            let head = self.vcs.read_fetch_head()?;
            let trunk_revision = self.record(parent)?.revision.clone();
            let base = self
                .vcs
                .merge_base(head.as_str(), trunk_revision.as_str())?;
            self.vcs.write_fetch_base(&base)?;
        } else {
            let previous_head = self.vcs.read_fetch_head()?;
            self.vcs.write_fetch_base(&previous_head)?;
            self.vcs.fetch_branch(&self.remote, branch)?;
        }
        Ok(())
    }

    pub fn branch_matches_fetched(&self, branch: &BranchName) -> Result<bool, CoreError> {
        Ok(self.record(branch)?.revision == self.vcs.read_fetch_head()?)
    }

    /// Materialize the last fetch as a new local tracked branch.
    pub fn checkout_branch_from_fetched(
        &mut self,
        branch: &BranchName,
        parent: &BranchName,
    ) -> Result<(), CoreError> {
        self.validate_new_parent(branch, parent)?;
        self.record(parent)?;
        let head = self.vcs.read_fetch_head()?;
        let base = self.vcs.read_fetch_base()?;
        self.vcs.force_switch_new_branch(branch, &head)?;
        self.vcs.set_remote_tracking(&self.remote, branch, &head)?;
        self.update_meta(
            branch,
            head,
            TrackedMeta {
                parent: parent.clone(),
                fork_point: base,
                pr_info: None,
            },
        )?;
        self.current = Some(branch.clone());
        Ok(())
    }

    /// Rebase a tracked branch onto its freshly fetched counterpart. Same
    /// conflict contract as [`restack_branch`](Self::restack_branch) with
    /// `onto = fetchHead` and `newBase = fetchBase`.
    pub fn rebase_branch_onto_fetched(
        &mut self,
        branch: &BranchName,
    ) -> Result<RestackResult, CoreError> {
        let meta = self.valid_meta(branch)?;
        let head = self.vcs.read_fetch_head()?;
        let base = self.vcs.read_fetch_base()?;
        self.vcs.set_remote_tracking(&self.remote, branch, &head)?;

        // Correct on both paths: on conflict this becomes the persisted
        // current-branch override; on success the rebase leaves HEAD here.
        self.current = Some(branch.clone());
        let outcome = self.vcs.rebase(&RebaseOpts {
            branch: branch.clone(),
            onto: head.to_string(),
            from: meta.fork_point,
        })?;
        match outcome {
            RebaseOutcome::Conflict => Ok(RestackResult::Conflict {
                rebased_branch_base: base,
            }),
            RebaseOutcome::Done => {
                self.handle_successful_rebase(branch, base)?;
                Ok(RestackResult::Done)
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn record(&self, branch: &BranchName) -> Result<&CachedBranch, CoreError> {
        self.branches
            .get(branch)
            .ok_or_else(|| CoreError::UnknownBranch(branch.clone()))
    }

    /// Metadata of a branch required to be VALID (so not trunk).
    fn valid_meta(&self, branch: &BranchName) -> Result<TrackedMeta, CoreError> {
        match &self.record(branch)?.state {
            BranchState::Valid(meta) => Ok(meta.clone()),
            BranchState::Trunk => Err(CoreError::BadTrunkOperation),
            BranchState::Untracked => Err(CoreError::UntrackedBranch(branch.clone())),
            BranchState::InvalidParent(_) => Err(CoreError::InvalidParent(branch.clone())),
        }
    }

    fn assert_valid_or_trunk(&self, branch: &BranchName) -> Result<(), CoreError> {
        match &self.record(branch)?.state {
            BranchState::Valid(_) | BranchState::Trunk => Ok(()),
            BranchState::Untracked => Err(CoreError::UntrackedBranch(branch.clone())),
            BranchState::InvalidParent(_) => Err(CoreError::InvalidParent(branch.clone())),
        }
    }

    /// Reject self-parenting and cycles before any mutation happens.
    fn validate_new_parent(
        &self,
        branch: &BranchName,
        parent: &BranchName,
    ) -> Result<(), CoreError> {
        if branch == parent {
            return Err(CoreError::precondition(format!(
                "cannot set the parent of '{branch}' to itself"
            )));
        }
        if self.branches.contains_key(branch)
            && self.recursive_children(branch).contains(parent)
        {
            return Err(CoreError::precondition(format!(
                "cannot set the parent of '{branch}' to its descendant '{parent}'"
            )));
        }
        Ok(())
    }

    /// The single write funnel. Validates the parent, maintains both
    /// parents' child sets, persists the entry, and revalidates
    /// INVALID_PARENT children when this branch was not previously VALID.
    fn update_meta(
        &mut self,
        branch: &BranchName,
        revision: Oid,
        meta: TrackedMeta,
    ) -> Result<(), CoreError> {
        let (old_parent, was_valid, children) = match self.branches.get(branch) {
            Some(record) => {
                if matches!(record.state, BranchState::Trunk) {
                    return Err(CoreError::BadTrunkOperation);
                }
                (
                    record.state.parent().cloned(),
                    record.state.is_valid(),
                    record.children.clone(),
                )
            }
            None => (None, false, BTreeSet::new()),
        };
        let new_parent = meta.parent.clone();
        if !self.branches.contains_key(&new_parent) {
            return Err(CoreError::UnknownBranch(new_parent));
        }

        let entry = BranchEntry::new(
            meta.parent.clone(),
            meta.fork_point.clone(),
            meta.pr_info.clone(),
        );
        self.branches.insert(
            branch.clone(),
            CachedBranch {
                revision,
                children: children.clone(),
                state: BranchState::Valid(meta),
            },
        );

        if let Some(old_parent) = old_parent {
            if old_parent != new_parent {
                self.remove_child(&old_parent, branch);
            }
        }
        self.branches
            .get_mut(&new_parent)
            .expect("parent checked above")
            .children
            .insert(branch.clone());

        self.store.write(branch, &entry)?;

        if !was_valid {
            self.revalidate_children(&children)?;
        }
        Ok(())
    }

    /// Re-examine INVALID_PARENT children after their parent's metadata
    /// changed. VALID children are left alone.
    fn revalidate_children(&mut self, children: &BTreeSet<BranchName>) -> Result<(), CoreError> {
        for child in children {
            let Some(record) = self.branches.get(child) else {
                continue;
            };
            let BranchState::InvalidParent(meta) = record.state.clone() else {
                continue;
            };
            let grandchildren = record.children.clone();
            let parent_revision = self.record(&meta.parent)?.revision.clone();
            let new_state = match loader::classify_fork_point(
                self.vcs.as_ref(),
                child,
                &meta.fork_point,
                &parent_revision,
            )? {
                Some(fork_point) => BranchState::Valid(TrackedMeta { fork_point, ..meta }),
                None => BranchState::InvalidParent(meta),
            };
            self.branches.get_mut(child).expect("present above").state = new_state;
            self.revalidate_children(&grandchildren)?;
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: &BranchName, child: &BranchName) {
        if let Some(record) = self.branches.get_mut(parent) {
            record.children.remove(child);
        }
    }

    /// Drop a branch from the cache, the store, and the repository.
    fn delete_all_branch_data(&mut self, branch: &BranchName) -> Result<(), CoreError> {
        let meta = self.valid_meta(branch)?;
        self.remove_child(&meta.parent, branch);
        self.branches.remove(branch);
        self.vcs.delete_branch(branch)?;
        self.store.delete(branch)?;
        Ok(())
    }

    fn handle_successful_rebase(
        &mut self,
        branch: &BranchName,
        new_base: Oid,
    ) -> Result<(), CoreError> {
        let meta = self.valid_meta(branch)?;
        let revision = self.vcs.sha_or_err(branch.as_str())?;
        self.update_meta(
            branch,
            revision,
            TrackedMeta {
                fork_point: new_base,
                ..meta
            },
        )?;
        if let Some(current) = self.current.clone() {
            if self.branches.contains_key(&current) {
                self.vcs.switch_branch(&current)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::meta::GitRefStore;
    use crate::git::fake::FakeVcs;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    struct Harness {
        vcs: Rc<FakeVcs>,
        store: Rc<GitRefStore>,
    }

    impl Harness {
        fn new() -> Self {
            let vcs = Rc::new(FakeVcs::new());
            vcs.init_trunk("main");
            let store = Rc::new(GitRefStore::new(vcs.clone() as Rc<dyn Vcs>));
            Self { vcs, store }
        }

        fn cache(&self) -> MetaCache {
            MetaCache::new(
                self.vcs.clone() as Rc<dyn Vcs>,
                self.store.clone() as Rc<dyn RefStore>,
                branch("main"),
                "origin".into(),
                None,
            )
            .unwrap()
        }
    }

    /// trunk <- a <- b, all tracked and fixed.
    fn stacked_harness() -> (Harness, MetaCache) {
        let h = Harness::new();
        let mut cache = h.cache();
        cache.checkout_new_branch(&branch("a")).unwrap();
        h.vcs.add_commit("a");
        cache = h.cache();
        cache.checkout_branch(&branch("a")).unwrap();
        cache.checkout_new_branch(&branch("b")).unwrap();
        h.vcs.add_commit("b");
        let cache = h.cache();
        (h, cache)
    }

    mod tracking {
        use super::*;

        #[test]
        fn checkout_new_branch_is_valid_and_fixed() {
            let h = Harness::new();
            let mut cache = h.cache();
            cache.checkout_new_branch(&branch("feature")).unwrap();

            assert!(cache.is_branch_tracked(&branch("feature")).unwrap());
            assert!(cache.is_branch_fixed(&branch("feature")).unwrap());
            assert_eq!(
                cache.parent(&branch("feature")).unwrap(),
                Some(&branch("main"))
            );
            assert!(h.vcs.metadata_ref_exists("feature"));
        }

        #[test]
        fn track_branch_uses_merge_base_as_fork_point() {
            let h = Harness::new();
            let root = h.vcs.tip("main");
            h.vcs.create_branch_at("feature", &root);
            h.vcs.add_commit("feature");
            h.vcs.add_commit("main");

            let mut cache = h.cache();
            cache.track_branch(&branch("feature"), &branch("main")).unwrap();

            assert!(cache.is_branch_tracked(&branch("feature")).unwrap());
            assert_eq!(cache.base_revision(&branch("feature")).unwrap(), root);
            // main moved since the fork, so the branch needs a restack.
            assert!(!cache.is_branch_fixed(&branch("feature")).unwrap());
        }

        #[test]
        fn untrack_then_track_restores_valid_state() {
            let (h, mut cache) = stacked_harness();
            cache.untrack_branch(&branch("a")).unwrap();
            assert!(!cache.is_branch_tracked(&branch("a")).unwrap());
            assert!(!h.vcs.metadata_ref_exists("a"));
            // b's lineage is no longer authoritative.
            assert!(matches!(
                cache.state(&branch("b")).unwrap(),
                BranchState::InvalidParent(_)
            ));

            cache.track_branch(&branch("a"), &branch("main")).unwrap();
            assert!(cache.is_branch_tracked(&branch("a")).unwrap());
            // Tracking a's metadata again revalidates b.
            assert!(cache.is_branch_tracked(&branch("b")).unwrap());
        }

        #[test]
        fn untrack_requires_a_tracked_branch() {
            let h = Harness::new();
            let root = h.vcs.tip("main");
            h.vcs.create_branch_at("loose", &root);
            let mut cache = h.cache();
            assert!(matches!(
                cache.untrack_branch(&branch("loose")),
                Err(CoreError::UntrackedBranch(_))
            ));
        }

        #[test]
        fn self_parent_is_rejected() {
            let (_h, mut cache) = stacked_harness();
            assert!(matches!(
                cache.set_parent(&branch("a"), &branch("a")),
                Err(CoreError::Precondition(_))
            ));
        }

        #[test]
        fn cycle_creating_parent_is_rejected() {
            let (_h, mut cache) = stacked_harness();
            assert!(matches!(
                cache.set_parent(&branch("a"), &branch("b")),
                Err(CoreError::Precondition(_))
            ));
        }

        #[test]
        fn trunk_operations_are_rejected() {
            let (_h, mut cache) = stacked_harness();
            assert!(matches!(
                cache.untrack_branch(&branch("main")),
                Err(CoreError::BadTrunkOperation)
            ));
            assert!(matches!(
                cache.delete_branch(&branch("main")),
                Err(CoreError::BadTrunkOperation)
            ));
        }
    }

    mod mutations {
        use super::*;

        #[test]
        fn rename_moves_subtree_and_clears_pr_info() {
            let (h, mut cache) = stacked_harness();
            cache
                .upsert_pr_info(
                    &branch("a"),
                    PrInfo {
                        number: Some(7),
                        ..PrInfo::default()
                    },
                )
                .unwrap();
            cache.checkout_branch(&branch("a")).unwrap();
            cache.rename_current_branch(&branch("a2")).unwrap();

            assert!(!cache.branch_exists(&branch("a")));
            assert!(cache.is_branch_tracked(&branch("a2")).unwrap());
            assert_eq!(cache.pr_info(&branch("a2")), None);
            assert_eq!(
                cache.parent(&branch("b")).unwrap(),
                Some(&branch("a2"))
            );
            assert!(!h.vcs.metadata_ref_exists("a"));
            assert_eq!(cache.current_branch(), Some(&branch("a2")));
        }

        #[test]
        fn pr_info_can_be_set_merged_and_cleared() {
            let (_h, mut cache) = stacked_harness();
            cache
                .upsert_pr_info(
                    &branch("a"),
                    PrInfo {
                        number: Some(7),
                        ..PrInfo::default()
                    },
                )
                .unwrap();
            cache
                .upsert_pr_info(
                    &branch("a"),
                    PrInfo {
                        url: Some("https://example.com/7".into()),
                        ..PrInfo::default()
                    },
                )
                .unwrap();

            let info = cache.pr_info(&branch("a")).unwrap();
            assert_eq!(info.number, Some(7));
            assert_eq!(info.url.as_deref(), Some("https://example.com/7"));

            cache.clear_pr_info(&branch("a")).unwrap();
            assert_eq!(cache.pr_info(&branch("a")), None);
        }

        #[test]
        fn delete_splices_children_onto_grandparent() {
            let (h, mut cache) = stacked_harness();
            // Give a a second child.
            cache.checkout_branch(&branch("a")).unwrap();
            cache.checkout_new_branch(&branch("c")).unwrap();

            cache.delete_branch(&branch("a")).unwrap();

            assert!(!cache.branch_exists(&branch("a")));
            assert!(!h.vcs.branch_exists("a"));
            assert_eq!(cache.parent(&branch("b")).unwrap(), Some(&branch("main")));
            assert_eq!(cache.parent(&branch("c")).unwrap(), Some(&branch("main")));
        }

        #[test]
        fn delete_of_current_branch_checks_out_parent() {
            let (_h, mut cache) = stacked_harness();
            cache.checkout_branch(&branch("b")).unwrap();
            cache.delete_branch(&branch("b")).unwrap();
            assert_eq!(cache.current_branch(), Some(&branch("a")));
        }

        #[test]
        fn fold_keeping_current_absorbs_parent() {
            let (h, mut cache) = stacked_harness();
            cache.checkout_branch(&branch("b")).unwrap();
            cache.fold_current_branch(true).unwrap();

            assert!(!cache.branch_exists(&branch("a")));
            assert!(!h.vcs.branch_exists("a"));
            assert_eq!(cache.parent(&branch("b")).unwrap(), Some(&branch("main")));
        }

        #[test]
        fn fold_into_parent_moves_parent_to_tip() {
            let (h, mut cache) = stacked_harness();
            let b_tip = h.vcs.tip("b");
            cache.checkout_branch(&branch("b")).unwrap();
            cache.fold_current_branch(false).unwrap();

            assert!(!cache.branch_exists(&branch("b")));
            assert_eq!(cache.revision(&branch("a")).unwrap(), &b_tip);
            assert_eq!(cache.current_branch(), Some(&branch("a")));
        }

        #[test]
        fn fold_at_trunk_child_is_rejected() {
            let (_h, mut cache) = stacked_harness();
            cache.checkout_branch(&branch("a")).unwrap();
            // a's parent is trunk, which cannot be absorbed.
            assert!(matches!(
                cache.fold_current_branch(true),
                Err(CoreError::BadTrunkOperation)
            ));
        }

        #[test]
        fn split_produces_parent_to_child_chain() {
            let h = Harness::new();
            let mut cache = h.cache();
            cache.checkout_new_branch(&branch("s")).unwrap();
            h.vcs.add_commit("s");
            h.vcs.add_commit("s");
            h.vcs.add_commit("s");
            let mut cache = h.cache();
            cache.checkout_branch(&branch("s")).unwrap();
            cache
                .upsert_pr_info(
                    &branch("s"),
                    PrInfo {
                        number: Some(3),
                        ..PrInfo::default()
                    },
                )
                .unwrap();

            // Boundaries newest-first: s3 keeps the tip, s1 ends two back.
            cache
                .apply_split(
                    &branch("s"),
                    &[branch("s1"), branch("s2"), branch("s3")],
                    &[0, 1, 2],
                )
                .unwrap();

            assert_eq!(cache.parent(&branch("s1")).unwrap(), Some(&branch("main")));
            assert_eq!(cache.parent(&branch("s2")).unwrap(), Some(&branch("s1")));
            assert_eq!(cache.parent(&branch("s3")).unwrap(), Some(&branch("s2")));
            assert!(!cache.branch_exists(&branch("s")));
            // None of the new names reused "s", so its PR info is gone.
            assert_eq!(cache.pr_info(&branch("s3")), None);
            assert_eq!(cache.current_branch(), Some(&branch("s3")));
        }

        #[test]
        fn split_keeps_pr_info_on_name_reusing_branch() {
            let h = Harness::new();
            let mut cache = h.cache();
            cache.checkout_new_branch(&branch("s")).unwrap();
            h.vcs.add_commit("s");
            h.vcs.add_commit("s");
            let mut cache = h.cache();
            cache.checkout_branch(&branch("s")).unwrap();
            cache
                .upsert_pr_info(
                    &branch("s"),
                    PrInfo {
                        number: Some(9),
                        ..PrInfo::default()
                    },
                )
                .unwrap();

            cache
                .apply_split(&branch("s"), &[branch("s0"), branch("s")], &[0, 1])
                .unwrap();

            assert_eq!(cache.pr_info(&branch("s0")), None);
            assert_eq!(cache.pr_info(&branch("s")).and_then(|p| p.number), Some(9));
        }
    }

    mod restack {
        use super::*;

        #[test]
        fn restack_is_unneeded_when_fixed() {
            let (_h, mut cache) = stacked_harness();
            assert_eq!(
                cache.restack_branch(&branch("b")).unwrap(),
                RestackResult::Unneeded
            );
        }

        #[test]
        fn restack_moves_branch_onto_parent_tip() {
            let (h, _) = stacked_harness();
            let new_main = h.vcs.add_commit("main");
            let mut cache = h.cache();

            assert_eq!(
                cache.restack_branch(&branch("a")).unwrap(),
                RestackResult::Done
            );
            assert!(cache.is_branch_fixed(&branch("a")).unwrap());
            assert_eq!(cache.base_revision(&branch("a")).unwrap(), new_main);
            // Idempotent: nothing left to do.
            assert_eq!(
                cache.restack_branch(&branch("a")).unwrap(),
                RestackResult::Unneeded
            );
        }

        #[test]
        fn child_base_reflects_parent_post_restack_revision() {
            let (h, _) = stacked_harness();
            h.vcs.add_commit("main");
            let mut cache = h.cache();

            assert_eq!(
                cache.restack_branch(&branch("a")).unwrap(),
                RestackResult::Done
            );
            let a_after = cache.revision(&branch("a")).unwrap().clone();
            assert_eq!(
                cache.restack_branch(&branch("b")).unwrap(),
                RestackResult::Done
            );
            assert_eq!(cache.base_revision(&branch("b")).unwrap(), a_after);
        }

        #[test]
        fn conflict_reports_new_base_and_leaves_cache_untouched() {
            let (h, _) = stacked_harness();
            let new_main = h.vcs.add_commit("main");
            h.vcs.conflict_on_rebase_of("a");
            let mut cache = h.cache();
            let old_fork = cache.base_revision(&branch("a")).unwrap();

            match cache.restack_branch(&branch("a")).unwrap() {
                RestackResult::Conflict {
                    rebased_branch_base,
                } => assert_eq!(rebased_branch_base, new_main),
                other => panic!("expected conflict, got {other:?}"),
            }
            // Fork point unchanged until the conflict resolves.
            assert_eq!(cache.base_revision(&branch("a")).unwrap(), old_fork);
        }

        #[test]
        fn continue_rebase_records_the_pending_base() {
            let (h, _) = stacked_harness();
            let new_main = h.vcs.add_commit("main");
            h.vcs.conflict_on_rebase_of("a");
            let mut cache = h.cache();

            let base = match cache.restack_branch(&branch("a")).unwrap() {
                RestackResult::Conflict {
                    rebased_branch_base,
                } => rebased_branch_base,
                other => panic!("expected conflict, got {other:?}"),
            };

            match cache.continue_rebase(base).unwrap() {
                ContinueResult::Done(name) => assert_eq!(name, branch("a")),
                ContinueResult::Conflict => panic!("expected the rebase to finish"),
            }
            assert_eq!(cache.base_revision(&branch("a")).unwrap(), new_main);
            assert!(cache.is_branch_fixed(&branch("a")).unwrap());
        }

        #[test]
        fn restack_restores_previous_checkout() {
            let (h, _) = stacked_harness();
            h.vcs.add_commit("main");
            let mut cache = h.cache();
            cache.checkout_branch(&branch("main")).unwrap();

            cache.restack_branch(&branch("a")).unwrap();
            assert_eq!(
                h.vcs.current_branch().unwrap(),
                Some(branch("main"))
            );
        }

        #[test]
        fn restack_of_untracked_branch_errors() {
            let h = Harness::new();
            let root = h.vcs.tip("main");
            h.vcs.create_branch_at("loose", &root);
            let mut cache = h.cache();
            assert!(matches!(
                cache.restack_branch(&branch("loose")),
                Err(CoreError::UntrackedBranch(_))
            ));
        }
    }

    mod commits {
        use super::*;

        #[test]
        fn commit_advances_cached_revision() {
            let (h, mut cache) = stacked_harness();
            cache.checkout_branch(&branch("b")).unwrap();
            let before = cache.revision(&branch("b")).unwrap().clone();

            h.vcs.set_staged_changes(true);
            cache.commit(&CommitOpts::default()).unwrap();
            assert_ne!(cache.revision(&branch("b")).unwrap(), &before);
        }

        #[test]
        fn squash_collapses_branch_to_one_commit() {
            let h = Harness::new();
            let mut cache = h.cache();
            cache.checkout_new_branch(&branch("s")).unwrap();
            h.vcs.add_commit("s");
            h.vcs.add_commit("s");
            let mut cache = h.cache();
            cache.checkout_branch(&branch("s")).unwrap();

            cache.squash_current_branch(&CommitOpts::default()).unwrap();
            assert_eq!(cache.commits_of(&branch("s")).unwrap().len(), 1);
        }

        #[test]
        fn failed_squash_amend_restores_branch_revision() {
            let h = Harness::new();
            let mut cache = h.cache();
            cache.checkout_new_branch(&branch("s")).unwrap();
            h.vcs.add_commit("s");
            let tip = h.vcs.add_commit("s");
            let mut cache = h.cache();
            cache.checkout_branch(&branch("s")).unwrap();

            h.vcs.fail_next_commit();
            assert!(cache.squash_current_branch(&CommitOpts::default()).is_err());
            assert_eq!(h.vcs.tip("s"), tip);
        }
    }

    mod predicates {
        use super::*;

        #[test]
        fn branch_with_no_own_commits_is_empty() {
            let (_h, mut cache) = stacked_harness();
            cache.checkout_branch(&branch("a")).unwrap();
            cache.checkout_new_branch(&branch("e")).unwrap();

            assert!(cache.is_branch_empty(&branch("e")).unwrap());
            assert!(!cache.is_branch_empty(&branch("a")).unwrap());
        }

        #[test]
        fn merge_detection_follows_trunk_history() {
            let (h, cache) = stacked_harness();
            assert!(!cache.is_merged_into_trunk(&branch("a")).unwrap());

            // Fast-forward trunk over a's commits.
            h.vcs.create_branch_at("main", &h.vcs.tip("a"));
            assert!(cache.is_merged_into_trunk(&branch("a")).unwrap());
            assert!(!cache.is_merged_into_trunk(&branch("b")).unwrap());
        }

        #[test]
        fn remote_match_tracks_pushes() {
            let (h, cache) = stacked_harness();
            assert!(!cache.branch_matches_remote(&branch("a")).unwrap());

            cache.push_branch(&branch("a"), false).unwrap();
            assert!(cache.branch_matches_remote(&branch("a")).unwrap());

            h.vcs.add_commit("a");
            let cache = h.cache();
            assert!(!cache.branch_matches_remote(&branch("a")).unwrap());
        }
    }

    mod interactive {
        use super::*;

        #[test]
        fn interactive_rebase_rewrites_commits_but_not_the_base() {
            let (_h, mut cache) = stacked_harness();
            let base = cache.base_revision(&branch("b")).unwrap();
            let before = cache.revision(&branch("b")).unwrap().clone();

            assert_eq!(
                cache.rebase_interactive(&branch("b")).unwrap(),
                RestackResult::Done
            );
            assert_eq!(cache.base_revision(&branch("b")).unwrap(), base);
            assert_ne!(cache.revision(&branch("b")).unwrap(), &before);
        }

        #[test]
        fn conflicted_interactive_rebase_reports_its_own_base() {
            let (h, mut cache) = stacked_harness();
            let base = cache.base_revision(&branch("b")).unwrap();
            h.vcs.conflict_on_rebase_of("b");

            assert_eq!(
                cache.rebase_interactive(&branch("b")).unwrap(),
                RestackResult::Conflict {
                    rebased_branch_base: base
                }
            );
        }
    }

    mod remote {
        use super::*;

        #[test]
        fn push_branch_publishes_the_local_tip() {
            let (h, _) = stacked_harness();
            h.vcs.create_branch_at("loose", &h.vcs.tip("main"));
            let cache = h.cache();

            cache.push_branch(&branch("a"), false).unwrap();
            assert_eq!(h.vcs.remote_tip("a"), Some(h.vcs.tip("a")));

            assert!(matches!(
                cache.push_branch(&branch("loose"), false),
                Err(CoreError::UntrackedBranch(_))
            ));
        }

        #[test]
        fn pull_trunk_restores_checkout_and_updates_revision() {
            let (h, mut cache) = stacked_harness();
            cache.checkout_branch(&branch("b")).unwrap();
            let remote_tip = h.vcs.orphan_commit(&h.vcs.tip("main"));
            h.vcs.set_remote_branch("main", &remote_tip);

            assert_eq!(cache.pull_trunk().unwrap(), PullResult::Done);
            assert_eq!(cache.revision(&branch("main")).unwrap(), &remote_tip);
            assert_eq!(h.vcs.current_branch().unwrap(), Some(branch("b")));

            assert_eq!(cache.pull_trunk().unwrap(), PullResult::Unneeded);
        }

        #[test]
        fn fetch_for_trunk_child_bases_on_merge_base() {
            let (h, cache) = stacked_harness();
            let main_tip = h.vcs.tip("main");
            let remote_tip = h.vcs.orphan_commit(&main_tip);
            h.vcs.set_remote_branch("x", &remote_tip);

            cache.fetch_branch(&branch("x"), &branch("main")).unwrap();
            assert_eq!(h.vcs.read_fetch_head().unwrap(), remote_tip);
            assert_eq!(h.vcs.read_fetch_base().unwrap(), main_tip);
        }

        #[test]
        fn chained_fetch_bases_on_previous_head() {
            let (h, mut cache) = stacked_harness();
            let main_tip = h.vcs.tip("main");
            let first = h.vcs.orphan_commit(&main_tip);
            let second = h.vcs.orphan_commit(&first);
            h.vcs.set_remote_branch("x", &first);
            h.vcs.set_remote_branch("y", &second);

            cache.fetch_branch(&branch("x"), &branch("main")).unwrap();
            cache
                .checkout_branch_from_fetched(&branch("x"), &branch("main"))
                .unwrap();
            cache.fetch_branch(&branch("y"), &branch("x")).unwrap();

            assert_eq!(h.vcs.read_fetch_head().unwrap(), second);
            assert_eq!(h.vcs.read_fetch_base().unwrap(), first);
        }

        #[test]
        fn checkout_from_fetched_creates_valid_branch() {
            let (h, mut cache) = stacked_harness();
            let main_tip = h.vcs.tip("main");
            let remote_tip = h.vcs.orphan_commit(&main_tip);
            h.vcs.set_remote_branch("x", &remote_tip);

            cache.fetch_branch(&branch("x"), &branch("main")).unwrap();
            cache
                .checkout_branch_from_fetched(&branch("x"), &branch("main"))
                .unwrap();

            assert!(cache.is_branch_tracked(&branch("x")).unwrap());
            assert_eq!(cache.revision(&branch("x")).unwrap(), &remote_tip);
            assert_eq!(cache.base_revision(&branch("x")).unwrap(), main_tip);
            assert_eq!(cache.current_branch(), Some(&branch("x")));
            assert!(cache.branch_matches_fetched(&branch("x")).unwrap());
        }
    }
}
