//! engine::loader
//!
//! Builds the in-memory branch arena at process start.
//!
//! Every live branch gets a record. Classification per branch:
//! - the configured trunk is `Trunk`;
//! - no persisted entry, an entry without parent fields, or a parent that no
//!   longer exists as a branch, is `Untracked`;
//! - otherwise the recorded fork point is checked against the parent's
//!   current revision ([`classify_fork_point`]), yielding `Valid` (possibly
//!   with a repaired fork point) or `InvalidParent`.
//!
//! Children sets are derived by one full scan here; afterwards they are only
//! maintained incrementally by the cache's update funnel.

use std::collections::BTreeMap;

use crate::core::errors::CoreError;
use crate::core::types::{BranchName, Oid};
use crate::engine::cache::{BranchState, CachedBranch, TrackedMeta};
use crate::engine::meta::RefStore;
use crate::git::Vcs;

/// Decide whether a recorded fork point is still consistent with the
/// parent's current revision.
///
/// Returns the fork point to use when the relationship is sound (it may be
/// repaired forward), or `None` when the branch's metadata is stale beyond
/// repair:
/// 1. fork point equals the parent's current revision: valid, fixed.
/// 2. the parent's current revision is an ancestor of the branch: the branch
///    already contains the parent; valid with fork point advanced to it.
/// 3. the fork point is an ancestor of both the branch and the parent's
///    current revision: valid, pending restack.
/// 4. anything else: invalid.
pub(crate) fn classify_fork_point(
    vcs: &dyn Vcs,
    branch: &BranchName,
    fork_point: &Oid,
    parent_revision: &Oid,
) -> Result<Option<Oid>, CoreError> {
    if fork_point == parent_revision {
        return Ok(Some(fork_point.clone()));
    }
    if vcs.is_ancestor(parent_revision, branch.as_str())? {
        return Ok(Some(parent_revision.clone()));
    }
    if vcs.is_ancestor(fork_point, branch.as_str())?
        && vcs.is_ancestor(fork_point, parent_revision.as_str())?
    {
        return Ok(Some(fork_point.clone()));
    }
    Ok(None)
}

pub(crate) fn load_branches(
    vcs: &dyn Vcs,
    store: &dyn RefStore,
    trunk: &BranchName,
) -> Result<BTreeMap<BranchName, CachedBranch>, CoreError> {
    let live: BTreeMap<BranchName, Oid> = vcs.list_branches()?.into_iter().collect();
    let entries = store.list()?;

    let mut branches = BTreeMap::new();
    for (name, revision) in &live {
        let state = if name == trunk {
            BranchState::Trunk
        } else {
            match entries.get(name) {
                Some(entry) => classify_entry(vcs, name, entry, &live)?,
                None => BranchState::Untracked,
            }
        };
        branches.insert(
            name.clone(),
            CachedBranch {
                revision: revision.clone(),
                children: Default::default(),
                state,
            },
        );
    }

    let edges: Vec<(BranchName, BranchName)> = branches
        .iter()
        .filter_map(|(name, record)| {
            record
                .state
                .parent()
                .map(|parent| (parent.clone(), name.clone()))
        })
        .collect();
    for (parent, child) in edges {
        if let Some(record) = branches.get_mut(&parent) {
            record.children.insert(child);
        }
    }

    Ok(branches)
}

fn classify_entry(
    vcs: &dyn Vcs,
    name: &BranchName,
    entry: &crate::engine::meta::BranchEntry,
    live: &BTreeMap<BranchName, Oid>,
) -> Result<BranchState, CoreError> {
    let (Some(parent), Some(fork_point)) =
        (&entry.parent_branch_name, &entry.parent_branch_revision)
    else {
        return Ok(BranchState::Untracked);
    };
    if parent == name {
        return Ok(BranchState::Untracked);
    }
    let Some(parent_revision) = live.get(parent) else {
        return Ok(BranchState::Untracked);
    };

    let meta = |fork_point: Oid| TrackedMeta {
        parent: parent.clone(),
        fork_point,
        pr_info: entry.pr_info.clone(),
    };
    Ok(
        match classify_fork_point(vcs, name, fork_point, parent_revision)? {
            Some(repaired) => BranchState::Valid(meta(repaired)),
            None => BranchState::InvalidParent(meta(fork_point.clone())),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::meta::{BranchEntry, MemoryRefStore};
    use crate::git::fake::FakeVcs;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    #[test]
    fn branch_without_entry_is_untracked() {
        let vcs = FakeVcs::new();
        let root = vcs.init_trunk("main");
        vcs.create_branch_at("feature", &root);
        let store = MemoryRefStore::new();

        let branches = load_branches(&vcs, &store, &branch("main")).unwrap();
        assert!(matches!(branches[&branch("main")].state, BranchState::Trunk));
        assert!(matches!(
            branches[&branch("feature")].state,
            BranchState::Untracked
        ));
    }

    #[test]
    fn entry_with_missing_parent_branch_is_untracked() {
        let vcs = FakeVcs::new();
        let root = vcs.init_trunk("main");
        vcs.create_branch_at("feature", &root);
        let store = MemoryRefStore::new();
        store
            .write(
                &branch("feature"),
                &BranchEntry::new(branch("gone"), root, None),
            )
            .unwrap();

        let branches = load_branches(&vcs, &store, &branch("main")).unwrap();
        assert!(matches!(
            branches[&branch("feature")].state,
            BranchState::Untracked
        ));
    }

    #[test]
    fn consistent_entry_loads_valid_with_children_linked() {
        let vcs = FakeVcs::new();
        let root = vcs.init_trunk("main");
        vcs.create_branch_at("feature", &root);
        vcs.add_commit("feature");
        let store = MemoryRefStore::new();
        store
            .write(
                &branch("feature"),
                &BranchEntry::new(branch("main"), root, None),
            )
            .unwrap();

        let branches = load_branches(&vcs, &store, &branch("main")).unwrap();
        match &branches[&branch("feature")].state {
            BranchState::Valid(meta) => assert_eq!(meta.parent, branch("main")),
            other => panic!("expected Valid, got {other:?}"),
        }
        assert!(branches[&branch("main")].children.contains(&branch("feature")));
    }

    #[test]
    fn fork_point_repaired_when_parent_is_contained() {
        // feature was rebased onto main's tip outside this tool: main's
        // current revision is an ancestor of feature, but the stored fork
        // point is the old root.
        let vcs = FakeVcs::new();
        let root = vcs.init_trunk("main");
        let new_main = vcs.add_commit("main");
        vcs.create_branch_at("feature", &new_main);
        vcs.add_commit("feature");
        let store = MemoryRefStore::new();
        store
            .write(
                &branch("feature"),
                &BranchEntry::new(branch("main"), root, None),
            )
            .unwrap();

        let branches = load_branches(&vcs, &store, &branch("main")).unwrap();
        match &branches[&branch("feature")].state {
            BranchState::Valid(meta) => assert_eq!(meta.fork_point, new_main),
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_fork_point_is_invalid_parent() {
        let vcs = FakeVcs::new();
        let root = vcs.init_trunk("main");
        vcs.create_branch_at("feature", &root);
        vcs.add_commit("feature");
        // A fork point on a side lineage nothing descends from.
        let stray = vcs.orphan_commit(&root);
        let stray_fork = vcs.orphan_commit(&stray);
        let store = MemoryRefStore::new();
        store
            .write(
                &branch("feature"),
                &BranchEntry::new(branch("main"), stray_fork, None),
            )
            .unwrap();

        let branches = load_branches(&vcs, &store, &branch("main")).unwrap();
        assert!(matches!(
            branches[&branch("feature")].state,
            BranchState::InvalidParent(_)
        ));
    }
}
