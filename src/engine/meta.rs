//! engine::meta
//!
//! Durable branch metadata.
//!
//! Each tracked branch has one entry, stored as a JSON blob behind
//! `refs/branch-metadata/<branch>`. The blob records the branch's parent
//! pointer, the fork point (the parent revision the branch was last based
//! on), and optional pull-request info that the engine carries around but
//! never interprets.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::types::{BranchName, Oid};
use crate::git::{GitError, Vcs};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("metadata for '{branch}' is not valid JSON: {source}")]
    Corrupt {
        branch: BranchName,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize metadata for '{branch}': {source}")]
    Serialize {
        branch: BranchName,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Pull-request details attached to a branch. The engine passes this through
/// unmodified; unrecognized keys survive a read-modify-write cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PrInfo {
    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.state.is_none() && self.url.is_none() && self.extra.is_empty()
    }

    /// Shallow-merge `other` into `self`; fields present in `other` win.
    pub fn merge_from(&mut self, other: PrInfo) {
        if other.number.is_some() {
            self.number = other.number;
        }
        if other.state.is_some() {
            self.state = other.state;
        }
        if other.url.is_some() {
            self.url = other.url;
        }
        self.extra.extend(other.extra);
    }
}

/// One persisted metadata entry.
///
/// The parent fields are optional on the wire: an entry written by an older
/// tool version (or a branch whose parent was since deleted) still
/// deserializes, and the loader classifies it instead of erroring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_branch_name: Option<BranchName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_branch_revision: Option<Oid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_info: Option<PrInfo>,
}

impl BranchEntry {
    pub fn new(parent: BranchName, fork_point: Oid, pr_info: Option<PrInfo>) -> Self {
        Self {
            parent_branch_name: Some(parent),
            parent_branch_revision: Some(fork_point),
            pr_info,
        }
    }
}

/// Durable branch-name -> entry mapping.
pub trait RefStore {
    fn list(&self) -> Result<BTreeMap<BranchName, BranchEntry>, StoreError>;
    fn read(&self, branch: &BranchName) -> Result<Option<BranchEntry>, StoreError>;
    fn write(&self, branch: &BranchName, entry: &BranchEntry) -> Result<(), StoreError>;
    fn delete(&self, branch: &BranchName) -> Result<(), StoreError>;
}

/// Production store: JSON blobs behind metadata refs, via the [`Vcs`] seam.
pub struct GitRefStore {
    vcs: Rc<dyn Vcs>,
}

impl GitRefStore {
    pub fn new(vcs: Rc<dyn Vcs>) -> Self {
        Self { vcs }
    }

    fn parse(branch: &BranchName, json: &str) -> Result<BranchEntry, StoreError> {
        serde_json::from_str(json).map_err(|source| StoreError::Corrupt {
            branch: branch.clone(),
            source,
        })
    }
}

impl RefStore for GitRefStore {
    fn list(&self) -> Result<BTreeMap<BranchName, BranchEntry>, StoreError> {
        let mut entries = BTreeMap::new();
        for branch in self.vcs.list_metadata_refs()? {
            if let Some(json) = self.vcs.read_metadata_blob(&branch)? {
                entries.insert(branch.clone(), Self::parse(&branch, &json)?);
            }
        }
        Ok(entries)
    }

    fn read(&self, branch: &BranchName) -> Result<Option<BranchEntry>, StoreError> {
        match self.vcs.read_metadata_blob(branch)? {
            Some(json) => Ok(Some(Self::parse(branch, &json)?)),
            None => Ok(None),
        }
    }

    fn write(&self, branch: &BranchName, entry: &BranchEntry) -> Result<(), StoreError> {
        let json = serde_json::to_string(entry).map_err(|source| StoreError::Serialize {
            branch: branch.clone(),
            source,
        })?;
        self.vcs.write_metadata_blob(branch, &json)?;
        Ok(())
    }

    fn delete(&self, branch: &BranchName) -> Result<(), StoreError> {
        self.vcs.delete_metadata_ref(branch)?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryRefStore {
    entries: RefCell<BTreeMap<BranchName, BranchEntry>>,
}

impl MemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for MemoryRefStore {
    fn list(&self) -> Result<BTreeMap<BranchName, BranchEntry>, StoreError> {
        Ok(self.entries.borrow().clone())
    }

    fn read(&self, branch: &BranchName) -> Result<Option<BranchEntry>, StoreError> {
        Ok(self.entries.borrow().get(branch).cloned())
    }

    fn write(&self, branch: &BranchName, entry: &BranchEntry) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(branch.clone(), entry.clone());
        Ok(())
    }

    fn delete(&self, branch: &BranchName) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(branch);
        Ok(())
    }
}
