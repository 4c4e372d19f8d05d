//! The stack engine: the metadata cache, its persistence, and the flows
//! built on top of it (restack queues, remote sync, cross-process
//! continuations).

pub mod cache;
pub mod continuation;
pub mod loader;
pub mod meta;
pub mod restack;
pub mod scope;
pub mod sync;

pub use cache::{BranchState, CachedBranch, ContinueResult, MetaCache, PullResult, RestackResult, TrackedMeta};
pub use continuation::{ContinuationData, ContinueStore};
pub use meta::{BranchEntry, GitRefStore, MemoryRefStore, PrInfo, RefStore};
pub use scope::ScopeSpec;
