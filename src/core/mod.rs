//! Core domain types and repository-scoped plumbing.

pub mod config;
pub mod errors;
pub mod lock;
pub mod paths;
pub mod types;

pub use config::RepoConfig;
pub use errors::CoreError;
pub use lock::RepoLock;
pub use paths::BraidPaths;
pub use types::{BranchName, Oid, RefName};
