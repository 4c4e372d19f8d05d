//! Braid - stacked branch management for Git
//!
//! Braid is a single-binary tool (`bd`) for working with stacks of dependent
//! branches: branches chained parent→child, where each child is rebased onto
//! its parent whenever the parent's content changes.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to handlers)
//! - [`session`] - Per-invocation setup: repository discovery, config, lock
//! - [`engine`] - The metadata cache, restack/sync flows, and continuations
//! - [`core`] - Domain types, configuration, paths, errors, locking
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - Output utilities
//!
//! # Correctness Invariants
//!
//! 1. Every metadata mutation flows through the cache's single write funnel
//! 2. Only one braid process mutates a repository at a time
//! 3. A conflict always leaves a durable continuation record behind before
//!    the process exits

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod session;
pub mod ui;
