//! User-facing output.

pub mod output;

pub use output::Verbosity;
