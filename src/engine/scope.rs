//! engine::scope
//!
//! Scope selectors for bulk operations over a stack.

/// Which branches, relative to a starting branch, a bulk operation covers.
///
/// The resulting list is always ordered parent-before-child; trunk is only
/// included when the starting branch is trunk itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeSpec {
    pub recursive_parents: bool,
    pub current_branch: bool,
    pub recursive_children: bool,
}

impl ScopeSpec {
    /// Ancestors, the branch itself, and all descendants.
    pub const STACK: Self = Self {
        recursive_parents: true,
        current_branch: true,
        recursive_children: true,
    };

    /// The branch itself and all descendants.
    pub const UPSTACK: Self = Self {
        recursive_parents: false,
        current_branch: true,
        recursive_children: true,
    };

    /// Descendants only.
    pub const UPSTACK_EXCLUSIVE: Self = Self {
        recursive_parents: false,
        current_branch: false,
        recursive_children: true,
    };

    /// Ancestors and the branch itself.
    pub const DOWNSTACK: Self = Self {
        recursive_parents: true,
        current_branch: true,
        recursive_children: false,
    };
}
