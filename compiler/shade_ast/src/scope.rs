//! Lexical scopes.

use std::fmt;

use shade_types::DeclId;

/// Index of a scope in the arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        ScopeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// One link in the lookup chain.
///
/// Name lookup walks every sibling at one level before moving to the
/// parent; importing a module splices its scope in as a sibling of the
/// importing module's scope.
#[derive(Clone, Debug)]
pub struct Scope {
    /// The container declaration whose members this scope exposes.
    pub container: Option<DeclId>,
    pub parent: Option<ScopeId>,
    pub next_sibling: Option<ScopeId>,
}

impl Scope {
    pub fn new(container: Option<DeclId>, parent: Option<ScopeId>) -> Self {
        Scope { container, parent, next_sibling: None }
    }
}
