//! Name-lookup result structures.
//!
//! The resolution algorithm lives in the checker; these are the shapes it
//! produces. Breadcrumbs record the implicit member/dereference steps that
//! lookup took so the expression builder can replay them when it turns a
//! result into nested access expressions.

use std::sync::Arc;

use shade_types::DeclRef;

use crate::{AstArena, DeclKind};

/// One recorded intermediate step in a lookup path.
#[derive(Clone, Debug)]
pub enum Breadcrumb {
    /// An implicit member access through `decl_ref`.
    Member {
        decl_ref: DeclRef,
        next: Option<Arc<Breadcrumb>>,
    },
    /// An implicit dereference of a pointer-like base.
    Deref { next: Option<Arc<Breadcrumb>> },
}

impl Breadcrumb {
    pub fn next(&self) -> Option<&Arc<Breadcrumb>> {
        match self {
            Breadcrumb::Member { next, .. } | Breadcrumb::Deref { next } => next.as_ref(),
        }
    }
}

/// A single declaration found by lookup, plus the path to reach it.
#[derive(Clone, Debug)]
pub struct LookupResultItem {
    pub decl_ref: DeclRef,
    pub breadcrumbs: Option<Arc<Breadcrumb>>,
}

impl LookupResultItem {
    pub fn new(decl_ref: DeclRef) -> Self {
        LookupResultItem { decl_ref, breadcrumbs: None }
    }
}

/// The outcome of a name lookup: empty, a single item, or an overloaded
/// set of items in the order they were found.
#[derive(Clone, Debug, Default)]
pub struct LookupResult {
    pub items: Vec<LookupResultItem>,
}

impl LookupResult {
    pub fn empty() -> Self {
        LookupResult { items: Vec::new() }
    }

    pub fn from_item(item: LookupResultItem) -> Self {
        LookupResult { items: vec![item] }
    }

    pub fn is_valid(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn is_overloaded(&self) -> bool {
        self.items.len() > 1
    }

    /// The unique item, when there is exactly one.
    pub fn single(&self) -> Option<&LookupResultItem> {
        match self.items.as_slice() {
            [item] => Some(item),
            _ => None,
        }
    }

    pub fn add(&mut self, item: LookupResultItem) {
        self.items.push(item);
    }
}

/// The category of declaration a use site expects.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LookupMask {
    Any,
    /// Something usable in type position.
    Type,
    /// A value (variable, field, parameter).
    Value,
    /// Something callable.
    Function,
}

impl LookupMask {
    /// Does `decl` fall in this category? Generics are classified by their
    /// inner declaration.
    pub fn admits(self, arena: &AstArena, decl: shade_types::DeclId) -> bool {
        let decl = match &arena.decl(decl).kind {
            DeclKind::Generic(g) => arena.decl(g.inner),
            other_kind => {
                return self.admits_kind(other_kind);
            }
        };
        self.admits_kind(&decl.kind)
    }

    fn admits_kind(self, kind: &DeclKind) -> bool {
        match self {
            LookupMask::Any => true,
            LookupMask::Type => matches!(
                kind,
                DeclKind::Struct(_)
                    | DeclKind::Class(_)
                    | DeclKind::Interface(_)
                    | DeclKind::TypeDef(_)
                    | DeclKind::GenericTypeParam(_)
            ),
            LookupMask::Value => matches!(
                kind,
                DeclKind::Variable(_)
                    | DeclKind::Field(_)
                    | DeclKind::Param(_)
                    | DeclKind::GenericValueParam(_)
            ),
            LookupMask::Function => matches!(
                kind,
                DeclKind::Func(_) | DeclKind::Constructor(_) | DeclKind::Subscript(_)
            ),
        }
    }
}

/// Keep only the items the mask admits.
pub fn refine_lookup(arena: &AstArena, result: &LookupResult, mask: LookupMask) -> LookupResult {
    LookupResult {
        items: result
            .items
            .iter()
            .filter(|item| mask.admits(arena, item.decl_ref.decl))
            .cloned()
            .collect(),
    }
}
