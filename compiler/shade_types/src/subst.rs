//! Substitution chains and declaration references.

use std::sync::Arc;

use crate::{DeclId, Val};

/// One bound generic parameter.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SubstArg {
    /// The generic type- or value-parameter declaration being bound.
    pub param: DeclId,
    /// The value it is bound to.
    pub val: Val,
}

/// A binding of one generic declaration's parameters to arguments.
///
/// Substitutions form an outer-to-inner chain: when an inner scope adds
/// parameters, the outer bindings are preserved through `outer`. The chain
/// is immutable and the tail is shared between sibling references.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Subst {
    /// The generic declaration whose parameters are bound here.
    pub generic: DeclId,
    /// Bindings in parameter declaration order.
    pub args: Vec<SubstArg>,
    /// Bindings contributed by enclosing generics.
    pub outer: Option<Arc<Subst>>,
}

impl Subst {
    pub fn new(generic: DeclId, args: Vec<SubstArg>, outer: Option<Arc<Subst>>) -> Self {
        Subst { generic, args, outer }
    }

    /// Look up the value bound to `param` anywhere in the chain.
    pub fn find(&self, param: DeclId) -> Option<&Val> {
        for arg in &self.args {
            if arg.param == param {
                return Some(&arg.val);
            }
        }
        self.outer.as_deref().and_then(|outer| outer.find(param))
    }

    /// Rewrite every bound value with a further substitution.
    pub fn apply(&self, subst: &Subst) -> Subst {
        Subst {
            generic: self.generic,
            args: self
                .args
                .iter()
                .map(|arg| SubstArg { param: arg.param, val: arg.val.apply(subst) })
                .collect(),
            outer: self.outer.as_ref().map(|outer| Arc::new(outer.apply(subst))),
        }
    }
}

/// A reference to a declaration together with the substitutions that apply
/// to it. The canonical form of every named type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct DeclRef {
    pub decl: DeclId,
    pub subst: Option<Arc<Subst>>,
}

impl DeclRef {
    pub fn new(decl: DeclId) -> Self {
        DeclRef { decl, subst: None }
    }

    pub fn with_subst(decl: DeclId, subst: Arc<Subst>) -> Self {
        DeclRef { decl, subst: Some(subst) }
    }

    /// A reference to `member` seen through this reference's substitutions.
    pub fn member(&self, member: DeclId) -> DeclRef {
        DeclRef { decl: member, subst: self.subst.clone() }
    }
}
