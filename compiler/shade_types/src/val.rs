//! Compile-time values used inside type arguments.

use crate::{DeclId, Subst, Type};

/// A compile-time integer value.
///
/// Either a known constant, or a symbolic reference to a generic value
/// parameter (or a specialization constant, which behaves the same way).
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum IntVal {
    Const(i64),
    /// Symbolic: the value of a generic value parameter.
    GenericParam(DeclId),
}

impl IntVal {
    /// The constant payload, if this value is known.
    pub fn as_const(&self) -> Option<i64> {
        match self {
            IntVal::Const(v) => Some(*v),
            IntVal::GenericParam(_) => None,
        }
    }

    /// Replace symbolic parameter references bound by `subst`.
    pub fn apply(&self, subst: &Subst) -> IntVal {
        match self {
            IntVal::Const(_) => self.clone(),
            IntVal::GenericParam(decl) => match subst.find(*decl) {
                Some(Val::Int(v)) => v.clone(),
                _ => self.clone(),
            },
        }
    }
}

/// A value appearing in a type-argument list: a type or an integer.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Val {
    Type(Type),
    Int(IntVal),
}

impl Val {
    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Val::Type(t) => Some(t),
            Val::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<&IntVal> {
        match self {
            Val::Int(v) => Some(v),
            Val::Type(_) => None,
        }
    }

    /// Apply a substitution to whichever kind of value this is.
    pub fn apply(&self, subst: &Subst) -> Val {
        match self {
            Val::Type(t) => Val::Type(t.apply(subst)),
            Val::Int(v) => Val::Int(v.apply(subst)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_values_compare_by_payload() {
        assert_eq!(IntVal::Const(3), IntVal::Const(3));
        assert_ne!(IntVal::Const(3), IntVal::Const(4));
        assert_ne!(IntVal::Const(3), IntVal::GenericParam(DeclId::new(0)));
    }
}
