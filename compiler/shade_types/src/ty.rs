//! The structural type representation.

use std::sync::Arc;

use crate::{DeclRef, IntVal, ScalarType, Subst, Val};

/// Parameter passing direction. `Out` and `InOut` both require an l-value
/// argument and are treated as equivalent for signature matching.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ParamDirection {
    #[default]
    In,
    Out,
    InOut,
}

impl ParamDirection {
    /// Whether the argument is written through.
    pub fn is_out(self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }
}

/// A parameter slot of a function type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FuncParam {
    pub ty: Type,
    pub direction: ParamDirection,
}

/// A type.
///
/// Equality is structural; the `Error` variant absorbs every operation so
/// that one failure does not cascade into follow-on diagnostics.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    /// One of the basic expression types (`void`, `bool`, `int`, ...).
    Scalar(ScalarType),
    /// Sentinel for failed checking.
    Error,
    /// A named type: declaration plus substitution chain.
    DeclRef(DeclRef),
    /// A reference to an *unapplied* generic declaration. Not a proper
    /// type; it is completed with default arguments before use.
    GenericDeclRef(DeclRef),
    /// `vector<elem, count>`.
    Vector { elem: Box<Type>, count: IntVal },
    /// `matrix<elem, rows, cols>`.
    Matrix { elem: Box<Type>, rows: IntVal, cols: IntVal },
    /// `elem[count]`; `count` is absent for unsized arrays.
    Array { elem: Box<Type>, count: Option<IntVal> },
    /// A type that wraps an element and is transparently dereferenced
    /// during member access (resource views and the like).
    PtrLike { elem: Box<Type> },
    /// The type of something callable.
    Func { params: Vec<FuncParam>, ret: Box<Type> },
    /// The type of an expression that itself names a type.
    TypeType(Box<Type>),
    /// The type given to a not-yet-resolved overloaded reference.
    Overloaded,
    /// The type given to an initializer list before a target type is known.
    InitializerList,
}

impl Type {
    #[inline]
    pub fn error() -> Type {
        Type::Error
    }

    #[inline]
    pub fn void() -> Type {
        Type::Scalar(ScalarType::Void)
    }

    #[inline]
    pub fn bool() -> Type {
        Type::Scalar(ScalarType::Bool)
    }

    #[inline]
    pub fn int() -> Type {
        Type::Scalar(ScalarType::Int)
    }

    #[inline]
    pub fn uint() -> Type {
        Type::Scalar(ScalarType::UInt)
    }

    #[inline]
    pub fn float() -> Type {
        Type::Scalar(ScalarType::Float)
    }

    pub fn vector(elem: Type, count: IntVal) -> Type {
        Type::Vector { elem: Box::new(elem), count }
    }

    pub fn array(elem: Type, count: Option<IntVal>) -> Type {
        Type::Array { elem: Box::new(elem), count }
    }

    pub fn type_type(inner: Type) -> Type {
        Type::TypeType(Box::new(inner))
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn as_scalar(&self) -> Option<ScalarType> {
        match self {
            Type::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_decl_ref(&self) -> Option<&DeclRef> {
        match self {
            Type::DeclRef(dr) => Some(dr),
            _ => None,
        }
    }

    /// The inner type when this expression names a type.
    pub fn as_type_type(&self) -> Option<&Type> {
        match self {
            Type::TypeType(inner) => Some(inner),
            _ => None,
        }
    }

    /// Replace generic-parameter references bound by `subst`, recursively.
    pub fn apply(&self, subst: &Subst) -> Type {
        match self {
            Type::Scalar(_) | Type::Error | Type::Overloaded | Type::InitializerList => self.clone(),
            Type::DeclRef(dr) => {
                // An unsubstituted reference may *be* a bound parameter.
                if dr.subst.is_none() {
                    if let Some(Val::Type(t)) = subst.find(dr.decl) {
                        return t.clone();
                    }
                }
                Type::DeclRef(DeclRef {
                    decl: dr.decl,
                    subst: dr.subst.as_ref().map(|s| Arc::new(s.apply(subst))),
                })
            }
            Type::GenericDeclRef(dr) => Type::GenericDeclRef(DeclRef {
                decl: dr.decl,
                subst: dr.subst.as_ref().map(|s| Arc::new(s.apply(subst))),
            }),
            Type::Vector { elem, count } => Type::Vector {
                elem: Box::new(elem.apply(subst)),
                count: count.apply(subst),
            },
            Type::Matrix { elem, rows, cols } => Type::Matrix {
                elem: Box::new(elem.apply(subst)),
                rows: rows.apply(subst),
                cols: cols.apply(subst),
            },
            Type::Array { elem, count } => Type::Array {
                elem: Box::new(elem.apply(subst)),
                count: count.as_ref().map(|c| c.apply(subst)),
            },
            Type::PtrLike { elem } => Type::PtrLike { elem: Box::new(elem.apply(subst)) },
            Type::Func { params, ret } => Type::Func {
                params: params
                    .iter()
                    .map(|p| FuncParam { ty: p.ty.apply(subst), direction: p.direction })
                    .collect(),
                ret: Box::new(ret.apply(subst)),
            },
            Type::TypeType(inner) => Type::type_type(inner.apply(subst)),
        }
    }

    /// Apply a whole substitution chain, outermost first.
    pub fn apply_chain(&self, subst: Option<&Arc<Subst>>) -> Type {
        let Some(subst) = subst else { return self.clone() };
        let applied = self.apply_chain(subst.outer.as_ref());
        applied.apply(subst)
    }
}

/// A type together with l-value status; every checked expression carries one.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct QualType {
    pub ty: Type,
    pub is_lvalue: bool,
}

impl QualType {
    /// An r-value of the given type.
    pub fn rvalue(ty: Type) -> QualType {
        QualType { ty, is_lvalue: false }
    }

    pub fn lvalue(ty: Type) -> QualType {
        QualType { ty, is_lvalue: true }
    }

    pub fn error() -> QualType {
        QualType::rvalue(Type::Error)
    }

    pub fn is_error(&self) -> bool {
        self.ty.is_error()
    }
}

impl From<Type> for QualType {
    fn from(ty: Type) -> QualType {
        QualType::rvalue(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeclId, SubstArg};

    fn d(i: u32) -> DeclId {
        DeclId::new(i)
    }

    #[test]
    fn equality_is_structural() {
        let a = Type::vector(Type::float(), IntVal::Const(3));
        let b = Type::vector(Type::float(), IntVal::Const(3));
        assert_eq!(a, b);
        assert_ne!(a, Type::vector(Type::float(), IntVal::Const(4)));
        assert_ne!(a, Type::vector(Type::int(), IntVal::Const(3)));
    }

    #[test]
    fn apply_substitutes_type_and_value_params() {
        // vector<T, N> with T := float, N := 3
        let t_param = d(10);
        let n_param = d(11);
        let generic = Type::Vector {
            elem: Box::new(Type::DeclRef(DeclRef::new(t_param))),
            count: IntVal::GenericParam(n_param),
        };
        let subst = Subst::new(
            d(9),
            vec![
                SubstArg { param: t_param, val: Val::Type(Type::float()) },
                SubstArg { param: n_param, val: Val::Int(IntVal::Const(3)) },
            ],
            None,
        );

        assert_eq!(generic.apply(&subst), Type::vector(Type::float(), IntVal::Const(3)));
    }

    #[test]
    fn apply_chain_preserves_outer_bindings() {
        let outer_param = d(1);
        let inner_param = d(2);
        let outer = Arc::new(Subst::new(
            d(0),
            vec![SubstArg { param: outer_param, val: Val::Type(Type::int()) }],
            None,
        ));
        let inner = Arc::new(Subst::new(
            d(3),
            vec![SubstArg { param: inner_param, val: Val::Type(Type::float()) }],
            Some(outer),
        ));

        let ty = Type::Array {
            elem: Box::new(Type::DeclRef(DeclRef::new(outer_param))),
            count: None,
        };
        assert_eq!(ty.apply_chain(Some(&inner)), Type::array(Type::int(), None));
    }
}
