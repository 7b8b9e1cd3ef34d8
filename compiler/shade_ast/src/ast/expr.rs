//! Expression nodes.

use shade_types::{DeclRef, QualType, Type};

use crate::lookup::LookupResult;
use crate::{ExprId, Name, ScopeId, Span};

/// How a call site was written. Operator declarations carry matching
/// prefix/postfix modifiers that overload resolution checks against this.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InvokeStyle {
    Call,
    PrefixOp,
    PostfixOp,
    /// `T(x)` — checked like any other call so that casts and constructor
    /// calls stay semantically equivalent.
    Cast,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    /// A bare name, resolved against `scope` during checking.
    Var {
        name: Name,
        scope: ScopeId,
        decl: Option<DeclRef>,
    },
    /// `base.name` as parsed; checking replaces it with a resolved member
    /// reference, swizzle, or static member access.
    Member {
        base: ExprId,
        name: Name,
        decl: Option<DeclRef>,
    },
    /// Member access on a type-valued base, produced by checking.
    StaticMember {
        base: ExprId,
        name: Name,
        decl: Option<DeclRef>,
    },
    /// Implicit dereference of a pointer-like base, produced by checking.
    Deref { base: ExprId },
    /// Vector component selection, produced by checking.
    Swizzle { base: ExprId, elements: Vec<u8> },
    Paren { base: ExprId },
    Invoke {
        callee: ExprId,
        args: Vec<ExprId>,
        style: InvokeStyle,
    },
    /// `base<args...>`.
    GenericApp { base: ExprId, args: Vec<ExprId> },
    /// `base[index]`; `index` is absent for `T[]` unsized array types.
    Index { base: ExprId, index: Option<ExprId> },
    InitializerList { args: Vec<ExprId> },
    Assign { left: ExprId, right: ExprId },
    /// A compiler-inserted conversion; the target type is this node's own
    /// type slot.
    ImplicitCast { arg: ExprId },
    /// A compiler-synthesized reference to a known type.
    TypeRef { ty: Type },
    /// An unresolved overloaded reference (internal, never in input).
    Overloaded {
        base: Option<ExprId>,
        lookup: LookupResult,
    },
}

/// An expression node. `ty` is `None` until checking attaches a type;
/// every checked expression has `Some`, with `error` marking failure.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: Span,
    pub ty: Option<QualType>,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: Span) -> Self {
        Expr { kind, loc, ty: None }
    }

    /// The checked type, or `error` if checking has not attached one.
    pub fn qual_type(&self) -> QualType {
        self.ty.clone().unwrap_or_else(QualType::error)
    }

    pub fn type_or_error(&self) -> Type {
        self.ty.as_ref().map(|q| q.ty.clone()).unwrap_or(Type::Error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.ty, Some(ref q) if q.is_error())
    }
}
