//! Declaration nodes.

use rustc_hash::FxHashMap;

use shade_types::{DeclId, ParamDirection, ScalarType, Type};

use crate::{ExprId, MagicKind, Modifier, Name, ScopeId, Span, StmtId};

/// How far checking has progressed on a declaration.
///
/// The ordering matters: `ensure_decl` early-exits when the current state
/// already satisfies the request, and re-entering a declaration that sits
/// at `CheckingHeader` is the circularity signal.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug, Default)]
pub enum CheckState {
    #[default]
    Unchecked,
    CheckingHeader,
    CheckedHeader,
    Checked,
}

/// A checkable type expression: the parsed expression, and the type it
/// resolved to once checked. A `TypeExpr` whose `ty` is already set is
/// not re-checked (checking is idempotent).
#[derive(Clone, Debug, Default)]
pub struct TypeExpr {
    pub expr: Option<ExprId>,
    pub ty: Option<Type>,
}

impl TypeExpr {
    pub fn none() -> Self {
        TypeExpr::default()
    }

    pub fn from_expr(expr: ExprId) -> Self {
        TypeExpr { expr: Some(expr), ty: None }
    }

    /// A type expression synthesized by the compiler, already resolved.
    pub fn resolved(ty: Type) -> Self {
        TypeExpr { expr: None, ty: Some(ty) }
    }

    pub fn is_present(&self) -> bool {
        self.expr.is_some() || self.ty.is_some()
    }

    /// The checked type, or `error` when checking failed or never ran.
    pub fn ty_or_error(&self) -> Type {
        self.ty.clone().unwrap_or(Type::Error)
    }
}

/// Ordered member list of a container declaration, with a lazily built
/// name index used for overload scanning.
#[derive(Clone, Debug, Default)]
pub struct Members {
    pub decls: Vec<DeclId>,
    pub(crate) index: Option<FxHashMap<Name, Vec<DeclId>>>,
}

impl Members {
    pub fn new() -> Self {
        Members::default()
    }

    pub fn push(&mut self, decl: DeclId) {
        self.decls.push(decl);
        // Any edit invalidates the name index.
        self.index = None;
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModuleData {
    pub members: Members,
    /// This module's own scope; imports splice sibling scopes onto it.
    pub scope: Option<ScopeId>,
}

#[derive(Clone, Debug)]
pub struct ImportData {
    pub module_name: Name,
    /// The scope the import splices into.
    pub scope: ScopeId,
    /// Filled once the loader resolves the module.
    pub imported: Option<DeclId>,
}

#[derive(Clone, Debug)]
pub struct TypeDefData {
    pub target: TypeExpr,
}

/// Struct, class, or interface body.
#[derive(Clone, Debug, Default)]
pub struct AggData {
    pub members: Members,
    /// Extensions that target this type. Prepended during checking, so
    /// the list observes extensions in reverse declaration order.
    pub candidate_extensions: Vec<DeclId>,
}

/// Common payload of anything variable-like (variables, fields, generic
/// value parameters).
#[derive(Clone, Debug, Default)]
pub struct VarData {
    pub ty: TypeExpr,
    pub init: Option<ExprId>,
}

#[derive(Clone, Debug)]
pub struct ParamData {
    pub var: VarData,
    pub direction: ParamDirection,
}

#[derive(Clone, Debug, Default)]
pub struct FuncData {
    /// Parameters and body-local declarations, in order.
    pub members: Members,
    pub return_ty: TypeExpr,
    pub body: Option<StmtId>,
}

#[derive(Clone, Debug, Default)]
pub struct CtorData {
    pub members: Members,
    pub body: Option<StmtId>,
}

#[derive(Clone, Debug, Default)]
pub struct SubscriptData {
    /// Parameters and accessors.
    pub members: Members,
    pub return_ty: TypeExpr,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AccessorKind {
    Getter,
    Setter,
}

/// A generic wrapper: parameter members plus the inner declaration.
#[derive(Clone, Debug)]
pub struct GenericData {
    pub members: Members,
    pub inner: DeclId,
}

#[derive(Clone, Debug, Default)]
pub struct GenericTypeParamData {
    /// Default argument, when present.
    pub default: TypeExpr,
}

#[derive(Clone, Debug)]
pub struct InheritanceData {
    pub base: TypeExpr,
}

#[derive(Clone, Debug)]
pub struct ExtensionData {
    pub target: TypeExpr,
    pub members: Members,
}

/// Generic constraint: `sub` must conform to `sup`.
#[derive(Clone, Debug)]
pub struct GenericConstraintData {
    pub sub: TypeExpr,
    pub sup: TypeExpr,
}

#[derive(Clone, Debug)]
pub enum DeclKind {
    Module(ModuleData),
    Import(ImportData),
    TypeDef(TypeDefData),
    Struct(AggData),
    Class(AggData),
    Interface(AggData),
    Field(VarData),
    Variable(VarData),
    Param(ParamData),
    Func(FuncData),
    Constructor(CtorData),
    Subscript(SubscriptData),
    Accessor(AccessorKind),
    Generic(GenericData),
    GenericTypeParam(GenericTypeParamData),
    GenericValueParam(VarData),
    GenericConstraint(GenericConstraintData),
    Extension(ExtensionData),
    Inheritance(InheritanceData),
    Empty,
}

impl DeclKind {
    /// Member list, for container declarations.
    pub fn members(&self) -> Option<&Members> {
        match self {
            DeclKind::Module(d) => Some(&d.members),
            DeclKind::Struct(d) | DeclKind::Class(d) | DeclKind::Interface(d) => Some(&d.members),
            DeclKind::Func(d) => Some(&d.members),
            DeclKind::Constructor(d) => Some(&d.members),
            DeclKind::Subscript(d) => Some(&d.members),
            DeclKind::Generic(d) => Some(&d.members),
            DeclKind::Extension(d) => Some(&d.members),
            _ => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Members> {
        match self {
            DeclKind::Module(d) => Some(&mut d.members),
            DeclKind::Struct(d) | DeclKind::Class(d) | DeclKind::Interface(d) => {
                Some(&mut d.members)
            }
            DeclKind::Func(d) => Some(&mut d.members),
            DeclKind::Constructor(d) => Some(&mut d.members),
            DeclKind::Subscript(d) => Some(&mut d.members),
            DeclKind::Generic(d) => Some(&mut d.members),
            DeclKind::Extension(d) => Some(&mut d.members),
            _ => None,
        }
    }

    /// Struct/class/interface payload, for types that can hold members,
    /// constructors, and candidate extensions.
    pub fn as_agg(&self) -> Option<&AggData> {
        match self {
            DeclKind::Struct(d) | DeclKind::Class(d) | DeclKind::Interface(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_agg_mut(&mut self) -> Option<&mut AggData> {
        match self {
            DeclKind::Struct(d) | DeclKind::Class(d) | DeclKind::Interface(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            DeclKind::Func(_) | DeclKind::Constructor(_) | DeclKind::Subscript(_)
        )
    }
}

/// A named program entity.
#[derive(Clone, Debug)]
pub struct Decl {
    pub name: Name,
    pub loc: Span,
    pub parent: Option<DeclId>,
    pub state: CheckState,
    pub modifiers: Vec<Modifier>,
    pub kind: DeclKind,
}

impl Decl {
    pub fn new(name: Name, kind: DeclKind) -> Self {
        Decl {
            name,
            loc: Span::DUMMY,
            parent: None,
            state: CheckState::Unchecked,
            modifiers: Vec::new(),
            kind,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn is_checked(&self, state: CheckState) -> bool {
        self.state >= state
    }

    pub fn has_modifier(&self, pred: impl Fn(&Modifier) -> bool) -> bool {
        self.modifiers.iter().any(pred)
    }

    pub fn builtin_scalar(&self) -> Option<ScalarType> {
        self.modifiers.iter().find_map(|m| match m {
            Modifier::BuiltinScalar(s) => Some(*s),
            _ => None,
        })
    }

    pub fn magic_kind(&self) -> Option<MagicKind> {
        self.modifiers.iter().find_map(|m| match m {
            Modifier::Magic(k) => Some(*k),
            _ => None,
        })
    }

    pub fn implicit_conversion_cost(&self) -> Option<shade_types::ConversionCost> {
        self.modifiers.iter().find_map(Modifier::implicit_conversion_cost)
    }

    pub fn is_static(&self) -> bool {
        self.has_modifier(|m| matches!(m, Modifier::Static))
    }

    pub fn is_const(&self) -> bool {
        self.has_modifier(|m| matches!(m, Modifier::Const))
    }

    pub fn constant_id(&self) -> Option<u32> {
        self.modifiers.iter().find_map(|m| match m {
            Modifier::ConstantId(id) => Some(*id),
            _ => None,
        })
    }

    pub fn is_intrinsic_op(&self) -> bool {
        self.has_modifier(|m| matches!(m, Modifier::IntrinsicOp))
    }
}
