//! Shade AST.
//!
//! Data structures shared between the parser and the semantic checker:
//! spans, interned names, declarations, expressions, statements, modifier
//! lists, lexical scopes, and the arena that owns all of them.
//!
//! # Design
//!
//! - **Intern everything**: identifiers become [`Name`] (a `u32`).
//! - **Flatten everything**: nodes reference children through `u32` ids
//!   ([`ExprId`], [`StmtId`], [`shade_types::DeclId`]) into one
//!   [`AstArena`], never through boxes, so the checker can rewrite a child
//!   slot without touching the rest of the tree.
//! - Expressions carry a reserved type slot (`Option<QualType>`) that is
//!   `None` until checking attaches a type; node identity is preserved
//!   through checking.

mod arena;
mod ids;
mod interner;
pub mod lookup;
mod name;
mod scope;
mod span;

pub mod ast;

pub use arena::AstArena;
pub use ids::{ExprId, StmtId};
pub use interner::{SharedInterner, StringInterner};
pub use name::Name;
pub use scope::{Scope, ScopeId};
pub use span::Span;

pub use ast::{
    AccessorKind, AggData, CheckState, CtorData, Decl, DeclKind, Expr, ExprKind, ExtensionData,
    FuncData, GenericConstraintData, GenericData, GenericTypeParamData, ImportData,
    InheritanceData, InvokeStyle, MagicKind, Members, Modifier, ModuleData, ParamData, Stmt,
    StmtKind, SubscriptData, TypeDefData, TypeExpr, VarData,
};
