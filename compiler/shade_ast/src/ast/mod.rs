//! AST node definitions.

mod decl;
mod expr;
mod modifier;
mod stmt;

pub use decl::{
    AccessorKind, AggData, CheckState, CtorData, Decl, DeclKind, ExtensionData, FuncData,
    GenericConstraintData, GenericData, GenericTypeParamData, ImportData, InheritanceData,
    Members, ModuleData, ParamData, SubscriptData, TypeDefData, TypeExpr, VarData,
};
pub use expr::{Expr, ExprKind, InvokeStyle};
pub use modifier::{MagicKind, Modifier};
pub use stmt::{Stmt, StmtKind};
