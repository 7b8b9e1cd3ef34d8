//! Statement nodes.

use shade_types::{DeclId, IntVal};

use crate::{ExprId, Span, StmtId};

#[derive(Clone, Debug)]
pub enum StmtKind {
    Block { stmts: Vec<StmtId> },
    /// A local declaration, checked in statement order.
    Decl { decl: DeclId },
    Expr { expr: ExprId },
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    While { cond: ExprId, body: StmtId },
    DoWhile { body: StmtId, cond: ExprId },
    /// Loop over a compile-time integer range; the bounds must fold.
    CompileTimeFor {
        var: DeclId,
        range_begin: Option<ExprId>,
        range_end: ExprId,
        begin_val: Option<IntVal>,
        end_val: Option<IntVal>,
        body: StmtId,
    },
    Switch { cond: ExprId, body: StmtId },
    /// `case expr:`; `host` is the enclosing switch once checked, nulled
    /// on a violation.
    Case { expr: ExprId, host: Option<StmtId> },
    Default { host: Option<StmtId> },
    Break { host: Option<StmtId> },
    Continue { host: Option<StmtId> },
    Return { expr: Option<ExprId> },
    Discard,
    Empty,
}

impl StmtKind {
    /// `break` may target this statement.
    pub fn is_breakable(&self) -> bool {
        self.is_loop() || matches!(self, StmtKind::Switch { .. })
    }

    /// `continue` may target this statement.
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            StmtKind::For { .. }
                | StmtKind::While { .. }
                | StmtKind::DoWhile { .. }
                | StmtKind::CompileTimeFor { .. }
        )
    }
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: Span) -> Self {
        Stmt { kind, loc }
    }
}
