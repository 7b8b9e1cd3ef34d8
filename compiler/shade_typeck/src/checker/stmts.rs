//! Statement checking.
//!
//! A stack of lexically enclosing statements gives `break`, `continue`,
//! `case`, and `default` their hosts; every predicate coerces to `bool`;
//! `return` coerces to the enclosing function's return type.

use shade_ast::{CheckState, DeclKind, ExprId, Modifier, StmtId, StmtKind, TypeExpr};
use shade_diagnostic::{Diagnostic, ErrorCode};
use shade_types::{IntVal, ScalarType, Type};

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;

impl SemanticsVisitor<'_> {
    fn push_outer_stmt(&mut self, stmt: StmtId) {
        self.outer_stmts.push(stmt);
    }

    fn pop_outer_stmt(&mut self) {
        self.outer_stmts.pop();
    }

    /// The innermost enclosing statement matching `pred`.
    fn find_outer_stmt(&self, pred: impl Fn(&StmtKind) -> bool) -> Option<StmtId> {
        self.outer_stmts
            .iter()
            .rev()
            .copied()
            .find(|&s| pred(&self.arena.stmt(s).kind))
    }

    fn set_stmt_kind(&mut self, stmt: StmtId, kind: StmtKind) {
        self.arena.stmt_mut(stmt).kind = kind;
    }

    /// A predicate expression coerces to `bool`.
    fn check_predicate_expr(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        let checked = self.check_term(expr)?;
        self.coerce(&Type::bool(), checked)
    }

    pub(crate) fn check_stmt(&mut self, stmt: StmtId) -> CheckResult<()> {
        match self.arena.stmt(stmt).kind.clone() {
            StmtKind::Block { stmts } => {
                for s in stmts {
                    self.check_stmt(s)?;
                }
            }
            StmtKind::Decl { decl } => {
                // Local declarations check in statement order by direct
                // dispatch; a local is not visible before its statement.
                self.check_decl_dispatch(decl)?;
                if self.arena.decl(decl).state < CheckState::Checked {
                    self.arena.decl_mut(decl).state = CheckState::Checked;
                }
            }
            StmtKind::Expr { expr } => {
                let expr = self.check_expr(expr)?;
                self.set_stmt_kind(stmt, StmtKind::Expr { expr });
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                let cond = self.check_predicate_expr(cond)?;
                self.set_stmt_kind(stmt, StmtKind::If { cond, then_branch, else_branch });
                self.check_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch)?;
                }
            }
            StmtKind::For { init, cond, step, body } => {
                self.push_outer_stmt(stmt);
                if let Some(init) = init {
                    self.check_stmt(init)?;
                }
                let cond = match cond {
                    Some(c) => Some(self.check_predicate_expr(c)?),
                    None => None,
                };
                let step = match step {
                    Some(s) => Some(self.check_expr(s)?),
                    None => None,
                };
                self.set_stmt_kind(stmt, StmtKind::For { init, cond, step, body });
                self.check_stmt(body)?;
                self.pop_outer_stmt();
            }
            StmtKind::While { cond, body } => {
                self.push_outer_stmt(stmt);
                let cond = self.check_predicate_expr(cond)?;
                self.set_stmt_kind(stmt, StmtKind::While { cond, body });
                self.check_stmt(body)?;
                self.pop_outer_stmt();
            }
            StmtKind::DoWhile { body, cond } => {
                self.push_outer_stmt(stmt);
                let cond = self.check_predicate_expr(cond)?;
                self.set_stmt_kind(stmt, StmtKind::DoWhile { body, cond });
                self.check_stmt(body)?;
                self.pop_outer_stmt();
            }
            StmtKind::CompileTimeFor { var, range_begin, range_end, body, .. } => {
                self.check_compile_time_for(stmt, var, range_begin, range_end, body)?;
            }
            StmtKind::Switch { cond, body } => {
                self.push_outer_stmt(stmt);
                let cond = self.check_expr(cond)?;
                self.set_stmt_kind(stmt, StmtKind::Switch { cond, body });
                self.check_stmt(body)?;
                self.pop_outer_stmt();
            }
            StmtKind::Case { expr, .. } => {
                let expr = self.check_expr(expr)?;
                let host = self.find_outer_stmt(|k| matches!(k, StmtKind::Switch { .. }));
                if host.is_none() {
                    let loc = self.arena.stmt(stmt).loc;
                    self.diagnose(
                        Diagnostic::error(ErrorCode::E2022)
                            .with_message("`case` outside of a `switch`")
                            .with_label(loc, ""),
                    );
                }
                self.set_stmt_kind(stmt, StmtKind::Case { expr, host });
            }
            StmtKind::Default { .. } => {
                let host = self.find_outer_stmt(|k| matches!(k, StmtKind::Switch { .. }));
                if host.is_none() {
                    let loc = self.arena.stmt(stmt).loc;
                    self.diagnose(
                        Diagnostic::error(ErrorCode::E2023)
                            .with_message("`default` outside of a `switch`")
                            .with_label(loc, ""),
                    );
                }
                self.set_stmt_kind(stmt, StmtKind::Default { host });
            }
            StmtKind::Break { .. } => {
                let host = self.find_outer_stmt(StmtKind::is_breakable);
                if host.is_none() {
                    let loc = self.arena.stmt(stmt).loc;
                    self.diagnose(
                        Diagnostic::error(ErrorCode::E2020)
                            .with_message("`break` outside of a breakable statement")
                            .with_label(loc, ""),
                    );
                }
                self.set_stmt_kind(stmt, StmtKind::Break { host });
            }
            StmtKind::Continue { .. } => {
                let host = self.find_outer_stmt(StmtKind::is_loop);
                if host.is_none() {
                    let loc = self.arena.stmt(stmt).loc;
                    self.diagnose(
                        Diagnostic::error(ErrorCode::E2021)
                            .with_message("`continue` outside of a loop")
                            .with_label(loc, ""),
                    );
                }
                self.set_stmt_kind(stmt, StmtKind::Continue { host });
            }
            StmtKind::Return { expr } => self.check_return_stmt(stmt, expr)?,
            StmtKind::Discard | StmtKind::Empty => {}
        }
        Ok(())
    }

    fn check_return_stmt(&mut self, stmt: StmtId, expr: Option<ExprId>) -> CheckResult<()> {
        let return_ty = self.function.and_then(|func| match &self.arena.decl(func).kind {
            DeclKind::Func(f) => Some(f.return_ty.ty_or_error()),
            _ => None,
        });

        match expr {
            None => {
                if let Some(return_ty) = return_ty {
                    if return_ty != Type::Scalar(ScalarType::Void) {
                        let loc = self.arena.stmt(stmt).loc;
                        self.diagnose(
                            Diagnostic::error(ErrorCode::E2024)
                                .with_message("`return` needs an expression")
                                .with_label(loc, ""),
                        );
                    }
                }
            }
            Some(expr) => {
                let mut expr = self.check_term(expr)?;
                if !self.is_error_expr(expr) {
                    if let Some(return_ty) = return_ty {
                        expr = self.coerce(&return_ty, expr)?;
                    }
                }
                self.set_stmt_kind(stmt, StmtKind::Return { expr: Some(expr) });
            }
        }
        Ok(())
    }

    /// A loop over a compile-time integer range: the induction variable
    /// is a `const int`, and both bounds must be integer constants.
    fn check_compile_time_for(
        &mut self,
        stmt: StmtId,
        var: shade_types::DeclId,
        range_begin: Option<ExprId>,
        range_end: ExprId,
        body: StmtId,
    ) -> CheckResult<()> {
        self.push_outer_stmt(stmt);

        if let DeclKind::Variable(v) = &mut self.arena.decl_mut(var).kind {
            v.ty = TypeExpr::resolved(Type::int());
        }
        self.arena.decl_mut(var).modifiers.push(Modifier::Const);
        self.arena.decl_mut(var).state = CheckState::Checked;

        let (range_begin, begin_val) = match range_begin {
            Some(begin) => {
                let begin = self.check_expr(begin)?;
                let val = self.check_integer_constant_expression(begin)?;
                (Some(begin), val)
            }
            None => (None, Some(IntVal::Const(0))),
        };

        let range_end = self.check_expr(range_end)?;
        let end_val = self.check_integer_constant_expression(range_end)?;

        self.set_stmt_kind(
            stmt,
            StmtKind::CompileTimeFor { var, range_begin, range_end, begin_val, end_val, body },
        );

        self.check_stmt(body)?;
        self.pop_outer_stmt();
        Ok(())
    }
}
