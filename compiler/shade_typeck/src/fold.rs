//! Integer constant folding.
//!
//! Folds the integer expressions that appear inside types (array sizes,
//! generic value arguments) and attributes. A fold can produce a symbolic
//! value — a reference to a generic value parameter or a specialization
//! constant — which participates in unification but is not a literal.

use shade_ast::{DeclKind, ExprId, ExprKind, InvokeStyle};
use shade_diagnostic::{Diagnostic, ErrorCode};
use shade_types::{DeclRef, IntVal, Type};

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;
use crate::request::SourceLanguage;

/// Calls with more operands than this stay symbolic.
const MAX_FOLD_ARGS: usize = 8;

impl SemanticsVisitor<'_> {
    /// Fold a checked expression to an integer value, or `None` when it
    /// is not recognized as a constant.
    pub(crate) fn try_constant_fold_expr(&mut self, expr: ExprId) -> Option<IntVal> {
        // Unwrap identity expressions.
        let mut expr = expr;
        while let ExprKind::Paren { base } = self.arena.expr(expr).kind {
            expr = base;
        }

        match self.arena.expr(expr).kind.clone() {
            ExprKind::IntLit(value) => Some(IntVal::Const(value)),
            ExprKind::Var { decl: Some(dr), .. }
            | ExprKind::Member { decl: Some(dr), .. }
            | ExprKind::StaticMember { decl: Some(dr), .. } => self.try_fold_decl_ref(&dr),
            ExprKind::Invoke { args, style: InvokeStyle::Cast, .. } => {
                args.first().and_then(|&arg| self.try_constant_fold_expr(arg))
            }
            ExprKind::ImplicitCast { arg } => self.try_constant_fold_expr(arg),
            ExprKind::Invoke { callee, args, .. } => self.try_fold_invoke(callee, &args),
            _ => None,
        }
    }

    fn try_fold_decl_ref(&mut self, dr: &DeclRef) -> Option<IntVal> {
        enum VarClass {
            GenericValueParam,
            Var { init: Option<ExprId>, is_static: bool, is_const: bool, spec_const: bool },
            Other,
        }

        let decl = self.arena.decl(dr.decl);
        let class = match &decl.kind {
            DeclKind::GenericValueParam(_) => VarClass::GenericValueParam,
            DeclKind::Variable(v) | DeclKind::Field(v) => VarClass::Var {
                init: v.init,
                is_static: decl.is_static(),
                is_const: decl.is_const(),
                spec_const: decl.constant_id().is_some(),
            },
            _ => VarClass::Other,
        };

        match class {
            VarClass::GenericValueParam => Some(IntVal::GenericParam(dr.decl)),
            VarClass::Var { init, is_static, is_const, spec_const } => match self.language {
                // `static const` marks a compile-time constant.
                SourceLanguage::Unified | SourceLanguage::Hlsl => {
                    if is_static && is_const {
                        init.and_then(|e| self.try_constant_fold_expr(e))
                    } else {
                        None
                    }
                }
                // GLSL `const` is a constant, except a specialization
                // constant (`constant_id`) which stays symbolic.
                SourceLanguage::Glsl => {
                    if !is_const {
                        None
                    } else if spec_const {
                        Some(IntVal::GenericParam(dr.decl))
                    } else {
                        init.and_then(|e| self.try_constant_fold_expr(e))
                    }
                }
            },
            VarClass::Other => None,
        }
    }

    /// Fold a call to an intrinsic operator, dispatching on its name.
    fn try_fold_invoke(&mut self, callee: ExprId, args: &[ExprId]) -> Option<IntVal> {
        let dr = match &self.arena.expr(callee).kind {
            ExprKind::Var { decl: Some(dr), .. }
            | ExprKind::Member { decl: Some(dr), .. }
            | ExprKind::StaticMember { decl: Some(dr), .. } => dr.clone(),
            _ => return None,
        };
        if !self.arena.decl(dr.decl).is_intrinsic_op() {
            return None;
        }
        if args.len() > MAX_FOLD_ARGS {
            return None;
        }

        let mut const_args = Vec::with_capacity(args.len());
        for &arg in args {
            let val = self.try_check_integer_constant_expression(arg)?;
            match val.as_const() {
                Some(value) => const_args.push(value),
                // A symbolic operand keeps the whole call symbolic.
                None => return None,
            }
        }

        let name = self.interner.lookup(self.arena.decl(dr.decl).name);
        let result = match (name, const_args.as_slice()) {
            ("-", [value]) => value.wrapping_neg(),
            ("-", [left, right]) => left.wrapping_sub(*right),
            ("+", [left, right]) => left.wrapping_add(*right),
            ("*", [left, right]) => left.wrapping_mul(*right),
            ("/", [_, 0]) | ("%", [_, 0]) => return None,
            ("/", [left, right]) => left.wrapping_div(*right),
            ("%", [left, right]) => left.wrapping_rem(*right),
            _ => return None,
        };
        Some(IntVal::Const(result))
    }

    /// Fold only when the expression already has type `int`.
    pub(crate) fn try_check_integer_constant_expression(&mut self, expr: ExprId) -> Option<IntVal> {
        if self.expr_ty(expr) != Type::int() {
            return None;
        }
        self.try_constant_fold_expr(expr)
    }

    /// Enforce that an expression is an integer constant: coerce it to
    /// `int`, fold, and diagnose when nothing constant comes out.
    pub(crate) fn check_integer_constant_expression(
        &mut self,
        expr: ExprId,
    ) -> CheckResult<Option<IntVal>> {
        let coerced = self.coerce(&Type::int(), expr)?;
        let result = self.try_check_integer_constant_expression(coerced);
        if result.is_none() {
            let loc = self.arena.expr(expr).loc;
            self.diagnose(
                Diagnostic::error(ErrorCode::E2025)
                    .with_message("expected an integer constant expression")
                    .with_label(loc, ""),
            );
        }
        Ok(result)
    }

    /// Check an expression and require a *literal* integer constant, for
    /// attribute arguments.
    pub(crate) fn check_constant_int_val(&mut self, expr: ExprId) -> CheckResult<Option<i64>> {
        let expr = self.check_expr(expr)?;
        match self.check_integer_constant_expression(expr)? {
            Some(IntVal::Const(value)) => Ok(Some(value)),
            Some(_) => {
                let loc = self.arena.expr(expr).loc;
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2026)
                        .with_message("expected an integer constant, not a symbolic value")
                        .with_label(loc, ""),
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
