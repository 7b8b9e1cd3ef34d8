//! Expression checking.
//!
//! `check_term` dispatches on the expression variant. Name references
//! resolve through the scope chain; member access becomes a swizzle, a
//! static member, or an instance member depending on the base type; calls
//! and casts go through overload resolution; subscripts on user types
//! rewrite into `operator[]` calls.

use shade_ast::{Expr, ExprId, ExprKind, InvokeStyle, TypeExpr};
use shade_diagnostic::{Diagnostic, ErrorCode};
use shade_types::{IntVal, QualType, Type};

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;
use crate::overload::{CandidateStatus, OverloadResolveContext, ResolveMode};

impl SemanticsVisitor<'_> {
    /// Check a term, returning the (possibly replaced) expression.
    pub(crate) fn check_term(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        match self.arena.expr(expr).kind.clone() {
            ExprKind::IntLit(_) => {
                // The literal may already be typed by its suffix.
                if self.arena.expr(expr).ty.is_none() {
                    self.set_expr_type(expr, QualType::rvalue(Type::int()));
                }
                Ok(expr)
            }
            ExprKind::FloatLit(_) => {
                if self.arena.expr(expr).ty.is_none() {
                    self.set_expr_type(expr, QualType::rvalue(Type::float()));
                }
                Ok(expr)
            }
            ExprKind::BoolLit(_) => {
                if self.arena.expr(expr).ty.is_none() {
                    self.set_expr_type(expr, QualType::rvalue(Type::bool()));
                }
                Ok(expr)
            }
            ExprKind::Var { name, scope, decl } => {
                // Already resolved: nothing to do.
                if decl.is_some() {
                    return Ok(expr);
                }
                self.set_expr_type(expr, QualType::error());

                let result = self.lookup_name(name, scope);
                if result.is_valid() {
                    let loc = self.arena.expr(expr).loc;
                    return self.create_lookup_result_expr(&result, None, loc);
                }

                let text = self.interner.lookup(name).to_owned();
                let loc = self.arena.expr(expr).loc;
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2005)
                        .with_message(format!("undefined identifier `{text}`"))
                        .with_label(loc, ""),
                );
                Ok(expr)
            }
            ExprKind::Member { .. } => self.visit_member_expr(expr),
            ExprKind::Paren { base } => {
                let base = self.check_term(base)?;
                let qual = self.expr_qual(base);
                self.arena.expr_mut(expr).kind = ExprKind::Paren { base };
                self.set_expr_type(expr, qual);
                Ok(expr)
            }
            ExprKind::InitializerList { args } => {
                // Check the elements blindly; conforming them to a type
                // waits until context supplies one.
                let mut checked = Vec::with_capacity(args.len());
                for arg in args {
                    checked.push(self.check_term(arg)?);
                }
                self.arena.expr_mut(expr).kind = ExprKind::InitializerList { args: checked };
                self.set_expr_type(expr, QualType::rvalue(Type::InitializerList));
                Ok(expr)
            }
            ExprKind::Assign { left, right } => {
                let left = self.check_expr(left)?;
                let left_qual = self.expr_qual(left);
                let right = self.check_term(right)?;
                let right = self.coerce(&left_qual.ty, right)?;

                if !left_qual.is_lvalue && !left_qual.ty.is_error() {
                    let loc = self.arena.expr(expr).loc;
                    self.diagnose(
                        Diagnostic::error(ErrorCode::E2029)
                            .with_message("cannot assign to a non-l-value")
                            .with_label(loc, ""),
                    );
                }

                self.arena.expr_mut(expr).kind = ExprKind::Assign { left, right };
                self.set_expr_type(expr, left_qual);
                Ok(expr)
            }
            ExprKind::Invoke { style: InvokeStyle::Cast, .. } => self.visit_type_cast(expr),
            ExprKind::Invoke { .. } => self.visit_invoke(expr),
            ExprKind::GenericApp { .. } => self.visit_generic_app(expr),
            ExprKind::Index { .. } => self.visit_index(expr),
            ExprKind::ImplicitCast { .. } => {
                // Only synthesized by checking; already typed.
                Ok(expr)
            }
            ExprKind::TypeRef { ty } => {
                if self.arena.expr(expr).ty.is_none() {
                    self.set_expr_type(expr, QualType::rvalue(Type::type_type(ty)));
                }
                Ok(expr)
            }
            ExprKind::StaticMember { .. }
            | ExprKind::Deref { .. }
            | ExprKind::Swizzle { .. }
            | ExprKind::Overloaded { .. } => {
                // Checking produces these; an already-typed one flowing
                // back through (a resolved callee, a replayed lookup) is
                // left alone. An untyped one came from the parser and
                // should not occur in concrete input syntax.
                if self.arena.expr(expr).ty.is_some() {
                    return Ok(expr);
                }
                let loc = self.arena.expr(expr).loc;
                self.diagnose(
                    Diagnostic::error(ErrorCode::E9001)
                        .with_message("expression should not appear in input syntax")
                        .with_label(loc, ""),
                );
                Ok(self.error_expr(expr))
            }
        }
    }

    /// Check an expression (a term that must denote a value).
    pub(crate) fn check_expr(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        self.check_term(expr)
    }

    // ----- calls -----

    fn visit_invoke(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        let (callee, args, style) = match self.arena.expr(expr).kind.clone() {
            ExprKind::Invoke { callee, args, style } => (callee, args, style),
            _ => return Ok(expr),
        };

        let callee = self.check_expr(callee)?;
        let mut checked_args = Vec::with_capacity(args.len());
        for arg in args {
            checked_args.push(self.check_expr(arg)?);
        }
        self.arena.expr_mut(expr).kind =
            ExprKind::Invoke { callee, args: checked_args, style };

        self.check_invoke_with_checked_operands(expr)
    }

    /// Resolve the call, then enforce that arguments bound to `out` and
    /// `inout` parameters are l-values.
    pub(crate) fn check_invoke_with_checked_operands(
        &mut self,
        expr: ExprId,
    ) -> CheckResult<ExprId> {
        let resolved = self.resolve_invoke(expr)?;

        if let ExprKind::Invoke { callee, args, .. } = self.arena.expr(resolved).kind.clone() {
            if let Type::Func { params, .. } = self.expr_ty(callee) {
                for (index, param) in params.iter().enumerate() {
                    if !param.direction.is_out() || index >= args.len() {
                        continue;
                    }
                    if !self.expr_qual(args[index]).is_lvalue {
                        let loc = self.arena.expr(args[index]).loc;
                        self.diagnose(
                            Diagnostic::error(ErrorCode::E2030)
                                .with_message(format!(
                                    "argument {} must be an l-value",
                                    index + 1
                                ))
                                .with_label(loc, ""),
                        );
                    }
                }
            }
        }
        Ok(resolved)
    }

    /// A cast `T(x)` checks its callee as a type and then resolves like
    /// any other call, so casts and constructor calls stay equivalent.
    fn visit_type_cast(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        let (callee, args) = match self.arena.expr(expr).kind.clone() {
            ExprKind::Invoke { callee, args, .. } => (callee, args),
            _ => return Ok(expr),
        };

        let callee = self.check_term(callee)?;
        let type_expr = self.check_proper_type(TypeExpr::from_expr(callee))?;
        let callee = type_expr.expr.unwrap_or(callee);

        let mut checked_args = Vec::with_capacity(args.len());
        for arg in args {
            checked_args.push(self.check_expr(arg)?);
        }
        self.arena.expr_mut(expr).kind = ExprKind::Invoke {
            callee,
            args: checked_args,
            style: InvokeStyle::Cast,
        };

        self.check_invoke_with_checked_operands(expr)
    }

    /// Explicit generic application `base<args...>`: a specialized case
    /// of overload resolution, since several generics may share the name.
    fn visit_generic_app(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        let (base, args) = match self.arena.expr(expr).kind.clone() {
            ExprKind::GenericApp { base, args } => (base, args),
            _ => return Ok(expr),
        };

        let base = self.check_term(base)?;
        let mut checked_args = Vec::with_capacity(args.len());
        for arg in args {
            checked_args.push(self.check_term(arg)?);
        }
        self.arena.expr_mut(expr).kind =
            ExprKind::GenericApp { base, args: checked_args.clone() };

        if self.is_error_expr(base) {
            return Ok(self.error_expr(expr));
        }
        for &arg in &checked_args {
            if self.is_error_expr(arg) {
                return Ok(self.error_expr(expr));
            }
        }

        let loc = self.arena.expr(expr).loc;
        let arg_types: Vec<Type> = checked_args.iter().map(|&a| self.expr_ty(a)).collect();
        let mut ctx = OverloadResolveContext {
            loc,
            func_loc: self.arena.expr(base).loc,
            original_expr: Some(expr),
            style: InvokeStyle::Call,
            args: checked_args,
            arg_types,
            base_expr: self.base_of(base),
            mode: ResolveMode::JustTrying,
            disallow_nested_conversions: false,
            best: None,
            bests: Vec::new(),
        };

        self.add_generic_overload_candidates(base, &mut ctx)?;

        if !ctx.bests.is_empty() {
            if ctx.bests[0].status != CandidateStatus::Applicable {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2007)
                        .with_message("no applicable generic declaration")
                        .with_label(loc, ""),
                );
            } else {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2008)
                        .with_message("ambiguous generic application")
                        .with_label(loc, ""),
                );
                for candidate in &ctx.bests {
                    let signature = self.decl_signature_string(&candidate.item.decl_ref);
                    let decl_loc = self.arena.decl(candidate.item.decl_ref.decl).loc;
                    self.diagnose(
                        Diagnostic::note(ErrorCode::E2032)
                            .with_message(format!("candidate: {signature}"))
                            .with_label(decl_loc, ""),
                    );
                }
            }
            return Ok(self.error_expr(expr));
        }

        if let Some(mut best) = ctx.best.take() {
            return self.complete_overload_candidate(&mut ctx, &mut best);
        }

        self.diagnose(
            Diagnostic::error(ErrorCode::E2099)
                .with_message("expected a generic declaration")
                .with_label(loc, ""),
        );
        Ok(self.error_expr(expr))
    }

    // ----- subscripts -----

    fn visit_index(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        let (base, index) = match self.arena.expr(expr).kind.clone() {
            ExprKind::Index { base, index } => (base, index),
            _ => return Ok(expr),
        };

        let base = self.check_expr(base)?;
        let index = match index {
            Some(i) => Some(self.check_expr(i)?),
            None => None,
        };
        self.arena.expr_mut(expr).kind = ExprKind::Index { base, index };

        if self.is_error_expr(base) {
            return Ok(self.error_expr(expr));
        }

        let loc = self.arena.expr(expr).loc;
        match self.expr_ty(base) {
            Type::TypeType(inner) => {
                // Indexing a type builds an array type: `float[2]`.
                let count = match index {
                    Some(index) => self.check_integer_constant_expression(index)?,
                    None => None,
                };
                let elem_expr = TypeExpr { expr: Some(base), ty: Some(*inner) };
                let elem = self.check_usable_type(elem_expr)?.ty_or_error();
                let array = Type::array(elem, count);
                self.set_expr_type(expr, QualType::rvalue(Type::type_type(array)));
                Ok(expr)
            }
            Type::Array { elem, .. } => self.check_simple_subscript(expr, *elem),
            Type::Vector { elem, .. } => self.check_simple_subscript(expr, *elem),
            Type::Matrix { elem, cols, .. } => {
                // A matrix indexes into its rows.
                let row = Type::Vector { elem, count: cols };
                self.check_simple_subscript(expr, row)
            }
            Type::DeclRef(dr) if self.arena.decl(dr.decl).kind.as_agg().is_some() => {
                // Rewrite as a call to the type's subscript operator.
                self.ensure_decl(dr.decl, shade_ast::CheckState::Checked)?;

                let name = self.interner.intern("operator[]");
                let base_ty = Type::DeclRef(dr.clone());
                let result = self.lookup_local(name, &dr, &base_ty)?;
                let (Some(index), true) = (index, result.is_valid()) else {
                    return Ok(self.subscript_failure(expr, &base_ty));
                };

                let callee = self.create_lookup_result_expr(&result, Some(base), loc)?;
                let invoke = self.arena.alloc_expr(Expr::new(
                    ExprKind::Invoke {
                        callee,
                        args: vec![index],
                        style: InvokeStyle::Call,
                    },
                    loc,
                ));
                self.check_invoke_with_checked_operands(invoke)
            }
            other => Ok(self.subscript_failure(expr, &other)),
        }
    }

    fn subscript_failure(&mut self, expr: ExprId, base_ty: &Type) -> ExprId {
        let loc = self.arena.expr(expr).loc;
        let found = self.type_string(base_ty);
        self.diagnose(
            Diagnostic::error(ErrorCode::E2016)
                .with_message(format!("`{found}` cannot be subscripted"))
                .with_label(loc, ""),
        );
        self.error_expr(expr)
    }

    fn check_simple_subscript(&mut self, expr: ExprId, elem: Type) -> CheckResult<ExprId> {
        let (base, index) = match &self.arena.expr(expr).kind {
            ExprKind::Index { base, index } => (*base, *index),
            _ => return Ok(expr),
        };
        let Some(index) = index else {
            let loc = self.arena.expr(expr).loc;
            self.diagnose(
                Diagnostic::error(ErrorCode::E2017)
                    .with_message("subscript needs an index expression")
                    .with_label(loc, ""),
            );
            return Ok(self.error_expr(expr));
        };

        let index_ty = self.expr_ty(index);
        if index_ty != Type::int() && index_ty != Type::uint() {
            let loc = self.arena.expr(index).loc;
            self.diagnose(
                Diagnostic::error(ErrorCode::E2017)
                    .with_message("subscript index must be an integer")
                    .with_label(loc, ""),
            );
            return Ok(self.error_expr(expr));
        }

        // The element inherits the base's l-value status.
        let is_lvalue = self.expr_qual(base).is_lvalue;
        self.set_expr_type(expr, QualType { ty: elem, is_lvalue });
        Ok(expr)
    }

    // ----- member access -----

    fn visit_member_expr(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        let (base, name, decl) = match self.arena.expr(expr).kind.clone() {
            ExprKind::Member { base, name, decl } => (base, name, decl),
            _ => return Ok(expr),
        };
        // Already resolved by a previous pass.
        if decl.is_some() {
            return Ok(expr);
        }

        let base = self.check_expr(base)?;
        let base = self.maybe_dereference(base);
        self.arena.expr_mut(expr).kind = ExprKind::Member { base, name, decl: None };

        let base_qual = self.expr_qual(base);
        let loc = self.arena.expr(expr).loc;

        // Vectors (and scalars, as one-element vectors) swizzle; checked
        // before declaration references since vectors lower from one.
        match base_qual.ty.clone() {
            Type::Vector { elem, count } => {
                return self.check_swizzle(expr, base, &elem, &count);
            }
            Type::Scalar(_) => {
                let elem = base_qual.ty.clone();
                return self.check_swizzle(expr, base, &elem, &IntVal::Const(1));
            }
            Type::TypeType(inner) => {
                // A member of a type: static lookup on aggregates only.
                if let Type::DeclRef(dr) = *inner.clone() {
                    if self.arena.decl(dr.decl).kind.as_agg().is_some() {
                        self.ensure_decl(dr.decl, shade_ast::CheckState::Checked)?;
                        let result = self.lookup_local(name, &dr, &inner)?;
                        if !result.is_valid() {
                            return Ok(self.member_lookup_failure(expr, &base_qual.ty));
                        }
                        return self.create_lookup_result_expr(&result, Some(base), loc);
                    }
                }
                Ok(self.member_lookup_failure(expr, &base_qual.ty))
            }
            Type::DeclRef(dr) => {
                if self.arena.decl(dr.decl).kind.as_agg().is_some() {
                    self.ensure_decl(dr.decl, shade_ast::CheckState::Checked)?;
                    let base_ty = base_qual.ty.clone();
                    let result = self.lookup_local(name, &dr, &base_ty)?;
                    if !result.is_valid() {
                        return Ok(self.member_lookup_failure(expr, &base_ty));
                    }
                    return self.create_lookup_result_expr(&result, Some(base), loc);
                }
                Ok(self.member_lookup_failure(expr, &base_qual.ty))
            }
            Type::Error => Ok(self.error_expr(expr)),
            other => Ok(self.member_lookup_failure(expr, &other)),
        }
    }

    fn member_lookup_failure(&mut self, expr: ExprId, base_ty: &Type) -> ExprId {
        let name = match &self.arena.expr(expr).kind {
            ExprKind::Member { name, .. } => self.interner.lookup(*name).to_owned(),
            _ => String::new(),
        };
        let loc = self.arena.expr(expr).loc;
        let found = self.type_string(base_ty);
        self.diagnose(
            Diagnostic::error(ErrorCode::E2015)
                .with_message(format!("type `{found}` has no member `{name}`"))
                .with_label(loc, ""),
        );
        self.error_expr(expr)
    }

    // ----- swizzles -----

    /// Component selection on a vector base. One component yields the
    /// element type; several yield a vector of that width. Any repeated
    /// component makes the result a non-l-value.
    fn check_swizzle(
        &mut self,
        expr: ExprId,
        base: ExprId,
        elem_ty: &Type,
        count: &IntVal,
    ) -> CheckResult<ExprId> {
        let loc = self.arena.expr(expr).loc;

        let Some(limit) = count.as_const() else {
            self.diagnose(
                Diagnostic::error(ErrorCode::E2031)
                    .with_message("cannot swizzle a vector of statically unknown size")
                    .with_label(loc, ""),
            );
            return Ok(self.error_expr(expr));
        };

        let name = match &self.arena.expr(expr).kind {
            ExprKind::Member { name, .. } => *name,
            _ => return Ok(self.error_expr(expr)),
        };
        let text = self.interner.lookup(name);

        let mut elements: Vec<u8> = Vec::new();
        let mut any_duplicates = false;
        let mut any_error = false;

        for ch in text.chars() {
            let element: i64 = match ch {
                'x' | 'r' => 0,
                'y' | 'g' => 1,
                'z' | 'b' => 2,
                'w' | 'a' => 3,
                _ => {
                    self.diagnose(
                        Diagnostic::error(ErrorCode::E2031)
                            .with_message(format!("invalid swizzle component `{ch}`"))
                            .with_label(loc, ""),
                    );
                    any_error = true;
                    continue;
                }
            };
            if element >= limit {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2031)
                        .with_message(format!("swizzle component `{ch}` out of range"))
                        .with_label(loc, ""),
                );
                any_error = true;
                continue;
            }
            if elements.contains(&(element as u8)) {
                any_duplicates = true;
            }
            elements.push(element as u8);
        }

        if any_error {
            return Ok(self.error_expr(expr));
        }

        let ty = if elements.len() == 1 {
            elem_ty.clone()
        } else {
            Type::Vector {
                elem: Box::new(elem_ty.clone()),
                count: IntVal::Const(elements.len() as i64),
            }
        };
        let is_lvalue = self.expr_qual(base).is_lvalue && !any_duplicates;

        let mut swizzle = Expr::new(ExprKind::Swizzle { base, elements }, loc);
        swizzle.ty = Some(QualType { ty, is_lvalue });
        Ok(self.arena.alloc_expr(swizzle))
    }
}
