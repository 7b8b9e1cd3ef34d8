//! The implicit conversion engine.
//!
//! One predicate drives every conversion in the checker: assignment,
//! return, initialization, argument binding, and the overload resolver's
//! argument matching all go through [`SemanticsVisitor::coerce`] or its
//! non-constructive dual [`SemanticsVisitor::can_coerce`].
//!
//! Precedence: equal types, error absorption, initializer lists,
//! interface casts, constructor-based conversion. Constructor conversion
//! reuses the ordinary overload resolver with nested conversions
//! disallowed, so a conversion can never recursively justify itself.

use shade_ast::{Expr, ExprId, ExprKind, InvokeStyle, Span};
use shade_diagnostic::{Diagnostic, ErrorCode};
use shade_types::{ConversionCost, DeclId, QualType, Type};

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;
use crate::overload::{CandidateStatus, OverloadResolveContext, ResolveMode};

/// A successful coercion: the replacement expression (when one was
/// requested and needed) and the conversion cost.
pub(crate) struct CoerceSuccess {
    pub expr: Option<ExprId>,
    pub cost: ConversionCost,
}

impl SemanticsVisitor<'_> {
    /// Wrap an expression in a compiler-inserted cast to `to`.
    pub(crate) fn create_implicit_cast(&mut self, to: Type, from: ExprId) -> ExprId {
        let loc = self.arena.expr(from).loc;
        let mut expr = Expr::new(ExprKind::ImplicitCast { arg: from }, loc);
        expr.ty = Some(QualType::rvalue(to));
        self.arena.alloc_expr(expr)
    }

    /// The cost of using `decl` for implicit conversion. A constructor
    /// without an implicit-conversion modifier is explicit-only.
    pub(crate) fn implicit_conversion_cost_of(&self, decl: DeclId) -> ConversionCost {
        self.arena
            .decl(decl)
            .implicit_conversion_cost()
            .unwrap_or(ConversionCost::EXPLICIT)
    }

    /// Can a value of `from` convert to `to`, and at what cost?
    pub(crate) fn can_coerce(
        &mut self,
        to: &Type,
        from: &Type,
    ) -> CheckResult<Option<ConversionCost>> {
        Ok(self.try_coerce_impl(to, from, None, false)?.map(|s| s.cost))
    }

    /// Convert `from` to `to`, reporting a type mismatch when impossible.
    /// Always returns an expression so checking can continue.
    pub(crate) fn coerce(&mut self, to: &Type, from: ExprId) -> CheckResult<ExprId> {
        // Rewrite mode can see unchecked expressions; leave them alone.
        if self.arena.expr(from).ty.is_none() && self.sink.is_muted() {
            return Ok(from);
        }

        let from_ty = self.expr_ty(from);
        match self.try_coerce_impl(to, &from_ty, Some(from), true)? {
            Some(success) => Ok(success.expr.unwrap_or(from)),
            None => {
                let loc = self.arena.expr(from).loc;
                let expected = self.type_string(to);
                let found = self.type_string(&from_ty);
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2001)
                        .with_message(format!(
                            "type mismatch: expected `{expected}`, found `{found}`"
                        ))
                        .with_label(loc, ""),
                );
                // Wrap rather than clobber: coercion introduces nodes, it
                // never changes the expression it was given.
                Ok(self.create_implicit_cast(Type::Error, from))
            }
        }
    }

    pub(crate) fn try_coerce_impl(
        &mut self,
        to: &Type,
        from_ty: &Type,
        from_expr: Option<ExprId>,
        want_expr: bool,
    ) -> CheckResult<Option<CoerceSuccess>> {
        // Equal types pass straight through.
        if to == from_ty {
            return Ok(Some(CoerceSuccess { expr: from_expr, cost: ConversionCost::NONE }));
        }

        // Either side an error: succeed silently, wrapped for shape.
        if to.is_error() || from_ty.is_error() {
            let expr = match (want_expr, from_expr) {
                (true, Some(from)) => Some(self.create_implicit_cast(to.clone(), from)),
                _ => None,
            };
            return Ok(Some(CoerceSuccess { expr, cost: ConversionCost::NONE }));
        }

        // An initializer list converts element-wise.
        if let Some(from) = from_expr {
            if let ExprKind::InitializerList { args } = self.arena.expr(from).kind.clone() {
                return self.coerce_initializer_list(to, from, &args, want_expr);
            }
        }

        // Conversion up to an interface the source type conforms to.
        if let Some(interface) = to.as_decl_ref().cloned() {
            if matches!(self.arena.decl(interface.decl).kind, shade_ast::DeclKind::Interface(_))
                && self.does_type_conform_to_interface(from_ty, &interface)?
            {
                let expr = match (want_expr, from_expr) {
                    (true, Some(from)) => Some(self.create_implicit_cast(to.clone(), from)),
                    _ => None,
                };
                return Ok(Some(CoerceSuccess {
                    expr,
                    cost: ConversionCost::CAST_TO_INTERFACE,
                }));
            }
        }

        self.try_coerce_via_constructor(to, from_ty, from_expr, want_expr)
    }

    fn coerce_initializer_list(
        &mut self,
        to: &Type,
        from: ExprId,
        args: &[ExprId],
        want_expr: bool,
    ) -> CheckResult<Option<CoerceSuccess>> {
        let mut coerced_args = Vec::new();

        match to {
            Type::DeclRef(dr)
                if matches!(
                    self.arena.decl(dr.decl).kind,
                    shade_ast::DeclKind::Struct(_) | shade_ast::DeclKind::Class(_)
                ) =>
            {
                // Pair list elements with fields in declaration order.
                // Extra arguments are dropped; missing fields default.
                let dr = dr.clone();
                let fields = self
                    .arena
                    .members_where(dr.decl, |d| matches!(d.kind, shade_ast::DeclKind::Field(_)));
                let mut arg_index = 0;
                for field in fields {
                    if arg_index >= args.len() {
                        break;
                    }
                    let arg = args[arg_index];
                    arg_index += 1;

                    let field_ty = match &self.arena.decl(field).kind {
                        shade_ast::DeclKind::Field(v) => {
                            v.ty.ty_or_error().apply_chain(dr.subst.as_ref())
                        }
                        _ => Type::Error,
                    };
                    let arg_ty = self.expr_ty(arg);
                    let Some(sub) =
                        self.try_coerce_impl(&field_ty, &arg_ty, Some(arg), want_expr)?
                    else {
                        return Ok(None);
                    };
                    if want_expr {
                        coerced_args.push(sub.expr.unwrap_or(arg));
                    }
                }
            }
            Type::Array { elem, .. } => {
                // Element counts are not enforced here; array-size
                // validation happens on the declaration.
                let elem = (**elem).clone();
                for &arg in args {
                    let arg_ty = self.expr_ty(arg);
                    let Some(sub) = self.try_coerce_impl(&elem, &arg_ty, Some(arg), want_expr)?
                    else {
                        return Ok(None);
                    };
                    if want_expr {
                        coerced_args.push(sub.expr.unwrap_or(arg));
                    }
                }
            }
            _ => return Ok(None),
        }

        let expr = if want_expr {
            let loc = self.arena.expr(from).loc;
            let mut list = Expr::new(ExprKind::InitializerList { args: coerced_args }, loc);
            list.ty = Some(QualType::rvalue(to.clone()));
            Some(self.arena.alloc_expr(list))
        } else {
            None
        };
        Ok(Some(CoerceSuccess { expr, cost: ConversionCost::NONE }))
    }

    /// Look for a constructor on the target type usable for implicit
    /// conversion from the source type.
    fn try_coerce_via_constructor(
        &mut self,
        to: &Type,
        from_ty: &Type,
        from_expr: Option<ExprId>,
        want_expr: bool,
    ) -> CheckResult<Option<CoerceSuccess>> {
        let loc = from_expr
            .map(|e| self.arena.expr(e).loc)
            .unwrap_or(Span::DUMMY);
        let mut ctx = OverloadResolveContext {
            loc,
            func_loc: loc,
            original_expr: None,
            style: InvokeStyle::Call,
            args: from_expr.into_iter().collect(),
            arg_types: vec![from_ty.clone()],
            base_expr: None,
            mode: ResolveMode::JustTrying,
            // Exact-match arguments only, to prevent infinite recursion.
            disallow_nested_conversions: true,
            best: None,
            bests: Vec::new(),
        };

        self.add_type_overload_candidates(to, &mut ctx)?;

        if !ctx.bests.is_empty() {
            // Multiple equally good candidates.
            if ctx.bests[0].status != CandidateStatus::Applicable {
                return Ok(None);
            }

            // The conversion is possible but ambiguous; the nominal cost
            // is the minimum over the candidates.
            let mut cost = ConversionCost::GENERAL;
            for candidate in &ctx.bests {
                let candidate_cost =
                    self.implicit_conversion_cost_of(candidate.item.decl_ref.decl);
                if candidate_cost < cost {
                    cost = candidate_cost;
                }
            }

            let expr = if want_expr {
                let target = self.type_string(to);
                let source = self.type_string(from_ty);
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2008)
                        .with_message(format!(
                            "ambiguous conversion from `{source}` to `{target}`"
                        ))
                        .with_label(ctx.loc, ""),
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
                ctx.args
                    .first()
                    .map(|&from| self.create_implicit_cast(Type::Error, from))
            } else {
                None
            };
            return Ok(Some(CoerceSuccess { expr, cost }));
        }

        if let Some(mut best) = ctx.best.take() {
            // A single best candidate; it still has to be applicable.
            if best.status != CandidateStatus::Applicable {
                return Ok(None);
            }

            let cost = self.implicit_conversion_cost_of(best.item.decl_ref.decl);
            let expr = if want_expr {
                Some(self.complete_overload_candidate(&mut ctx, &mut best)?)
            } else {
                None
            };
            return Ok(Some(CoerceSuccess { expr, cost }));
        }

        Ok(None)
    }
}
