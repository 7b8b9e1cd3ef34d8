//! The semantic checker.
//!
//! One visitor drives everything: declaration checking through the
//! `ensure_decl` state machine, statement and expression checking, and
//! the shared type-expression translation helpers. The other engines
//! (coercion, overload resolution, inference, folding) are implemented as
//! further `impl SemanticsVisitor` blocks in their own modules.
//!
//! # Module structure
//!
//! - `decls`: the declaration state machine and module checking order
//! - `stmts`: statement checking and the enclosing-statement stack
//! - `exprs`: expression checking (names, members, swizzles, calls)
//! - `modifiers`: the final attribute-checking pass

mod decls;
mod exprs;
mod modifiers;
mod stmts;

#[cfg(test)]
mod tests;

use rustc_hash::FxHashSet;

use shade_ast::lookup::{refine_lookup, Breadcrumb, LookupMask, LookupResult, LookupResultItem};
use shade_ast::{
    AstArena, CheckState, DeclKind, Expr, ExprId, ExprKind, Span, StmtId, StringInterner, TypeExpr,
};
use shade_diagnostic::{Diagnostic, DiagnosticSink, ErrorCode};
use shade_types::{DeclId, DeclRef, IntVal, ParamDirection, QualType, ScalarType, SubstArg, Type, Val};

use crate::error::{CheckResult, Circularity};
use crate::request::{ModuleLoader, SourceLanguage, TranslationUnit};
use crate::session::Session;

use std::sync::Arc;

/// Check one translation unit: resolve and type every declaration in its
/// module, mutating the AST in place and reporting diagnostics to the
/// sink.
///
/// In rewrite mode (the `no_checking` flag) the sink is muted for the
/// duration, so the AST is still annotated but nothing is reported.
///
/// The only error is the internal circularity signal.
pub fn check_translation_unit(
    unit: &TranslationUnit,
    arena: &mut AstArena,
    session: &mut Session,
    interner: &StringInterner,
    sink: &mut DiagnosticSink,
    loader: &mut dyn ModuleLoader,
) -> CheckResult<()> {
    let span = tracing::debug_span!("check_translation_unit", module = ?unit.module);
    let _guard = span.enter();

    let was_muted = sink.is_muted();
    if unit.flags.is_no_checking() {
        sink.set_muted(true);
    }

    let mut visitor = SemanticsVisitor {
        arena,
        session,
        interner,
        sink,
        loader,
        language: unit.language,
        function: None,
        outer_stmts: Vec::new(),
        imported_modules: FxHashSet::default(),
    };
    let result = visitor.check_decl(unit.module);

    sink.set_muted(was_muted);
    result
}

/// The checking state for one translation unit.
pub struct SemanticsVisitor<'a> {
    pub(crate) arena: &'a mut AstArena,
    pub(crate) session: &'a mut Session,
    pub(crate) interner: &'a StringInterner,
    pub(crate) sink: &'a mut DiagnosticSink,
    pub(crate) loader: &'a mut dyn ModuleLoader,
    pub(crate) language: SourceLanguage,
    /// The function whose body is being checked, for `return`.
    pub(crate) function: Option<DeclId>,
    /// Lexically enclosing statements, innermost last.
    pub(crate) outer_stmts: Vec<StmtId>,
    /// Modules already spliced into the lookup chain.
    pub(crate) imported_modules: FxHashSet<DeclId>,
}

impl<'a> SemanticsVisitor<'a> {
    pub(crate) fn circularity(&self, decl: DeclId) -> Circularity {
        Circularity {
            decl,
            name: self.interner.lookup(self.arena.decl(decl).name).to_owned(),
        }
    }

    pub(crate) fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.sink.diagnose(diagnostic);
    }

    // ----- the declaration state machine -----

    /// Make sure `decl` has been checked at least to `target`, checking it
    /// now if necessary. Re-entering a declaration whose header is being
    /// checked is a circularity.
    pub(crate) fn ensure_decl(&mut self, decl: DeclId, target: CheckState) -> CheckResult<()> {
        if self.arena.decl(decl).is_checked(target) {
            return Ok(());
        }
        if self.arena.decl(decl).state == CheckState::CheckingHeader {
            return Err(self.circularity(decl));
        }
        if self.arena.decl(decl).state < CheckState::CheckingHeader {
            self.arena.decl_mut(decl).state = CheckState::CheckingHeader;
        }

        self.check_decl_dispatch(decl)?;

        self.arena.decl_mut(decl).state = CheckState::Checked;
        Ok(())
    }

    /// Fully check a declaration.
    pub fn check_decl(&mut self, decl: DeclId) -> CheckResult<()> {
        self.ensure_decl(decl, CheckState::Checked)
    }

    // ----- expression plumbing -----

    pub(crate) fn expr_ty(&self, expr: ExprId) -> Type {
        self.arena.expr(expr).type_or_error()
    }

    pub(crate) fn expr_qual(&self, expr: ExprId) -> QualType {
        self.arena.expr(expr).qual_type()
    }

    pub(crate) fn is_error_expr(&self, expr: ExprId) -> bool {
        self.arena.expr(expr).is_error()
    }

    /// Mark an expression as failed without disturbing its structure, so
    /// callers never need null checks and errors do not cascade.
    pub(crate) fn error_expr(&mut self, expr: ExprId) -> ExprId {
        self.arena.expr_mut(expr).ty = Some(QualType::error());
        expr
    }

    pub(crate) fn set_expr_type(&mut self, expr: ExprId, ty: QualType) {
        self.arena.expr_mut(expr).ty = Some(ty);
    }

    /// The base expression, when `expr` is a member-style reference.
    pub(crate) fn base_of(&self, expr: ExprId) -> Option<ExprId> {
        match &self.arena.expr(expr).kind {
            ExprKind::Member { base, .. } | ExprKind::StaticMember { base, .. } => Some(*base),
            ExprKind::Overloaded { base, .. } => *base,
            _ => None,
        }
    }

    // ----- referencing declarations -----

    /// Lower a declaration reference into the type it denotes when used
    /// as a type. Magic declarations become the dedicated structural
    /// variants; everything else stays a declaration-reference type.
    pub(crate) fn decl_ref_type(&self, dr: &DeclRef) -> Type {
        let decl = self.arena.decl(dr.decl);
        if let Some(scalar) = decl.builtin_scalar() {
            return Type::Scalar(scalar);
        }
        match decl.magic_kind() {
            Some(shade_ast::MagicKind::Vector) => {
                let (types, ints) = self.magic_args(dr);
                Type::Vector {
                    elem: Box::new(types.first().cloned().unwrap_or(Type::Error)),
                    count: ints.first().cloned().unwrap_or(IntVal::Const(0)),
                }
            }
            Some(shade_ast::MagicKind::Matrix) => {
                let (types, ints) = self.magic_args(dr);
                Type::Matrix {
                    elem: Box::new(types.first().cloned().unwrap_or(Type::Error)),
                    rows: ints.first().cloned().unwrap_or(IntVal::Const(0)),
                    cols: ints.get(1).cloned().unwrap_or(IntVal::Const(0)),
                }
            }
            None => Type::DeclRef(dr.clone()),
        }
    }

    /// The struct declaration inside a magic generic; the anchor that
    /// vector/matrix extensions and constructors hang off.
    pub(crate) fn magic_inner_decl(&self, kind: shade_ast::MagicKind) -> Option<DeclId> {
        let generic = self.session.magic_generic(kind)?;
        match &self.arena.decl(generic).kind {
            DeclKind::Generic(g) => Some(g.inner),
            _ => None,
        }
    }

    /// Generic arguments bound for a magic declaration, split by kind and
    /// in parameter order.
    fn magic_args(&self, dr: &DeclRef) -> (Vec<Type>, Vec<IntVal>) {
        let mut types = Vec::new();
        let mut ints = Vec::new();
        let Some(generic) = self.arena.decl(dr.decl).parent else {
            return (types, ints);
        };
        let Some(subst) = dr.subst.as_deref() else {
            return (types, ints);
        };
        for &param in self.arena.members(generic) {
            match &self.arena.decl(param).kind {
                DeclKind::GenericTypeParam(_) => {
                    if let Some(Val::Type(t)) = subst.find(param) {
                        types.push(t.clone());
                    }
                }
                DeclKind::GenericValueParam(_) => {
                    if let Some(Val::Int(v)) = subst.find(param) {
                        ints.push(v.clone());
                    }
                }
                _ => {}
            }
        }
        (types, ints)
    }

    /// The parameter declarations of a callable, in order.
    pub(crate) fn callable_params(&self, decl: DeclId) -> Vec<DeclId> {
        self.arena
            .members_where(decl, |d| matches!(d.kind, DeclKind::Param(_)))
    }

    pub(crate) fn param_info(&self, param: DeclId) -> (Type, ParamDirection, bool) {
        match &self.arena.decl(param).kind {
            DeclKind::Param(p) => (p.var.ty.ty_or_error(), p.direction, p.var.init.is_some()),
            _ => (Type::Error, ParamDirection::In, false),
        }
    }

    /// The result type of calling through `dr`.
    pub(crate) fn callable_result_type(&mut self, dr: &DeclRef) -> Type {
        match &self.arena.decl(dr.decl).kind {
            DeclKind::Func(f) => f.return_ty.ty_or_error().apply_chain(dr.subst.as_ref()),
            DeclKind::Subscript(s) => s.return_ty.ty_or_error().apply_chain(dr.subst.as_ref()),
            DeclKind::Constructor(_) => {
                // A constructor produces its enclosing type.
                let Some(parent) = self.arena.decl(dr.decl).parent else {
                    return Type::Error;
                };
                match &self.arena.decl(parent).kind {
                    DeclKind::Extension(e) => {
                        e.target.ty_or_error().apply_chain(dr.subst.as_ref())
                    }
                    _ => self.decl_ref_type(&DeclRef { decl: parent, subst: dr.subst.clone() }),
                }
            }
            _ => Type::Error,
        }
    }

    fn func_type_for(&mut self, dr: &DeclRef) -> Type {
        let params = self.callable_params(dr.decl);
        let mut func_params = Vec::with_capacity(params.len());
        for param in params {
            let (ty, direction, _) = self.param_info(param);
            func_params.push(shade_types::FuncParam {
                ty: ty.apply_chain(dr.subst.as_ref()),
                direction,
            });
        }
        let ret = self.callable_result_type(dr);
        Type::Func { params: func_params, ret: Box::new(ret) }
    }

    /// The type to use when an expression references `dr`.
    pub(crate) fn type_for_decl_ref(&mut self, dr: &DeclRef) -> CheckResult<QualType> {
        self.ensure_decl(dr.decl, CheckState::CheckedHeader)?;

        enum RefClass {
            Value(Type),
            Alias(Type),
            Agg,
            TypeParam,
            Generic,
            Callable,
            Unsupported,
        }

        let class = match &self.arena.decl(dr.decl).kind {
            DeclKind::Variable(v) | DeclKind::Field(v) | DeclKind::GenericValueParam(v) => {
                RefClass::Value(v.ty.ty_or_error())
            }
            DeclKind::Param(p) => RefClass::Value(p.var.ty.ty_or_error()),
            DeclKind::TypeDef(td) => RefClass::Alias(td.target.ty_or_error()),
            DeclKind::Struct(_) | DeclKind::Class(_) | DeclKind::Interface(_) => RefClass::Agg,
            DeclKind::GenericTypeParam(_) => RefClass::TypeParam,
            DeclKind::Generic(_) => RefClass::Generic,
            DeclKind::Func(_) | DeclKind::Constructor(_) | DeclKind::Subscript(_) => {
                RefClass::Callable
            }
            _ => RefClass::Unsupported,
        };

        Ok(match class {
            RefClass::Value(ty) => QualType::lvalue(ty.apply_chain(dr.subst.as_ref())),
            RefClass::Alias(ty) => {
                QualType::rvalue(Type::type_type(ty.apply_chain(dr.subst.as_ref())))
            }
            RefClass::Agg => QualType::rvalue(Type::type_type(self.decl_ref_type(dr))),
            RefClass::TypeParam => QualType::rvalue(Type::type_type(Type::DeclRef(dr.clone()))),
            RefClass::Generic => {
                QualType::rvalue(Type::type_type(Type::GenericDeclRef(dr.clone())))
            }
            RefClass::Callable => QualType::rvalue(self.func_type_for(dr)),
            RefClass::Unsupported => {
                let loc = self.arena.decl(dr.decl).loc;
                self.diagnose(
                    Diagnostic::error(ErrorCode::E9001)
                        .with_message("cannot form a reference to this kind of declaration")
                        .with_label(loc, ""),
                );
                QualType::error()
            }
        })
    }

    // ----- turning lookup results into expressions -----

    pub(crate) fn construct_decl_ref_expr(
        &mut self,
        dr: DeclRef,
        base: Option<ExprId>,
        loc: Span,
    ) -> CheckResult<ExprId> {
        let ty = self.type_for_decl_ref(&dr)?;
        let name = self.arena.decl(dr.decl).name;
        let kind = match base {
            Some(base_expr) => {
                if matches!(self.expr_ty(base_expr), Type::TypeType(_)) {
                    ExprKind::StaticMember { base: base_expr, name, decl: Some(dr) }
                } else {
                    ExprKind::Member { base: base_expr, name, decl: Some(dr) }
                }
            }
            None => ExprKind::Var { name, scope: self.session.core_scope, decl: Some(dr) },
        };
        let mut expr = Expr::new(kind, loc);
        expr.ty = Some(ty);
        Ok(self.arena.alloc_expr(expr))
    }

    pub(crate) fn construct_deref_expr(&mut self, base: ExprId, loc: Span) -> ExprId {
        let elem = match self.expr_ty(base) {
            Type::PtrLike { elem } => *elem,
            _ => Type::Error,
        };
        let mut expr = Expr::new(ExprKind::Deref { base }, loc);
        expr.ty = Some(QualType::rvalue(elem));
        self.arena.alloc_expr(expr)
    }

    /// Replay the breadcrumbs recorded by lookup, then reference the item.
    pub(crate) fn construct_lookup_result_expr(
        &mut self,
        item: &LookupResultItem,
        base: Option<ExprId>,
        loc: Span,
    ) -> CheckResult<ExprId> {
        let mut chain = Vec::new();
        let mut cursor = item.breadcrumbs.clone();
        while let Some(crumb) = cursor {
            cursor = crumb.next().cloned();
            chain.push(crumb);
        }

        let mut current = base;
        for crumb in chain {
            match &*crumb {
                Breadcrumb::Member { decl_ref, .. } => {
                    current = Some(self.construct_decl_ref_expr(decl_ref.clone(), current, loc)?);
                }
                Breadcrumb::Deref { .. } => match current {
                    Some(base_expr) => current = Some(self.construct_deref_expr(base_expr, loc)),
                    None => {
                        self.diagnose(
                            Diagnostic::error(ErrorCode::E9001)
                                .with_message("dereference breadcrumb without a base expression")
                                .with_label(loc, ""),
                        );
                    }
                },
            }
        }

        self.construct_decl_ref_expr(item.decl_ref.clone(), current, loc)
    }

    pub(crate) fn create_lookup_result_expr(
        &mut self,
        result: &LookupResult,
        base: Option<ExprId>,
        loc: Span,
    ) -> CheckResult<ExprId> {
        if result.is_overloaded() {
            let mut expr = Expr::new(
                ExprKind::Overloaded { base, lookup: result.clone() },
                loc,
            );
            expr.ty = Some(QualType::rvalue(Type::Overloaded));
            Ok(self.arena.alloc_expr(expr))
        } else if let Some(item) = result.single() {
            let item = item.clone();
            self.construct_lookup_result_expr(&item, base, loc)
        } else {
            // An empty result; callers normally guard against this, so
            // just produce an error-typed placeholder reference.
            let mut expr = Expr::new(ExprKind::Overloaded { base, lookup: result.clone() }, loc);
            expr.ty = Some(QualType::error());
            Ok(self.arena.alloc_expr(expr))
        }
    }

    /// Refine an overloaded reference by the category the use site
    /// expects; report an ambiguity if more than one candidate remains.
    pub(crate) fn resolve_overloaded_expr(
        &mut self,
        expr: ExprId,
        mask: LookupMask,
    ) -> CheckResult<ExprId> {
        let (base, lookup) = match &self.arena.expr(expr).kind {
            ExprKind::Overloaded { base, lookup } => (*base, lookup.clone()),
            _ => return Ok(expr),
        };
        let loc = self.arena.expr(expr).loc;

        let refined = refine_lookup(self.arena, &lookup, mask);
        if !refined.is_valid() {
            // Nothing survived the filter; keep the original so the
            // caller reports the error in its own terms.
            return Ok(expr);
        }

        if refined.is_overloaded() {
            let name = self.arena.decl(refined.items[0].decl_ref.decl).name;
            let name_text = self.interner.lookup(name);
            self.diagnose(
                Diagnostic::error(ErrorCode::E2006)
                    .with_message(format!("ambiguous reference to `{name_text}`"))
                    .with_label(loc, ""),
            );
            for item in &refined.items {
                let signature = self.decl_signature_string(&item.decl_ref);
                let decl_loc = self.arena.decl(item.decl_ref.decl).loc;
                self.diagnose(
                    Diagnostic::note(ErrorCode::E2032)
                        .with_message(format!("candidate: {signature}"))
                        .with_label(decl_loc, ""),
                );
            }
            return Ok(self.error_expr(expr));
        }

        let item = refined.items[0].clone();
        self.construct_lookup_result_expr(&item, base, loc)
    }

    // ----- type expressions -----

    /// Check a parsed type expression. Early-exits when already typed, so
    /// re-checking is a no-op.
    pub(crate) fn translate_type_expr(&mut self, type_expr: TypeExpr) -> CheckResult<TypeExpr> {
        if type_expr.ty.is_some() {
            return Ok(type_expr);
        }
        let Some(expr) = type_expr.expr else {
            return Ok(type_expr);
        };
        let repr = self.check_term(expr)?;
        let repr = self.expect_a_type_repr(repr)?;
        let ty = self.extract_type_from_repr(repr);
        Ok(TypeExpr { expr: Some(repr), ty: Some(ty) })
    }

    pub(crate) fn expect_a_type_repr(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        let expr = if matches!(self.arena.expr(expr).kind, ExprKind::Overloaded { .. }) {
            self.resolve_overloaded_expr(expr, LookupMask::Type)?
        } else {
            expr
        };

        match self.expr_ty(expr) {
            Type::TypeType(_) | Type::Error => Ok(expr),
            found => {
                let loc = self.arena.expr(expr).loc;
                let found = self.type_string(&found);
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2002)
                        .with_message(format!("expected a type, found `{found}`"))
                        .with_label(loc, ""),
                );
                Ok(self.error_expr(expr))
            }
        }
    }

    fn extract_type_from_repr(&self, expr: ExprId) -> Type {
        match self.expr_ty(expr) {
            Type::TypeType(inner) => *inner,
            _ => Type::Error,
        }
    }

    /// The type an expression denotes, or `error` with a diagnostic.
    pub(crate) fn expect_a_type(&mut self, expr: ExprId) -> CheckResult<Type> {
        let repr = self.expect_a_type_repr(expr)?;
        Ok(self.extract_type_from_repr(repr))
    }

    /// Complete a reference to an unapplied generic with its default
    /// arguments so the result is a proper type.
    pub(crate) fn coerce_to_proper_type(&mut self, type_expr: TypeExpr) -> CheckResult<TypeExpr> {
        let Some(Type::GenericDeclRef(dr)) = &type_expr.ty else {
            return Ok(type_expr);
        };
        let dr = dr.clone();
        self.ensure_decl(dr.decl, CheckState::CheckedHeader)?;

        let loc = type_expr
            .expr
            .map(|e| self.arena.expr(e).loc)
            .unwrap_or(Span::DUMMY);
        let members = self.arena.members(dr.decl).to_vec();
        let mut args = Vec::new();
        for member in members {
            let default = match &self.arena.decl(member).kind {
                DeclKind::GenericTypeParam(p) => p.default.ty.clone().map(Val::Type),
                DeclKind::GenericValueParam(v) => match v.init {
                    Some(init) => self.try_constant_fold_expr(init).map(Val::Int),
                    None => None,
                },
                _ => continue,
            };
            let Some(val) = default else {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2099)
                        .with_message("cannot fill in a default for a generic parameter")
                        .with_label(loc, ""),
                );
                return Ok(TypeExpr { expr: type_expr.expr, ty: Some(Type::Error) });
            };
            args.push(SubstArg { param: member, val });
        }

        let inner = match &self.arena.decl(dr.decl).kind {
            DeclKind::Generic(g) => g.inner,
            _ => {
                return Ok(TypeExpr { expr: type_expr.expr, ty: Some(Type::Error) });
            }
        };
        let subst = Arc::new(shade_types::Subst::new(dr.decl, args, dr.subst.clone()));
        let inner_ref = DeclRef::with_subst(inner, subst);
        Ok(TypeExpr {
            expr: type_expr.expr,
            ty: Some(self.decl_ref_type(&inner_ref)),
        })
    }

    /// Check a type expression and make it proper.
    pub(crate) fn check_proper_type(&mut self, type_expr: TypeExpr) -> CheckResult<TypeExpr> {
        let translated = self.translate_type_expr(type_expr)?;
        self.coerce_to_proper_type(translated)
    }

    /// Check a type expression for use as a variable or parameter type;
    /// `void` is rejected here.
    pub(crate) fn check_usable_type(&mut self, type_expr: TypeExpr) -> CheckResult<TypeExpr> {
        let mut result = self.check_proper_type(type_expr)?;
        if result.ty == Some(Type::Scalar(ScalarType::Void)) {
            let loc = result
                .expr
                .map(|e| self.arena.expr(e).loc)
                .unwrap_or(Span::DUMMY);
            self.diagnose(
                Diagnostic::error(ErrorCode::E2018)
                    .with_message("`void` is not a valid type here")
                    .with_label(loc, ""),
            );
            result.ty = Some(Type::Error);
        }
        Ok(result)
    }

    // ----- misc -----

    /// Implicitly dereference pointer-like bases.
    pub(crate) fn maybe_dereference(&mut self, expr: ExprId) -> ExprId {
        let mut current = expr;
        loop {
            match self.expr_ty(current) {
                Type::PtrLike { .. } => {
                    let loc = self.arena.expr(current).loc;
                    current = self.construct_deref_expr(current, loc);
                }
                _ => return current,
            }
        }
    }
}
