//! Overload resolution.
//!
//! Candidates (functions, generics, constructors) advance through a
//! monotonic status ladder; the context keeps either a unique best
//! candidate or the tied set of ambiguous ones. Completion replays the
//! checks in `ForReal` mode so argument coercions are materialized on the
//! chosen candidate only.

use std::sync::Arc;

use shade_ast::lookup::{Breadcrumb, LookupResultItem};
use shade_ast::{
    AccessorKind, AstArena, CheckState, DeclKind, Expr, ExprId, ExprKind, InvokeStyle, Modifier,
    Span,
};
use shade_diagnostic::{Diagnostic, ErrorCode};
use shade_types::{ConversionCost, DeclId, DeclRef, IntVal, QualType, Subst, SubstArg, Type, Val};

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;

/// What kind of thing a candidate applies.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CandidateFlavor {
    Func,
    /// A generic callable as an implicit specialization.
    Generic,
    /// Placeholder kept when inference failed, to preserve the message.
    UnspecializedGeneric,
}

/// How far a candidate got through checking. The declaration order is the
/// ranking order: further along wins.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub enum CandidateStatus {
    GenericInferenceFailed,
    Unchecked,
    ArityChecked,
    FixityChecked,
    TypeChecked,
    Applicable,
}

#[derive(Clone, Debug)]
pub struct OverloadCandidate {
    pub flavor: CandidateFlavor,
    pub status: CandidateStatus,
    pub item: LookupResultItem,
    /// The type of the call expression if this candidate is chosen.
    pub result_ty: Option<Type>,
    /// Conversion cost accumulated over the arguments.
    pub cost: ConversionCost,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum ResolveMode {
    /// Checking whether a candidate works at all.
    JustTrying,
    /// Updating the AST for the chosen candidate.
    ForReal,
}

/// State for resolving one call to a possibly overloaded callee.
pub(crate) struct OverloadResolveContext {
    pub loc: Span,
    pub func_loc: Span,
    /// The call expression that triggered resolution, when there is one.
    pub original_expr: Option<ExprId>,
    pub style: InvokeStyle,
    pub args: Vec<ExprId>,
    /// Argument types as seen at resolution start; authoritative over the
    /// (possibly rewritten) argument expressions.
    pub arg_types: Vec<Type>,
    pub base_expr: Option<ExprId>,
    pub mode: ResolveMode,
    /// Require exact argument type matches (used by the coercion engine
    /// to prevent recursive conversions).
    pub disallow_nested_conversions: bool,
    /// The unique best candidate so far, when unambiguous.
    pub best: Option<OverloadCandidate>,
    /// The tied best candidates, when ambiguous. Invariant: `best` and a
    /// non-empty `bests` never coexist.
    pub bests: Vec<OverloadCandidate>,
}

impl OverloadResolveContext {
    pub(crate) fn arg_count(&self) -> usize {
        self.arg_types.len().max(self.args.len())
    }

    pub(crate) fn arg_type_with(&self, arena: &AstArena, index: usize) -> Type {
        if let Some(ty) = self.arg_types.get(index) {
            return ty.clone();
        }
        self.args
            .get(index)
            .map(|&arg| arena.expr(arg).type_or_error())
            .unwrap_or(Type::Error)
    }
}

/// Better candidates compare negative, like a three-way comparison.
fn compare_candidates(left: &OverloadCandidate, right: &OverloadCandidate) -> i32 {
    // The candidate that advanced further through checking wins.
    if left.status != right.status {
        return right.status as i32 - left.status as i32;
    }
    // Between applicable candidates, cheaper conversions win.
    if left.status == CandidateStatus::Applicable && left.cost != right.cost {
        return left.cost.0 as i32 - right.cost.0 as i32;
    }
    0
}

impl SemanticsVisitor<'_> {
    /// An error-typed placeholder for paths with no expression to reuse.
    pub(crate) fn fresh_error_expr(&mut self, loc: Span) -> ExprId {
        let mut expr = Expr::new(ExprKind::TypeRef { ty: Type::Error }, loc);
        expr.ty = Some(QualType::error());
        self.arena.alloc_expr(expr)
    }

    /// Required/allowed argument counts for a callable: parameters with
    /// defaults are allowed but not required.
    fn count_parameters(&self, decl: DeclId) -> (usize, usize) {
        let mut required = 0;
        let mut allowed = 0;
        for param in self.callable_params(decl) {
            allowed += 1;
            let (_, _, has_default) = self.param_info(param);
            if !has_default {
                required += 1;
            }
        }
        (required, allowed)
    }

    fn count_generic_parameters(&self, decl: DeclId) -> (usize, usize) {
        let mut required = 0;
        let mut allowed = 0;
        for &member in self.arena.members(decl) {
            match &self.arena.decl(member).kind {
                DeclKind::GenericTypeParam(p) => {
                    allowed += 1;
                    if !p.default.is_present() {
                        required += 1;
                    }
                }
                DeclKind::GenericValueParam(v) => {
                    allowed += 1;
                    if v.init.is_none() {
                        required += 1;
                    }
                }
                _ => {}
            }
        }
        (required, allowed)
    }

    /// Generic type/value parameters, in declaration order.
    pub(crate) fn generic_params(&self, decl: DeclId) -> Vec<DeclId> {
        self.arena.members_where(decl, |d| {
            matches!(
                d.kind,
                DeclKind::GenericTypeParam(_) | DeclKind::GenericValueParam(_)
            )
        })
    }

    // ----- the candidate checks -----

    fn try_check_candidate_arity(
        &mut self,
        ctx: &mut OverloadResolveContext,
        candidate: &OverloadCandidate,
    ) -> bool {
        let arg_count = ctx.arg_count();
        let (required, allowed) = match candidate.flavor {
            CandidateFlavor::Func => self.count_parameters(candidate.item.decl_ref.decl),
            CandidateFlavor::Generic => {
                self.count_generic_parameters(candidate.item.decl_ref.decl)
            }
            CandidateFlavor::UnspecializedGeneric => return true,
        };

        if arg_count >= required && arg_count <= allowed {
            return true;
        }

        if ctx.mode == ResolveMode::ForReal {
            if arg_count < required {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2010)
                        .with_message(format!(
                            "not enough arguments: got {arg_count}, expected at least {required}"
                        ))
                        .with_label(ctx.loc, ""),
                );
            } else {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2011)
                        .with_message(format!(
                            "too many arguments: got {arg_count}, expected at most {allowed}"
                        ))
                        .with_label(ctx.loc, ""),
                );
            }
        }
        false
    }

    fn try_check_candidate_fixity(
        &mut self,
        ctx: &mut OverloadResolveContext,
        candidate: &OverloadCandidate,
    ) -> bool {
        let decl = candidate.item.decl_ref.decl;
        let (wanted, code, what) = match ctx.style {
            InvokeStyle::PrefixOp => (
                self.arena.decl(decl).has_modifier(|m| matches!(m, Modifier::Prefix)),
                ErrorCode::E2012,
                "prefix",
            ),
            InvokeStyle::PostfixOp => (
                self.arena.decl(decl).has_modifier(|m| matches!(m, Modifier::Postfix)),
                ErrorCode::E2013,
                "postfix",
            ),
            _ => return true,
        };
        if wanted {
            return true;
        }
        if ctx.mode == ResolveMode::ForReal {
            let name = self.interner.lookup(self.arena.decl(decl).name).to_owned();
            let decl_loc = self.arena.decl(decl).loc;
            self.diagnose(
                Diagnostic::error(code)
                    .with_message(format!("expected a {what} operator"))
                    .with_label(ctx.loc, ""),
            );
            self.diagnose(
                Diagnostic::note(ErrorCode::E2033)
                    .with_message(format!("see the definition of `{name}`"))
                    .with_label(decl_loc, ""),
            );
        }
        false
    }

    fn try_check_generic_candidate_types(
        &mut self,
        ctx: &mut OverloadResolveContext,
        candidate: &mut OverloadCandidate,
    ) -> CheckResult<bool> {
        let generic_ref = candidate.item.decl_ref.clone();
        let params = self.generic_params(generic_ref.decl);

        let mut index = 0;
        for param in params {
            if index >= ctx.args.len() {
                break;
            }
            let arg = ctx.args[index];
            index += 1;

            match &self.arena.decl(param).kind {
                DeclKind::GenericTypeParam(_) => {
                    // The argument has to denote a type.
                    let is_type = matches!(
                        self.expr_ty(arg),
                        Type::TypeType(_) | Type::Error | Type::Overloaded
                    );
                    if ctx.mode == ResolveMode::JustTrying {
                        if !is_type {
                            return Ok(false);
                        }
                    }
                }
                DeclKind::GenericValueParam(v) => {
                    let param_ty =
                        v.ty.ty_or_error().apply_chain(generic_ref.subst.as_ref());
                    if ctx.mode == ResolveMode::JustTrying {
                        let arg_ty = self.expr_ty(arg);
                        match self.can_coerce(&param_ty, &arg_ty)? {
                            Some(cost) => candidate.cost += cost,
                            None => return Ok(false),
                        }
                    } else {
                        ctx.args[index - 1] = self.coerce(&param_ty, arg)?;
                    }
                }
                _ => {}
            }
        }
        Ok(true)
    }

    fn try_check_candidate_types(
        &mut self,
        ctx: &mut OverloadResolveContext,
        candidate: &mut OverloadCandidate,
    ) -> CheckResult<bool> {
        if candidate.flavor == CandidateFlavor::Generic {
            return self.try_check_generic_candidate_types(ctx, candidate);
        }

        let decl_ref = candidate.item.decl_ref.clone();
        let params = self.callable_params(decl_ref.decl);
        let arg_count = ctx.arg_count();
        // Arity passed, so we have at most as many arguments as
        // parameters (defaults cover the rest).
        debug_assert!(arg_count <= params.len());

        for (index, &param) in params.iter().enumerate().take(arg_count) {
            let (declared, _, _) = self.param_info(param);
            let param_ty = declared.apply_chain(decl_ref.subst.as_ref());

            if ctx.mode == ResolveMode::JustTrying {
                let arg_ty = ctx.arg_type_with(self.arena, index);
                if ctx.disallow_nested_conversions {
                    // An exact match is required on this path.
                    if param_ty != arg_ty {
                        return Ok(false);
                    }
                } else {
                    match self.can_coerce(&param_ty, &arg_ty)? {
                        Some(cost) => candidate.cost += cost,
                        None => return Ok(false),
                    }
                }
            } else {
                let arg = ctx.args[index];
                ctx.args[index] = self.coerce(&param_ty, arg)?;
            }
        }
        Ok(true)
    }

    fn try_check_candidate_directions(
        &mut self,
        _ctx: &mut OverloadResolveContext,
        _candidate: &OverloadCandidate,
    ) -> bool {
        // l-value-ness of arguments to `out` parameters is enforced once
        // the call completes.
        true
    }

    /// Run the checks in order, leaving the status where the first
    /// failure stopped it.
    fn try_check_candidate(
        &mut self,
        ctx: &mut OverloadResolveContext,
        candidate: &mut OverloadCandidate,
    ) -> CheckResult<()> {
        if !self.try_check_candidate_arity(ctx, candidate) {
            return Ok(());
        }
        candidate.status = CandidateStatus::ArityChecked;

        if !self.try_check_candidate_fixity(ctx, candidate) {
            return Ok(());
        }
        candidate.status = CandidateStatus::FixityChecked;

        if !self.try_check_candidate_types(ctx, candidate)? {
            return Ok(());
        }
        candidate.status = CandidateStatus::TypeChecked;

        if !self.try_check_candidate_directions(ctx, candidate) {
            return Ok(());
        }
        candidate.status = CandidateStatus::Applicable;
        Ok(())
    }

    /// Rank the candidate against the current winners and keep whichever
    /// survive. Either the single `best` slot holds the unique winner, or
    /// `bests` holds the tied set.
    pub(crate) fn add_candidate_inner(
        &mut self,
        ctx: &mut OverloadResolveContext,
        candidate: OverloadCandidate,
    ) {
        let mut keep = true;

        if !ctx.bests.is_empty() {
            let mut index = 0;
            while index < ctx.bests.len() {
                let cmp = compare_candidates(&candidate, &ctx.bests[index]);
                if cmp < 0 {
                    // The new candidate is strictly better.
                    ctx.bests.swap_remove(index);
                } else {
                    if cmp > 0 {
                        keep = false;
                    }
                    index += 1;
                }
            }
        } else if let Some(best) = &ctx.best {
            let cmp = compare_candidates(&candidate, best);
            if cmp < 0 {
                ctx.best = None;
            } else if cmp > 0 {
                keep = false;
            }
        }

        if !keep {
            return;
        }

        if !ctx.bests.is_empty() {
            ctx.bests.push(candidate);
        } else if let Some(previous) = ctx.best.take() {
            ctx.bests.push(previous);
            ctx.bests.push(candidate);
        } else {
            ctx.best = Some(candidate);
        }
    }

    pub(crate) fn add_candidate(
        &mut self,
        ctx: &mut OverloadResolveContext,
        mut candidate: OverloadCandidate,
    ) -> CheckResult<()> {
        self.try_check_candidate(ctx, &mut candidate)?;
        self.add_candidate_inner(ctx, candidate);
        Ok(())
    }

    // ----- enumerating candidates -----

    fn add_func_overload_candidate(
        &mut self,
        item: LookupResultItem,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<()> {
        self.ensure_decl(item.decl_ref.decl, CheckState::CheckedHeader)?;
        let result_ty = self.callable_result_type(&item.decl_ref);
        let candidate = OverloadCandidate {
            flavor: CandidateFlavor::Func,
            status: CandidateStatus::Unchecked,
            item,
            result_ty: Some(result_ty),
            cost: ConversionCost::NONE,
        };
        self.add_candidate(ctx, candidate)
    }

    fn add_ctor_overload_candidate(
        &mut self,
        type_item: &LookupResultItem,
        ty: &Type,
        ctor_ref: DeclRef,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<()> {
        self.ensure_decl(ctor_ref.decl, CheckState::CheckedHeader)?;

        // The lookup item referred to the type being constructed; the
        // candidate must refer to the constructor, reached through it.
        let ctor_item = LookupResultItem {
            decl_ref: ctor_ref,
            breadcrumbs: Some(Arc::new(Breadcrumb::Member {
                decl_ref: type_item.decl_ref.clone(),
                next: type_item.breadcrumbs.clone(),
            })),
        };

        let candidate = OverloadCandidate {
            flavor: CandidateFlavor::Func,
            status: CandidateStatus::Unchecked,
            item: ctor_item,
            result_ty: Some(ty.clone()),
            cost: ConversionCost::NONE,
        };
        self.add_candidate(ctx, candidate)
    }

    fn add_agg_type_overload_candidates(
        &mut self,
        type_item: &LookupResultItem,
        ty: &Type,
        agg_ref: &DeclRef,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<()> {
        let ctors = self
            .arena
            .members_where(agg_ref.decl, |d| matches!(d.kind, DeclKind::Constructor(_)));
        for ctor in ctors {
            self.add_ctor_overload_candidate(type_item, ty, agg_ref.member(ctor), ctx)?;
        }

        let extensions: Vec<DeclId> = self
            .arena
            .decl(agg_ref.decl)
            .kind
            .as_agg()
            .map(|agg| agg.candidate_extensions.clone())
            .unwrap_or_default();
        for ext in extensions {
            let Some(ext_ref) = self.apply_extension_to_type(ext, ty)? else {
                continue;
            };

            let ctors = self
                .arena
                .members_where(ext, |d| matches!(d.kind, DeclKind::Constructor(_)));
            for ctor in ctors {
                self.add_ctor_overload_candidate(type_item, ty, ext_ref.member(ctor), ctx)?;
            }

            // Generic constructors contributed by the extension.
            let generics = self
                .arena
                .members_where(ext, |d| matches!(d.kind, DeclKind::Generic(_)));
            for generic in generics {
                let inner = match &self.arena.decl(generic).kind {
                    DeclKind::Generic(g) => g.inner,
                    _ => continue,
                };
                if !matches!(self.arena.decl(inner).kind, DeclKind::Constructor(_)) {
                    continue;
                }
                let generic_ref = ext_ref.member(generic);
                let Some(inner_ref) = self.specialize_generic_for_overload(&generic_ref, ctx)?
                else {
                    continue;
                };
                self.add_ctor_overload_candidate(type_item, ty, inner_ref, ctx)?;
            }
        }
        Ok(())
    }

    /// Enumerate the constructors usable to build a value of `ty`.
    pub(crate) fn add_type_overload_candidates(
        &mut self,
        ty: &Type,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<()> {
        match ty {
            Type::DeclRef(dr) if self.arena.decl(dr.decl).kind.as_agg().is_some() => {
                let dr = dr.clone();
                let item = LookupResultItem::new(dr.clone());
                self.add_agg_type_overload_candidates(&item, ty, &dr, ctx)
            }
            Type::Scalar(scalar) => {
                // Scalars lower away their declaration; recover it so
                // their conversion constructors are reachable.
                let Some(decl) = self.session.scalar_decl(*scalar) else {
                    return Ok(());
                };
                let dr = DeclRef::new(decl);
                let item = LookupResultItem::new(dr.clone());
                self.add_agg_type_overload_candidates(&item, ty, &dr, ctx)
            }
            Type::Vector { .. } | Type::Matrix { .. } => {
                // Vector and matrix shapes anchor on the magic
                // declarations, where extensions may contribute
                // constructors.
                let kind = match ty {
                    Type::Vector { .. } => shade_ast::MagicKind::Vector,
                    _ => shade_ast::MagicKind::Matrix,
                };
                let Some(decl) = self.magic_inner_decl(kind) else {
                    return Ok(());
                };
                let dr = DeclRef::new(decl);
                let item = LookupResultItem::new(dr.clone());
                self.add_agg_type_overload_candidates(&item, ty, &dr, ctx)
            }
            _ => Ok(()),
        }
    }

    fn add_decl_ref_overload_candidates(
        &mut self,
        item: LookupResultItem,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<()> {
        enum Class {
            Callable,
            Agg,
            Generic,
            Alias(Type),
            Other,
        }
        let class = match &self.arena.decl(item.decl_ref.decl).kind {
            kind if kind.is_callable() => Class::Callable,
            DeclKind::Struct(_) | DeclKind::Class(_) | DeclKind::Interface(_) => Class::Agg,
            DeclKind::Generic(_) => Class::Generic,
            DeclKind::TypeDef(td) => Class::Alias(td.target.ty_or_error()),
            _ => Class::Other,
        };

        match class {
            Class::Callable => self.add_func_overload_candidate(item, ctx),
            Class::Agg => {
                let ty = self.decl_ref_type(&item.decl_ref);
                let dr = item.decl_ref.clone();
                self.add_agg_type_overload_candidates(&item, &ty, &dr, ctx)
            }
            Class::Generic => {
                // Infer generic arguments from the call site.
                match self.specialize_generic_for_overload(&item.decl_ref, ctx)? {
                    Some(inner_ref) => {
                        let inner_item = LookupResultItem {
                            decl_ref: inner_ref,
                            breadcrumbs: item.breadcrumbs.clone(),
                        };
                        self.add_decl_ref_overload_candidates(inner_item, ctx)
                    }
                    None => {
                        // Keep a candidate around to report the failure.
                        let candidate = OverloadCandidate {
                            flavor: CandidateFlavor::UnspecializedGeneric,
                            status: CandidateStatus::GenericInferenceFailed,
                            item,
                            result_ty: None,
                            cost: ConversionCost::NONE,
                        };
                        self.add_candidate_inner(ctx, candidate);
                        Ok(())
                    }
                }
            }
            Class::Alias(ty) => {
                let ty = ty.apply_chain(item.decl_ref.subst.as_ref());
                self.add_type_overload_candidates(&ty, ctx)
            }
            Class::Other => Ok(()),
        }
    }

    /// Gather candidates from whatever the callee expression resolved to.
    pub(crate) fn add_overload_candidates_for_callee(
        &mut self,
        callee: ExprId,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<()> {
        let kind = self.arena.expr(callee).kind.clone();
        match kind {
            ExprKind::Var { decl: Some(dr), .. }
            | ExprKind::Member { decl: Some(dr), .. }
            | ExprKind::StaticMember { decl: Some(dr), .. } => {
                self.add_decl_ref_overload_candidates(LookupResultItem::new(dr), ctx)
            }
            ExprKind::Overloaded { lookup, .. } => {
                for item in lookup.items {
                    self.add_decl_ref_overload_candidates(item, ctx)?;
                }
                Ok(())
            }
            _ => {
                // A type in callee position is a constructor call.
                if let Type::TypeType(ty) = self.expr_ty(callee) {
                    self.add_type_overload_candidates(&ty, ctx)?;
                }
                Ok(())
            }
        }
    }

    /// Candidates for explicit generic application `base<args...>`.
    pub(crate) fn add_generic_overload_candidates(
        &mut self,
        base: ExprId,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<()> {
        let kind = self.arena.expr(base).kind.clone();
        match kind {
            ExprKind::Var { decl: Some(dr), .. }
            | ExprKind::Member { decl: Some(dr), .. }
            | ExprKind::StaticMember { decl: Some(dr), .. } => {
                self.add_generic_overload_candidate(LookupResultItem::new(dr), ctx)
            }
            ExprKind::Overloaded { lookup, .. } => {
                // Each of the referenced declarations might be generic.
                for item in lookup.items {
                    self.add_generic_overload_candidate(item, ctx)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn add_generic_overload_candidate(
        &mut self,
        item: LookupResultItem,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<()> {
        if !matches!(self.arena.decl(item.decl_ref.decl).kind, DeclKind::Generic(_)) {
            return Ok(());
        }
        self.ensure_decl(item.decl_ref.decl, CheckState::CheckedHeader)?;

        let candidate = OverloadCandidate {
            flavor: CandidateFlavor::Generic,
            status: CandidateStatus::Unchecked,
            item,
            result_ty: None,
            cost: ConversionCost::NONE,
        };
        self.add_candidate(ctx, candidate)
    }

    // ----- generic specialization -----

    /// Specialize a generic's parameters so its inner declaration can
    /// apply at this call site, by unifying parameter and argument types.
    pub(crate) fn specialize_generic_for_overload(
        &mut self,
        generic_ref: &DeclRef,
        ctx: &mut OverloadResolveContext,
    ) -> CheckResult<Option<DeclRef>> {
        let inner = match &self.arena.decl(generic_ref.decl).kind {
            DeclKind::Generic(g) => g.inner,
            _ => return Ok(None),
        };
        if !self.arena.decl(inner).kind.is_callable() {
            return Ok(None);
        }

        let params = self.callable_params(inner);
        if ctx.arg_count() != params.len() {
            return Ok(None);
        }

        let mut system = crate::infer::ConstraintSystem::new();
        for (index, &param) in params.iter().enumerate() {
            let (declared, _, _) = self.param_info(param);
            // Outer substitutions apply, but not the generic's own: those
            // are what we are solving for. A unification miss is not an
            // immediate failure; the solved candidate gets re-checked
            // with coercion anyway.
            let param_ty = declared.apply_chain(generic_ref.subst.as_ref());
            let arg_ty = ctx.arg_type_with(self.arena, index);
            let _ = self.try_unify_types(&mut system, &arg_ty, &param_ty)?;
        }

        let Some(solution) = self.try_solve_constraint_system(&mut system, generic_ref)? else {
            return Ok(None);
        };
        Ok(Some(DeclRef::with_subst(inner, solution)))
    }

    /// Build the expression for a generic applied to explicit arguments.
    pub(crate) fn create_generic_decl_ref(
        &mut self,
        base: ExprId,
        original_loc: Span,
        args: &[ExprId],
    ) -> CheckResult<ExprId> {
        let base_ref = match &self.arena.expr(base).kind {
            ExprKind::Var { decl: Some(dr), .. }
            | ExprKind::Member { decl: Some(dr), .. }
            | ExprKind::StaticMember { decl: Some(dr), .. } => dr.clone(),
            _ => {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E9001)
                        .with_message("expected a reference to a generic declaration")
                        .with_label(original_loc, ""),
                );
                return Ok(self.fresh_error_expr(original_loc));
            }
        };
        let inner = match &self.arena.decl(base_ref.decl).kind {
            DeclKind::Generic(g) => g.inner,
            _ => {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E9001)
                        .with_message("expected a reference to a generic declaration")
                        .with_label(original_loc, ""),
                );
                return Ok(self.fresh_error_expr(original_loc));
            }
        };

        let params = self.generic_params(base_ref.decl);
        let mut subst_args = Vec::new();
        for (index, &param) in params.iter().enumerate() {
            let Some(&arg) = args.get(index) else {
                break;
            };
            let val = match &self.arena.decl(param).kind {
                DeclKind::GenericTypeParam(_) => Val::Type(self.expect_a_type(arg)?),
                DeclKind::GenericValueParam(_) => Val::Int(
                    self.check_integer_constant_expression(arg)?
                        .unwrap_or(IntVal::Const(0)),
                ),
                _ => continue,
            };
            subst_args.push(SubstArg { param, val });
        }

        let subst = Arc::new(Subst::new(base_ref.decl, subst_args, base_ref.subst.clone()));
        self.construct_decl_ref_expr(DeclRef::with_subst(inner, subst), None, original_loc)
    }

    // ----- completion -----

    /// Finish the chosen candidate: replay checks in `ForReal` mode so
    /// coercions land on the arguments, then build the call expression.
    pub(crate) fn complete_overload_candidate(
        &mut self,
        ctx: &mut OverloadResolveContext,
        candidate: &mut OverloadCandidate,
    ) -> CheckResult<ExprId> {
        if candidate.status == CandidateStatus::GenericInferenceFailed {
            let call_string = self.call_signature_string(ctx);
            let signature = self.decl_signature_string(&candidate.item.decl_ref);
            let decl_loc = self.arena.decl(candidate.item.decl_ref.decl).loc;
            self.diagnose(
                Diagnostic::error(ErrorCode::E2009)
                    .with_message(format!(
                        "could not infer generic arguments for call with arguments {call_string}"
                    ))
                    .with_label(ctx.loc, ""),
            );
            self.diagnose(
                Diagnostic::note(ErrorCode::E2032)
                    .with_message(format!("tried: {signature}"))
                    .with_label(decl_loc, ""),
            );
            return self.complete_with_error(ctx);
        }

        ctx.mode = ResolveMode::ForReal;

        if !self.try_check_candidate_arity(ctx, candidate)
            || !self.try_check_candidate_fixity(ctx, candidate)
            || !self.try_check_candidate_types(ctx, candidate)?
            || !self.try_check_candidate_directions(ctx, candidate)
        {
            return self.complete_with_error(ctx);
        }

        let base = self.construct_lookup_result_expr(
            &candidate.item,
            ctx.base_expr,
            ctx.func_loc,
        )?;

        match candidate.flavor {
            CandidateFlavor::Func => {
                let result_ty = candidate.result_ty.clone().unwrap_or(Type::Error);
                let mut qual = QualType::rvalue(result_ty);

                // A subscript exposing a setter yields an l-value.
                if matches!(
                    self.arena.decl(candidate.item.decl_ref.decl).kind,
                    DeclKind::Subscript(_)
                ) {
                    let has_setter = self
                        .arena
                        .members(candidate.item.decl_ref.decl)
                        .iter()
                        .any(|&m| {
                            matches!(
                                self.arena.decl(m).kind,
                                DeclKind::Accessor(AccessorKind::Setter)
                            )
                        });
                    if has_setter {
                        qual.is_lvalue = true;
                    }
                }

                let invoke = match ctx.original_expr {
                    Some(expr)
                        if matches!(self.arena.expr(expr).kind, ExprKind::Invoke { .. }) =>
                    {
                        expr
                    }
                    _ => self
                        .arena
                        .alloc_expr(Expr::new(
                            ExprKind::Invoke {
                                callee: base,
                                args: Vec::new(),
                                style: ctx.style,
                            },
                            ctx.loc,
                        )),
                };
                self.arena.expr_mut(invoke).kind = ExprKind::Invoke {
                    callee: base,
                    args: ctx.args.clone(),
                    style: ctx.style,
                };
                self.arena.expr_mut(invoke).ty = Some(qual);
                Ok(invoke)
            }
            CandidateFlavor::Generic => {
                let args = ctx.args.clone();
                self.create_generic_decl_ref(base, ctx.loc, &args)
            }
            CandidateFlavor::UnspecializedGeneric => {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E9001)
                        .with_message("unexpected overload candidate flavor")
                        .with_label(ctx.loc, ""),
                );
                self.complete_with_error(ctx)
            }
        }
    }

    fn complete_with_error(&mut self, ctx: &mut OverloadResolveContext) -> CheckResult<ExprId> {
        match ctx.original_expr {
            Some(expr) => Ok(self.error_expr(expr)),
            None => Ok(self.fresh_error_expr(ctx.loc)),
        }
    }

    // ----- driving resolution for a call -----

    /// Resolve an invoke expression against everything its callee might
    /// mean, and rewrite it for the winning candidate.
    pub(crate) fn resolve_invoke(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        let (callee, args, style) = match &self.arena.expr(expr).kind {
            ExprKind::Invoke { callee, args, style } => (*callee, args.clone(), *style),
            _ => return Ok(self.error_expr(expr)),
        };
        let loc = self.arena.expr(expr).loc;

        // A bad callee, or any bad argument, poisons the call: resolving
        // it anyway could pick an overload the user never meant.
        if self.is_error_expr(callee) {
            return Ok(self.error_expr(expr));
        }
        for &arg in &args {
            if self.is_error_expr(arg) {
                return Ok(self.error_expr(expr));
            }
        }

        let arg_types: Vec<Type> = args.iter().map(|&a| self.expr_ty(a)).collect();
        let mut ctx = OverloadResolveContext {
            loc,
            func_loc: self.arena.expr(callee).loc,
            original_expr: Some(expr),
            style,
            args,
            arg_types,
            base_expr: self.base_of(callee),
            mode: ResolveMode::JustTrying,
            disallow_nested_conversions: false,
            best: None,
            bests: Vec::new(),
        };

        self.add_overload_candidates_for_callee(callee, &mut ctx)?;

        if !ctx.bests.is_empty() {
            let callee_name = match &self.arena.expr(callee).kind {
                ExprKind::Var { name, .. }
                | ExprKind::Member { name, .. }
                | ExprKind::StaticMember { name, .. } => {
                    Some(self.interner.lookup(*name).to_owned())
                }
                _ => None,
            };
            let args_list = self.call_signature_string(&ctx);

            if ctx.bests[0].status != CandidateStatus::Applicable {
                // Equally good candidates, none usable.
                let message = match &callee_name {
                    Some(name) => {
                        format!("no applicable overload for `{name}` with arguments {args_list}")
                    }
                    None => format!("no applicable overload with arguments {args_list}"),
                };
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2007)
                        .with_message(message)
                        .with_label(loc, ""),
                );
            } else {
                let message = match &callee_name {
                    Some(name) => {
                        format!("ambiguous overload for `{name}` with arguments {args_list}")
                    }
                    None => format!("ambiguous overload with arguments {args_list}"),
                };
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2008)
                        .with_message(message)
                        .with_label(loc, ""),
                );
            }

            const MAX_CANDIDATES_TO_PRINT: usize = 10;
            let total = ctx.bests.len();
            for candidate in ctx.bests.iter().take(MAX_CANDIDATES_TO_PRINT) {
                let signature = self.decl_signature_string(&candidate.item.decl_ref);
                let decl_loc = self.arena.decl(candidate.item.decl_ref.decl).loc;
                self.diagnose(
                    Diagnostic::note(ErrorCode::E2032)
                        .with_message(format!("candidate: {signature} [{}]", candidate.cost))
                        .with_label(decl_loc, ""),
                );
            }
            if total > MAX_CANDIDATES_TO_PRINT {
                self.diagnose(
                    Diagnostic::note(ErrorCode::E2034).with_message(format!(
                        "{} more candidates not shown",
                        total - MAX_CANDIDATES_TO_PRINT
                    )),
                );
            }

            return Ok(self.error_expr(expr));
        }

        if let Some(mut best) = ctx.best.take() {
            // One best candidate, applicable or not; completing it gives
            // the most helpful errors either way.
            return self.complete_overload_candidate(&mut ctx, &mut best);
        }

        // Nothing was even worth considering.
        let func_loc = self.arena.expr(callee).loc;
        self.diagnose(
            Diagnostic::error(ErrorCode::E2004)
                .with_message("expected a function")
                .with_label(func_loc, ""),
        );
        Ok(self.error_expr(expr))
    }
}
