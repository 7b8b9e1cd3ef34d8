//! Declaration checking.
//!
//! `check_decl_dispatch` routes a declaration to its variant checker; the
//! module visitor fixes the order everything happens in, which matters:
//! registration, imports, typedefs, aggregates, generics, extensions,
//! function headers, function bodies, then the exhaustive re-check and
//! the modifier pass.

use rustc_hash::FxHashSet;

use shade_ast::{CheckState, DeclKind, Modifier, Scope, ScopeId, TypeExpr};
use shade_diagnostic::{Diagnostic, ErrorCode};
use shade_types::{DeclId, IntVal, Type};

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;

impl SemanticsVisitor<'_> {
    /// Dispatch to the checker for this declaration's variant.
    pub(crate) fn check_decl_dispatch(&mut self, decl: DeclId) -> CheckResult<()> {
        enum Variant {
            Module,
            Import,
            TypeDef,
            Agg,
            Interface,
            Field,
            Variable,
            Param,
            Func,
            Constructor,
            Subscript,
            Generic,
            GenericValueParam,
            Constraint,
            Extension,
            Inheritance,
            Nothing,
        }
        let variant = match &self.arena.decl(decl).kind {
            DeclKind::Module(_) => Variant::Module,
            DeclKind::Import(_) => Variant::Import,
            DeclKind::TypeDef(_) => Variant::TypeDef,
            DeclKind::Struct(_) | DeclKind::Class(_) => Variant::Agg,
            DeclKind::Interface(_) => Variant::Interface,
            DeclKind::Field(_) => Variant::Field,
            DeclKind::Variable(_) => Variant::Variable,
            DeclKind::Param(_) => Variant::Param,
            DeclKind::Func(_) => Variant::Func,
            DeclKind::Constructor(_) => Variant::Constructor,
            DeclKind::Subscript(_) => Variant::Subscript,
            DeclKind::Generic(_) => Variant::Generic,
            DeclKind::GenericValueParam(_) => Variant::GenericValueParam,
            DeclKind::GenericConstraint(_) => Variant::Constraint,
            DeclKind::Extension(_) => Variant::Extension,
            DeclKind::Inheritance(_) => Variant::Inheritance,
            DeclKind::GenericTypeParam(_) | DeclKind::Accessor(_) | DeclKind::Empty => {
                Variant::Nothing
            }
        };

        match variant {
            Variant::Module => self.visit_module(decl),
            Variant::Import => self.visit_import(decl),
            Variant::TypeDef => self.visit_typedef(decl),
            Variant::Agg => self.visit_agg(decl),
            Variant::Interface => Ok(()),
            Variant::Field => self.visit_field(decl),
            Variant::Variable => self.visit_variable(decl),
            Variant::Param => self.visit_param(decl),
            Variant::Func => self.visit_func(decl),
            Variant::Constructor => self.visit_constructor(decl),
            Variant::Subscript => self.visit_subscript(decl),
            Variant::Generic => self.visit_generic(decl),
            Variant::GenericValueParam => self.check_var_decl_common(decl),
            Variant::Constraint => self.visit_generic_constraint(decl),
            Variant::Extension => self.visit_extension(decl),
            Variant::Inheritance => self.visit_inheritance(decl),
            Variant::Nothing => Ok(()),
        }
    }

    // ----- the module, in checking order -----

    fn visit_module(&mut self, module: DeclId) -> CheckResult<()> {
        let members = self.arena.members(module).to_vec();

        // Register tagged declarations so compiler-known types become
        // findable before anything references them.
        for &member in &members {
            let inner = match &self.arena.decl(member).kind {
                DeclKind::Generic(g) => g.inner,
                _ => member,
            };
            if let Some(scalar) = self.arena.decl(inner).builtin_scalar() {
                self.session.register_builtin_decl(scalar, inner);
            }
            if let Some(kind) = self.arena.decl(inner).magic_kind() {
                self.session.register_magic_decl(kind, member);
            }
        }

        // Imports first, so scoping works for everything after.
        for &member in &members {
            if matches!(self.arena.decl(member).kind, DeclKind::Import(_)) {
                self.ensure_decl(member, CheckState::Checked)?;
            }
        }

        for &member in &members {
            if matches!(self.arena.decl(member).kind, DeclKind::TypeDef(_)) {
                self.check_decl(member)?;
            }
        }
        for &member in &members {
            if matches!(
                self.arena.decl(member).kind,
                DeclKind::Struct(_) | DeclKind::Class(_)
            ) {
                self.check_decl(member)?;
            }
        }
        for &member in &members {
            if matches!(self.arena.decl(member).kind, DeclKind::Generic(_)) {
                self.check_decl(member)?;
            }
        }
        // Extensions register themselves on their target types here, so
        // their members are visible to overload resolution in bodies.
        for &member in &members {
            if matches!(self.arena.decl(member).kind, DeclKind::Extension(_)) {
                self.check_decl(member)?;
            }
        }

        // Function headers before any bodies, so mutual recursion and
        // redeclaration validation see every signature.
        for &member in &members {
            if matches!(self.arena.decl(member).kind, DeclKind::Func(_))
                && !self.arena.decl(member).is_checked(CheckState::Checked)
            {
                self.visit_function_header(member)?;
            }
        }
        for &member in &members {
            if matches!(self.arena.decl(member).kind, DeclKind::Func(_)) {
                self.ensure_decl(member, CheckState::Checked)?;
            }
        }

        if self.sink.error_count() != 0 {
            return Ok(());
        }

        // Force everything to be fully checked.
        for &member in &members {
            self.ensure_all_decls_rec(member)?;
        }

        for &member in &members {
            self.check_modifiers(member)?;
        }
        Ok(())
    }

    pub(crate) fn ensure_all_decls_rec(&mut self, decl: DeclId) -> CheckResult<()> {
        self.ensure_decl(decl, CheckState::Checked)?;
        for member in self.arena.members(decl).to_vec() {
            self.ensure_all_decls_rec(member)?;
        }
        if let DeclKind::Generic(g) = &self.arena.decl(decl).kind {
            let inner = g.inner;
            self.ensure_all_decls_rec(inner)?;
        }
        Ok(())
    }

    // ----- imports -----

    fn visit_import(&mut self, decl: DeclId) -> CheckResult<()> {
        if self.arena.decl(decl).is_checked(CheckState::Checked) {
            return Ok(());
        }
        let (module_name, scope) = match &self.arena.decl(decl).kind {
            DeclKind::Import(data) => (data.module_name, data.scope),
            _ => return Ok(()),
        };

        // The loader reports its own failures.
        let Some(module) = self.loader.find_or_import_module(module_name) else {
            return Ok(());
        };

        if let DeclKind::Import(data) = &mut self.arena.decl_mut(decl).kind {
            data.imported = Some(module);
        }
        self.import_module_into_scope(scope, module);
        self.arena.decl_mut(decl).state = CheckState::Checked;
        Ok(())
    }

    /// Splice a module's scope in as a sibling of `scope`. Idempotent
    /// across duplicate imports; re-exported imports splice transitively.
    fn import_module_into_scope(&mut self, scope: ScopeId, module: DeclId) {
        if !self.imported_modules.insert(module) {
            return;
        }

        let next = self.arena.scope(scope).next_sibling;
        let sub = self.arena.alloc_scope(Scope {
            container: Some(module),
            parent: None,
            next_sibling: next,
        });
        self.arena.scope_mut(scope).next_sibling = Some(sub);

        let imports = self
            .arena
            .members_where(module, |d| matches!(d.kind, DeclKind::Import(_)));
        for import in imports {
            let exported = self
                .arena
                .decl(import)
                .has_modifier(|m| matches!(m, Modifier::Exported));
            if !exported {
                continue;
            }
            let inner = match &self.arena.decl(import).kind {
                DeclKind::Import(data) => data.imported,
                _ => None,
            };
            if let Some(inner_module) = inner {
                self.import_module_into_scope(scope, inner_module);
            }
        }
    }

    // ----- type declarations -----

    fn visit_typedef(&mut self, decl: DeclId) -> CheckResult<()> {
        if self.arena.decl(decl).is_checked(CheckState::Checked) {
            return Ok(());
        }
        self.arena.decl_mut(decl).state = CheckState::CheckingHeader;
        let target = match &self.arena.decl(decl).kind {
            DeclKind::TypeDef(data) => data.target.clone(),
            _ => return Ok(()),
        };
        let target = self.check_proper_type(target)?;
        if let DeclKind::TypeDef(data) = &mut self.arena.decl_mut(decl).kind {
            data.target = target;
        }
        self.arena.decl_mut(decl).state = CheckState::Checked;
        Ok(())
    }

    /// Struct and class bodies: fields only; everything else is checked
    /// on demand or by the exhaustive pass.
    fn visit_agg(&mut self, decl: DeclId) -> CheckResult<()> {
        if self.arena.decl(decl).is_checked(CheckState::Checked) {
            return Ok(());
        }
        self.arena.decl_mut(decl).state = CheckState::Checked;

        let fields = self
            .arena
            .members_where(decl, |d| matches!(d.kind, DeclKind::Field(_)));
        for field in fields {
            self.check_decl(field)?;
        }
        Ok(())
    }

    fn visit_field(&mut self, decl: DeclId) -> CheckResult<()> {
        let ty = match &self.arena.decl(decl).kind {
            DeclKind::Field(v) => v.ty.clone(),
            _ => return Ok(()),
        };
        let ty = self.check_usable_type(ty)?;
        if let DeclKind::Field(v) = &mut self.arena.decl_mut(decl).kind {
            v.ty = ty;
        }
        self.arena.decl_mut(decl).state = CheckState::Checked;
        Ok(())
    }

    // ----- variables -----

    pub(crate) fn visit_variable(&mut self, decl: DeclId) -> CheckResult<()> {
        let data = match &self.arena.decl(decl).kind {
            DeclKind::Variable(v) => v.clone(),
            _ => return Ok(()),
        };

        let ty = self.check_usable_type(data.ty)?;
        if let DeclKind::Variable(v) = &mut self.arena.decl_mut(decl).kind {
            v.ty = ty;
        }

        if let Some(init) = data.init {
            let init = self.check_term(init)?;
            if let DeclKind::Variable(v) = &mut self.arena.decl_mut(decl).kind {
                v.init = Some(init);
            }
        }

        // An array variable may infer its size from the initializer, and
        // the declared-or-inferred size has to hold up.
        self.maybe_infer_array_size(decl);
        self.validate_array_size(decl);

        let data = match &self.arena.decl(decl).kind {
            DeclKind::Variable(v) => v.clone(),
            _ => return Ok(()),
        };
        if let Some(init) = data.init {
            let coerced = self.coerce(&data.ty.ty_or_error(), init)?;
            if let DeclKind::Variable(v) = &mut self.arena.decl_mut(decl).kind {
                v.init = Some(coerced);
            }
        }

        self.arena.decl_mut(decl).state = CheckState::Checked;
        Ok(())
    }

    fn maybe_infer_array_size(&mut self, decl: DeclId) {
        let data = match &self.arena.decl(decl).kind {
            DeclKind::Variable(v) => v.clone(),
            _ => return,
        };
        // Only unsized arrays with initializers are eligible.
        let Some(Type::Array { elem, count: None }) = data.ty.ty else {
            return;
        };
        let Some(init) = data.init else {
            return;
        };

        let count = match &self.arena.expr(init).kind {
            shade_ast::ExprKind::InitializerList { args } => Some(IntVal::Const(args.len() as i64)),
            _ => match self.expr_ty(init) {
                Type::Array { count: Some(count), .. } => Some(count),
                _ => None,
            },
        };
        let Some(count) = count else { return };

        if let DeclKind::Variable(v) = &mut self.arena.decl_mut(decl).kind {
            v.ty.ty = Some(Type::Array { elem, count: Some(count) });
        }
    }

    fn validate_array_size(&mut self, decl: DeclId) {
        let ty = match &self.arena.decl(decl).kind {
            DeclKind::Variable(v) => v.ty.ty.clone(),
            _ => return,
        };
        let Some(Type::Array { count: Some(count), .. }) = ty else {
            // Unsized arrays are allowed here; some dialects permit them.
            return;
        };
        // A symbolic bound is taken on faith.
        let min_bound = count.as_const().unwrap_or(1);
        if min_bound <= 0 {
            let loc = self.arena.decl(decl).loc;
            self.diagnose(
                Diagnostic::error(ErrorCode::E2014)
                    .with_message("invalid array size")
                    .with_label(loc, ""),
            );
        }
    }

    /// Shared variable-like checking for generic value parameters.
    fn check_var_decl_common(&mut self, decl: DeclId) -> CheckResult<()> {
        let data = match &self.arena.decl(decl).kind {
            DeclKind::GenericValueParam(v) => v.clone(),
            _ => return Ok(()),
        };

        let ty = if data.ty.is_present() {
            Some(self.check_usable_type(data.ty.clone())?)
        } else {
            None
        };

        let mut init = data.init;
        if let Some(expr) = init {
            init = Some(self.check_term(expr)?);
        }

        match (&ty, init) {
            (Some(ty), Some(expr)) => {
                init = Some(self.coerce(&ty.ty_or_error(), expr)?);
            }
            (None, _) => {
                let loc = self.arena.decl(decl).loc;
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2099)
                        .with_message("a value parameter needs an explicit type")
                        .with_label(loc, ""),
                );
            }
            _ => {}
        }

        if let DeclKind::GenericValueParam(v) = &mut self.arena.decl_mut(decl).kind {
            if let Some(ty) = ty {
                v.ty = ty;
            }
            v.init = init;
        }
        Ok(())
    }

    // ----- functions -----

    pub(crate) fn visit_param(&mut self, decl: DeclId) -> CheckResult<()> {
        let ty = match &self.arena.decl(decl).kind {
            DeclKind::Param(p) => p.var.ty.clone(),
            _ => return Ok(()),
        };
        let ty = self.check_usable_type(ty)?;
        if let DeclKind::Param(p) = &mut self.arena.decl_mut(decl).kind {
            p.var.ty = ty;
        }
        Ok(())
    }

    /// Check a function's signature: return type, parameters, duplicate
    /// parameter names, and redeclaration validity.
    pub(crate) fn visit_function_header(&mut self, func: DeclId) -> CheckResult<()> {
        if self.arena.decl(func).is_checked(CheckState::CheckedHeader) {
            return Ok(());
        }
        self.arena.decl_mut(func).state = CheckState::CheckingHeader;

        let previous_function = self.function.replace(func);

        let return_ty = match &self.arena.decl(func).kind {
            DeclKind::Func(f) => f.return_ty.clone(),
            _ => TypeExpr::none(),
        };
        let return_ty = self.check_proper_type(return_ty)?;
        if let DeclKind::Func(f) = &mut self.arena.decl_mut(func).kind {
            f.return_ty = return_ty;
        }

        let mut seen_names = FxHashSet::default();
        for param in self.callable_params(func) {
            self.check_decl(param)?;

            let name = self.arena.decl(param).name;
            if !seen_names.insert(name) {
                let text = self.interner.lookup(name).to_owned();
                let loc = self.arena.decl(param).loc;
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2019)
                        .with_message(format!("parameter `{text}` already defined"))
                        .with_label(loc, ""),
                );
            }
        }

        self.function = previous_function;
        self.arena.decl_mut(func).state = CheckState::CheckedHeader;

        self.validate_function_redeclaration(func)?;
        Ok(())
    }

    fn visit_func(&mut self, func: DeclId) -> CheckResult<()> {
        if self.arena.decl(func).is_checked(CheckState::Checked) {
            return Ok(());
        }
        self.visit_function_header(func)?;
        self.arena.decl_mut(func).state = CheckState::Checked;

        let body = match &self.arena.decl(func).kind {
            DeclKind::Func(f) => f.body,
            _ => None,
        };
        if let Some(body) = body {
            let previous_function = self.function.replace(func);
            self.check_stmt(body)?;
            self.function = previous_function;
        }
        Ok(())
    }

    /// Same name, same parameter count, same parameter types, same
    /// out-ness per parameter. The return type does not participate, and
    /// generics are not distinguished.
    fn function_signatures_match(&self, first: DeclId, second: DeclId) -> bool {
        let first_params = self.callable_params(first);
        let second_params = self.callable_params(second);
        if first_params.len() != second_params.len() {
            return false;
        }
        for (&a, &b) in first_params.iter().zip(second_params.iter()) {
            let (a_ty, a_dir, _) = self.param_info(a);
            let (b_ty, b_dir, _) = self.param_info(b);
            if a_ty != b_ty {
                return false;
            }
            // `out` and `inout` are equivalent for matching: overload
            // resolution has no way to pick between them.
            if a_dir.is_out() != b_dir.is_out() {
                return false;
            }
        }
        true
    }

    fn validate_function_redeclaration(&mut self, func: DeclId) -> CheckResult<()> {
        let Some(parent) = self.arena.decl(func).parent else {
            return Ok(());
        };
        let name = self.arena.decl(func).name;

        for prev in self.arena.members_with_name(parent, name) {
            // Only declarations before this one count as "previous".
            if prev == func {
                break;
            }
            // Look through generic wrappers to the declaration beneath.
            let prev = match &self.arena.decl(prev).kind {
                DeclKind::Generic(g) => g.inner,
                _ => prev,
            };
            if !matches!(self.arena.decl(prev).kind, DeclKind::Func(_)) {
                continue;
            }
            self.ensure_decl(prev, CheckState::CheckedHeader)?;

            if !self.function_signatures_match(func, prev) {
                continue;
            }

            let my_ret = match &self.arena.decl(func).kind {
                DeclKind::Func(f) => f.return_ty.ty_or_error(),
                _ => Type::Error,
            };
            let prev_ret = match &self.arena.decl(prev).kind {
                DeclKind::Func(f) => f.return_ty.ty_or_error(),
                _ => Type::Error,
            };
            if my_ret != prev_ret {
                let loc = self.arena.decl(func).loc;
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2027)
                        .with_message("redeclaration has a different return type")
                        .with_label(loc, ""),
                );
                break;
            }

            let my_body = matches!(&self.arena.decl(func).kind, DeclKind::Func(f) if f.body.is_some());
            let prev_body =
                matches!(&self.arena.decl(prev).kind, DeclKind::Func(f) if f.body.is_some());
            if my_body && prev_body {
                let loc = self.arena.decl(func).loc;
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2028)
                        .with_message("function redefinition")
                        .with_label(loc, ""),
                );
                break;
            }
        }
        Ok(())
    }

    // ----- other callables -----

    fn visit_constructor(&mut self, decl: DeclId) -> CheckResult<()> {
        if self.arena.decl(decl).is_checked(CheckState::Checked) {
            return Ok(());
        }
        self.arena.decl_mut(decl).state = CheckState::CheckingHeader;
        for param in self.callable_params(decl) {
            self.check_decl(param)?;
        }
        self.arena.decl_mut(decl).state = CheckState::CheckedHeader;
        // TODO: check constructor bodies once the front end accepts them.
        Ok(())
    }

    fn visit_subscript(&mut self, decl: DeclId) -> CheckResult<()> {
        if self.arena.decl(decl).is_checked(CheckState::Checked) {
            return Ok(());
        }
        self.arena.decl_mut(decl).state = CheckState::CheckingHeader;
        for param in self.callable_params(decl) {
            self.check_decl(param)?;
        }
        let return_ty = match &self.arena.decl(decl).kind {
            DeclKind::Subscript(s) => s.return_ty.clone(),
            _ => TypeExpr::none(),
        };
        let return_ty = self.check_usable_type(return_ty)?;
        if let DeclKind::Subscript(s) = &mut self.arena.decl_mut(decl).kind {
            s.return_ty = return_ty;
        }
        self.arena.decl_mut(decl).state = CheckState::CheckedHeader;
        Ok(())
    }

    // ----- generics -----

    fn visit_generic(&mut self, decl: DeclId) -> CheckResult<()> {
        for member in self.arena.members(decl).to_vec() {
            enum ParamKind {
                Ty(TypeExpr),
                Value,
                Constraint,
                Other,
            }
            let kind = match &self.arena.decl(member).kind {
                DeclKind::GenericTypeParam(p) => ParamKind::Ty(p.default.clone()),
                DeclKind::GenericValueParam(_) => ParamKind::Value,
                DeclKind::GenericConstraint(_) => ParamKind::Constraint,
                _ => ParamKind::Other,
            };
            match kind {
                ParamKind::Ty(default) => {
                    let default = self.check_proper_type(default)?;
                    if let DeclKind::GenericTypeParam(p) = &mut self.arena.decl_mut(member).kind {
                        p.default = default;
                    }
                }
                ParamKind::Value => self.check_var_decl_common(member)?,
                ParamKind::Constraint => self.visit_generic_constraint(member)?,
                ParamKind::Other => {}
            }
        }

        let inner = match &self.arena.decl(decl).kind {
            DeclKind::Generic(g) => g.inner,
            _ => return Ok(()),
        };
        self.check_decl(inner)
    }

    fn visit_generic_constraint(&mut self, decl: DeclId) -> CheckResult<()> {
        let (sub, sup) = match &self.arena.decl(decl).kind {
            DeclKind::GenericConstraint(c) => (c.sub.clone(), c.sup.clone()),
            _ => return Ok(()),
        };
        let sub = self.translate_type_expr(sub)?;
        let sup = self.translate_type_expr(sup)?;
        if let DeclKind::GenericConstraint(c) = &mut self.arena.decl_mut(decl).kind {
            c.sub = sub;
            c.sup = sup;
        }
        Ok(())
    }

    // ----- extensions and inheritance -----

    fn visit_extension(&mut self, decl: DeclId) -> CheckResult<()> {
        if self.arena.decl(decl).is_checked(CheckState::Checked) {
            return Ok(());
        }
        self.arena.decl_mut(decl).state = CheckState::CheckingHeader;

        let target = match &self.arena.decl(decl).kind {
            DeclKind::Extension(e) => e.target.clone(),
            _ => return Ok(()),
        };
        let target = self.check_proper_type(target)?;
        let target_ty = target.ty_or_error();
        let target_loc = target
            .expr
            .map(|e| self.arena.expr(e).loc)
            .unwrap_or(self.arena.decl(decl).loc);
        if let DeclKind::Extension(e) = &mut self.arena.decl_mut(decl).kind {
            e.target = target;
        }

        // Attach this extension as a candidate on the target type.
        // Prepending makes resolution observe extensions in reverse
        // declaration order.
        let target_decl = match &target_ty {
            Type::DeclRef(dr) => Some(dr.decl),
            Type::Scalar(scalar) => self.session.scalar_decl(*scalar),
            Type::Vector { .. } => self.magic_inner_decl(shade_ast::MagicKind::Vector),
            Type::Matrix { .. } => self.magic_inner_decl(shade_ast::MagicKind::Matrix),
            _ => None,
        };
        match (target_decl, &target_ty) {
            (Some(target_decl), _)
                if self.arena.decl(target_decl).kind.as_agg().is_some() =>
            {
                if let Some(agg) = self.arena.decl_mut(target_decl).kind.as_agg_mut() {
                    agg.candidate_extensions.insert(0, decl);
                }
            }
            (_, Type::Error) => {}
            _ => {
                self.diagnose(
                    Diagnostic::error(ErrorCode::E2099)
                        .with_message("an extension requires a nominal target type")
                        .with_label(target_loc, ""),
                );
            }
        }

        self.arena.decl_mut(decl).state = CheckState::CheckedHeader;

        for member in self.arena.members(decl).to_vec() {
            self.ensure_decl(member, CheckState::Checked)?;
        }
        self.arena.decl_mut(decl).state = CheckState::Checked;
        Ok(())
    }

    fn visit_inheritance(&mut self, decl: DeclId) -> CheckResult<()> {
        let base = match &self.arena.decl(decl).kind {
            DeclKind::Inheritance(i) => i.base.clone(),
            _ => return Ok(()),
        };
        let base = self.translate_type_expr(base)?;
        let base_ty = base.ty_or_error();
        let base_loc = base
            .expr
            .map(|e| self.arena.expr(e).loc)
            .unwrap_or(self.arena.decl(decl).loc);
        if let DeclKind::Inheritance(i) = &mut self.arena.decl_mut(decl).kind {
            i.base = base;
        }

        // Only inheritance from interfaces is supported.
        if let Some(dr) = base_ty.as_decl_ref() {
            if matches!(self.arena.decl(dr.decl).kind, DeclKind::Interface(_)) {
                return Ok(());
            }
        }
        let found = self.type_string(&base_ty);
        self.diagnose(
            Diagnostic::error(ErrorCode::E2003)
                .with_message(format!("expected an interface, got `{found}`"))
                .with_label(base_loc, ""),
        );
        Ok(())
    }
}
