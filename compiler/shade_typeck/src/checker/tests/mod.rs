//! Tests for the semantic checker.
//!
//! There is no parser in this workspace, so the harness builds parsed-
//! but-unchecked ASTs directly through the arena, the way the front end
//! would, and then runs the checker against a bootstrapped core module.

mod decl_tests;
mod fold_tests;
mod stmt_tests;

use rustc_hash::FxHashSet;

use shade_ast::{
    AggData, AstArena, CtorData, Decl, DeclKind, Expr, ExprId, ExprKind, FuncData, ImportData,
    InvokeStyle, Members, ModuleData, ParamData, Scope, ScopeId, SharedInterner, Span, Stmt,
    StmtId, StmtKind, SubscriptData, TypeDefData, TypeExpr, VarData,
};
use shade_diagnostic::DiagnosticSink;
use shade_types::{DeclId, ParamDirection};

use crate::checker::{check_translation_unit, SemanticsVisitor};
use crate::error::CheckResult;
use crate::request::{CompileFlags, ModuleLoader, NullLoader, SourceLanguage, TranslationUnit};
use crate::session::Session;

/// One test compilation: a bootstrapped session plus an empty module to
/// populate.
pub(crate) struct TestContext {
    pub arena: AstArena,
    pub interner: SharedInterner,
    pub sink: DiagnosticSink,
    pub session: Session,
    pub module: DeclId,
    pub module_scope: ScopeId,
}

impl TestContext {
    pub fn new() -> Self {
        let interner = SharedInterner::new();
        let mut arena = AstArena::new();
        let mut sink = DiagnosticSink::new();
        let session = Session::bootstrap(&mut arena, &interner, &mut sink)
            .expect("the core module must bootstrap");
        assert_eq!(sink.error_count(), 0, "core module checked clean");

        let module_name = interner.intern("test");
        let module =
            arena.alloc_decl(Decl::new(module_name, DeclKind::Module(ModuleData::default())));
        let module_scope = arena.alloc_scope(Scope::new(Some(module), Some(session.core_scope)));
        if let DeclKind::Module(data) = &mut arena.decl_mut(module).kind {
            data.scope = Some(module_scope);
        }

        TestContext { arena, interner, sink, session, module, module_scope }
    }

    // ----- driving the checker -----

    pub fn check(&mut self) -> CheckResult<()> {
        self.check_with(SourceLanguage::Unified, CompileFlags::default())
    }

    pub fn check_with(
        &mut self,
        language: SourceLanguage,
        flags: CompileFlags,
    ) -> CheckResult<()> {
        let unit = TranslationUnit::new(self.module, language).with_flags(flags);
        let mut loader = NullLoader;
        self.check_with_loader(&unit, &mut loader)
    }

    pub fn check_with_loader(
        &mut self,
        unit: &TranslationUnit,
        loader: &mut dyn ModuleLoader,
    ) -> CheckResult<()> {
        check_translation_unit(
            unit,
            &mut self.arena,
            &mut self.session,
            &self.interner,
            &mut self.sink,
            loader,
        )
    }

    /// Run a closure against a fresh visitor over this context's state.
    pub fn with_visitor<R>(
        &mut self,
        language: SourceLanguage,
        f: impl FnOnce(&mut SemanticsVisitor<'_>) -> R,
    ) -> R {
        let mut loader = NullLoader;
        let mut visitor = SemanticsVisitor {
            arena: &mut self.arena,
            session: &mut self.session,
            interner: &self.interner,
            sink: &mut self.sink,
            loader: &mut loader,
            language,
            function: None,
            outer_stmts: Vec::new(),
            imported_modules: FxHashSet::default(),
        };
        f(&mut visitor)
    }

    pub fn error_count(&self) -> usize {
        self.sink.error_count()
    }

    pub fn has_error_containing(&self, needle: &str) -> bool {
        self.sink.has_message_containing(needle)
    }

    // ----- expressions -----

    pub fn intern(&self, text: &str) -> shade_ast::Name {
        self.interner.intern(text)
    }

    fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.arena.alloc_expr(Expr::new(kind, Span::DUMMY))
    }

    pub fn int_lit(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::IntLit(value))
    }

    pub fn float_lit(&mut self, value: f64) -> ExprId {
        self.expr(ExprKind::FloatLit(value))
    }

    pub fn bool_lit(&mut self, value: bool) -> ExprId {
        self.expr(ExprKind::BoolLit(value))
    }

    /// A name reference resolved against `scope`.
    pub fn var_in(&mut self, scope: ScopeId, name: &str) -> ExprId {
        let name = self.intern(name);
        self.expr(ExprKind::Var { name, scope, decl: None })
    }

    /// A name reference in the module's own scope.
    pub fn var(&mut self, name: &str) -> ExprId {
        self.var_in(self.module_scope, name)
    }

    pub fn member(&mut self, base: ExprId, name: &str) -> ExprId {
        let name = self.intern(name);
        self.expr(ExprKind::Member { base, name, decl: None })
    }

    pub fn index(&mut self, base: ExprId, index: Option<ExprId>) -> ExprId {
        self.expr(ExprKind::Index { base, index })
    }

    pub fn invoke(&mut self, callee: ExprId, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Invoke { callee, args, style: InvokeStyle::Call })
    }

    pub fn invoke_styled(
        &mut self,
        callee: ExprId,
        args: Vec<ExprId>,
        style: InvokeStyle,
    ) -> ExprId {
        self.expr(ExprKind::Invoke { callee, args, style })
    }

    pub fn generic_app(&mut self, base: ExprId, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::GenericApp { base, args })
    }

    pub fn init_list(&mut self, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::InitializerList { args })
    }

    pub fn assign(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Assign { left, right })
    }

    // ----- type expressions -----

    /// A type expression naming a type visible in the module scope.
    pub fn named_type(&mut self, name: &str) -> TypeExpr {
        let var = self.var(name);
        TypeExpr::from_expr(var)
    }

    /// `vector<elem, count>` as the parser would produce it.
    pub fn vector_type(&mut self, elem: &str, count: i64) -> TypeExpr {
        let base = self.var("vector");
        let elem = self.var(elem);
        let count = self.int_lit(count);
        let app = self.generic_app(base, vec![elem, count]);
        TypeExpr::from_expr(app)
    }

    /// `elem[count]` (or `elem[]` with no count).
    pub fn array_type(&mut self, elem: &str, count: Option<i64>) -> TypeExpr {
        let base = self.var(elem);
        let count = count.map(|c| self.int_lit(c));
        let index = self.index(base, count);
        TypeExpr::from_expr(index)
    }

    // ----- statements -----

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.arena.alloc_stmt(Stmt::new(kind, Span::DUMMY))
    }

    pub fn block(&mut self, stmts: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::Block { stmts })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr { expr })
    }

    pub fn return_stmt(&mut self, expr: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return { expr })
    }

    // ----- declarations -----

    pub fn add_to_module(&mut self, decl: DeclId) {
        self.arena.add_member(self.module, decl);
    }

    /// A module-level variable.
    pub fn global_var(&mut self, name: &str, ty: TypeExpr, init: Option<ExprId>) -> DeclId {
        let name = self.intern(name);
        let decl = self
            .arena
            .alloc_decl(Decl::new(name, DeclKind::Variable(VarData { ty, init })));
        self.add_to_module(decl);
        decl
    }

    /// A struct with the given fields, added to the module.
    pub fn add_struct(&mut self, name: &str, fields: &[(&str, TypeExpr)]) -> DeclId {
        let name = self.intern(name);
        let decl = self
            .arena
            .alloc_decl(Decl::new(name, DeclKind::Struct(AggData::default())));
        for (field_name, field_ty) in fields {
            let field_name = self.intern(field_name);
            let field = self.arena.alloc_decl(Decl::new(
                field_name,
                DeclKind::Field(VarData { ty: field_ty.clone(), init: None }),
            ));
            self.arena.add_member(decl, field);
        }
        self.add_to_module(decl);
        decl
    }

    pub fn param(&mut self, name: &str, ty: TypeExpr, direction: ParamDirection) -> DeclId {
        let name = self.intern(name);
        self.arena.alloc_decl(Decl::new(
            name,
            DeclKind::Param(ParamData { var: VarData { ty, init: None }, direction }),
        ))
    }

    /// A function added to the module; the returned scope is for name
    /// references inside its body.
    pub fn add_func(
        &mut self,
        name: &str,
        params: Vec<DeclId>,
        return_ty: TypeExpr,
        body: Option<StmtId>,
    ) -> (DeclId, ScopeId) {
        let name = self.intern(name);
        let decl = self.arena.alloc_decl(Decl::new(
            name,
            DeclKind::Func(FuncData { members: Members::new(), return_ty, body }),
        ));
        for param in params {
            self.arena.add_member(decl, param);
        }
        self.add_to_module(decl);
        let scope = self
            .arena
            .alloc_scope(Scope::new(Some(decl), Some(self.module_scope)));
        (decl, scope)
    }

    /// A local variable declaration statement inside `func`.
    pub fn local_var(
        &mut self,
        func: DeclId,
        name: &str,
        ty: TypeExpr,
        init: Option<ExprId>,
    ) -> (DeclId, StmtId) {
        let name = self.intern(name);
        let decl = self
            .arena
            .alloc_decl(Decl::new(name, DeclKind::Variable(VarData { ty, init })));
        self.arena.add_member(func, decl);
        let stmt = self.stmt(StmtKind::Decl { decl });
        (decl, stmt)
    }

    pub fn add_typedef(&mut self, name: &str, target: TypeExpr) -> DeclId {
        let name = self.intern(name);
        let decl = self
            .arena
            .alloc_decl(Decl::new(name, DeclKind::TypeDef(TypeDefData { target })));
        self.add_to_module(decl);
        decl
    }

    pub fn add_interface(&mut self, name: &str) -> DeclId {
        let name = self.intern(name);
        let decl = self
            .arena
            .alloc_decl(Decl::new(name, DeclKind::Interface(AggData::default())));
        self.add_to_module(decl);
        decl
    }

    /// Attach an inheritance member to an aggregate.
    pub fn add_inheritance(&mut self, agg: DeclId, base: TypeExpr) -> DeclId {
        let decl = self.arena.alloc_decl(Decl::new(
            shade_ast::Name::EMPTY,
            DeclKind::Inheritance(shade_ast::InheritanceData { base }),
        ));
        self.arena.add_member(agg, decl);
        decl
    }

    /// A subscript declaration (`operator[]`) attached to an aggregate.
    pub fn add_subscript(
        &mut self,
        agg: DeclId,
        params: Vec<DeclId>,
        return_ty: TypeExpr,
        with_setter: bool,
    ) -> DeclId {
        let name = self.intern("operator[]");
        let decl = self.arena.alloc_decl(Decl::new(
            name,
            DeclKind::Subscript(SubscriptData { members: Members::new(), return_ty }),
        ));
        for param in params {
            self.arena.add_member(decl, param);
        }
        let getter = self
            .arena
            .alloc_decl(Decl::new(self.intern("get"), DeclKind::Accessor(shade_ast::AccessorKind::Getter)));
        self.arena.add_member(decl, getter);
        if with_setter {
            let setter = self.arena.alloc_decl(Decl::new(
                self.intern("set"),
                DeclKind::Accessor(shade_ast::AccessorKind::Setter),
            ));
            self.arena.add_member(decl, setter);
        }
        self.arena.add_member(agg, decl);
        decl
    }

    /// A constructor attached to an aggregate, optionally usable for
    /// implicit conversion.
    pub fn add_ctor(
        &mut self,
        agg: DeclId,
        params: Vec<DeclId>,
        implicit_cost: Option<shade_types::ConversionCost>,
    ) -> DeclId {
        let name = self.intern("__init");
        let mut decl = Decl::new(name, DeclKind::Constructor(CtorData::default()));
        if let Some(cost) = implicit_cost {
            decl.modifiers.push(shade_ast::Modifier::ImplicitConversion(cost));
        }
        let decl = self.arena.alloc_decl(decl);
        for param in params {
            self.arena.add_member(decl, param);
        }
        self.arena.add_member(agg, decl);
        decl
    }

    /// An `import` declaration splicing into the module scope.
    pub fn add_import(&mut self, module_name: &str) -> DeclId {
        let name = self.intern(module_name);
        let decl = self.arena.alloc_decl(Decl::new(
            name,
            DeclKind::Import(ImportData {
                module_name: name,
                scope: self.module_scope,
                imported: None,
            }),
        ));
        self.add_to_module(decl);
        decl
    }
}

/// Walk a module recursively asserting every declaration reached the
/// `Checked` state.
pub(crate) fn assert_all_checked(ctx: &TestContext, decl: DeclId) {
    assert_eq!(
        ctx.arena.decl(decl).state,
        shade_ast::CheckState::Checked,
        "declaration `{}` not fully checked",
        ctx.interner.lookup(ctx.arena.decl(decl).name),
    );
    for &member in ctx.arena.members(decl) {
        assert_all_checked(ctx, member);
    }
    if let DeclKind::Generic(g) = &ctx.arena.decl(decl).kind {
        assert_all_checked(ctx, g.inner);
    }
}

/// Walk everything reachable from a module asserting every expression
/// carries a type.
pub(crate) fn assert_reachable_exprs_typed(ctx: &TestContext, decl: DeclId) {
    fn walk_expr(ctx: &TestContext, expr: ExprId) {
        assert!(
            ctx.arena.expr(expr).ty.is_some(),
            "checked expression {expr:?} has no type: {:?}",
            ctx.arena.expr(expr).kind,
        );
        match &ctx.arena.expr(expr).kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::Var { .. }
            | ExprKind::TypeRef { .. } => {}
            ExprKind::Member { base, .. }
            | ExprKind::StaticMember { base, .. }
            | ExprKind::Deref { base }
            | ExprKind::Swizzle { base, .. }
            | ExprKind::Paren { base }
            | ExprKind::ImplicitCast { arg: base } => walk_expr(ctx, *base),
            ExprKind::Invoke { callee, args, .. } => {
                walk_expr(ctx, *callee);
                for &arg in args {
                    walk_expr(ctx, arg);
                }
            }
            ExprKind::GenericApp { base, args } => {
                walk_expr(ctx, *base);
                for &arg in args {
                    walk_expr(ctx, arg);
                }
            }
            ExprKind::Index { base, index } => {
                walk_expr(ctx, *base);
                if let Some(index) = index {
                    walk_expr(ctx, *index);
                }
            }
            ExprKind::InitializerList { args } => {
                for &arg in args {
                    walk_expr(ctx, arg);
                }
            }
            ExprKind::Assign { left, right } => {
                walk_expr(ctx, *left);
                walk_expr(ctx, *right);
            }
            ExprKind::Overloaded { base, .. } => {
                if let Some(base) = base {
                    walk_expr(ctx, *base);
                }
            }
        }
    }

    fn walk_type_expr(ctx: &TestContext, ty: &TypeExpr) {
        if let Some(expr) = ty.expr {
            walk_expr(ctx, expr);
        }
    }

    fn walk_stmt(ctx: &TestContext, stmt: StmtId) {
        match &ctx.arena.stmt(stmt).kind {
            StmtKind::Block { stmts } => {
                for &s in stmts {
                    walk_stmt(ctx, s);
                }
            }
            StmtKind::Decl { decl } => walk_decl(ctx, *decl),
            StmtKind::Expr { expr } => walk_expr(ctx, *expr),
            StmtKind::If { cond, then_branch, else_branch } => {
                walk_expr(ctx, *cond);
                walk_stmt(ctx, *then_branch);
                if let Some(else_branch) = else_branch {
                    walk_stmt(ctx, *else_branch);
                }
            }
            StmtKind::For { init, cond, step, body } => {
                if let Some(init) = init {
                    walk_stmt(ctx, *init);
                }
                if let Some(cond) = cond {
                    walk_expr(ctx, *cond);
                }
                if let Some(step) = step {
                    walk_expr(ctx, *step);
                }
                walk_stmt(ctx, *body);
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                walk_expr(ctx, *cond);
                walk_stmt(ctx, *body);
            }
            StmtKind::CompileTimeFor { range_begin, range_end, body, .. } => {
                if let Some(begin) = range_begin {
                    walk_expr(ctx, *begin);
                }
                walk_expr(ctx, *range_end);
                walk_stmt(ctx, *body);
            }
            StmtKind::Switch { cond, body } => {
                walk_expr(ctx, *cond);
                walk_stmt(ctx, *body);
            }
            StmtKind::Case { expr, .. } => walk_expr(ctx, *expr),
            StmtKind::Return { expr } => {
                if let Some(expr) = expr {
                    walk_expr(ctx, *expr);
                }
            }
            StmtKind::Default { .. }
            | StmtKind::Break { .. }
            | StmtKind::Continue { .. }
            | StmtKind::Discard
            | StmtKind::Empty => {}
        }
    }

    fn walk_decl(ctx: &TestContext, decl: DeclId) {
        match &ctx.arena.decl(decl).kind {
            DeclKind::Variable(v) | DeclKind::Field(v) | DeclKind::GenericValueParam(v) => {
                walk_type_expr(ctx, &v.ty);
                if let Some(init) = v.init {
                    walk_expr(ctx, init);
                }
            }
            DeclKind::Param(p) => walk_type_expr(ctx, &p.var.ty),
            DeclKind::TypeDef(td) => walk_type_expr(ctx, &td.target),
            DeclKind::Func(f) => {
                walk_type_expr(ctx, &f.return_ty);
                if let Some(body) = f.body {
                    walk_stmt(ctx, body);
                }
            }
            DeclKind::Subscript(s) => walk_type_expr(ctx, &s.return_ty),
            DeclKind::Extension(e) => walk_type_expr(ctx, &e.target),
            DeclKind::Inheritance(i) => walk_type_expr(ctx, &i.base),
            DeclKind::GenericTypeParam(p) => walk_type_expr(ctx, &p.default),
            DeclKind::GenericConstraint(c) => {
                walk_type_expr(ctx, &c.sub);
                walk_type_expr(ctx, &c.sup);
            }
            _ => {}
        }
        for &member in ctx.arena.members(decl) {
            walk_decl(ctx, member);
        }
        if let DeclKind::Generic(g) = &ctx.arena.decl(decl).kind {
            walk_decl(ctx, g.inner);
        }
    }

    walk_decl(ctx, decl);
}
