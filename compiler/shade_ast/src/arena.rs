//! The arena that owns every AST node of a compile session.

use rustc_hash::FxHashMap;

use shade_types::DeclId;

use crate::ast::{Decl, Expr, Stmt};
use crate::{ExprId, Name, Scope, ScopeId, StmtId};

/// Flat storage for declarations, expressions, statements, and scopes.
///
/// One arena holds the core module and every translation unit checked
/// against it, so declaration ids are unique across modules. Nodes are
/// mutated in place through the `_mut` accessors; expressions are replaced
/// by allocating a new node and rewriting the parent's child id.
#[derive(Default)]
pub struct AstArena {
    decls: Vec<Decl>,
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    scopes: Vec<Scope>,
}

impl AstArena {
    pub fn new() -> Self {
        AstArena::default()
    }

    // ----- declarations -----

    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId::new(
            u32::try_from(self.decls.len()).unwrap_or_else(|_| panic!("too many declarations")),
        );
        self.decls.push(decl);
        id
    }

    #[inline]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    #[inline]
    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    /// Add `member` to `container`'s member list and set its parent link.
    ///
    /// # Panics
    /// Panics if `container` is not a container declaration.
    pub fn add_member(&mut self, container: DeclId, member: DeclId) {
        self.decl_mut(member).parent = Some(container);
        self.decl_mut(container)
            .kind
            .members_mut()
            .unwrap_or_else(|| panic!("{container:?} is not a container"))
            .push(member);
    }

    /// The member list of a container, or an empty slice.
    pub fn members(&self, container: DeclId) -> &[DeclId] {
        self.decl(container)
            .kind
            .members()
            .map(|m| m.decls.as_slice())
            .unwrap_or(&[])
    }

    /// Members of `container` with the given name, via the lazily built
    /// per-container dictionary.
    pub fn members_with_name(&mut self, container: DeclId, name: Name) -> Vec<DeclId> {
        self.build_member_index(container);
        let Some(members) = self.decl(container).kind.members() else {
            return Vec::new();
        };
        members
            .index
            .as_ref()
            .and_then(|index| index.get(&name))
            .cloned()
            .unwrap_or_default()
    }

    fn build_member_index(&mut self, container: DeclId) {
        let Some(members) = self.decl(container).kind.members() else { return };
        if members.index.is_some() {
            return;
        }
        let decls = members.decls.clone();
        let mut index: FxHashMap<Name, Vec<DeclId>> = FxHashMap::default();
        for member in decls {
            index.entry(self.decl(member).name).or_default().push(member);
        }
        if let Some(members) = self.decl_mut(container).kind.members_mut() {
            members.index = Some(index);
        }
    }

    /// Member declarations for which `pred` holds, preserving order.
    pub fn members_where(
        &self,
        container: DeclId,
        pred: impl Fn(&Decl) -> bool,
    ) -> Vec<DeclId> {
        self.members(container)
            .iter()
            .copied()
            .filter(|&m| pred(self.decl(m)))
            .collect()
    }

    // ----- expressions -----

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(
            u32::try_from(self.exprs.len()).unwrap_or_else(|_| panic!("too many expressions")),
        );
        self.exprs.push(expr);
        id
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    // ----- statements -----

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::new(
            u32::try_from(self.stmts.len()).unwrap_or_else(|_| panic!("too many statements")),
        );
        self.stmts.push(stmt);
        id
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.index()]
    }

    // ----- scopes -----

    pub fn alloc_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId::new(
            u32::try_from(self.scopes.len()).unwrap_or_else(|_| panic!("too many scopes")),
        );
        self.scopes.push(scope);
        id
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    #[inline]
    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }
}
