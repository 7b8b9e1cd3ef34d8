//! Name resolution.
//!
//! Scope-chain lookup walks every sibling scope at one level (imports
//! splice modules in as siblings) before moving to the parent, so inner
//! declarations shadow outer ones but same-level results accumulate into
//! an overloaded set. Member lookup on an aggregate type also consults
//! the extensions that apply to the type.

use shade_ast::lookup::{LookupResult, LookupResultItem};
use shade_ast::{Name, ScopeId};
use shade_types::{DeclId, DeclRef, Type};

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;

impl SemanticsVisitor<'_> {
    /// Resolve `name` starting from `scope`, walking outward.
    pub(crate) fn lookup_name(&mut self, name: Name, scope: ScopeId) -> LookupResult {
        let mut level = Some(scope);
        while let Some(level_id) = level {
            let mut result = LookupResult::empty();
            let mut sibling = Some(level_id);
            while let Some(sibling_id) = sibling {
                let scope = self.arena.scope(sibling_id).clone();
                if let Some(container) = scope.container {
                    for decl in self.arena.members_with_name(container, name) {
                        result.add(LookupResultItem::new(DeclRef::new(decl)));
                    }
                }
                sibling = scope.next_sibling;
            }
            if result.is_valid() {
                return result;
            }
            level = self.arena.scope(level_id).parent;
        }
        LookupResult::empty()
    }

    /// Look up `name` as a member of the type referenced by `base`,
    /// including members contributed by applicable extensions. The
    /// extension list observes reverse declaration order.
    pub(crate) fn lookup_local(
        &mut self,
        name: Name,
        base: &DeclRef,
        base_ty: &Type,
    ) -> CheckResult<LookupResult> {
        let mut result = LookupResult::empty();
        for member in self.arena.members_with_name(base.decl, name) {
            result.add(LookupResultItem::new(base.member(member)));
        }

        let extensions: Vec<DeclId> = self
            .arena
            .decl(base.decl)
            .kind
            .as_agg()
            .map(|agg| agg.candidate_extensions.clone())
            .unwrap_or_default();
        for ext in extensions {
            let Some(ext_ref) = self.apply_extension_to_type(ext, base_ty)? else {
                continue;
            };
            for member in self.arena.members_with_name(ext, name) {
                result.add(LookupResultItem::new(ext_ref.member(member)));
            }
        }

        Ok(result)
    }
}
