//! The compile session.
//!
//! The session owns the core module (the standard library) and the
//! registries that let the checker find compiler-known declarations by
//! tag: the builtin scalar type declarations and the magic `vector` /
//! `matrix` generics. Registration happens as the first step of module
//! checking, so bootstrapping the session is just checking the core
//! module against an empty registry.

use rustc_hash::FxHashMap;

use shade_ast::{AstArena, MagicKind, ScopeId, StringInterner};
use shade_diagnostic::DiagnosticSink;
use shade_types::{DeclId, ScalarType};

use crate::checker::check_translation_unit;
use crate::error::CheckResult;
use crate::request::{NullLoader, SourceLanguage, TranslationUnit};
use crate::stdlib;

/// Read-mostly shared state for one compile session.
pub struct Session {
    /// The core (standard library) module declaration.
    pub core_module: DeclId,
    /// The core module's scope; user module scopes chain to it.
    pub core_scope: ScopeId,
    scalar_decls: FxHashMap<ScalarType, DeclId>,
    magic_decls: FxHashMap<MagicKind, DeclId>,
}

impl Session {
    /// Build and check the core module, registering its tagged
    /// declarations along the way.
    pub fn bootstrap(
        arena: &mut AstArena,
        interner: &StringInterner,
        sink: &mut DiagnosticSink,
    ) -> CheckResult<Session> {
        let (core_module, core_scope) = stdlib::build_core_module(arena, interner);
        let mut session = Session {
            core_module,
            core_scope,
            scalar_decls: FxHashMap::default(),
            magic_decls: FxHashMap::default(),
        };

        let unit = TranslationUnit::new(core_module, SourceLanguage::Unified);
        let mut loader = NullLoader;
        check_translation_unit(&unit, arena, &mut session, interner, sink, &mut loader)?;
        Ok(session)
    }

    /// Record a builtin-tagged scalar type declaration.
    pub fn register_builtin_decl(&mut self, scalar: ScalarType, decl: DeclId) {
        self.scalar_decls.entry(scalar).or_insert(decl);
    }

    /// Record a magic-tagged declaration (the generic wrapper).
    pub fn register_magic_decl(&mut self, kind: MagicKind, decl: DeclId) {
        self.magic_decls.entry(kind).or_insert(decl);
    }

    /// The struct declaration behind a scalar type, used to enumerate its
    /// conversion constructors.
    pub fn scalar_decl(&self, scalar: ScalarType) -> Option<DeclId> {
        self.scalar_decls.get(&scalar).copied()
    }

    /// The magic generic for `vector` / `matrix`.
    pub fn magic_generic(&self, kind: MagicKind) -> Option<DeclId> {
        self.magic_decls.get(&kind).copied()
    }
}
