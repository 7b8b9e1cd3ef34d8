//! The translation-unit request and its collaborators.

use rustc_hash::FxHashMap;

use shade_ast::Name;
use shade_types::DeclId;

/// Source dialect of the translation unit. The dialect changes a handful
/// of rules (which variables count as compile-time constants, for one).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum SourceLanguage {
    /// The unified source language.
    #[default]
    Unified,
    Hlsl,
    Glsl,
}

/// Per-unit compile flags.
#[derive(Copy, Clone, Debug, Default)]
pub struct CompileFlags {
    no_checking: bool,
}

impl CompileFlags {
    /// "Rewrite mode": annotate the AST where possible but drop all user
    /// diagnostics. Used for source-to-source passes.
    pub fn no_checking() -> Self {
        CompileFlags { no_checking: true }
    }

    pub fn is_no_checking(self) -> bool {
        self.no_checking
    }
}

/// One parsed translation unit handed to the checker.
#[derive(Clone, Debug)]
pub struct TranslationUnit {
    /// The module declaration produced by the parser.
    pub module: DeclId,
    pub language: SourceLanguage,
    pub flags: CompileFlags,
}

impl TranslationUnit {
    pub fn new(module: DeclId, language: SourceLanguage) -> Self {
        TranslationUnit { module, language, flags: CompileFlags::default() }
    }

    pub fn with_flags(mut self, flags: CompileFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Resolves `import` declarations to module declarations.
///
/// Loading may synchronously parse and check another translation unit;
/// the loader is responsible for its own re-entrancy. The checker only
/// asks for the result.
pub trait ModuleLoader {
    fn find_or_import_module(&mut self, name: Name) -> Option<DeclId>;
}

/// A loader that knows no modules.
#[derive(Default)]
pub struct NullLoader;

impl ModuleLoader for NullLoader {
    fn find_or_import_module(&mut self, _name: Name) -> Option<DeclId> {
        None
    }
}

/// A loader over pre-checked modules, keyed by name.
#[derive(Default)]
pub struct MapLoader {
    modules: FxHashMap<Name, DeclId>,
}

impl MapLoader {
    pub fn new() -> Self {
        MapLoader::default()
    }

    pub fn register(&mut self, name: Name, module: DeclId) {
        self.modules.insert(name, module);
    }
}

impl ModuleLoader for MapLoader {
    fn find_or_import_module(&mut self, name: Name) -> Option<DeclId> {
        self.modules.get(&name).copied()
    }
}
