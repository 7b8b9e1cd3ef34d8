//! String interner shared across compiler phases.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

struct Inner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Interns identifier text and hands out [`Name`] handles.
///
/// Interned strings are leaked to obtain a `'static` lifetime; the
/// interner lives as long as the compile session, so the leak is bounded
/// by the set of distinct identifiers seen.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create an interner with the well-known names pre-interned.
    pub fn new() -> Self {
        let mut inner = Inner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        };
        // The empty string is Name::EMPTY.
        inner.map.insert("", 0);
        inner.strings.push("");

        let interner = StringInterner { inner: RwLock::new(inner) };
        interner.pre_intern_known_names();
        interner
    }

    /// Intern a string, returning its handle.
    pub fn intern(&self, text: &str) -> Name {
        {
            let guard = self.inner.read();
            if let Some(&raw) = guard.map.get(text) {
                return Name::from_raw(raw);
            }
        }

        let mut guard = self.inner.write();
        // Re-check under the write lock.
        if let Some(&raw) = guard.map.get(text) {
            return Name::from_raw(raw);
        }

        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let raw = u32::try_from(guard.strings.len())
            .unwrap_or_else(|_| panic!("interner exceeded u32::MAX strings"));
        guard.strings.push(leaked);
        guard.map.insert(leaked, raw);
        Name::from_raw(raw)
    }

    /// The text of an interned name.
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.inner.read();
        guard.strings[name.raw() as usize]
    }

    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    fn pre_intern_known_names(&self) {
        const KNOWN: &[&str] = &[
            // scalar types
            "void", "bool", "int", "uint", "half", "float", "double",
            // compiler-known generics and their HLSL/GLSL spellings
            "vector", "matrix",
            "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4",
            "uvec2", "uvec3", "uvec4", "mat3", "mat4",
            // intrinsic operator names
            "+", "-", "*", "/", "%",
            "<", ">", "<=", ">=", "==", "!=",
            "!", "&&", "||",
            // names the parser is required to establish
            "operator[]", "numthreads",
        ];
        for text in KNOWN {
            self.intern(text);
        }
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Clonable handle to a [`StringInterner`] shared between phases.
#[derive(Clone)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("position");
        let b = interner.intern("position");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "position");
    }

    #[test]
    fn empty_string_is_the_empty_name() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
    }

    #[test]
    fn operator_names_are_pre_interned() {
        let interner = StringInterner::new();
        let plus = interner.intern("+");
        assert_eq!(interner.lookup(plus), "+");
        let subscript = interner.intern("operator[]");
        assert_eq!(interner.lookup(subscript), "operator[]");
    }
}
