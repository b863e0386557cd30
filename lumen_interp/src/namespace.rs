//! Name bindings shared by the interpreter and the frontend.

use crate::builtins;
use lumen_ir::{Callable, CallableId, Symbol};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Concurrent name → callable bindings.
///
/// Seeded with the builtin operators. Rebinding a builtin name is allowed;
/// [`Namespace::is_builtin`] then reports `false` for it.
#[derive(Debug)]
pub struct Namespace {
    bindings: RwLock<FxHashMap<Symbol, Callable>>,
    builtin_ids: FxHashSet<CallableId>,
}

impl Namespace {
    /// Create a namespace holding only the builtins.
    pub fn new() -> Self {
        let mut bindings = FxHashMap::default();
        let mut builtin_ids = FxHashSet::default();
        for callable in builtins::callables() {
            builtin_ids.insert(callable.id());
            bindings.insert(Arc::from(callable.name()), callable);
        }
        Self {
            bindings: RwLock::new(bindings),
            builtin_ids,
        }
    }

    /// Callable bound under `name`.
    #[inline]
    pub fn get(&self, name: &str) -> Option<Callable> {
        self.bindings.read().get(name).cloned()
    }

    /// Bind `callable` under `name`, returning the previous binding.
    pub fn set(&self, name: &str, callable: Callable) -> Option<Callable> {
        self.bindings.write().insert(Arc::from(name), callable)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Check whether `name` is still bound to the stock builtin.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.bindings
            .read()
            .get(name)
            .is_some_and(|callable| self.builtin_ids.contains(&callable.id()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ir::Value;

    #[test]
    fn test_seeded_with_builtins() {
        let ns = Namespace::new();
        assert_eq!(ns.len(), builtins::BUILTINS.len());
        for (name, arity) in builtins::BUILTINS {
            assert_eq!(ns.get(name).unwrap().arity(), *arity);
            assert!(ns.is_builtin(name));
        }
    }

    #[test]
    fn test_rebinding_shadows_builtin() {
        let ns = Namespace::new();
        let old = ns.set("+", Callable::native("+", 2, |_| Ok(Value::Int(0))));
        assert!(old.is_some());
        assert!(!ns.is_builtin("+"));
        assert!(ns.is_builtin("-"));
    }

    #[test]
    fn test_unknown_name() {
        let ns = Namespace::new();
        assert!(ns.get("f").is_none());
        assert!(!ns.contains("f"));
        assert!(!ns.is_builtin("f"));
    }
}
