//! Binding snapshots handed to guards and to the compilation callback.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use super::code::OriginalCode;
use super::value::Value;

/// Local variable bindings of one invocation.
#[derive(Debug, Clone, Default)]
pub struct Locals {
    bindings: AHashMap<String, Value>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.bindings.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Locals
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// A module-level binding scope, shared between the host, the guards that
/// consult it and every snapshot taken in it.
///
/// Clones alias the same scope.
#[derive(Debug, Clone, Default)]
pub struct GlobalScope {
    inner: Arc<RwLock<AHashMap<String, Value>>>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.write().insert(name.into(), value.into())
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.inner.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.read().get(name).cloned()
    }

    /// Runs `f` against the binding without cloning it.
    pub fn with<R>(&self, name: &str, f: impl FnOnce(&Value) -> R) -> Option<R> {
        self.inner.read().get(name).map(f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn same_scope(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Read-only view of the bindings of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct BindingSnapshot<'a> {
    positional: &'a [Value],
    locals: &'a Locals,
    globals: &'a GlobalScope,
}

impl<'a> BindingSnapshot<'a> {
    pub fn new(locals: &'a Locals, globals: &'a GlobalScope) -> Self {
        Self {
            positional: &[],
            locals,
            globals,
        }
    }

    /// Values passed positionally ahead of the named bindings.
    pub fn with_positional(mut self, positional: &'a [Value]) -> Self {
        self.positional = positional;
        self
    }

    pub fn positional(&self) -> &'a [Value] {
        self.positional
    }

    pub fn locals(&self) -> &'a Locals {
        self.locals
    }

    pub fn globals(&self) -> &'a GlobalScope {
        self.globals
    }

    pub fn local(&self, name: &str) -> Option<&'a Value> {
        self.locals.get(name)
    }
}

/// Execution context handed to the compilation callback.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    code: &'a OriginalCode,
    snapshot: BindingSnapshot<'a>,
}

impl<'a> Frame<'a> {
    pub fn new(code: &'a OriginalCode, snapshot: BindingSnapshot<'a>) -> Self {
        Self { code, snapshot }
    }

    pub fn code(&self) -> &'a OriginalCode {
        self.code
    }

    pub fn snapshot(&self) -> &BindingSnapshot<'a> {
        &self.snapshot
    }
}
