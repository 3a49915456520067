//! Request-scoped state shared between resolvers.

use std::sync::{Arc, RwLock};

use fnv::FnvHashMap;

use crate::value::Value;

/// A chained key/value map used as request-scoped state.
///
/// Each node holds its own entries plus an optional parent. A request owns
/// one root scope; subscriptions derive a fresh child scope per emitted
/// event, so event-local writes stay isolated while request globals remain
/// readable.
#[derive(Debug, Default)]
pub struct ScopedMap {
    parent: Option<Arc<ScopedMap>>,
    entries: RwLock<FnvHashMap<String, Value>>,
}

impl ScopedMap {
    /// Creates a new root scope.
    pub fn root() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a child scope on top of this one.
    pub fn child(self: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::clone(self)),
            entries: RwLock::new(FnvHashMap::default()),
        })
    }

    /// Reads a key, walking parent scopes until a value is found.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().unwrap();
        match entries.get(key) {
            Some(v) => Some(v.clone()),
            None => self.parent.as_ref().and_then(|p| p.get(key)),
        }
    }

    /// Writes a key into this scope only, shadowing any parent entry.
    pub fn set_scoped(&self, key: impl Into<String>, value: Value) {
        self.entries.write().unwrap().insert(key.into(), value);
    }

    /// Writes a key into the nearest enclosing scope that already contains
    /// it, or into this scope if none does.
    pub fn set_global(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut node = self;
        loop {
            if node.contains_local(&key) {
                node.entries.write().unwrap().insert(key, value);
                return;
            }
            match &node.parent {
                Some(parent) => node = parent,
                None => break,
            }
        }
        self.entries.write().unwrap().insert(key, value);
    }

    fn contains_local(&self, key: &str) -> bool {
        self.entries.read().unwrap().contains_key(key)
    }
}
