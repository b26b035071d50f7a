//! Environment for VoidScript
//!
//! Manages variable scopes and lookups. Globals belong to a loaded module
//! and are read-only once the module is built.

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

/// Variable scope
#[derive(Debug, Clone)]
pub struct Scope {
    /// Variables in this scope
    variables: HashMap<String, Value>,
}

impl Scope {
    /// Create a new empty scope
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Define a variable in this scope
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Get a variable from this scope
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Set a variable in this scope
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.variables.get_mut(name) {
            *slot = value;
            true
        } else {
            false
        }
    }

    /// Check if variable exists in this scope
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Get all variable names
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.variables.keys()
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Get all variables
    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment with nested scopes
#[derive(Clone)]
pub struct Environment {
    /// Stack of scopes (innermost last)
    scopes: Vec<Scope>,
    /// Module globals (shared by every call into the module)
    globals: Arc<Scope>,
}

impl Environment {
    /// Create a new environment with an empty global scope
    pub fn new() -> Self {
        Self::with_globals(Arc::new(Scope::new()))
    }

    /// Create an environment over an existing global scope
    pub fn with_globals(globals: Arc<Scope>) -> Self {
        Self {
            scopes: vec![Scope::new()],
            globals,
        }
    }

    /// Push a new scope
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pop the innermost scope
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Get current scope depth
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Define a variable in the current scope
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.define(name, value);
        }
    }

    /// Get a variable value (searches all scopes, then globals)
    pub fn get(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Some(value.clone());
            }
        }

        self.globals.get(name).cloned()
    }

    /// Set a variable value in the innermost scope that defines it
    ///
    /// Globals are never written; returns false when no local scope
    /// holds the name.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        for scope in self.scopes.iter_mut().rev() {
            if scope.contains(name) {
                return scope.set(name, value);
            }
        }
        false
    }

    /// Check if a variable exists
    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.contains(name)) || self.globals.contains(name)
    }

    /// Check if a name resolves to a global only
    pub fn is_global(&self, name: &str) -> bool {
        !self.scopes.iter().any(|s| s.contains(name)) && self.globals.contains(name)
    }

    /// Get the global scope
    pub fn globals(&self) -> &Arc<Scope> {
        &self.globals
    }

    /// Create a snapshot of all local variables
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let mut result = HashMap::new();

        // Later scopes override earlier
        for scope in &self.scopes {
            for (k, v) in scope.variables() {
                result.insert(k.clone(), v.clone());
            }
        }

        result
    }

    /// Create a child environment for function calls
    pub fn child(&self) -> Self {
        Self {
            scopes: vec![Scope::new()],
            globals: Arc::clone(&self.globals),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("scope_depth", &self.scopes.len())
            .field("local_vars", &self.scopes.iter().flat_map(|s| s.names()).count())
            .field("global_vars", &self.globals.len())
            .finish()
    }
}
