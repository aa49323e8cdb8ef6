//! The scope stack used while rendering.

use std::collections::HashMap;

use crate::value::Value;

/// One frame of bindings.
pub type Scope = HashMap<String, Value>;

/// An ordered stack of scopes.
///
/// Lookups search from the innermost scope outward and the first match wins.
/// Assignments always write to the innermost scope, so a binding made inside a
/// loop iteration disappears when that iteration's scope is popped.
#[derive(Debug, Clone)]
pub struct Context {
    scopes: Vec<Scope>,
}

impl Context {
    /// Creates a context whose bottom scope is `root`.
    pub fn new(root: Scope) -> Self {
        Self { scopes: vec![root] }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Binds `name` in the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Removes the innermost scope. The bottom scope is never removed.
    pub fn pop(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Scope::new())
    }
}
