//! DF-004: Symbol table: variable defaults keyed by name.

use indexmap::IndexMap;

/// Resolved variable defaults. Last write wins for a repeated name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    vars: IndexMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a variable's default.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Names in first-definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}
