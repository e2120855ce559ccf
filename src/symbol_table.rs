use std::collections::HashMap;

use tracing::trace;

use crate::resolver::DeclRef;

/// A stack of lexical scopes, innermost last.
///
/// Names are unique within a scope; inner scopes may shadow outer ones.
pub struct SymbolTable {
    scopes: Vec<HashMap<Box<str>, DeclRef>>,
}

impl SymbolTable {
    /// Creates a table with a single, empty, outermost scope.
    pub fn new() -> SymbolTable {
        SymbolTable {
            scopes: vec![HashMap::with_capacity(32)],
        }
    }

    pub fn open_scope(&mut self) {
        trace!(depth = self.scopes.len(), "opening scope");
        self.scopes.push(HashMap::new());
    }

    /// # Panics
    ///
    /// If called on the outermost scope.
    pub fn close_scope(&mut self) {
        assert!(self.scopes.len() > 1, "can't close the outermost scope");
        self.scopes.pop();
        trace!(depth = self.scopes.len(), "closed scope");
    }

    /// Number of open scopes, including the outermost one.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Enters a name into the innermost scope.
    ///
    /// Fails, leaving the table untouched, if the name is already declared in
    /// that scope. The existing declaration is returned.
    pub fn enter(&mut self, name: &str, decl: DeclRef) -> Result<(), DeclRef> {
        let scope = self
            .scopes
            .last_mut()
            .expect("symbol table always has a scope");
        if let Some(existing) = scope.get(name) {
            return Err(*existing);
        }
        trace!(name, %decl, "entered");
        scope.insert(name.into(), decl);
        Ok(())
    }

    /// Looks a name up from the innermost to the outermost scope.
    pub fn retrieve(&self, name: &str) -> Option<DeclRef> {
        let found = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied());
        trace!(name, found = found.is_some(), "retrieved");
        found
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}
