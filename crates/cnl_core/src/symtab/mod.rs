//! Lexical scope tracking used by the semantic checkers.
//!
//! A `SymbolTable` is a stack of scopes rooted at the module scope, which
//! can never be exited. Each checker pass builds and walks its own table as
//! it visits the IR — the table itself carries no checking logic.

pub mod alias;

use std::collections::HashMap;

use cnl_base::Span;

use crate::ir::{IrEffect, IrType};

pub use alias::AliasTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
    Lambda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    DataType,
    EnumType,
    WorkflowTask,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: String,
    pub ty: IrType,
    pub kind: SymbolKind,
    pub mutable: bool,
    pub span: Option<Span>,
    pub captured: bool,
    pub shadowed_from: Option<usize>,
    pub declared_effect: Option<IrEffect>,
}

impl SymbolInfo {
    pub fn new(name: impl Into<String>, ty: IrType, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
            mutable: false,
            span: None,
            captured: false,
            shadowed_from: None,
            declared_effect: None,
        }
    }

    pub fn mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_effect(mut self, effect: IrEffect) -> Self {
        self.declared_effect = Some(effect);
        self
    }
}

struct Scope {
    kind: ScopeKind,
    symbols: HashMap<String, SymbolInfo>,
}

/// Error returned by [`SymbolTable::define`] when a name is already bound in
/// the *current* scope (shadowing an enclosing scope is allowed and instead
/// reported through `on_shadow`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSymbol {
    pub name: String,
}

#[derive(Default)]
pub struct DefineOptions<'a> {
    pub on_shadow: Option<&'a mut dyn FnMut(&SymbolInfo)>,
}

pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { scopes: vec![Scope { kind: ScopeKind::Module, symbols: HashMap::new() }] }
    }

    pub fn enter_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope { kind, symbols: HashMap::new() });
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes.last().expect("module scope always present").kind
    }

    pub fn define(
        &mut self,
        mut info: SymbolInfo,
        mut options: DefineOptions<'_>,
    ) -> Result<(), DuplicateSymbol> {
        if self.scopes.last().unwrap().symbols.contains_key(&info.name) {
            return Err(DuplicateSymbol { name: info.name });
        }
        if let Some(depth) = self.find_enclosing_depth(&info.name) {
            info.shadowed_from = Some(depth);
            if let Some(callback) = options.on_shadow.as_deref_mut() {
                callback(&info);
            }
        }
        self.scopes.last_mut().unwrap().symbols.insert(info.name.clone(), info);
        Ok(())
    }

    fn find_enclosing_depth(&self, name: &str) -> Option<usize> {
        // Enclosing scopes only — the current scope was already checked by
        // the caller for a duplicate, not a shadow.
        self.scopes[..self.scopes.len() - 1]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, scope)| scope.symbols.contains_key(name))
            .map(|(depth, _)| depth)
    }

    /// Walks from the current scope to the module root.
    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.symbols.get(name))
    }

    /// Looks only in the current scope.
    pub fn lookup_local(&self, name: &str) -> Option<&SymbolInfo> {
        self.scopes.last().and_then(|scope| scope.symbols.get(name))
    }

    /// Finds the scope that defines `name` (walking outward from current)
    /// and flips its `captured` flag. A no-op if `name` is not in scope.
    pub fn mark_captured(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(info) = scope.symbols.get_mut(name) {
                info.captured = true;
                return;
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrType;

    fn int_symbol(name: &str) -> SymbolInfo {
        SymbolInfo::new(name, IrType::TypeName("Int".into()), SymbolKind::Variable)
    }

    #[test]
    fn define_then_lookup_finds_symbol_in_current_scope() {
        let mut table = SymbolTable::new();
        table.define(int_symbol("x"), DefineOptions::default()).unwrap();
        assert!(table.lookup("x").is_some());
    }

    #[test]
    fn duplicate_define_in_same_scope_fails() {
        let mut table = SymbolTable::new();
        table.define(int_symbol("x"), DefineOptions::default()).unwrap();
        let err = table.define(int_symbol("x"), DefineOptions::default()).unwrap_err();
        assert_eq!(err.name, "x");
    }

    #[test]
    fn lookup_walks_to_enclosing_scope() {
        let mut table = SymbolTable::new();
        table.define(int_symbol("outer"), DefineOptions::default()).unwrap();
        table.enter_scope(ScopeKind::Function);
        assert!(table.lookup("outer").is_some());
        assert!(table.lookup_local("outer").is_none());
    }

    #[test]
    fn shadowing_an_enclosing_scope_fires_the_callback_and_records_depth() {
        let mut table = SymbolTable::new();
        table.define(int_symbol("x"), DefineOptions::default()).unwrap();
        table.enter_scope(ScopeKind::Block);
        let mut fired = false;
        let mut on_shadow = |_info: &SymbolInfo| fired = true;
        table
            .define(int_symbol("x"), DefineOptions { on_shadow: Some(&mut on_shadow) })
            .unwrap();
        assert!(fired);
        assert_eq!(table.lookup_local("x").unwrap().shadowed_from, Some(0));
    }

    #[test]
    fn module_scope_cannot_be_exited() {
        let mut table = SymbolTable::new();
        table.exit_scope();
        assert_eq!(table.current_kind(), ScopeKind::Module);
    }

    #[test]
    fn mark_captured_flips_the_flag_on_the_defining_scope() {
        let mut table = SymbolTable::new();
        table.define(int_symbol("x"), DefineOptions::default()).unwrap();
        table.enter_scope(ScopeKind::Lambda);
        table.mark_captured("x");
        table.exit_scope();
        assert!(table.lookup_local("x").unwrap().captured);
    }
}
