// adl-vm - Symbol table for the ADL compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Nested symbol tables.
//!
//! Each function being compiled gets its own table frame, linked to the
//! frame of the enclosing function. Resolution walks outward; when it finds
//! a `Local` or `Free` binding in an outer frame, the current frame captures
//! it: the original symbol is appended to `free_symbols` and the name is
//! re-bound locally with scope `Free`, so repeated lookups reuse the same
//! slot. The closure compiled from a frame loads every `free_symbols` entry,
//! in order, right before its `OpClosure`.

use std::collections::HashMap;

/// Where a resolved name lives, which decides the load opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    /// Captured from an enclosing function.
    Free,
    /// The currently compiling function itself.
    Function,
    Builtin,
}

/// A resolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// One frame of the nested symbol table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    /// Count of Global/Local definitions; becomes `num_locals` on the
    /// compiled function. Builtin, Free and Function bindings do not count.
    num_definitions: usize,
    /// Captured outer symbols in order of first appearance. The position in
    /// this list is the runtime `Free` index.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Create an empty top-level table.
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Create a table enclosed in `outer` (entering a function).
    pub fn enclosed(outer: SymbolTable) -> Self {
        SymbolTable {
            outer: Some(Box::new(outer)),
            ..SymbolTable::default()
        }
    }

    /// Detach and return the enclosing table (leaving a function).
    pub fn take_outer(&mut self) -> Option<SymbolTable> {
        self.outer.take().map(|outer| *outer)
    }

    /// Number of Global/Local definitions made in this frame.
    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    /// Define a name in this frame. Global in the top-level frame, Local
    /// otherwise; shadows any previous binding of the same name here.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    /// Bind a builtin at its fixed registry index.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Bind the name of the function currently being compiled, so its body
    /// can refer to itself before any global slot is written.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Function,
            index: 0,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Resolve a name, capturing it as a free variable if it comes from an
    /// enclosing function's locals.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }

        let outer = self.outer.as_mut()?;
        let symbol = outer.resolve(name)?;

        match symbol.scope {
            SymbolScope::Global | SymbolScope::Builtin | SymbolScope::Function => Some(symbol),
            SymbolScope::Local | SymbolScope::Free => Some(self.define_free(symbol)),
        }
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        self.free_symbols.push(original.clone());

        let symbol = Symbol {
            name: original.name,
            scope: SymbolScope::Free,
            index: self.free_symbols.len() - 1,
        };
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }
}
