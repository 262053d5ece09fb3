// adl-vm - Symbol table tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use adl_vm::compiler::symbols::{Symbol, SymbolScope, SymbolTable};

fn symbol(name: &str, scope: SymbolScope, index: usize) -> Symbol {
    Symbol {
        name: name.to_string(),
        scope,
        index,
    }
}

#[test]
fn define_assigns_indices_in_order() {
    let mut global = SymbolTable::new();
    assert_eq!(global.define("a"), symbol("a", SymbolScope::Global, 0));
    assert_eq!(global.define("b"), symbol("b", SymbolScope::Global, 1));

    let mut first_local = SymbolTable::enclosed(global);
    assert_eq!(first_local.define("c"), symbol("c", SymbolScope::Local, 0));
    assert_eq!(first_local.define("d"), symbol("d", SymbolScope::Local, 1));

    let mut second_local = SymbolTable::enclosed(first_local);
    assert_eq!(second_local.define("e"), symbol("e", SymbolScope::Local, 0));
    assert_eq!(second_local.define("f"), symbol("f", SymbolScope::Local, 1));
}

#[test]
fn resolve_global() {
    let mut global = SymbolTable::new();
    global.define("a");
    global.define("b");

    assert_eq!(
        global.resolve("a"),
        Some(symbol("a", SymbolScope::Global, 0))
    );
    assert_eq!(
        global.resolve("b"),
        Some(symbol("b", SymbolScope::Global, 1))
    );
    assert_eq!(global.resolve("c"), None);
}

#[test]
fn resolve_local_sees_outer_globals() {
    let mut global = SymbolTable::new();
    global.define("a");
    global.define("b");

    let mut local = SymbolTable::enclosed(global);
    local.define("c");
    local.define("d");

    assert_eq!(local.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
    assert_eq!(local.resolve("b"), Some(symbol("b", SymbolScope::Global, 1)));
    assert_eq!(local.resolve("c"), Some(symbol("c", SymbolScope::Local, 0)));
    assert_eq!(local.resolve("d"), Some(symbol("d", SymbolScope::Local, 1)));
}

#[test]
fn shadowing_in_the_same_frame_rebinds() {
    let mut global = SymbolTable::new();
    global.define("a");
    let shadowed = global.define("a");

    // The rebinding takes a fresh slot and wins every later lookup.
    assert_eq!(shadowed.index, 1);
    assert_eq!(global.resolve("a"), Some(symbol("a", SymbolScope::Global, 1)));
}

#[test]
fn builtins_resolve_at_every_nesting_depth() {
    let mut global = SymbolTable::new();
    global.define_builtin(0, "len");
    global.define_builtin(1, "out");

    assert_eq!(
        global.resolve("len"),
        Some(symbol("len", SymbolScope::Builtin, 0))
    );

    let first = SymbolTable::enclosed(global);
    let mut second = SymbolTable::enclosed(first);

    // Builtins propagate unchanged; they are never captured.
    assert_eq!(
        second.resolve("len"),
        Some(symbol("len", SymbolScope::Builtin, 0))
    );
    assert_eq!(
        second.resolve("out"),
        Some(symbol("out", SymbolScope::Builtin, 1))
    );
    assert!(second.free_symbols.is_empty());
}

#[test]
fn resolving_outer_locals_captures_them_as_free() {
    let mut global = SymbolTable::new();
    global.define("a");
    global.define("b");

    let mut first = SymbolTable::enclosed(global);
    first.define("c");
    first.define("d");

    let mut second = SymbolTable::enclosed(first);
    second.define("e");
    second.define("f");

    assert_eq!(second.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
    assert_eq!(second.resolve("b"), Some(symbol("b", SymbolScope::Global, 1)));
    assert_eq!(second.resolve("c"), Some(symbol("c", SymbolScope::Free, 0)));
    assert_eq!(second.resolve("d"), Some(symbol("d", SymbolScope::Free, 1)));
    assert_eq!(second.resolve("e"), Some(symbol("e", SymbolScope::Local, 0)));
    assert_eq!(second.resolve("f"), Some(symbol("f", SymbolScope::Local, 1)));

    // free_symbols records the original outer symbols, in capture order.
    assert_eq!(
        second.free_symbols,
        vec![
            symbol("c", SymbolScope::Local, 0),
            symbol("d", SymbolScope::Local, 1),
        ]
    );
}

#[test]
fn repeated_resolution_reuses_the_same_free_slot() {
    let mut global = SymbolTable::new();
    global.define("a");

    let mut first = SymbolTable::enclosed(global);
    first.define("c");

    let mut second = SymbolTable::enclosed(first);

    let once = second.resolve("c");
    let twice = second.resolve("c");
    assert_eq!(once, Some(symbol("c", SymbolScope::Free, 0)));
    assert_eq!(once, twice);
    assert_eq!(second.free_symbols.len(), 1);
}

#[test]
fn unresolvable_names_stay_unresolvable() {
    let mut global = SymbolTable::new();
    global.define("a");

    let mut first = SymbolTable::enclosed(global);
    first.define("c");

    let mut second = SymbolTable::enclosed(first);
    second.define("e");
    second.define("f");

    assert!(second.resolve("a").is_some());
    assert!(second.resolve("c").is_some());
    assert!(second.resolve("e").is_some());
    assert!(second.resolve("f").is_some());

    assert_eq!(second.resolve("b"), None);
    assert_eq!(second.resolve("d"), None);
}

#[test]
fn define_and_resolve_function_name() {
    let mut global = SymbolTable::new();
    global.define_function_name("a");

    assert_eq!(
        global.resolve("a"),
        Some(symbol("a", SymbolScope::Function, 0))
    );
}

#[test]
fn shadowing_the_function_name_wins() {
    let mut global = SymbolTable::new();
    global.define_function_name("a");
    global.define("a");

    assert_eq!(global.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
}

#[test]
fn num_definitions_ignores_free_builtin_and_function_bindings() {
    let mut global = SymbolTable::new();
    global.define_builtin(0, "len");
    global.define("a");

    let mut inner = SymbolTable::enclosed(global);
    inner.define_function_name("f");
    inner.define("x");
    inner.resolve("a");

    // Only the Local definition counts toward reserved slots.
    assert_eq!(inner.num_definitions(), 1);
}
