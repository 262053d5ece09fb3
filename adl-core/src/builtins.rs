// adl-core - Built-in functions for ADL
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The fixed registry of host-provided functions.
//!
//! The position of a builtin in [`BUILTINS`] is its index in the bytecode
//! (`OpGetBuiltin` operand); the compiler pre-defines the names in every
//! fresh symbol table with those indices. Do not reorder.

use std::fmt;

use im::Vector;

use crate::value::Value;

/// Signature of a builtin. `None` means "no value": the VM pushes null.
/// Failures are reported as `Value::Error` results, not host errors.
pub type BuiltinFn = fn(&[Value]) -> Option<Value>;

/// A host-provided function.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl Builtin {
    /// Invoke the builtin on the given argument slice.
    pub fn call(&self, args: &[Value]) -> Option<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Builtin) -> bool {
        // Names are unique within the fixed registry.
        self.name == other.name
    }
}

/// The builtin registry, in index order.
pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "len",
        func: builtin_len,
    },
    Builtin {
        name: "out",
        func: builtin_out,
    },
    Builtin {
        name: "first",
        func: builtin_first,
    },
    Builtin {
        name: "last",
        func: builtin_last,
    },
    Builtin {
        name: "rest",
        func: builtin_rest,
    },
    Builtin {
        name: "push",
        func: builtin_push,
    },
];

/// Look a builtin up by name (used by tests and diagnostics).
pub fn get_builtin_by_name(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

fn new_error(message: String) -> Option<Value> {
    Some(Value::Error(message))
}

/// `len(array | string)` - element or byte count.
fn builtin_len(args: &[Value]) -> Option<Value> {
    if args.len() != 1 {
        return new_error(format!(
            "wrong number of arguments. got={}, want=1",
            args.len()
        ));
    }

    match &args[0] {
        Value::Array(elements) => Some(Value::Integer(elements.len() as i64)),
        Value::String(s) => Some(Value::Integer(s.len() as i64)),
        other => new_error(format!(
            "argument to `len` not supported, got {}",
            other.kind()
        )),
    }
}

/// `out(args...)` - print each argument's inspection on its own line.
fn builtin_out(args: &[Value]) -> Option<Value> {
    for arg in args {
        println!("{}", arg);
    }
    None
}

/// `first(array)` - the first element, or null when empty.
fn builtin_first(args: &[Value]) -> Option<Value> {
    if args.len() != 1 {
        return new_error(format!(
            "wrong number of arguments, got={}, want=1",
            args.len()
        ));
    }

    match &args[0] {
        Value::Array(elements) => elements.front().cloned(),
        other => new_error(format!(
            "argument to `first` must be an array, got {}",
            other.kind()
        )),
    }
}

/// `last(array)` - the last element, or null when empty.
fn builtin_last(args: &[Value]) -> Option<Value> {
    if args.len() != 1 {
        return new_error(format!(
            "wrong number of arguments, got={}, want=1",
            args.len()
        ));
    }

    match &args[0] {
        Value::Array(elements) => elements.back().cloned(),
        other => new_error(format!(
            "argument to `last` must be an array, got {}",
            other.kind()
        )),
    }
}

/// `rest(array)` - a new array without the first element, or null when
/// empty.
fn builtin_rest(args: &[Value]) -> Option<Value> {
    if args.len() != 1 {
        return new_error(format!(
            "wrong number of arguments, got={}, want=1",
            args.len()
        ));
    }

    match &args[0] {
        Value::Array(elements) => {
            if elements.is_empty() {
                return None;
            }
            let rest: Vector<Value> = elements.iter().skip(1).cloned().collect();
            Some(Value::Array(rest))
        }
        other => new_error(format!(
            "argument to `rest` must be an array, got {}",
            other.kind()
        )),
    }
}

/// `push(array, value)` - a new array with the value appended.
fn builtin_push(args: &[Value]) -> Option<Value> {
    if args.len() != 2 {
        return new_error(format!(
            "wrong number of arguments, got={}, want=2",
            args.len()
        ));
    }

    match &args[0] {
        Value::Array(elements) => {
            let mut pushed = elements.clone();
            pushed.push_back(args[1].clone());
            Some(Value::Array(pushed))
        }
        other => new_error(format!(
            "argument to `push` must be an array, got {}",
            other.kind()
        )),
    }
}
