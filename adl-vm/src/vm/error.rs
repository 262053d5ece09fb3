// adl-vm - Runtime error types for the ADL virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors.
//!
//! A runtime error terminates the current `run` invocation; there is no
//! unwinding and no in-language handler. The driver decides whether to
//! continue (REPL) or abort (file mode).

use std::fmt;

use adl_core::code::Opcode;
use adl_core::value::ValueKind;

/// Error during VM execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The value stack or the frame stack is exhausted.
    StackOverflow,
    /// More values were popped than pushed; only reachable through
    /// malformed bytecode.
    StackUnderflow,
    /// A byte in the instruction stream is not a defined opcode.
    UndefinedOpcode(u8),
    /// Binary operation on an unsupported type pairing.
    UnsupportedBinaryTypes { left: ValueKind, right: ValueKind },
    /// Integer or string operation with an opcode that does not apply.
    UnknownOperator(Opcode),
    /// Comparison of a type pairing with no defined ordering.
    UnknownComparison {
        op: Opcode,
        left: ValueKind,
        right: ValueKind,
    },
    /// Arithmetic negation of a non-integer.
    UnsupportedNegation(ValueKind),
    /// Integer division with a zero divisor.
    DivisionByZero,
    /// Hash construction or lookup with an unhashable key.
    UnusableHashKey(ValueKind),
    /// Index operation on a value that is neither array nor hash.
    UnsupportedIndex(ValueKind),
    /// Closure call with the wrong argument count.
    WrongArgumentCount { want: usize, got: usize },
    /// Call of a value that is neither a closure nor a builtin.
    NotCallable,
    /// An `OpClosure` operand pointing at a non-function constant.
    NotAFunction(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackOverflow => write!(f, "stack overflow"),
            RuntimeError::StackUnderflow => write!(f, "stack underflow"),
            RuntimeError::UndefinedOpcode(byte) => write!(f, "opcode {} undefined", byte),
            RuntimeError::UnsupportedBinaryTypes { left, right } => {
                write!(f, "unsupported type for binary operation: {} {}", left, right)
            }
            RuntimeError::UnknownOperator(op) => write!(f, "unknown operator: {}", op),
            RuntimeError::UnknownComparison { op, left, right } => {
                write!(f, "unknown operator: {} ({} {})", op, left, right)
            }
            RuntimeError::UnsupportedNegation(kind) => {
                write!(f, "unsupported type for negation: {}", kind)
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::UnusableHashKey(kind) => write!(f, "unusable as hash key: {}", kind),
            RuntimeError::UnsupportedIndex(kind) => {
                write!(f, "index operator not supported: {}", kind)
            }
            RuntimeError::WrongArgumentCount { want, got } => {
                write!(f, "wrong number of arguments: want={}, got={}", want, got)
            }
            RuntimeError::NotCallable => write!(f, "calling non-function and non-built-in"),
            RuntimeError::NotAFunction(value) => write!(f, "not a function: {}", value),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
