// adl-vm - Bytecode compiler and virtual machine for the ADL programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for ADL.
//!
//! The [`compiler`] lowers a parsed program to a linear byte stream plus a
//! constants pool, resolving every name to a (scope, index) pair through a
//! nested symbol table. The [`vm`] executes that stream with explicit call
//! frames, a fixed-size value stack and a globals array.

pub mod compiler;
pub mod vm;

pub use compiler::{Bytecode, CompileError, Compiler};
pub use vm::{RuntimeError, Vm};
