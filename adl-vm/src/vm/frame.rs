// adl-vm - Call frames for the ADL virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames.

use std::rc::Rc;

use adl_core::code::Instructions;
use adl_core::value::Closure;

/// An activation record: the executing closure, its instruction pointer,
/// and the base of its local-variable window on the value stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub closure: Rc<Closure>,
    /// Index of the last executed byte; the run loop pre-increments, so a
    /// fresh frame starts at -1.
    pub ip: isize,
    /// First stack slot of this frame's window: parameters first, then
    /// locals.
    pub base_pointer: usize,
}

impl Frame {
    /// Create a frame for a closure whose window starts at `base_pointer`.
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Frame {
            closure,
            ip: -1,
            base_pointer,
        }
    }

    /// The instruction stream of the executing function.
    pub fn instructions(&self) -> &Instructions {
        &self.closure.func.instructions
    }
}
