// adl-vm - Stack-based virtual machine for ADL
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The fetch-decode-execute loop.
//!
//! The VM owns a fixed-size value stack, a globals array and a frame stack,
//! all allocated at construction. Execution runs to completion or to the
//! first runtime error. The loop invariant: a frame's `ip` points at the
//! last executed byte; each iteration pre-increments it, and operand reads
//! advance it by the operand width.

pub mod error;
pub mod frame;
pub mod stack;

use std::rc::Rc;

use adl_core::builtins::{BUILTINS, Builtin};
use adl_core::code::{self, Opcode};
use adl_core::value::{Closure, CompiledFunction, HashPair, Value};
use adl_core::{HashMap, Vector};

use crate::compiler::Bytecode;

pub use error::{Result, RuntimeError};
pub use frame::Frame;
pub use stack::ValueStack;

/// Size of the globals array.
pub const GLOBALS_SIZE: usize = 65536;
/// Size of the value stack.
pub const STACK_SIZE: usize = 2048;
/// Size of the frame stack.
pub const MAX_FRAMES: usize = 1024;

/// The ADL virtual machine.
pub struct Vm {
    constants: Vec<Value>,
    globals: Vec<Value>,
    stack: ValueStack,
    frames: Vec<Frame>,
}

impl Vm {
    /// Create a VM for the given bytecode. The top-level instructions are
    /// wrapped in a synthetic zero-argument closure executing as frame 0.
    pub fn new(bytecode: Bytecode) -> Self {
        let main_fn = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Closure {
            func: Rc::new(main_fn),
            free: Vec::new(),
        };

        let mut frames = Vec::with_capacity(MAX_FRAMES);
        frames.push(Frame::new(Rc::new(main_closure), 0));

        Vm {
            constants: bytecode.constants,
            globals: vec![Value::Null; GLOBALS_SIZE],
            stack: ValueStack::new(STACK_SIZE),
            frames,
        }
    }

    /// Create a VM reusing an existing globals array. The REPL threads the
    /// array through successive runs to retain `let` bindings.
    pub fn with_global_store(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        let mut vm = Vm::new(bytecode);
        vm.globals = globals;
        vm
    }

    /// Hand the globals array back for the next run.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The most recently popped value; what the REPL displays.
    pub fn last_popped_stack_elem(&self) -> &Value {
        self.stack.last_popped()
    }

    /// Execute until the main frame runs out of instructions.
    pub fn run(&mut self) -> Result<()> {
        while self.current_frame().ip < self.current_frame().instructions().len() as isize - 1 {
            self.current_frame_mut().ip += 1;

            let ip = self.current_frame().ip as usize;
            let byte = self.current_frame().instructions()[ip];
            let op = Opcode::try_from(byte).map_err(|e| RuntimeError::UndefinedOpcode(e.0))?;

            match op {
                Opcode::Constant => {
                    let const_index = self.read_u16_operand(ip + 1);
                    self.current_frame_mut().ip += 2;

                    let constant = self.constants[const_index].clone();
                    self.stack.push(constant)?;
                }
                Opcode::Pop => {
                    self.stack.pop()?;
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    self.execute_binary_operation(op)?;
                }
                Opcode::True => self.stack.push(Value::Boolean(true))?,
                Opcode::False => self.stack.push(Value::Boolean(false))?,
                Opcode::Null => self.stack.push(Value::Null)?,
                Opcode::Equal | Opcode::NotEqual | Opcode::GreaterThan => {
                    self.execute_comparison(op)?;
                }
                Opcode::Bang => {
                    let operand = self.stack.pop()?;
                    self.stack.push(Value::Boolean(!is_truthy(&operand)))?;
                }
                Opcode::Minus => {
                    let operand = self.stack.pop()?;
                    match operand {
                        Value::Integer(value) => self.stack.push(Value::Integer(-value))?,
                        other => return Err(RuntimeError::UnsupportedNegation(other.kind())),
                    }
                }
                Opcode::Jump => {
                    let target = self.read_u16_operand(ip + 1);
                    // The loop pre-increments, so land one byte short.
                    self.current_frame_mut().ip = target as isize - 1;
                }
                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand(ip + 1);
                    self.current_frame_mut().ip += 2;

                    let condition = self.stack.pop()?;
                    if !is_truthy(&condition) {
                        self.current_frame_mut().ip = target as isize - 1;
                    }
                }
                Opcode::SetGlobal => {
                    let global_index = self.read_u16_operand(ip + 1);
                    self.current_frame_mut().ip += 2;

                    self.globals[global_index] = self.stack.pop()?;
                }
                Opcode::GetGlobal => {
                    let global_index = self.read_u16_operand(ip + 1);
                    self.current_frame_mut().ip += 2;

                    self.stack.push(self.globals[global_index].clone())?;
                }
                Opcode::SetLocal => {
                    let local_index = self.read_u8_operand(ip + 1);
                    self.current_frame_mut().ip += 1;

                    let base_pointer = self.current_frame().base_pointer;
                    let value = self.stack.pop()?;
                    self.stack.set(base_pointer + local_index, value);
                }
                Opcode::GetLocal => {
                    let local_index = self.read_u8_operand(ip + 1);
                    self.current_frame_mut().ip += 1;

                    let base_pointer = self.current_frame().base_pointer;
                    self.stack
                        .push(self.stack.get(base_pointer + local_index).clone())?;
                }
                Opcode::Array => {
                    let num_elements = self.read_u16_operand(ip + 1);
                    self.current_frame_mut().ip += 2;

                    let sp = self.stack.sp();
                    let array = self.build_array(sp - num_elements, sp);
                    self.stack.set_sp(sp - num_elements);
                    self.stack.push(array)?;
                }
                Opcode::Hash => {
                    let num_elements = self.read_u16_operand(ip + 1);
                    self.current_frame_mut().ip += 2;

                    let sp = self.stack.sp();
                    let hash = self.build_hash(sp - num_elements, sp)?;
                    self.stack.set_sp(sp - num_elements);
                    self.stack.push(hash)?;
                }
                Opcode::Index => {
                    let index = self.stack.pop()?;
                    let left = self.stack.pop()?;
                    self.execute_index_expression(left, index)?;
                }
                Opcode::Call => {
                    let num_args = self.read_u8_operand(ip + 1);
                    self.current_frame_mut().ip += 1;

                    self.execute_call(num_args)?;
                }
                Opcode::ReturnValue => {
                    let return_value = self.stack.pop()?;

                    let frame = self.pop_frame();
                    if self.frames.is_empty() {
                        // Top-level `return`: surface the value as the final
                        // result and stop.
                        self.stack.push(return_value)?;
                        self.stack.pop()?;
                        return Ok(());
                    }

                    self.stack.set_sp(frame.base_pointer - 1);
                    self.stack.push(return_value)?;
                }
                Opcode::Return => {
                    let frame = self.pop_frame();
                    if self.frames.is_empty() {
                        self.stack.push(Value::Null)?;
                        self.stack.pop()?;
                        return Ok(());
                    }

                    self.stack.set_sp(frame.base_pointer - 1);
                    self.stack.push(Value::Null)?;
                }
                Opcode::GetBuiltin => {
                    let builtin_index = self.read_u8_operand(ip + 1);
                    self.current_frame_mut().ip += 1;

                    self.stack.push(Value::Builtin(BUILTINS[builtin_index]))?;
                }
                Opcode::Closure => {
                    let const_index = self.read_u16_operand(ip + 1);
                    let num_free = self.read_u8_operand(ip + 3);
                    self.current_frame_mut().ip += 3;

                    self.push_closure(const_index, num_free)?;
                }
                Opcode::GetFree => {
                    let free_index = self.read_u8_operand(ip + 1);
                    self.current_frame_mut().ip += 1;

                    let value = self.current_frame().closure.free[free_index].clone();
                    self.stack.push(value)?;
                }
                Opcode::CurrentClosure => {
                    let closure = Rc::clone(&self.current_frame().closure);
                    self.stack.push(Value::Closure(closure))?;
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn execute_binary_operation(&mut self, op: Opcode) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => {
                self.execute_binary_integer_operation(op, *l, *r)
            }
            (Value::String(l), Value::String(r)) => match op {
                Opcode::Add => self.stack.push(Value::string(format!("{}{}", l, r))),
                _ => Err(RuntimeError::UnknownOperator(op)),
            },
            _ => Err(RuntimeError::UnsupportedBinaryTypes {
                left: left.kind(),
                right: right.kind(),
            }),
        }
    }

    fn execute_binary_integer_operation(&mut self, op: Opcode, left: i64, right: i64) -> Result<()> {
        let result = match op {
            Opcode::Add => left + right,
            Opcode::Sub => left - right,
            Opcode::Mul => left * right,
            Opcode::Div => {
                if right == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                left / right
            }
            _ => return Err(RuntimeError::UnknownOperator(op)),
        };
        self.stack.push(Value::Integer(result))
    }

    fn execute_comparison(&mut self, op: Opcode) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        if let (Value::Integer(l), Value::Integer(r)) = (&left, &right) {
            let result = match op {
                Opcode::Equal => l == r,
                Opcode::NotEqual => l != r,
                Opcode::GreaterThan => l > r,
                _ => return Err(RuntimeError::UnknownOperator(op)),
            };
            return self.stack.push(Value::Boolean(result));
        }

        // Everything non-integer compares by reference identity; the
        // singleton-like variants make this value equality for booleans and
        // null.
        match op {
            Opcode::Equal => self.stack.push(Value::Boolean(left.identity_eq(&right))),
            Opcode::NotEqual => self.stack.push(Value::Boolean(!left.identity_eq(&right))),
            _ => Err(RuntimeError::UnknownComparison {
                op,
                left: left.kind(),
                right: right.kind(),
            }),
        }
    }

    // ========================================================================
    // Aggregates and indexing
    // ========================================================================

    fn build_array(&self, start: usize, end: usize) -> Value {
        let elements: Vector<Value> = self.stack.slice(start, end).iter().cloned().collect();
        Value::Array(elements)
    }

    fn build_hash(&self, start: usize, end: usize) -> Result<Value> {
        let mut pairs: HashMap<_, HashPair> = HashMap::new();

        let mut i = start;
        while i < end {
            let key = self.stack.get(i).clone();
            let value = self.stack.get(i + 1).clone();

            let hash_key = key
                .hash_key()
                .ok_or_else(|| RuntimeError::UnusableHashKey(key.kind()))?;
            pairs.insert(hash_key, HashPair { key, value });

            i += 2;
        }

        Ok(Value::Hash(pairs))
    }

    fn execute_index_expression(&mut self, left: Value, index: Value) -> Result<()> {
        match (&left, &index) {
            (Value::Array(elements), Value::Integer(i)) => {
                let element = if *i < 0 || *i as usize >= elements.len() {
                    Value::Null
                } else {
                    elements[*i as usize].clone()
                };
                self.stack.push(element)
            }
            (Value::Hash(pairs), key) => {
                let hash_key = key
                    .hash_key()
                    .ok_or_else(|| RuntimeError::UnusableHashKey(key.kind()))?;
                let value = pairs
                    .get(&hash_key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(Value::Null);
                self.stack.push(value)
            }
            _ => Err(RuntimeError::UnsupportedIndex(left.kind())),
        }
    }

    // ========================================================================
    // Calls, returns, closures
    // ========================================================================

    fn execute_call(&mut self, num_args: usize) -> Result<()> {
        let callee = self.stack.get(self.stack.sp() - 1 - num_args).clone();
        match callee {
            Value::Closure(closure) => self.call_closure(closure, num_args),
            Value::Builtin(builtin) => self.call_builtin(builtin, num_args),
            _ => Err(RuntimeError::NotCallable),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> Result<()> {
        if num_args != closure.func.num_parameters {
            return Err(RuntimeError::WrongArgumentCount {
                want: closure.func.num_parameters,
                got: num_args,
            });
        }

        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }

        let base_pointer = self.stack.sp() - num_args;
        let num_locals = closure.func.num_locals;
        if base_pointer + num_locals > self.stack.capacity() {
            return Err(RuntimeError::StackOverflow);
        }

        self.frames.push(Frame::new(closure, base_pointer));
        // Reserve the window for parameters and locals in one step.
        self.stack.set_sp(base_pointer + num_locals);

        Ok(())
    }

    fn call_builtin(&mut self, builtin: Builtin, num_args: usize) -> Result<()> {
        let sp = self.stack.sp();
        let args = self.stack.slice(sp - num_args, sp).to_vec();

        let result = builtin.call(&args);

        // Drop the arguments and the callee slot.
        self.stack.set_sp(sp - num_args - 1);

        match result {
            Some(value) => self.stack.push(value),
            None => self.stack.push(Value::Null),
        }
    }

    fn push_closure(&mut self, const_index: usize, num_free: usize) -> Result<()> {
        let constant = self.constants[const_index].clone();
        let func = match constant {
            Value::CompiledFunction(func) => func,
            other => return Err(RuntimeError::NotAFunction(other.to_string())),
        };

        let sp = self.stack.sp();
        let free: Vec<Value> = (0..num_free)
            .map(|i| self.stack.get(sp - num_free + i).clone())
            .collect();
        self.stack.set_sp(sp - num_free);

        self.stack.push(Value::Closure(Rc::new(Closure { func, free })))
    }

    // ========================================================================
    // Frames and operand decoding
    // ========================================================================

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("no active frame")
    }

    fn read_u16_operand(&self, offset: usize) -> usize {
        code::read_u16(&self.current_frame().instructions()[offset..]) as usize
    }

    fn read_u8_operand(&self, offset: usize) -> usize {
        code::read_u8(&self.current_frame().instructions()[offset..]) as usize
    }
}

/// False and null are falsy; every other value is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Null => false,
        _ => true,
    }
}
