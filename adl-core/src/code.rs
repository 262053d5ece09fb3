// adl-core - Bytecode instruction encoding for ADL
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Byte-level instruction encoding.
//!
//! An instruction is a single opcode byte followed by zero or more operands.
//! Operands are one or two bytes wide and written big-endian. [`make`]
//! assembles an instruction, [`read_operands`] disassembles one given its
//! [`Definition`].

use std::fmt;
use std::ops::{Deref, DerefMut};

/// A stream of encoded instructions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instructions(pub Vec<u8>);

impl Deref for Instructions {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Instructions {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Display for Instructions {
    /// Render the stream in disassembly form, one instruction per line:
    ///
    /// ```text
    /// 0000 OpConstant 1
    /// 0003 OpAdd
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut i = 0;
        while i < self.0.len() {
            let op = match Opcode::try_from(self.0[i]) {
                Ok(op) => op,
                Err(err) => {
                    writeln!(f, "ERROR: {}", err)?;
                    i += 1;
                    continue;
                }
            };

            let def = op.definition();
            let (operands, read) = read_operands(&def, &self.0[i + 1..]);

            write!(f, "{:04} {}", i, def.name)?;
            for operand in &operands {
                write!(f, " {}", operand)?;
            }
            writeln!(f)?;

            i += 1 + read;
        }
        Ok(())
    }
}

/// A single-byte operation code.
///
/// The discriminants are the wire encoding; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Push `constants[u16]`.
    Constant = 0,
    /// Pop two operands, push their sum.
    Add,
    /// Discard the top of the stack.
    Pop,
    Sub,
    Mul,
    Div,
    /// Push the true singleton.
    True,
    /// Push the false singleton.
    False,
    Equal,
    NotEqual,
    GreaterThan,
    /// Arithmetic negation.
    Minus,
    /// Logical negation.
    Bang,
    /// Pop the condition; jump to the u16 target if it is not truthy.
    JumpNotTruthy,
    /// Unconditional jump to the u16 target.
    Jump,
    /// Push the null singleton.
    Null,
    GetGlobal,
    SetGlobal,
    /// Build an array from the last u16 stack entries.
    Array,
    /// Build a hash from the last u16 stack entries (pairs x 2).
    Hash,
    /// Pop index and container, push the element.
    Index,
    /// Call the value below the last u8 arguments.
    Call,
    /// Pop the return value, pop the frame, push the value.
    ReturnValue,
    /// Pop the frame, push null.
    Return,
    GetLocal,
    SetLocal,
    /// Push `Builtins[u8]`.
    GetBuiltin,
    /// Build a closure from `constants[u16]` capturing the last u8 values.
    Closure,
    /// Push the closure being executed (compile-time self-reference).
    CurrentClosure,
    /// Push `current_closure.free[u8]`.
    GetFree,
}

/// Error for a byte that is not a defined opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndefinedOpcode(pub u8);

impl fmt::Display for UndefinedOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "opcode {} undefined", self.0)
    }
}

impl std::error::Error for UndefinedOpcode {}

impl TryFrom<u8> for Opcode {
    type Error = UndefinedOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        let op = match byte {
            0 => Constant,
            1 => Add,
            2 => Pop,
            3 => Sub,
            4 => Mul,
            5 => Div,
            6 => True,
            7 => False,
            8 => Equal,
            9 => NotEqual,
            10 => GreaterThan,
            11 => Minus,
            12 => Bang,
            13 => JumpNotTruthy,
            14 => Jump,
            15 => Null,
            16 => GetGlobal,
            17 => SetGlobal,
            18 => Array,
            19 => Hash,
            20 => Index,
            21 => Call,
            22 => ReturnValue,
            23 => Return,
            24 => GetLocal,
            25 => SetLocal,
            26 => GetBuiltin,
            27 => Closure,
            28 => CurrentClosure,
            29 => GetFree,
            other => return Err(UndefinedOpcode(other)),
        };
        Ok(op)
    }
}

/// The name and operand layout of an opcode.
#[derive(Debug, Clone, Copy)]
pub struct Definition {
    pub name: &'static str,
    /// Width in bytes of each operand, in order.
    pub operand_widths: &'static [usize],
}

impl Opcode {
    /// The encoding definition for this opcode.
    pub fn definition(self) -> Definition {
        use Opcode::*;
        let (name, operand_widths): (&'static str, &'static [usize]) = match self {
            Constant => ("OpConstant", &[2]),
            Add => ("OpAdd", &[]),
            Pop => ("OpPop", &[]),
            Sub => ("OpSub", &[]),
            Mul => ("OpMul", &[]),
            Div => ("OpDiv", &[]),
            True => ("OpTrue", &[]),
            False => ("OpFalse", &[]),
            Equal => ("OpEqual", &[]),
            NotEqual => ("OpNotEqual", &[]),
            GreaterThan => ("OpGreaterThan", &[]),
            Minus => ("OpMinus", &[]),
            Bang => ("OpBang", &[]),
            JumpNotTruthy => ("OpJumpNotTruthy", &[2]),
            Jump => ("OpJump", &[2]),
            Null => ("OpNull", &[]),
            GetGlobal => ("OpGetGlobal", &[2]),
            SetGlobal => ("OpSetGlobal", &[2]),
            Array => ("OpArray", &[2]),
            Hash => ("OpHash", &[2]),
            Index => ("OpIndex", &[]),
            Call => ("OpCall", &[1]),
            ReturnValue => ("OpReturnValue", &[]),
            Return => ("OpReturn", &[]),
            GetLocal => ("OpGetLocal", &[1]),
            SetLocal => ("OpSetLocal", &[1]),
            GetBuiltin => ("OpGetBuiltin", &[1]),
            Closure => ("OpClosure", &[2, 1]),
            CurrentClosure => ("OpCurrentClosure", &[]),
            GetFree => ("OpGetFree", &[1]),
        };
        Definition {
            name,
            operand_widths,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

/// Assemble a single instruction from an opcode and its operands.
///
/// Operand counts or values that do not fit the definition are programmer
/// errors; surplus operands are ignored, missing ones are zero.
pub fn make(op: Opcode, operands: &[usize]) -> Instructions {
    let def = op.definition();

    let len = 1 + def.operand_widths.iter().sum::<usize>();
    let mut instruction = Vec::with_capacity(len);
    instruction.push(op as u8);

    for (operand, width) in operands.iter().zip(def.operand_widths) {
        match width {
            2 => instruction.extend_from_slice(&(*operand as u16).to_be_bytes()),
            1 => instruction.push(*operand as u8),
            _ => unreachable!("unsupported operand width {}", width),
        }
    }

    Instructions(instruction)
}

/// Decode the operands of an instruction, given its definition and the
/// bytes following the opcode. Returns the operands and the number of bytes
/// read.
pub fn read_operands(def: &Definition, ins: &[u8]) -> (Vec<usize>, usize) {
    let mut operands = Vec::with_capacity(def.operand_widths.len());
    let mut offset = 0;

    for width in def.operand_widths {
        match width {
            2 => operands.push(read_u16(&ins[offset..]) as usize),
            1 => operands.push(read_u8(&ins[offset..]) as usize),
            _ => unreachable!("unsupported operand width {}", width),
        }
        offset += width;
    }

    (operands, offset)
}

/// Read a big-endian u16 from the start of the slice.
pub fn read_u16(ins: &[u8]) -> u16 {
    u16::from_be_bytes([ins[0], ins[1]])
}

/// Read a u8 from the start of the slice.
pub fn read_u8(ins: &[u8]) -> u8 {
    ins[0]
}
