// adl-vm - Bytecode compiler for ADL
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Single-pass compiler from AST to bytecode.
//!
//! The compiler walks the tree once, appending instructions to the current
//! compilation scope and values to the shared constants pool. A new scope
//! is entered per function literal, in lock-step with a new symbol-table
//! frame. Forward jumps are emitted with a placeholder operand and
//! back-patched in place once their target offset is known.

pub mod symbols;

use std::fmt;
use std::rc::Rc;

use adl_core::builtins::BUILTINS;
use adl_core::code::{self, Instructions, Opcode};
use adl_core::value::{CompiledFunction, Value};
use adl_parser::ast::{Block, Expression, Program, Statement};

use symbols::{Symbol, SymbolScope, SymbolTable};

/// Placeholder operand for jumps whose target is not yet known.
const PLACEHOLDER_JUMP_TARGET: usize = 9999;

/// Error during compilation. Aborts the compile and surfaces to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Reference to a name with no visible definition.
    UndefinedVariable(String),
    /// An operator token the compiler has no lowering for.
    UnknownOperator(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UndefinedVariable(name) => write!(f, "undefined variable {}", name),
            CompileError::UnknownOperator(op) => write!(f, "unknown operator {}", op),
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// The output of a compile: the main instruction stream and the constants
/// pool it references.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

/// The opcode and byte offset of an instruction already written to the
/// current scope.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

/// Per-function instruction buffer. Index 0 is the main program.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// The bytecode compiler.
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
    scope_index: usize,
}

impl Compiler {
    /// Create a compiler with a fresh symbol table; the builtin registry is
    /// pre-defined at its fixed indices.
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }

        Compiler {
            constants: Vec::new(),
            symbol_table,
            scopes: vec![CompilationScope::default()],
            scope_index: 0,
        }
    }

    /// Create a compiler that continues from existing state. The REPL uses
    /// this to retain the symbol table and constants across lines.
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        let mut compiler = Compiler::new();
        compiler.symbol_table = symbol_table;
        compiler.constants = constants;
        compiler
    }

    /// Hand the symbol table and constants back for the next compile.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    /// Compile a whole program into the current scope.
    pub fn compile(&mut self, program: &Program) -> Result<()> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// The compiled main instructions plus the constants pool.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.current_instructions().clone(),
            constants: self.constants.clone(),
        }
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression { expression } => {
                self.compile_expression(expression)?;
                self.emit(Opcode::Pop, &[]);
            }
            Statement::Let { name, value } => {
                // Defining before compiling the value reserves the slot, so
                // the value expression can already refer to the name
                // (recursive functions, forward self-references).
                let symbol = self.symbol_table.define(name);
                self.compile_expression(value)?;
                if symbol.scope == SymbolScope::Global {
                    self.emit(Opcode::SetGlobal, &[symbol.index]);
                } else {
                    self.emit(Opcode::SetLocal, &[symbol.index]);
                }
            }
            Statement::Return { value } => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[]);
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> Result<()> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::IntegerLiteral(value) => {
                let constant = self.add_constant(Value::Integer(*value));
                self.emit(Opcode::Constant, &[constant]);
            }
            Expression::StringLiteral(value) => {
                let constant = self.add_constant(Value::string(value));
                self.emit(Opcode::Constant, &[constant]);
            }
            Expression::BooleanLiteral(true) => {
                self.emit(Opcode::True, &[]);
            }
            Expression::BooleanLiteral(false) => {
                self.emit(Opcode::False, &[]);
            }
            Expression::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.load_symbol(&symbol);
            }
            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator.as_str() {
                    "-" => self.emit(Opcode::Minus, &[]),
                    "!" => self.emit(Opcode::Bang, &[]),
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                };
            }
            Expression::Infix {
                operator,
                left,
                right,
            } => {
                // `<` compiles as a reversed `>`; there is no dedicated
                // less-than opcode.
                if operator == "<" {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;

                match operator.as_str() {
                    "+" => self.emit(Opcode::Add, &[]),
                    "-" => self.emit(Opcode::Sub, &[]),
                    "*" => self.emit(Opcode::Mul, &[]),
                    "/" => self.emit(Opcode::Div, &[]),
                    ">" => self.emit(Opcode::GreaterThan, &[]),
                    "==" => self.emit(Opcode::Equal, &[]),
                    "!=" => self.emit(Opcode::NotEqual, &[]),
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                };
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                let jump_not_truthy_pos =
                    self.emit(Opcode::JumpNotTruthy, &[PLACEHOLDER_JUMP_TARGET]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(Opcode::Pop) {
                    // The branch is an expression: keep its value on the
                    // stack.
                    self.remove_last_pop();
                }

                let jump_pos = self.emit(Opcode::Jump, &[PLACEHOLDER_JUMP_TARGET]);

                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_not_truthy_pos, after_consequence);

                match alternative {
                    None => {
                        self.emit(Opcode::Null, &[]);
                    }
                    Some(alternative) => {
                        self.compile_block(alternative)?;
                        if self.last_instruction_is(Opcode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                }

                let after_alternative = self.current_instructions().len();
                self.change_operand(jump_pos, after_alternative);
            }
            Expression::FnLiteral {
                parameters,
                body,
                name,
            } => {
                self.enter_scope();

                if !name.is_empty() {
                    self.symbol_table.define_function_name(name);
                }
                for parameter in parameters {
                    self.symbol_table.define(parameter);
                }

                self.compile_block(body)?;

                // An expression in tail position becomes the return value.
                if self.last_instruction_is(Opcode::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Opcode::ReturnValue) {
                    self.emit(Opcode::Return, &[]);
                }

                let free_symbols = self.symbol_table.free_symbols.clone();
                let num_locals = self.symbol_table.num_definitions();
                let instructions = self.leave_scope();

                // Load every captured value, in capture order, so OpClosure
                // finds them on top of the stack.
                for symbol in &free_symbols {
                    self.load_symbol(symbol);
                }

                let function = CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: parameters.len(),
                };
                let constant = self.add_constant(Value::CompiledFunction(Rc::new(function)));
                self.emit(Opcode::Closure, &[constant, free_symbols.len()]);
            }
            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }
            Expression::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            Expression::HashLiteral(pairs) => {
                // Sort by the key's textual rendering: two textually equal
                // programs then compile to byte-identical output.
                let mut sorted: Vec<&(Expression, Expression)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[]);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Emit helpers
    // ========================================================================

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = code::make(op, operands);
        let position = self.add_instruction(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn add_instruction(&mut self, instruction: &Instructions) -> usize {
        let scope = &mut self.scopes[self.scope_index];
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(instruction);
        position
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        let scope = &mut self.scopes[self.scope_index];
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, opcode: Opcode) -> bool {
        self.scopes[self.scope_index]
            .last_instruction
            .is_some_and(|last| last.opcode == opcode)
    }

    fn remove_last_pop(&mut self) {
        let scope = &mut self.scopes[self.scope_index];
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    /// Overwrite the instruction at `position` in place. Only valid for a
    /// replacement of the same encoded width.
    fn replace_instruction(&mut self, position: usize, new_instruction: &Instructions) {
        let instructions = &mut self.scopes[self.scope_index].instructions;
        instructions[position..position + new_instruction.len()]
            .copy_from_slice(new_instruction);
    }

    /// Back-patch the operand of the jump emitted at `op_position`.
    fn change_operand(&mut self, op_position: usize, operand: usize) {
        let byte = self.current_instructions()[op_position];
        let op = Opcode::try_from(byte).expect("back-patching a byte that is not an opcode");
        let new_instruction = code::make(op, &[operand]);
        self.replace_instruction(op_position, &new_instruction);
    }

    /// Rewrite a trailing `Pop` into `ReturnValue` (implicit return of the
    /// last expression value). Both encode to a single byte.
    fn replace_last_pop_with_return(&mut self) {
        let last_position = self.scopes[self.scope_index]
            .last_instruction
            .expect("replacing last instruction in empty scope")
            .position;

        let return_value = code::make(Opcode::ReturnValue, &[]);
        self.replace_instruction(last_position, &return_value);

        if let Some(last) = &mut self.scopes[self.scope_index].last_instruction {
            last.opcode = Opcode::ReturnValue;
        }
    }

    fn current_instructions(&self) -> &Instructions {
        &self.scopes[self.scope_index].instructions
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.scope_index += 1;

        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("leaving scope with empty stack");
        self.scope_index -= 1;

        self.symbol_table = self
            .symbol_table
            .take_outer()
            .expect("leaving scope without enclosing symbol table");

        scope.instructions
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index]),
            SymbolScope::Function => self.emit(Opcode::CurrentClosure, &[]),
        };
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}
