// adl - CLI driver for the ADL programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Entry point: execute a `.adl` source file, or run the interactive REPL.
//!
//! The REPL retains constants, globals and the symbol table across lines,
//! so `let` bindings survive from one input to the next.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

use adl_core::builtins::BUILTINS;
use adl_core::value::Value;
use adl_parser::Parser;
use adl_vm::compiler::Compiler;
use adl_vm::compiler::symbols::SymbolTable;
use adl_vm::vm::{GLOBALS_SIZE, Vm};

const PROMPT: &str = ">> ";

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("ADL v0.1.0");
        return;
    }

    if args.len() > 1 {
        if let Err(e) = execute_file(&args[1]) {
            eprintln!("Error executing file: {}", e);
            process::exit(1);
        }
    } else {
        run_repl();
    }
}

/// Compile and run a single source file, printing the final value.
fn execute_file(filename: &str) -> Result<(), String> {
    if Path::new(filename).extension().and_then(|e| e.to_str()) != Some("adl") {
        return Err("invalid file extension, expected .adl".to_string());
    }

    let source = fs::read_to_string(filename).map_err(|e| e.to_string())?;

    let mut parser = Parser::from_source(&source);
    let program = parser.parse_program();
    if !parser.errors().is_empty() {
        print_parser_errors(parser.errors());
        return Err("parsing errors".to_string());
    }

    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .map_err(|e| format!("compilation failed: {}", e))?;

    let mut machine = Vm::new(compiler.bytecode());
    machine
        .run()
        .map_err(|e| format!("execution of bytecode failed: {}", e))?;

    println!("{}", machine.last_popped_stack_elem());

    Ok(())
}

/// Read-eval-print loop with state retained across lines.
fn run_repl() {
    println!("Hello! This is the ADL programming language!");
    println!("Feel free to type in some commands");

    let mut constants: Vec<Value> = Vec::new();
    let mut globals: Vec<Value> = vec![Value::Null; GLOBALS_SIZE];
    let mut symbol_table = SymbolTable::new();
    for (index, builtin) in BUILTINS.iter().enumerate() {
        symbol_table.define_builtin(index, builtin.name);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}", PROMPT);
        stdout.flush().expect("failed to flush stdout");

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Read error: {}", e);
                return;
            }
        }

        let mut parser = Parser::from_source(&line);
        let program = parser.parse_program();
        if !parser.errors().is_empty() {
            print_parser_errors(parser.errors());
            continue;
        }

        let mut compiler = Compiler::with_state(
            std::mem::take(&mut symbol_table),
            std::mem::take(&mut constants),
        );
        if let Err(e) = compiler.compile(&program) {
            eprintln!("Compilation failed:\n {}", e);
            (symbol_table, constants) = compiler.into_state();
            continue;
        }

        let bytecode = compiler.bytecode();
        (symbol_table, constants) = compiler.into_state();

        let mut machine = Vm::with_global_store(bytecode, std::mem::take(&mut globals));
        match machine.run() {
            Ok(()) => {
                println!("{}", machine.last_popped_stack_elem());
            }
            Err(e) => {
                eprintln!("Execution of bytecode failed:\n {}", e);
            }
        }
        globals = machine.into_globals();
    }
}

fn print_parser_errors(errors: &[String]) {
    eprintln!("Woops! We ran into some trouble here!");
    eprintln!(" parser errors:");
    for message in errors {
        eprintln!("\t{}", message);
    }
}
