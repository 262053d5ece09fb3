// adl-parser - Abstract syntax tree for ADL
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! AST node definitions.
//!
//! The `Display` impls render nodes back to (parenthesised) source text.
//! They are more than diagnostics: the compiler sorts hash-literal keys by
//! this rendering to make compiled output deterministic, and the parser
//! tests assert operator precedence through it.

use std::fmt;

/// The root node: a whole parsed program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

/// A series of statements enclosed in braces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let <name> = <value>;`
    Let { name: String, value: Expression },
    /// `return <value>;`
    Return { value: Expression },
    /// A bare expression followed by an optional semicolon.
    Expression { expression: Expression },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "let {} = {};", name, value),
            Statement::Return { value } => write!(f, "return {};", value),
            Statement::Expression { expression } => write!(f, "{}", expression),
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    IntegerLiteral(i64),
    BooleanLiteral(bool),
    StringLiteral(String),
    /// `<op><right>`, e.g. `-x` or `!ok`.
    Prefix {
        operator: String,
        right: Box<Expression>,
    },
    /// `<left> <op> <right>`.
    Infix {
        operator: String,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `if (<condition>) { <consequence> } else { <alternative> }`.
    If {
        condition: Box<Expression>,
        consequence: Block,
        alternative: Option<Block>,
    },
    /// `fn(<params>) { <body> }`. `name` is non-empty when the literal was
    /// bound by a `let`, and enables compile-time self-reference.
    FnLiteral {
        parameters: Vec<String>,
        body: Block,
        name: String,
    },
    /// `<function>(<arguments>)`.
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// `[<elements>]`.
    ArrayLiteral(Vec<Expression>),
    /// `{<key>: <value>, ...}` in source order; hashability of the keys is
    /// only checked at runtime.
    HashLiteral(Vec<(Expression, Expression)>),
    /// `<left>[<index>]`.
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(name) => f.write_str(name),
            Expression::IntegerLiteral(value) => write!(f, "{}", value),
            Expression::BooleanLiteral(value) => write!(f, "{}", value),
            Expression::StringLiteral(value) => f.write_str(value),
            Expression::Prefix { operator, right } => write!(f, "({}{})", operator, right),
            Expression::Infix {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {} {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
            Expression::FnLiteral {
                parameters,
                body,
                name,
            } => {
                if name.is_empty() {
                    write!(f, "fn({}) {}", parameters.join(", "), body)
                } else {
                    write!(f, "fn<{}>({}) {}", name, parameters.join(", "), body)
                }
            }
            Expression::Call {
                function,
                arguments,
            } => {
                let args: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", function, args.join(", "))
            }
            Expression::ArrayLiteral(elements) => {
                let elements: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Expression::HashLiteral(pairs) => {
                let pairs: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, v))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Expression::Index { left, index } => write!(f, "({}[{}])", left, index),
        }
    }
}
