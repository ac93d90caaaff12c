//! # Abstract Syntax Tree (AST)
//!
//! Defines the data structures produced by the parser.
//!
//! ## Structure
//!
//! A `Program` is a flat list of top-level `Binding`s (declarations and
//! procedure definitions) plus the top-level `Body` executed at startup.
//! Each syntactic category is a sum type matched exhaustively by the code
//! generator rather than a class hierarchy walked with `isinstance`.

/// A top-level declaration or procedure definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Definition { name: String, body: Body },
    Variable { name: String },
    StringLit { name: String, text: String },
    Const { name: String, value: i64 },
    Alloc { name: String, size: SizeRef },
    Vector { port: SizeRef, handler_name: String },
}

/// A size or port operand that may be given as a literal number or as the
/// name of a previously declared `const`.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeRef {
    Literal(i64),
    ConstRef(String),
}

pub type Body = Vec<Statement>;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Number(i64),
    Str(String),
    Ident(String),
    IfStmt { then_body: Body, else_body: Option<Body> },
    BeginLoop { body: Body },
    TimesLoop { body: Body },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub bindings: Vec<Binding>,
    pub body: Body,
}
