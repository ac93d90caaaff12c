//! # Parser
//!
//! Recursive-descent parser over the token stream, built on a linear
//! cursor rather than a flat per-line dispatch — this language's grammar
//! nests (`if`/`begin`/`times` bodies can contain further structured
//! forms), so each construct recurses into its own body.
//!
//! Top level loop:
//! - `Sym(":")` opens a procedure **definition**: an identifier (must not
//!   be a keyword), then a body terminated by `Sym(";")`.
//! - `Word` equal to one of `var str const alloc vector` opens a
//!   **declaration**.
//! - anything else is parsed as a statement into the top-level body.

pub mod ast;

#[cfg(test)]
mod tests;

use crate::error::{CompileError, ErrorKind, Span};
use crate::lexer::token::{Token, TokenKind};
use ast::{Binding, Body, Program, SizeRef, Statement};

const KEYWORDS: &[&str] =
    &["if", "else", "then", "begin", "until", "times", "next", "var", "const", "str", "alloc", "vector"];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn span(&self) -> Span {
        self.peek().span
    }
}

pub fn parse(tokens: &[Token]) -> Result<Program, CompileError> {
    let mut cursor = Cursor::new(tokens);
    let mut bindings = Vec::new();
    let mut body = Vec::new();

    while !cursor.is_eof() {
        if cursor.peek().kind.is_sym(":") {
            bindings.push(parse_definition(&mut cursor)?);
            continue;
        }

        if let Some(word) = cursor.peek().kind.as_word() {
            if matches!(word, "var" | "str" | "const" | "alloc" | "vector") {
                bindings.push(parse_declaration(&mut cursor)?);
                continue;
            }
        }

        body.push(parse_statement(&mut cursor)?);
    }

    Ok(Program { bindings, body })
}

fn parse_ident(cursor: &mut Cursor) -> Result<String, CompileError> {
    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            "expected an identifier, found end of file",
            cursor.span(),
        ));
    }

    let tok = cursor.advance();
    let name = match &tok.kind {
        TokenKind::Word(w) => w.clone(),
        TokenKind::Sym(s) => s.clone(),
        _ => {
            return Err(CompileError::new(
                ErrorKind::UnexpectedToken,
                "expected an identifier",
                tok.span,
            ))
        }
    };

    if is_keyword(&name) {
        return Err(CompileError::new(
            ErrorKind::KeywordAsIdentifier,
            format!("'{name}' is a keyword and cannot be used as a name"),
            tok.span,
        ));
    }

    Ok(name)
}

fn parse_number(cursor: &mut Cursor) -> Result<i64, CompileError> {
    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            "expected a numeric literal, found end of file",
            cursor.span(),
        ));
    }

    let tok = cursor.advance();
    match tok.kind {
        TokenKind::Number(n) => Ok(n),
        _ => Err(CompileError::new(
            ErrorKind::ExpectedLiteral,
            "expected a numeric literal",
            tok.span,
        )),
    }
}

fn parse_string(cursor: &mut Cursor) -> Result<String, CompileError> {
    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            "expected a string literal, found end of file",
            cursor.span(),
        ));
    }

    let tok = cursor.advance();
    match &tok.kind {
        TokenKind::Str(s) => Ok(s.clone()),
        _ => Err(CompileError::new(
            ErrorKind::ExpectedString,
            "expected a string literal",
            tok.span,
        )),
    }
}

/// A `number | const-name` operand, as used by `alloc` and `vector`.
fn parse_size_ref(cursor: &mut Cursor) -> Result<SizeRef, CompileError> {
    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            "expected a number or a const name, found end of file",
            cursor.span(),
        ));
    }

    if let TokenKind::Number(n) = cursor.peek().kind {
        cursor.advance();
        return Ok(SizeRef::Literal(n));
    }

    Ok(SizeRef::ConstRef(parse_ident(cursor)?))
}

fn expect_sym(cursor: &mut Cursor, text: &str, expecting: &str) -> Result<(), CompileError> {
    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            format!("expected {expecting}, found end of file"),
            cursor.span(),
        ));
    }

    let tok = cursor.advance();
    if tok.kind.is_sym(text) {
        Ok(())
    } else {
        Err(CompileError::new(
            ErrorKind::UnexpectedToken,
            format!("expected {expecting}"),
            tok.span,
        ))
    }
}

fn parse_definition(cursor: &mut Cursor) -> Result<Binding, CompileError> {
    cursor.advance(); // ':'
    let name = parse_ident(cursor)?;
    let body = parse_body(cursor, &[";"], "';'")?;
    expect_sym(cursor, ";", "';' to close the definition")?;
    Ok(Binding::Definition { name, body })
}

fn parse_declaration(cursor: &mut Cursor) -> Result<Binding, CompileError> {
    let keyword = cursor.advance().kind.as_word().unwrap().to_string();

    match keyword.as_str() {
        "var" => {
            let name = parse_ident(cursor)?;
            Ok(Binding::Variable { name })
        }
        "str" => {
            let name = parse_ident(cursor)?;
            let text = parse_string(cursor)?;
            Ok(Binding::StringLit { name, text })
        }
        "const" => {
            let name = parse_ident(cursor)?;
            let value = parse_number(cursor)?;
            Ok(Binding::Const { name, value })
        }
        "alloc" => {
            let name = parse_ident(cursor)?;
            let size = parse_size_ref(cursor)?;
            Ok(Binding::Alloc { name, size })
        }
        "vector" => {
            let port = parse_size_ref(cursor)?;
            expect_sym(cursor, ":", "':' between the port and the handler name")?;
            let handler_name = parse_ident(cursor)?;
            Ok(Binding::Vector { port, handler_name })
        }
        _ => unreachable!("parse_declaration dispatched on a non-declaration keyword"),
    }
}

fn parse_body(
    cursor: &mut Cursor,
    stop_syms: &[&str],
    expected: &str,
) -> Result<Body, CompileError> {
    let mut statements = Vec::new();

    loop {
        if cursor.is_eof() {
            return Err(CompileError::new(
                ErrorKind::UnexpectedEof,
                format!("expected {expected}, found end of file"),
                cursor.span(),
            ));
        }

        if stop_syms.iter().any(|s| cursor.peek().kind.is_sym(s)) {
            break;
        }
        if let Some(word) = cursor.peek().kind.as_word() {
            if stop_syms.contains(&word) {
                break;
            }
        }

        statements.push(parse_statement(cursor)?);
    }

    Ok(statements)
}

fn parse_statement(cursor: &mut Cursor) -> Result<Statement, CompileError> {
    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            "expected a statement, found end of file",
            cursor.span(),
        ));
    }

    if let TokenKind::Number(n) = cursor.peek().kind {
        cursor.advance();
        return Ok(Statement::Number(n));
    }

    if let TokenKind::Str(_) = &cursor.peek().kind {
        let tok = cursor.advance();
        if let TokenKind::Str(s) = &tok.kind {
            return Ok(Statement::Str(s.clone()));
        }
        unreachable!();
    }

    if let Some(word) = cursor.peek().kind.as_word() {
        match word {
            "if" => return parse_if(cursor),
            "begin" => return parse_begin(cursor),
            "times" => return parse_times(cursor),
            _ => {}
        }
    }

    let tok = cursor.advance();
    let name = match &tok.kind {
        TokenKind::Word(w) => w.clone(),
        TokenKind::Sym(s) => s.clone(),
        _ => {
            return Err(CompileError::new(
                ErrorKind::UnexpectedToken,
                "unexpected token in statement position",
                tok.span,
            ))
        }
    };
    Ok(Statement::Ident(name))
}

fn parse_if(cursor: &mut Cursor) -> Result<Statement, CompileError> {
    cursor.advance(); // 'if'
    let then_body = parse_body(cursor, &["else", "then"], "'else' or 'then'")?;

    if let Some("else") = cursor.peek().kind.as_word() {
        cursor.advance();
        let else_body = parse_body(cursor, &["then"], "'then'")?;
        expect_then(cursor)?;
        return Ok(Statement::IfStmt { then_body, else_body: Some(else_body) });
    }

    expect_then(cursor)?;
    Ok(Statement::IfStmt { then_body, else_body: None })
}

fn expect_then(cursor: &mut Cursor) -> Result<(), CompileError> {
    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            "expected 'then', found end of file",
            cursor.span(),
        ));
    }
    let tok = cursor.advance();
    if tok.kind.as_word() == Some("then") {
        Ok(())
    } else {
        Err(CompileError::new(ErrorKind::UnexpectedToken, "expected 'then'", tok.span))
    }
}

fn parse_begin(cursor: &mut Cursor) -> Result<Statement, CompileError> {
    cursor.advance(); // 'begin'
    let body = parse_body(cursor, &["until"], "'until'")?;

    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            "expected 'until', found end of file",
            cursor.span(),
        ));
    }
    cursor.advance(); // 'until'
    Ok(Statement::BeginLoop { body })
}

fn parse_times(cursor: &mut Cursor) -> Result<Statement, CompileError> {
    cursor.advance(); // 'times'
    let body = parse_body(cursor, &["next"], "'next'")?;

    if cursor.is_eof() {
        return Err(CompileError::new(
            ErrorKind::UnexpectedEof,
            "expected 'next', found end of file",
            cursor.span(),
        ));
    }
    cursor.advance(); // 'next'
    Ok(Statement::TimesLoop { body })
}
