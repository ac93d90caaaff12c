//! # Tokenizer
//!
//! Splits preprocessed source text into a flat token stream. Single pass,
//! no backtracking; whitespace separates tokens and is otherwise
//! discarded.
//!
//! Rules are checked in order at each position:
//! 1. `."` (dot immediately followed by a double quote) becomes
//!    `Sym(".\"")`, the print-string marker; the string itself follows as
//!    a separate `Str` token.
//! 2. A bare `"` opens a quoted string, consumed up to the closing `"`.
//! 3. `(` opens a signature comment, consumed up to the matching `)`;
//!    unmatched is fatal.
//! 4. `\` comments to end of line.
//! 5. `0x` begins a hex literal (`[0-9a-fA-F]+`); an empty body is fatal.
//! 6. Decimal digits form a `Number`.
//! 7. A letter or `_` starts a `Word`, continuing over
//!    `[A-Za-z0-9_]`.
//! 8. Any other character becomes a single-character `Sym`.

pub mod cursor;
pub mod token;


use crate::error::{CompileError, ErrorKind, Span};
use cursor::Cursor;
use token::{Token, TokenKind};

pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<CompileError>,
}

#[must_use]
pub fn tokenize(source: &str) -> LexResult {
    let chars: Vec<char> = source.chars().collect();
    let mut cursor = Cursor::new(&chars);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    while !cursor.is_at_end() {
        match lex_token(&mut cursor) {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }

    let (l, c) = cursor.current_pos();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: chars.len(), end: chars.len(), line: l, col: c },
    });

    LexResult { tokens, errors }
}

fn lex_token(cursor: &mut Cursor) -> Result<Option<Token>, CompileError> {
    while matches!(cursor.peek(), Some(c) if c.is_whitespace()) {
        cursor.advance();
    }

    if cursor.is_at_end() {
        return Ok(None);
    }

    let sb = cursor.pos();
    let (sl, sc) = cursor.current_pos();
    let ch = cursor.peek().unwrap();

    if ch == '.' && cursor.peek_at(1) == Some('"') {
        cursor.advance();
        cursor.advance();
        return Ok(Some(Token {
            kind: TokenKind::Sym(".\"".to_string()),
            span: cursor.make_span(sb, sl, sc),
        }));
    }

    match ch {
        '"' => lex_string(cursor, sb, sl, sc).map(Some),
        '(' => lex_signature_comment(cursor, sb, sl, sc),
        '\\' => {
            lex_line_comment(cursor);
            Ok(None)
        }
        '0' if cursor.peek_at(1) == Some('x') || cursor.peek_at(1) == Some('X') => {
            lex_hex(cursor, sb, sl, sc).map(Some)
        }
        c if c.is_ascii_digit() => lex_decimal(cursor, sb, sl, sc).map(Some),
        c if c.is_alphabetic() || c == '_' => Ok(Some(lex_word(cursor, sb, sl, sc))),
        _ => {
            cursor.advance();
            Ok(Some(Token {
                kind: TokenKind::Sym(ch.to_string()),
                span: cursor.make_span(sb, sl, sc),
            }))
        }
    }
}

fn lex_string(
    cursor: &mut Cursor,
    sb: usize,
    sl: usize,
    sc: usize,
) -> Result<Token, CompileError> {
    cursor.advance(); // opening quote
    let mut text = String::new();

    loop {
        match cursor.peek() {
            None => {
                return Err(CompileError::new(
                    ErrorKind::UnterminatedString,
                    "unterminated string literal",
                    cursor.make_span(sb, sl, sc),
                ))
            }
            Some('"') => {
                cursor.advance();
                break;
            }
            Some(c) => {
                cursor.advance();
                text.push(c);
            }
        }
    }

    Ok(Token { kind: TokenKind::Str(text), span: cursor.make_span(sb, sl, sc) })
}

fn lex_signature_comment(
    cursor: &mut Cursor,
    sb: usize,
    sl: usize,
    sc: usize,
) -> Result<Option<Token>, CompileError> {
    cursor.advance(); // '('
    loop {
        match cursor.advance() {
            None => {
                return Err(CompileError::new(
                    ErrorKind::UnterminatedSignatureComment,
                    "unterminated signature comment: missing closing ')'",
                    cursor.make_span(sb, sl, sc),
                ))
            }
            Some(')') => return Ok(None),
            Some(_) => {}
        }
    }
}

fn lex_line_comment(cursor: &mut Cursor) {
    while let Some(ch) = cursor.peek() {
        if ch == '\n' {
            break;
        }
        cursor.advance();
    }
}

fn lex_hex(
    cursor: &mut Cursor,
    sb: usize,
    sl: usize,
    sc: usize,
) -> Result<Token, CompileError> {
    cursor.advance(); // '0'
    cursor.advance(); // 'x'/'X'

    let mut digits = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_hexdigit()) {
        digits.push(cursor.advance().unwrap());
    }

    if digits.is_empty() {
        return Err(CompileError::new(
            ErrorKind::InvalidHexLiteral,
            "expected hex digits after 0x",
            cursor.make_span(sb, sl, sc),
        ));
    }

    let value = i64::from_str_radix(&digits, 16).map_err(|_| {
        CompileError::new(
            ErrorKind::InvalidHexLiteral,
            format!("invalid hex literal: 0x{digits}"),
            cursor.make_span(sb, sl, sc),
        )
    })?;

    Ok(Token { kind: TokenKind::Number(value), span: cursor.make_span(sb, sl, sc) })
}

fn lex_decimal(
    cursor: &mut Cursor,
    sb: usize,
    sl: usize,
    sc: usize,
) -> Result<Token, CompileError> {
    let mut digits = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
        digits.push(cursor.advance().unwrap());
    }

    let value = digits.parse::<i64>().map_err(|_| {
        CompileError::new(
            ErrorKind::ExpectedLiteral,
            format!("invalid decimal literal: {digits}"),
            cursor.make_span(sb, sl, sc),
        )
    })?;

    Ok(Token { kind: TokenKind::Number(value), span: cursor.make_span(sb, sl, sc) })
}

fn lex_word(cursor: &mut Cursor, sb: usize, sl: usize, sc: usize) -> Token {
    let mut word = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
        word.push(cursor.advance().unwrap());
    }

    Token { kind: TokenKind::Word(word), span: cursor.make_span(sb, sl, sc) }
}
