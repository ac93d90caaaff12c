//! # Data Layout
//!
//! Assigns data-segment word addresses to every `const`, `str`, `var` and
//! `alloc` binding.
//!
//! Bindings are processed in four fixed phases so that a later phase can
//! always resolve a name declared in an earlier one (most importantly:
//! `alloc`'s size may reference a `const` declared anywhere in the
//! source, including after the `alloc` itself):
//!
//! 1. all `Const`
//! 2. all `StringLit`
//! 3. all `Variable`
//! 4. all `Alloc`
//!
//! Within a phase, declaration order is preserved and a single running
//! cursor assigns consecutive addresses across all four phases together.

pub mod symbol_table;

#[cfg(test)]
mod tests;

use crate::error::{CompileError, ErrorKind, Span};
use crate::parser::ast::{Binding, SizeRef};
use symbol_table::{SymbolEntry, SymbolKind, SymbolTable};

pub struct DataLayoutResult {
    pub symbol_table: SymbolTable,
    pub words: Vec<u32>,
}

pub fn layout(bindings: &[Binding]) -> Result<DataLayoutResult, CompileError> {
    let mut table = SymbolTable::new();
    let mut words: Vec<u32> = Vec::new();
    let mut cursor: u32 = 0;

    layout_consts(bindings, &mut table, &mut words, &mut cursor)?;
    layout_strings(bindings, &mut table, &mut words, &mut cursor)?;
    layout_variables(bindings, &mut table, &mut words, &mut cursor)?;
    layout_allocs(bindings, &mut table, &mut words, &mut cursor)?;

    Ok(DataLayoutResult { symbol_table: table, words })
}

fn declare(
    table: &mut SymbolTable,
    name: &str,
    entry: SymbolEntry,
) -> Result<(), CompileError> {
    if table.contains(name) {
        return Err(CompileError::duplicate_name(name, Span::dummy()));
    }
    table.insert(name.to_string(), entry);
    Ok(())
}

fn layout_consts(
    bindings: &[Binding],
    table: &mut SymbolTable,
    words: &mut Vec<u32>,
    cursor: &mut u32,
) -> Result<(), CompileError> {
    for binding in bindings {
        if let Binding::Const { name, value } = binding {
            declare(
                table,
                name,
                SymbolEntry { kind: SymbolKind::Const, addr: *cursor, size: 1, value: Some(*value) },
            )?;
            words.push(*value as u32);
            *cursor += 1;
        }
    }
    Ok(())
}

fn layout_strings(
    bindings: &[Binding],
    table: &mut SymbolTable,
    words: &mut Vec<u32>,
    cursor: &mut u32,
) -> Result<(), CompileError> {
    for binding in bindings {
        if let Binding::StringLit { name, text } = binding {
            let size = 1 + text.chars().count() as u32;
            declare(
                table,
                name,
                SymbolEntry { kind: SymbolKind::Str, addr: *cursor, size, value: None },
            )?;
            words.push(text.chars().count() as u32);
            for ch in text.chars() {
                words.push(ch as u32);
            }
            *cursor += size;
        }
    }
    Ok(())
}

fn layout_variables(
    bindings: &[Binding],
    table: &mut SymbolTable,
    words: &mut Vec<u32>,
    cursor: &mut u32,
) -> Result<(), CompileError> {
    for binding in bindings {
        if let Binding::Variable { name } = binding {
            declare(
                table,
                name,
                SymbolEntry { kind: SymbolKind::Var, addr: *cursor, size: 1, value: None },
            )?;
            words.push(0);
            *cursor += 1;
        }
    }
    Ok(())
}

fn layout_allocs(
    bindings: &[Binding],
    table: &mut SymbolTable,
    words: &mut Vec<u32>,
    cursor: &mut u32,
) -> Result<(), CompileError> {
    for binding in bindings {
        if let Binding::Alloc { name, size } = binding {
            let n = resolve_size(table, size)?;
            declare(
                table,
                name,
                SymbolEntry { kind: SymbolKind::Alloc, addr: *cursor, size: n, value: None },
            )?;
            for _ in 0..n {
                words.push(0);
            }
            *cursor += n;
        }
    }
    Ok(())
}

fn resolve_size(table: &SymbolTable, size: &SizeRef) -> Result<u32, CompileError> {
    match size {
        SizeRef::Literal(n) => Ok(*n as u32),
        SizeRef::ConstRef(name) => table.resolve_const_value(name).map(|v| v as u32).ok_or_else(|| {
            CompileError::new(
                ErrorKind::InvalidAllocSize,
                format!("'{name}' is not a declared const"),
                Span::dummy(),
            )
        }),
    }
}
