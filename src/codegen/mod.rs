//! # Code Generator
//!
//! Lowers a parsed program into `InstructionRecord`s plus the data-segment
//! words produced by [`crate::data_layout`].
//!
//! Every stack primitive expands to a short template built from a handful
//! of scratch registers (`eax`, `ebx`, `ecx`, `dr`) — pop operands off the
//! data stack into registers, compute, push the result back. Control
//! constructs and comparisons need fresh label names; those are minted by
//! a [`LabelGen`] owned by this compile alone, so two compiles running in
//! the same process never collide and the label numbering for identical
//! input is always the same.
//!
//! `compile` lays the image out as: entry jump, then the interrupt vector
//! table (`nop`-padded up to `VECTOR_BASE`, then one `jmp handler` per
//! bound port in ascending order, each preceded by more padding), then
//! every procedure body, then the top-level body under `__entry_main`. A
//! `times` loop's counter is protected across its body on the return
//! stack rather than left sitting in `ecx`, so the body is free to clobber
//! `ecx` itself.

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

use crate::data_layout::symbol_table::{SymbolKind, SymbolTable};
use crate::data_layout::{self};
use crate::emitter::Emitter;
use crate::error::{CompileError, ErrorKind, Span};
use crate::isa::{AddrMode, InstructionRecord, Opcode, Register};
use crate::parser::ast::{Binding, Body, Program, SizeRef, Statement};

const STDIN_PORT: u32 = 1;
const STDOUT_PORT: u32 = 2;
const ENTRY_LABEL: &str = "__entry_main";
const TRUE_VALUE: i64 = -1;
const FALSE_VALUE: i64 = 0;
/// Word address where the interrupt vector table begins. Port `p`'s entry
/// lives at word `VECTOR_BASE + p`.
const VECTOR_BASE: u32 = 1;

pub struct CodegenResult {
    pub instructions: Vec<InstructionRecord>,
    pub data_words: Vec<u32>,
    pub symbol_table: SymbolTable,
}

/// Mints label names unique to one compile. Each prefix gets its own
/// counter, so `if_else_0`, `if_else_1`, ... never collide with
/// `cmp_true_0`, `cmp_true_1`, ...
struct LabelGen {
    counters: HashMap<&'static str, u32>,
}

impl LabelGen {
    fn new() -> Self {
        Self { counters: HashMap::new() }
    }

    fn fresh(&mut self, prefix: &'static str) -> String {
        let n = self.counters.entry(prefix).or_insert(0);
        let label = format!("{prefix}_{n}");
        *n += 1;
        label
    }
}

pub fn compile(program: &Program) -> Result<CodegenResult, CompileError> {
    let layout = data_layout::layout(&program.bindings)?;

    let mut procedures: Vec<(String, &Body)> = Vec::new();
    let mut vectors: Vec<(SizeRef, String)> = Vec::new();
    for binding in &program.bindings {
        match binding {
            Binding::Definition { name, body } => {
                if find_procedure(&procedures, name).is_some() {
                    return Err(CompileError::duplicate_name(name, Span::dummy()));
                }
                procedures.push((name.clone(), body));
            }
            Binding::Vector { port, handler_name } => {
                vectors.push((port.clone(), handler_name.clone()));
            }
            Binding::Const { .. } | Binding::Variable { .. } | Binding::StringLit { .. } | Binding::Alloc { .. } => {}
        }
    }

    let mut resolved_vectors: Vec<(u32, String)> = Vec::new();
    let mut seen_ports = HashSet::new();
    for (port, handler_name) in &vectors {
        let resolved = resolve_port(&layout.symbol_table, port)?;
        if !seen_ports.insert(resolved) {
            return Err(CompileError::new(
                ErrorKind::DuplicateVectorPort,
                format!("interrupt port {resolved} is bound to more than one vector"),
                Span::dummy(),
            ));
        }
        resolved_vectors.push((resolved, handler_name.clone()));
    }
    resolved_vectors.sort_by_key(|(port, _)| *port);

    let mut em = Emitter::new();
    let mut labels = LabelGen::new();

    em.emit_jmp_to_label(jmp_record(), ENTRY_LABEL, Span::dummy());

    pad_to(&mut em, VECTOR_BASE);
    for (port, handler_name) in &resolved_vectors {
        pad_to(&mut em, VECTOR_BASE + port);
        em.emit_jmp_to_label(jmp_record(), handler_name.clone(), Span::dummy());
    }

    for (name, body) in &procedures {
        em.mark(name.clone());
        gen_body(&mut em, &mut labels, &layout.symbol_table, &procedures, body)?;
        em.emit(InstructionRecord::new(Opcode::Ret));
    }

    em.mark(ENTRY_LABEL);
    gen_body(&mut em, &mut labels, &layout.symbol_table, &procedures, &program.body)?;
    em.emit(InstructionRecord::new(Opcode::Halt));

    em.patch_all()?;

    Ok(CodegenResult {
        instructions: em.into_records(),
        data_words: layout.words,
        symbol_table: layout.symbol_table,
    })
}

/// Emits `nop`s until `pc_words` reaches `target`. A no-op if it's already
/// there — the entry jump alone occupies two words, which may already
/// clear a low `VECTOR_BASE`.
fn pad_to(em: &mut Emitter, target: u32) {
    while em.pc_words() < target {
        em.emit(InstructionRecord::new(Opcode::Nop));
    }
}

fn find_procedure<'a>(procedures: &'a [(String, &'a Body)], name: &str) -> Option<&'a Body> {
    procedures.iter().find(|(n, _)| n == name).map(|(_, b)| *b)
}

fn resolve_port(symtab: &SymbolTable, size: &SizeRef) -> Result<u32, CompileError> {
    match size {
        SizeRef::Literal(n) => Ok(*n as u32),
        SizeRef::ConstRef(name) => symtab.resolve_const_value(name).map(|v| v as u32).ok_or_else(|| {
            CompileError::new(ErrorKind::InvalidAllocSize, format!("'{name}' is not a declared const"), Span::dummy())
        }),
    }
}

fn gen_body(
    em: &mut Emitter,
    labels: &mut LabelGen,
    symtab: &SymbolTable,
    procedures: &[(String, &Body)],
    body: &Body,
) -> Result<(), CompileError> {
    let mut i = 0;
    while i < body.len() {
        match &body[i] {
            Statement::Ident(word) if word == ".\"" => {
                let text = match body.get(i + 1) {
                    Some(Statement::Str(s)) => s.clone(),
                    _ => {
                        return Err(CompileError::new(
                            ErrorKind::MissingPrintStringOperand,
                            "'.\"' must be followed by a quoted string",
                            Span::dummy(),
                        ))
                    }
                };
                gen_print_string(em, &text);
                i += 2;
                continue;
            }
            Statement::Number(n) => gen_push_imm(em, *n),
            Statement::Str(_) => {
                return Err(CompileError::new(
                    ErrorKind::MissingPrintStringOperand,
                    "string literal without a preceding '.\"'",
                    Span::dummy(),
                ))
            }
            Statement::Ident(word) => gen_word(em, labels, symtab, procedures, word)?,
            Statement::IfStmt { then_body, else_body } => {
                gen_if(em, labels, symtab, procedures, then_body, else_body.as_ref())?
            }
            Statement::BeginLoop { body: inner } => gen_begin(em, labels, symtab, procedures, inner)?,
            Statement::TimesLoop { body: inner } => gen_times(em, labels, symtab, procedures, inner)?,
        }
        i += 1;
    }
    Ok(())
}

fn gen_word(
    em: &mut Emitter,
    labels: &mut LabelGen,
    symtab: &SymbolTable,
    procedures: &[(String, &Body)],
    word: &str,
) -> Result<(), CompileError> {
    match word {
        "dup" => gen_dup(em),
        "swap" => gen_swap(em),
        "drop" => gen_drop(em),
        "over" => gen_over(em),
        "rot" => gen_rot(em),
        ">r" => gen_to_r(em),
        "r>" => gen_from_r(em),
        "r@" => gen_r_fetch(em),
        "@" => gen_fetch(em),
        "!" => gen_store(em),
        "+" => gen_binop(em, Opcode::Add),
        "-" => gen_binop(em, Opcode::Sub),
        "*" => gen_binop(em, Opcode::Mul),
        "/" => gen_binop(em, Opcode::Div),
        "mod" => gen_binop(em, Opcode::Mod),
        "and" => gen_binop(em, Opcode::And),
        "or" => gen_binop(em, Opcode::Or),
        "xor" => gen_binop(em, Opcode::Xor),
        "not" => gen_unop(em, Opcode::Not),
        "neg" => gen_unop(em, Opcode::Neg),
        "=" => gen_cmp(em, labels, Opcode::Jeq),
        "<" => gen_cmp(em, labels, Opcode::Jlt),
        ">" => gen_cmp(em, labels, Opcode::Jgt),
        "<=" => gen_cmp(em, labels, Opcode::Jle),
        ">=" => gen_cmp(em, labels, Opcode::Jge),
        "." | "emit" => gen_dot(em),
        "cr" => gen_cr(em),
        "key" => gen_key(em),
        "_enable_int_" => em.emit(InstructionRecord::new(Opcode::EnInt)),
        "_disable_int_" => em.emit(InstructionRecord::new(Opcode::DisInt)),
        "_iret_" => em.emit(InstructionRecord::new(Opcode::Iret)),
        "_exit_" => em.emit(InstructionRecord::new(Opcode::Halt)),
        other => {
            if find_procedure(procedures, other).is_some() {
                gen_call(em, other);
            } else if let Some(entry) = symtab.get(other) {
                match entry.kind {
                    SymbolKind::Const => gen_push_imm(em, entry.value.unwrap_or(0)),
                    SymbolKind::Var | SymbolKind::Str | SymbolKind::Alloc => gen_push_imm(em, entry.addr as i64),
                }
            } else {
                return Err(CompileError::unknown_word(other, Span::dummy()));
            }
        }
    }
    Ok(())
}

fn jmp_record() -> InstructionRecord {
    let mut r = InstructionRecord::new(Opcode::Jmp);
    r.rs1_addr_t = Some(AddrMode::Imm);
    r
}

fn gen_push_imm(em: &mut Emitter, value: i64) {
    let mut r = InstructionRecord::new(Opcode::PushDs);
    r.rs1_addr_t = Some(AddrMode::Imm);
    r.imm = Some(value);
    em.emit(r);
}

fn gen_push_reg(em: &mut Emitter, reg: Register) {
    let mut r = InstructionRecord::new(Opcode::PushDs);
    r.rs1 = Some(reg);
    r.rs1_addr_t = Some(AddrMode::Reg);
    em.emit(r);
}

fn gen_pop_to_reg(em: &mut Emitter, reg: Register) {
    let mut r = InstructionRecord::new(Opcode::PopDs);
    r.rd = Some(reg);
    r.rd_addr_t = Some(AddrMode::Reg);
    em.emit(r);
}

fn gen_mov_imm(em: &mut Emitter, reg: Register, value: i64) {
    let mut r = InstructionRecord::new(Opcode::Mov);
    r.rd = Some(reg);
    r.rd_addr_t = Some(AddrMode::Reg);
    r.rs1_addr_t = Some(AddrMode::Imm);
    r.imm = Some(value);
    em.emit(r);
}

/// `in`/`out` carry only a port number on the wire — no register field —
/// so the value they move is always DR, by convention, never named
/// explicitly in the instruction itself.
fn gen_out_port(em: &mut Emitter, port: u32) {
    let mut r = InstructionRecord::new(Opcode::Out);
    r.port = Some(port);
    em.emit(r);
}

fn gen_in_port(em: &mut Emitter, port: u32) {
    let mut r = InstructionRecord::new(Opcode::In);
    r.port = Some(port);
    em.emit(r);
}

fn gen_dup(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Eax);
    gen_push_reg(em, Register::Eax);
    gen_push_reg(em, Register::Eax);
}

fn gen_swap(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Ebx);
    gen_pop_to_reg(em, Register::Eax);
    gen_push_reg(em, Register::Ebx);
    gen_push_reg(em, Register::Eax);
}

fn gen_drop(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Eax);
}

fn gen_over(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Ebx);
    gen_pop_to_reg(em, Register::Eax);
    gen_push_reg(em, Register::Eax);
    gen_push_reg(em, Register::Ebx);
    gen_push_reg(em, Register::Eax);
}

fn gen_rot(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Ecx);
    gen_pop_to_reg(em, Register::Ebx);
    gen_pop_to_reg(em, Register::Eax);
    gen_push_reg(em, Register::Ebx);
    gen_push_reg(em, Register::Ecx);
    gen_push_reg(em, Register::Eax);
}

fn gen_to_r(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Eax);
    let mut r = InstructionRecord::new(Opcode::PushRs);
    r.rs1 = Some(Register::Eax);
    r.rs1_addr_t = Some(AddrMode::Reg);
    em.emit(r);
}

fn gen_from_r(em: &mut Emitter) {
    let mut r = InstructionRecord::new(Opcode::PopRs);
    r.rd = Some(Register::Eax);
    r.rd_addr_t = Some(AddrMode::Reg);
    em.emit(r);
    gen_push_reg(em, Register::Eax);
}

fn gen_r_fetch(em: &mut Emitter) {
    let mut pop = InstructionRecord::new(Opcode::PopRs);
    pop.rd = Some(Register::Eax);
    pop.rd_addr_t = Some(AddrMode::Reg);
    em.emit(pop);
    let mut push = InstructionRecord::new(Opcode::PushRs);
    push.rs1 = Some(Register::Eax);
    push.rs1_addr_t = Some(AddrMode::Reg);
    em.emit(push);
    gen_push_reg(em, Register::Eax);
}

fn gen_fetch(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Eax);
    let mut r = InstructionRecord::new(Opcode::Mov);
    r.rd = Some(Register::Ebx);
    r.rd_addr_t = Some(AddrMode::Reg);
    r.rs1 = Some(Register::Eax);
    r.rs1_addr_t = Some(AddrMode::Ind);
    em.emit(r);
    gen_push_reg(em, Register::Ebx);
}

fn gen_store(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Ebx);
    gen_pop_to_reg(em, Register::Eax);
    let mut r = InstructionRecord::new(Opcode::Mov);
    r.rd = Some(Register::Ebx);
    r.rd_addr_t = Some(AddrMode::Ind);
    r.rs1 = Some(Register::Eax);
    r.rs1_addr_t = Some(AddrMode::Reg);
    em.emit(r);
}

fn gen_binop(em: &mut Emitter, opcode: Opcode) {
    gen_pop_to_reg(em, Register::Ebx);
    gen_pop_to_reg(em, Register::Eax);
    let mut r = InstructionRecord::new(opcode);
    r.rd = Some(Register::Eax);
    r.rd_addr_t = Some(AddrMode::Reg);
    r.rs1 = Some(Register::Eax);
    r.rs1_addr_t = Some(AddrMode::Reg);
    r.rs2 = Some(Register::Ebx);
    r.rs2_addr_t = Some(AddrMode::Reg);
    em.emit(r);
    gen_push_reg(em, Register::Eax);
}

fn gen_unop(em: &mut Emitter, opcode: Opcode) {
    gen_pop_to_reg(em, Register::Eax);
    let mut r = InstructionRecord::new(opcode);
    r.rd = Some(Register::Eax);
    r.rd_addr_t = Some(AddrMode::Reg);
    r.rs1 = Some(Register::Eax);
    r.rs1_addr_t = Some(AddrMode::Reg);
    em.emit(r);
    gen_push_reg(em, Register::Eax);
}

/// Pops two operands, compares them, and pushes the all-ones/zero boolean
/// sentinel depending on whether `jump_if_true` fires.
fn gen_cmp(em: &mut Emitter, labels: &mut LabelGen, jump_if_true: Opcode) {
    gen_pop_to_reg(em, Register::Ebx);
    gen_pop_to_reg(em, Register::Eax);
    let mut c = InstructionRecord::new(Opcode::Cmp);
    c.rs1 = Some(Register::Eax);
    c.rs1_addr_t = Some(AddrMode::Reg);
    c.rs2 = Some(Register::Ebx);
    c.rs2_addr_t = Some(AddrMode::Reg);
    em.emit(c);

    let true_label = labels.fresh("cmp_true");
    let end_label = labels.fresh("cmp_end");

    let mut j = InstructionRecord::new(jump_if_true);
    j.rs1_addr_t = Some(AddrMode::Imm);
    em.emit_jmp_to_label(j, true_label.clone(), Span::dummy());

    gen_push_imm(em, FALSE_VALUE);
    let mut end_jmp = InstructionRecord::new(Opcode::Jmp);
    end_jmp.rs1_addr_t = Some(AddrMode::Imm);
    em.emit_jmp_to_label(end_jmp, end_label.clone(), Span::dummy());

    em.mark(true_label);
    gen_push_imm(em, TRUE_VALUE);
    em.mark(end_label);
}

fn gen_dot(em: &mut Emitter) {
    gen_pop_to_reg(em, Register::Dr);
    gen_out_port(em, STDOUT_PORT);
}

fn gen_cr(em: &mut Emitter) {
    gen_mov_imm(em, Register::Dr, '\r' as i64);
    gen_out_port(em, STDOUT_PORT);
    gen_mov_imm(em, Register::Dr, '\n' as i64);
    gen_out_port(em, STDOUT_PORT);
}

fn gen_key(em: &mut Emitter) {
    gen_in_port(em, STDIN_PORT);
    gen_push_reg(em, Register::Dr);
}

fn gen_print_string(em: &mut Emitter, text: &str) {
    for ch in text.chars() {
        gen_mov_imm(em, Register::Dr, ch as i64);
        gen_out_port(em, STDOUT_PORT);
    }
}

/// `name next_addr; jmp name` — the call pushes the address of the
/// instruction right after itself so `ret` knows where to resume.
fn gen_call(em: &mut Emitter, name: &str) {
    let next_addr = em.pc_words() + 4;
    let mut push = InstructionRecord::new(Opcode::PushRs);
    push.rs1_addr_t = Some(AddrMode::Imm);
    push.imm = Some(next_addr as i64);
    em.emit(push);
    let mut jmp = InstructionRecord::new(Opcode::Jmp);
    jmp.rs1_addr_t = Some(AddrMode::Imm);
    em.emit_jmp_to_label(jmp, name.to_string(), Span::dummy());
}

fn gen_if(
    em: &mut Emitter,
    labels: &mut LabelGen,
    symtab: &SymbolTable,
    procedures: &[(String, &Body)],
    then_body: &Body,
    else_body: Option<&Body>,
) -> Result<(), CompileError> {
    gen_pop_to_reg(em, Register::Eax);
    let mut c = InstructionRecord::new(Opcode::Cmp);
    c.rs1 = Some(Register::Eax);
    c.rs1_addr_t = Some(AddrMode::Reg);
    c.rs2_addr_t = Some(AddrMode::Imm);
    c.imm = Some(FALSE_VALUE);
    em.emit(c);

    let else_label = labels.fresh("if_else");
    let mut jeq = InstructionRecord::new(Opcode::Jeq);
    jeq.rs1_addr_t = Some(AddrMode::Imm);
    em.emit_jmp_to_label(jeq, else_label.clone(), Span::dummy());

    gen_body(em, labels, symtab, procedures, then_body)?;

    match else_body {
        Some(else_b) => {
            let end_label = labels.fresh("if_end");
            let mut jend = InstructionRecord::new(Opcode::Jmp);
            jend.rs1_addr_t = Some(AddrMode::Imm);
            em.emit_jmp_to_label(jend, end_label.clone(), Span::dummy());
            em.mark(else_label);
            gen_body(em, labels, symtab, procedures, else_b)?;
            em.mark(end_label);
        }
        None => em.mark(else_label),
    }
    Ok(())
}

fn gen_begin(
    em: &mut Emitter,
    labels: &mut LabelGen,
    symtab: &SymbolTable,
    procedures: &[(String, &Body)],
    body: &Body,
) -> Result<(), CompileError> {
    let loop_label = labels.fresh("begin_loop");
    em.mark(loop_label.clone());
    gen_body(em, labels, symtab, procedures, body)?;
    gen_pop_to_reg(em, Register::Eax);
    let mut c = InstructionRecord::new(Opcode::Cmp);
    c.rs1 = Some(Register::Eax);
    c.rs1_addr_t = Some(AddrMode::Reg);
    c.rs2_addr_t = Some(AddrMode::Imm);
    c.imm = Some(FALSE_VALUE);
    em.emit(c);
    let mut jeq = InstructionRecord::new(Opcode::Jeq);
    jeq.rs1_addr_t = Some(AddrMode::Imm);
    em.emit_jmp_to_label(jeq, loop_label, Span::dummy());
    Ok(())
}

fn gen_push_rs_reg(em: &mut Emitter, reg: Register) {
    let mut r = InstructionRecord::new(Opcode::PushRs);
    r.rs1 = Some(reg);
    r.rs1_addr_t = Some(AddrMode::Reg);
    em.emit(r);
}

fn gen_pop_rs_to_reg(em: &mut Emitter, reg: Register) {
    let mut r = InstructionRecord::new(Opcode::PopRs);
    r.rd = Some(reg);
    r.rd_addr_t = Some(AddrMode::Reg);
    em.emit(r);
}

/// A counted loop. The count lives on the return stack across the body
/// (`push_rs`/`pop_rs` around it) rather than staying in `ECX`, so the
/// body is free to use `ECX` itself — through `rot`, a nested `times`, or
/// a call — without corrupting the count. A count of 0 still runs the
/// body once: there is no forward-skip label for the zero case.
fn gen_times(
    em: &mut Emitter,
    labels: &mut LabelGen,
    symtab: &SymbolTable,
    procedures: &[(String, &Body)],
    body: &Body,
) -> Result<(), CompileError> {
    gen_pop_to_reg(em, Register::Ecx);
    gen_push_rs_reg(em, Register::Ecx);

    let loop_label = labels.fresh("times_loop");
    em.mark(loop_label.clone());
    gen_body(em, labels, symtab, procedures, body)?;

    gen_pop_rs_to_reg(em, Register::Ecx);

    let mut dec = InstructionRecord::new(Opcode::Sub);
    dec.rd = Some(Register::Ecx);
    dec.rd_addr_t = Some(AddrMode::Reg);
    dec.rs1 = Some(Register::Ecx);
    dec.rs1_addr_t = Some(AddrMode::Reg);
    dec.rs2_addr_t = Some(AddrMode::Imm);
    dec.imm = Some(1);
    em.emit(dec);

    gen_push_rs_reg(em, Register::Ecx);

    let mut c = InstructionRecord::new(Opcode::Cmp);
    c.rs1 = Some(Register::Ecx);
    c.rs1_addr_t = Some(AddrMode::Reg);
    c.rs2_addr_t = Some(AddrMode::Imm);
    c.imm = Some(0);
    em.emit(c);

    let mut jgt = InstructionRecord::new(Opcode::Jgt);
    jgt.rs1_addr_t = Some(AddrMode::Imm);
    em.emit_jmp_to_label(jgt, loop_label, Span::dummy());

    gen_pop_rs_to_reg(em, Register::Ecx);
    Ok(())
}
