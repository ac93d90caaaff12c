//! # Instruction Encoder
//!
//! Packs `InstructionRecord`s into the 32-bit wire format and produces a
//! disassembly listing alongside the raw words.
//!
//! ## Word layout
//!
//! ```text
//! 31                24 23  20 19  16 15  12 11      6 5       0
//! +--------------------+------+------+------+--------+--------+
//! |  reserved (zero)   | rs2  | rs1  |  rd   | addr_t | opcode |
//! +--------------------+------+------+------+--------+--------+
//! ```
//!
//! `opcode` and `addr_t` are each 6 bits; `addr_t` itself packs three
//! 2-bit addressing-mode fields, one per operand, ordered `rd` (bits
//! 0-1), `rs1` (bits 2-3), `rs2` (bits 4-5). `rd`/`rs1`/`rs2` are 4 bits
//! each. Instructions needing an immediate (any operand in `Imm` or
//! `IndImm` mode, or any jump) carry it as a second 32-bit word in full.
//!
//! `in`/`out` are the exception: they're always one word, with the
//! 10-bit port number packed into bits 6-15. There's no addressing mode
//! and no register field on the wire — the register moved is always
//! `DR`, by convention, on both sides.


use crate::error::{CompileError, ErrorKind, Span};
use crate::isa::{AddrMode, InstructionRecord, Opcode, Register};

pub struct EncodeResult {
    pub words: Vec<u32>,
    pub listing: Vec<String>,
}

pub fn encode(instructions: &[InstructionRecord]) -> Result<EncodeResult, CompileError> {
    let mut words = Vec::new();
    let mut listing = Vec::new();
    let mut addr: u32 = 0;

    for record in instructions {
        let start_addr = addr;
        let encoded = encode_record(record)?;
        listing.extend(format_listing_lines(start_addr, record, &encoded));
        addr += encoded.len() as u32;
        words.extend(encoded);
    }

    Ok(EncodeResult { words, listing })
}

fn encode_record(record: &InstructionRecord) -> Result<Vec<u32>, CompileError> {
    if record.opcode.is_port_io() {
        return Ok(vec![encode_port_io(record)]);
    }

    let addr_t = pack_addr_t(record);
    let first = (record.opcode as u32 & 0x3F)
        | ((addr_t as u32 & 0x3F) << 6)
        | ((reg_bits(record.rd) as u32) << 12)
        | ((reg_bits(record.rs1) as u32) << 16)
        | ((reg_bits(record.rs2) as u32) << 20);

    let needs_immediate = record.opcode.is_jump()
        || [record.rd_addr_t, record.rs1_addr_t, record.rs2_addr_t]
            .iter()
            .flatten()
            .any(|m| m.needs_immediate_word());

    if needs_immediate {
        let imm = record
            .imm
            .ok_or_else(|| CompileError::new(ErrorKind::MissingImmediate, "instruction requires an immediate word but none was set", Span::dummy()))?;
        Ok(vec![first, imm as u32])
    } else {
        Ok(vec![first])
    }
}

fn encode_port_io(record: &InstructionRecord) -> u32 {
    let port = record.port.unwrap_or(0) & 0x3FF;
    (record.opcode as u32 & 0x3F) | (port << 6)
}

fn pack_addr_t(record: &InstructionRecord) -> u8 {
    let rd_bits = record.rd_addr_t.map(|m| m as u8).unwrap_or(0);
    let rs1_bits = record.rs1_addr_t.map(|m| m as u8).unwrap_or(0);
    let rs2_bits = record.rs2_addr_t.map(|m| m as u8).unwrap_or(0);
    rd_bits | (rs1_bits << 2) | (rs2_bits << 4)
}

fn reg_bits(reg: Option<Register>) -> u8 {
    reg.map(|r| r as u8).unwrap_or(0)
}

/// One line for the opcode word (`"<index> - <HEX8> - <mnemonic> <op>, ..."`),
/// plus a separate `"<index> - <HEX8> - imm=<decimal>"` line when a second,
/// immediate word follows.
fn format_listing_lines(addr: u32, record: &InstructionRecord, encoded: &[u32]) -> Vec<String> {
    let mut operands = Vec::new();
    if record.opcode.uses_rd() {
        if let Some(op) = format_operand(record.rd, record.rd_addr_t, record.imm) {
            operands.push(op);
        }
    }
    if record.opcode.uses_rs1() {
        if let Some(op) = format_operand(record.rs1, record.rs1_addr_t, record.imm) {
            operands.push(op);
        }
    }
    if record.opcode.uses_rs2() {
        if let Some(op) = format_operand(record.rs2, record.rs2_addr_t, record.imm) {
            operands.push(op);
        }
    }
    if record.opcode.is_port_io() {
        operands.push(format!("port={}", record.port.unwrap_or(0)));
    }

    let mut lines = vec![format!(
        "{addr} - {:08X} - {} {}",
        encoded[0],
        record.opcode.mnemonic(),
        operands.join(", ")
    )];

    if encoded.len() > 1 {
        if let Some(imm) = record.imm {
            lines.push(format!("{} - {:08X} - imm={imm}", addr + 1, encoded[1]));
        }
    }

    lines
}

/// Formats one operand per spec's disassembly convention: `REG→name`,
/// `IMM→#n`, `IND→[name]`, `IND+IMM→[name+n]`.
fn format_operand(reg: Option<Register>, mode: Option<AddrMode>, imm: Option<i64>) -> Option<String> {
    match mode? {
        AddrMode::Reg => Some(reg?.name().to_string()),
        AddrMode::Imm => Some(format!("#{}", imm?)),
        AddrMode::Ind => Some(format!("[{}]", reg?.name())),
        AddrMode::IndImm => Some(format!("[{}+{}]", reg?.name(), imm?)),
    }
}

/// Packs 32-bit words into big-endian bytes for the output binary files.
pub fn pack_words(words: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for word in words {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes
}
