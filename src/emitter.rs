//! # Emitter
//!
//! Accumulates instruction records for one compile, tracking label
//! positions and queuing forward references until every label has been
//! marked.
//!
//! Label resolution here is entirely instance state (`labels`, `patches`,
//! `pc_words`) rather than a module-global counter — two compiles (or two
//! tests) running in the same process never see each other's labels.

use std::collections::HashMap;

use crate::error::{CompileError, Span};
use crate::isa::{instruction_len, InstructionRecord};

/// A forward reference awaiting resolution: the index into `records` whose
/// `imm` field must be filled in once `label` is known.
struct Patch {
    record_index: usize,
    label: String,
    span: Span,
}

pub struct Emitter {
    records: Vec<InstructionRecord>,
    labels: HashMap<String, u32>,
    patches: Vec<Patch>,
    pc_words: u32,
}

impl Emitter {
    pub fn new() -> Self {
        Self { records: Vec::new(), labels: HashMap::new(), patches: Vec::new(), pc_words: 0 }
    }

    /// Current program counter, in words, of the next emitted instruction.
    pub fn pc_words(&self) -> u32 {
        self.pc_words
    }

    /// Binds `label` to the current program counter.
    pub fn mark(&mut self, label: impl Into<String>) {
        self.labels.insert(label.into(), self.pc_words);
    }

    pub fn label_addr(&self, label: &str) -> Option<u32> {
        self.labels.get(label).copied()
    }

    /// Appends `record`, advancing the program counter by its encoded
    /// length.
    pub fn emit(&mut self, record: InstructionRecord) {
        self.pc_words += instruction_len(&record);
        self.records.push(record);
    }

    /// Emits a jump whose immediate target is `label`, which may not be
    /// marked yet. If it isn't, the jump's immediate is queued for
    /// `patch_all` to fill in later.
    pub fn emit_jmp_to_label(&mut self, mut record: InstructionRecord, label: impl Into<String>, span: Span) {
        let label = label.into();
        if let Some(addr) = self.labels.get(&label) {
            record.imm = Some(*addr as i64);
            self.emit(record);
        } else {
            let index = self.records.len();
            record.imm = Some(0);
            self.emit(record);
            self.patches.push(Patch { record_index: index, label, span });
        }
    }

    /// Resolves every queued forward reference. Must be called once all
    /// labels in the program have been marked.
    pub fn patch_all(&mut self) -> Result<(), CompileError> {
        for patch in &self.patches {
            let addr = self
                .labels
                .get(&patch.label)
                .ok_or_else(|| CompileError::undefined_label(&patch.label, patch.span))?;
            self.records[patch.record_index].imm = Some(*addr as i64);
        }
        self.patches.clear();
        Ok(())
    }

    pub fn into_records(self) -> Vec<InstructionRecord> {
        self.records
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
