// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Instruction emission with symbolic jump targets.
//!
//! Jumps are emitted against [`Label`]s. Each use of a label records a
//! fixup `(site, label)`; [`Assembler::finish`] resolves all of them in one
//! linking pass once every label has an address.

use super::bytecode::{Bytecode, Word};
use super::opcode::{Opcode, OpcodeTable};
use crate::error::CompileError;

/// A jump target, bound to an address at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Placeholder written at fixup sites until linking.
const UNRESOLVED: f64 = -1.0;

/// Emits words for one compilation.
pub struct Assembler<'t> {
    table: &'t OpcodeTable,
    code: Vec<Word>,
    labels: Vec<Option<usize>>,
    fixups: Vec<(usize, Label)>,
}

impl<'t> Assembler<'t> {
    /// Creates an assembler encoding with `table`.
    pub fn new(table: &'t OpcodeTable) -> Self {
        Self {
            table,
            code: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
        }
    }

    /// Address of the next emitted word.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// Emits an instruction with its inline operands.
    pub fn emit(&mut self, op: Opcode, operands: &[Word]) {
        debug_assert_eq!(op.arity(), operands.len(), "wrong operand count for {}", op);
        self.code.push(Word::Number(self.table.encode(op) as f64));
        self.code.extend_from_slice(operands);
    }

    /// Emits an instruction without operands.
    pub fn op(&mut self, op: Opcode) {
        self.emit(op, &[]);
    }

    /// Emits an instruction with one operand and returns the operand's site.
    pub fn op1(&mut self, op: Opcode, operand: impl Into<Word>) -> usize {
        self.emit(op, &[operand.into()]);
        self.position() - 1
    }

    /// Creates an unbound label.
    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds a label to the current position.
    pub fn bind(&mut self, label: Label) {
        debug_assert!(self.labels[label.0].is_none(), "label bound twice");
        self.labels[label.0] = Some(self.position());
    }

    /// Creates a label bound to the current position.
    pub fn here(&mut self) -> Label {
        let label = self.label();
        self.bind(label);
        label
    }

    /// Emits an instruction whose operands are jump targets; `None` is
    /// written as -1.
    pub fn emit_targets(&mut self, op: Opcode, targets: &[Option<Label>]) {
        debug_assert_eq!(op.arity(), targets.len(), "wrong target count for {}", op);
        self.code.push(Word::Number(self.table.encode(op) as f64));
        for target in targets {
            if let Some(label) = target {
                self.fixups.push((self.code.len(), *label));
            }
            self.code.push(Word::Number(UNRESOLVED));
        }
    }

    /// Emits a single-target instruction (`JMP`, `JMPt`, `FUNCTION`, ...).
    pub fn jump(&mut self, op: Opcode, target: Label) {
        self.emit_targets(op, &[Some(target)]);
    }

    /// Overwrites a previously emitted operand.
    pub fn patch(&mut self, site: usize, value: impl Into<Word>) {
        self.code[site] = value.into();
    }

    /// Resolves all fixups.
    pub fn finish(mut self) -> Result<Bytecode, CompileError> {
        for (site, label) in std::mem::take(&mut self.fixups) {
            let address = self.labels[label.0].ok_or(CompileError::Internal("jump to an unbound label"))?;
            self.code[site] = Word::from(address);
        }
        Ok(Bytecode(self.code))
    }
}
