// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The compile-time control stack.
//!
//! Every construct that leaves runtime state behind while its body runs
//! pushes an entry here. Abrupt exits (`break`, `continue`, `return`)
//! walk the entries they cross and emit the matching cleanup.

use super::Compiler;
use crate::ast::BlockStatement;
use crate::compiler::assembler::Label;
use crate::compiler::opcode::Opcode;
use crate::error::CompileError;

/// An entry on the control stack.
#[derive(Debug, Clone)]
pub enum Control<'a> {
    /// An open lexical frame, closed with `LEAVESCOPE`
    Frame,
    /// A value parked on the stack, discarded with `POP`
    Temporary,
    /// An active exception frame, popped with `POPe`; its finally body
    /// runs inline on the way out
    Handler {
        /// The finally body, if any
        finalizer: Option<&'a BlockStatement>,
        /// Compile-time frame depth of the try statement
        scope_depth: usize,
    },
    /// A break (and possibly continue) target
    Breakable {
        /// Labels naming this target
        labels: Vec<String>,
        /// Where `break` jumps
        break_label: Label,
        /// Where `continue` jumps, for loops only
        continue_label: Option<Label>,
        /// Whether an unlabeled `break` may target this entry
        unlabeled: bool,
    },
}

impl<'a> Compiler<'a> {
    /// Index of the target for `break`.
    pub(super) fn break_target(&self, label: Option<&str>) -> Result<usize, CompileError> {
        for (index, entry) in self.control.iter().enumerate().rev() {
            if let Control::Breakable {
                labels, unlabeled, ..
            } = entry
            {
                match label {
                    None if *unlabeled => return Ok(index),
                    Some(label) if labels.iter().any(|l| l == label) => return Ok(index),
                    _ => {}
                }
            }
        }
        match label {
            Some(label) => Err(CompileError::UndefinedLabel(label.to_string())),
            None => Err(CompileError::IllegalBreak),
        }
    }

    /// Index of the target for `continue`.
    pub(super) fn continue_target(&self, label: Option<&str>) -> Result<usize, CompileError> {
        let mut named = false;
        for (index, entry) in self.control.iter().enumerate().rev() {
            if let Control::Breakable {
                labels,
                continue_label,
                ..
            } = entry
            {
                let matches = match label {
                    None => true,
                    Some(label) => labels.iter().any(|l| l == label),
                };
                if matches && continue_label.is_some() {
                    return Ok(index);
                }
                named |= matches && label.is_some();
            }
        }
        match label {
            Some(label) if !named => Err(CompileError::UndefinedLabel(label.to_string())),
            _ => Err(CompileError::IllegalContinue),
        }
    }

    /// Emits the cleanup for every entry above `depth`, innermost first.
    ///
    /// The compile-time state is left untouched: code after the abrupt
    /// exit still runs in the original context.
    pub(super) fn unwind_to(&mut self, depth: usize) -> Result<(), CompileError> {
        for index in (depth..self.control.len()).rev() {
            match self.control[index].clone() {
                Control::Frame => self.asm.op(Opcode::LeaveScope),
                Control::Temporary => self.asm.op(Opcode::Pop),
                Control::Handler {
                    finalizer,
                    scope_depth,
                } => {
                    self.asm.op(Opcode::PopExcept);
                    if let Some(finalizer) = finalizer {
                        self.inline_finally(finalizer, scope_depth, index)?;
                    }
                }
                Control::Breakable { .. } => {}
            }
        }
        Ok(())
    }

    /// Compiles a finally body as seen from its try statement.
    pub(super) fn inline_finally(
        &mut self,
        finalizer: &'a BlockStatement,
        scope_depth: usize,
        control_depth: usize,
    ) -> Result<(), CompileError> {
        let scopes = self.scopes.split_off(scope_depth);
        let control = self.control.split_off(control_depth);
        let result = self.block(finalizer);
        self.scopes.extend(scopes);
        self.control.extend(control);
        result
    }

    /// Emits `break`.
    pub(super) fn break_statement(&mut self, label: Option<&str>) -> Result<(), CompileError> {
        let index = self.break_target(label)?;
        let Control::Breakable { break_label, .. } = self.control[index] else {
            return Err(CompileError::Internal("break target is not breakable"));
        };
        self.unwind_to(index + 1)?;
        self.asm.jump(Opcode::Jmp, break_label);
        Ok(())
    }

    /// Emits `continue`.
    pub(super) fn continue_statement(&mut self, label: Option<&str>) -> Result<(), CompileError> {
        let index = self.continue_target(label)?;
        let Control::Breakable {
            continue_label: Some(continue_label),
            ..
        } = self.control[index]
        else {
            return Err(CompileError::Internal("continue target is not a loop"));
        };
        self.unwind_to(index + 1)?;
        self.asm.jump(Opcode::Jmp, continue_label);
        Ok(())
    }

    /// Runs `body` with a break target pushed, consuming pending labels.
    pub(super) fn with_breakable(
        &mut self,
        break_label: Label,
        continue_label: Option<Label>,
        body: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<(), CompileError> {
        let labels = std::mem::take(&mut self.pending_labels);
        self.control.push(Control::Breakable {
            labels,
            break_label,
            continue_label,
            unlabeled: true,
        });
        let result = body(self);
        self.control.pop();
        result
    }
}
