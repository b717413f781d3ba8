// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode representation.
//!
//! A program is one flat stream of words. An instruction occupies
//! `1 + arity` consecutive words: the opcode's numeric code followed by its
//! inline operands. Nothing in the stream records instruction boundaries,
//! so they can only be recovered with the table the stream was built for.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use super::opcode::{Opcode, OpcodeTable};
use crate::error::RuntimeError;

/// One slot of the instruction stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Word {
    /// Opcode, address, count or numeric literal
    Number(f64),
    /// String literal operand
    String(String),
}

impl Word {
    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Word::Number(n) => Some(*n),
            Word::String(_) => None,
        }
    }
}

impl From<f64> for Word {
    fn from(n: f64) -> Self {
        Word::Number(n)
    }
}

impl From<usize> for Word {
    fn from(n: usize) -> Self {
        Word::Number(n as f64)
    }
}

impl From<i64> for Word {
    fn from(n: i64) -> Self {
        Word::Number(n as f64)
    }
}

impl From<&str> for Word {
    fn from(s: &str) -> Self {
        Word::String(s.to_string())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Number(n) => write!(f, "{}", n),
            Word::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction<'a> {
    /// Offset of the opcode word
    pub offset: usize,
    /// The instruction
    pub opcode: Opcode,
    /// Inline operands
    pub operands: &'a [Word],
}

/// A flat instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bytecode(pub Vec<Word>);

impl Bytecode {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the stream is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw words.
    pub fn words(&self) -> &[Word] {
        &self.0
    }

    /// Decodes the instruction whose opcode sits at `offset`.
    pub fn decode_at(&self, table: &OpcodeTable, offset: usize) -> Result<Instruction<'_>, RuntimeError> {
        let code = self
            .0
            .get(offset)
            .and_then(Word::as_number)
            .ok_or_else(|| RuntimeError::malformed(offset, "expected an opcode"))?;
        let opcode = table
            .decode(code)
            .ok_or_else(|| RuntimeError::malformed(offset, format!("unknown opcode {}", code)))?;
        let end = offset + 1 + table.arity(opcode);
        let operands = self
            .0
            .get(offset + 1..end)
            .ok_or_else(|| RuntimeError::malformed(offset, format!("truncated {}", opcode)))?;
        Ok(Instruction {
            offset,
            opcode,
            operands,
        })
    }

    /// Walks the stream instruction by instruction.
    pub fn instructions<'a>(
        &'a self,
        table: &'a OpcodeTable,
    ) -> impl Iterator<Item = Result<Instruction<'a>, RuntimeError>> + 'a {
        let mut offset = 0;
        std::iter::from_fn(move || {
            if offset >= self.0.len() {
                return None;
            }
            let decoded = self.decode_at(table, offset);
            match &decoded {
                Ok(instruction) => offset += 1 + instruction.operands.len(),
                // Boundaries are lost after a bad word
                Err(_) => offset = self.0.len(),
            }
            Some(decoded)
        })
    }

    /// Renders a listing, one instruction per line.
    pub fn disassemble(&self, table: &OpcodeTable) -> String {
        let mut out = String::new();
        for instruction in self.instructions(table) {
            match instruction {
                Ok(instruction) => {
                    let _ = write!(out, "{:04}  {}", instruction.offset, instruction.opcode);
                    for operand in instruction.operands {
                        let _ = write!(out, " {}", operand);
                    }
                    out.push('\n');
                }
                Err(err) => {
                    let _ = writeln!(out, "{}", err);
                }
            }
        }
        out
    }
}
