// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compile-time lexical frames and the global slot table.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ast::FunctionKind;

/// What opened a lexical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The program body
    Program,
    /// A function or arrow body
    Function(FunctionKind),
    /// A block, loop head or switch with block-scoped names
    Block,
    /// A catch clause
    Catch,
}

/// A compile-time lexical frame.
///
/// Slot 0 is always the frame's receiver cell. The register count is not
/// known until the frame closes, so the `TOP` operand is patched then.
#[derive(Debug)]
pub struct Frame {
    /// What opened this frame
    pub kind: FrameKind,
    names: FxHashMap<String, usize>,
    next: usize,
    /// Stream index of the `TOP` operand
    pub top_site: usize,
    result: Option<usize>,
}

impl Frame {
    /// Creates a frame whose first free register is `first`.
    pub fn new(kind: FrameKind, first: usize, top_site: usize) -> Self {
        Self {
            kind,
            names: FxHashMap::default(),
            next: first.max(1),
            top_site,
            result: None,
        }
    }

    /// Declares a name, reusing its slot if already declared.
    pub fn declare(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.names.get(name) {
            return slot;
        }
        self.declare_fresh(name)
    }

    /// Declares a name in a new slot, shadowing an earlier declaration.
    pub fn declare_fresh(&mut self, name: &str) -> usize {
        let slot = self.allocate();
        self.names.insert(name.to_string(), slot);
        slot
    }

    /// Allocates an anonymous register.
    pub fn allocate(&mut self) -> usize {
        let slot = self.next;
        self.next += 1;
        slot
    }

    /// Looks up a declared name.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// The register that parks a return value while `finally` bodies run.
    pub fn result_register(&mut self) -> usize {
        match self.result {
            Some(slot) => slot,
            None => {
                let slot = self.allocate();
                self.result = Some(slot);
                slot
            }
        }
    }

    /// The `TOP` operand: the highest register index.
    pub fn top_operand(&self) -> usize {
        self.next - 1
    }
}

/// How a name resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// The dynamic receiver
    This,
    /// A register `level` frames out from the innermost one
    Local {
        /// Relative frame level, 0 for the innermost frame
        level: usize,
        /// Register index inside that frame
        slot: usize,
    },
    /// A global slot
    Global(usize),
}

/// Free names and their global slots, in first-reference order.
///
/// Slot 0 is always the implicit receiver `this`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalTable {
    names: Vec<String>,
}

impl Default for GlobalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalTable {
    /// Creates a table holding only the receiver slot.
    pub fn new() -> Self {
        Self {
            names: vec!["this".to_string()],
        }
    }

    /// The slot for `name`, assigning the next one on first use.
    pub fn slot(&mut self, name: &str) -> usize {
        match self.get(name) {
            Some(slot) => slot,
            None => {
                self.names.push(name.to_string());
                self.names.len() - 1
            }
        }
    }

    /// The slot for `name`, if assigned.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// The name in `slot`.
    pub fn name(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    /// Names in slot order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of slots, including the receiver.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false, the receiver slot is permanent.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_slots() {
        let mut frame = Frame::new(FrameKind::Function(FunctionKind::Normal), 2, 0);
        assert_eq!(frame.declare("a"), 2);
        assert_eq!(frame.declare("b"), 3);
        assert_eq!(frame.declare("a"), 2);
        assert_eq!(frame.lookup("b"), Some(3));
        assert_eq!(frame.top_operand(), 3);
    }

    #[test]
    fn test_result_register_is_stable() {
        let mut frame = Frame::new(FrameKind::Program, 1, 0);
        frame.declare("x");
        let slot = frame.result_register();
        assert_eq!(slot, 2);
        assert_eq!(frame.result_register(), slot);
        assert_eq!(frame.top_operand(), 2);
    }

    #[test]
    fn test_empty_frame_has_receiver_cell() {
        let frame = Frame::new(FrameKind::Block, 0, 0);
        assert_eq!(frame.top_operand(), 0);
    }

    #[test]
    fn test_global_table_order() {
        let mut table = GlobalTable::new();
        assert_eq!(table.slot("print"), 1);
        assert_eq!(table.slot("Math"), 2);
        assert_eq!(table.slot("print"), 1);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["this", "print", "Math"]);
        assert_eq!(table.name(0), Some("this"));
    }
}
