// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The instruction set and its numeric encoding.
//!
//! Instructions are symbolic; an [`OpcodeTable`] decides which number each
//! one is written as. Two programs compiled from the same tree against
//! different tables differ byte for byte but behave identically when each
//! runs against its own table.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;
use veil_macros::instruction_set;

instruction_set! {
    /// A VM instruction.
    ///
    /// Operands that come from the stack are listed as "pops"; the arity
    /// counts only the operand slots inlined in the instruction stream.
    pub enum Opcode {
        /// Return from the current invocation with the popped value
        Halt = "HALT" / 0,
        /// Close the innermost lexical frame
        LeaveScope = "LEAVESCOPE" / 0,
        /// Do nothing
        Nop = "NOP" / 0,
        /// Open a lexical frame with `n + 1` register cells
        Top = "TOP" / 1,
        /// Push undefined
        Undefined = "UNDEFINED" / 0,
        /// Push null
        Null = "NULL" / 0,
        /// Push true
        True = "TRUE" / 0,
        /// Push false
        False = "FALSE" / 0,
        /// Push the inline operand
        Push = "PUSH" / 1,
        /// Discard the top of the stack
        Pop = "POP" / 0,
        /// Push an empty string
        String = "STRING" / 0,
        /// Append `code ^ 0x39` to the string on top of the stack
        Char = "CHAR" / 1,
        /// Pops level and slot, pushes a reference to an enclosing register
        Bind = "BIND" / 0,
        /// Pops a slot, pushes a reference to a global
        BindGlobal = "BINDg" / 0,
        /// Pops a slot, pushes a reference to a current-frame register
        BindLocal = "BINDv" / 0,
        /// Dereference the top of the stack
        Load = "LOAD" / 0,
        /// Pops value and reference, writes, pushes the value
        Store = "STORE" / 0,
        /// Pops key and base, pushes a member locator
        Access = "ACCESS" / 0,
        /// Push a fresh empty object
        Object = "OBJECT" / 0,
        /// Collect `n` values into an array
        Array = "ARRAY" / 1,
        /// Mark a sequence for spreading
        Expansion = "EXPANSION" / 0,
        /// Replace an object with a snapshot of its enumerable keys
        Properties = "PROPERTIES" / 0,
        /// Take the next key of a snapshot, pushing it and a flag
        Extract = "EXTRACT" / 0,
        /// Delete through a locator, pushes the result
        Delete = "DELETE" / 0,
        /// Throw the popped value
        Throw = "THROW" / 0,
        /// Unconditional jump
        Jmp = "JMP" / 1,
        /// Pop and jump if truthy
        JmpTrue = "JMPt" / 1,
        /// Jump if the top is truthy, without popping
        JmpPeekTrue = "JMPFt" / 1,
        /// Call with `argc` arguments
        Call = "CALL" / 1,
        /// Construct with `argc` arguments
        New = "NEW" / 1,
        /// Enter a closure body from the call trampoline
        RelCall = "RELCALL" / 0,
        /// Bind the incoming call: first register, formal count, rest flag
        Params = "PARAMS" / 3,
        /// Create a function closure for an entry address
        Function = "FUNCTION" / 1,
        /// Create an arrow closure for an entry address
        ArrowFunction = "ARROWFUNCTION" / 1,
        /// Logical not
        Not = "NOT" / 0,
        /// Bitwise not
        BitNot = "BNOT" / 0,
        /// typeof
        TypeOf = "TYPEOF" / 0,
        /// Unary plus
        Plus = "PLUS" / 0,
        /// Unary minus
        Minus = "MINUS" / 0,
        /// ==
        Eq = "EQ" / 0,
        /// ===
        Identity = "IDENTITY" / 0,
        /// >
        Gt = "GT" / 0,
        /// >=
        Ge = "GE" / 0,
        /// +
        Add = "ADD" / 0,
        /// -
        Sub = "SUB" / 0,
        /// *
        Mul = "MUL" / 0,
        /// /
        Div = "DIV" / 0,
        /// %
        Mod = "MOD" / 0,
        /// **
        Pow = "POW" / 0,
        /// |
        Or = "OR" / 0,
        /// &
        And = "AND" / 0,
        /// ^
        Xor = "XOR" / 0,
        /// <<
        Sal = "SAL" / 0,
        /// >>
        Sar = "SAR" / 0,
        /// >>>
        Shr = "SHR" / 0,
        /// in
        In = "IN" / 0,
        /// instanceof
        InstanceOf = "INSTANCEOF" / 0,
        /// Duplicate the top of the stack
        Dup = "DUP" / 0,
        /// Swap the top with the slot `n` below it (`n < 0`)
        Swap = "SWAP" / 1,
        /// Push an exception frame: catch address, finally address (-1 for none)
        PushExcept = "PUSHe" / 2,
        /// Pop the innermost exception frame
        PopExcept = "POPe" / 0,
    }
}

/// A bijection between instructions and numeric codes.
#[derive(Clone, PartialEq, Eq)]
pub struct OpcodeTable {
    /// Indexed by code
    order: Vec<Opcode>,
    /// Indexed by `Opcode as usize`
    codes: Vec<u32>,
}

impl fmt::Debug for OpcodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.order.iter().enumerate().map(|(code, op)| (op.mnemonic(), code)))
            .finish()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl OpcodeTable {
    fn from_order(order: Vec<Opcode>) -> Self {
        let mut codes = vec![0; order.len()];
        for (code, op) in order.iter().enumerate() {
            codes[*op as usize] = code as u32;
        }
        Self { order, codes }
    }

    fn sorted() -> Vec<Opcode> {
        let mut order = Opcode::ALL.to_vec();
        order.sort_by_key(|op| op.mnemonic());
        order
    }

    /// Codes assigned in lexicographic mnemonic order.
    pub fn canonical() -> Self {
        Self::from_order(Self::sorted())
    }

    /// A uniformly random permutation.
    pub fn random() -> Self {
        Self::shuffled(&mut fastrand::Rng::new())
    }

    /// A reproducible random permutation.
    pub fn seeded(seed: u64) -> Self {
        debug!(seed, "building seeded opcode table");
        Self::shuffled(&mut fastrand::Rng::with_seed(seed))
    }

    fn shuffled(rng: &mut fastrand::Rng) -> Self {
        let mut order = Self::sorted();
        rng.shuffle(&mut order);
        Self::from_order(order)
    }

    /// The code for an instruction.
    pub fn encode(&self, op: Opcode) -> u32 {
        self.codes[op as usize]
    }

    /// The instruction for a code, if the code is valid.
    pub fn decode(&self, code: f64) -> Option<Opcode> {
        if code < 0.0 || code.fract() != 0.0 {
            return None;
        }
        self.order.get(code as usize).copied()
    }

    /// Operand arity of an instruction.
    pub fn arity(&self, op: Opcode) -> usize {
        op.arity()
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns true if this is the canonical ordering.
    pub fn is_canonical(&self) -> bool {
        self.order == Self::sorted()
    }

    /// `(code, instruction)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Opcode)> + '_ {
        self.order.iter().enumerate().map(|(code, op)| (code as u32, *op))
    }
}

impl Serialize for OpcodeTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (code, op) in self.iter() {
            map.serialize_entry(op.mnemonic(), &code)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OpcodeTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, u32>::deserialize(deserializer)?;
        if entries.len() != Opcode::ALL.len() {
            return Err(de::Error::invalid_length(
                entries.len(),
                &"one entry per instruction",
            ));
        }
        let mut order: Vec<Option<Opcode>> = vec![None; Opcode::ALL.len()];
        for (mnemonic, code) in entries {
            let op = Opcode::from_mnemonic(&mnemonic)
                .ok_or_else(|| de::Error::custom(format!("unknown instruction '{}'", mnemonic)))?;
            let slot = order
                .get_mut(code as usize)
                .ok_or_else(|| de::Error::custom(format!("code {} out of range", code)))?;
            if slot.replace(op).is_some() {
                return Err(de::Error::custom(format!("code {} assigned twice", code)));
            }
        }
        // Every code is filled once, so the mapping is a bijection
        let order = order.into_iter().flatten().collect();
        Ok(Self::from_order(order))
    }
}
