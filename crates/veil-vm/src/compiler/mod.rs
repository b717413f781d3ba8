// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode compiler.
//!
//! Compiles an analyzed [`Program`](crate::ast::Program) to a flat
//! [`Bytecode`] stream encoded with a chosen [`OpcodeTable`], together with
//! the [`GlobalTable`] of free names the stream refers to by slot.

pub(crate) mod assembler;
pub mod bytecode;
pub mod codegen;
pub mod opcode;

pub use bytecode::{Bytecode, Instruction, Word};
pub use codegen::compile;
pub use codegen::scope::GlobalTable;
pub use opcode::{Opcode, OpcodeTable};
