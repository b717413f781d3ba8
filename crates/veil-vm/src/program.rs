// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Packaging compiled code into runnable programs.
//!
//! A [`CompiledProgram`] is the portable artifact: the opcode table, the
//! instruction stream and the names of the globals it refers to. Linking
//! it against an [`Environment`] resolves those names to accessors and
//! yields a [`Program`], which can be run any number of times.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compiler::{Bytecode, GlobalTable, OpcodeTable};
use crate::config::VmOptions;
use crate::error::{Result, RuntimeError};
use crate::runtime::{Environment, GlobalAccessors, Value};
use crate::vm::{self, Image};

/// A self-contained executable unit.
#[derive(Debug, Clone)]
pub struct Program {
    image: Arc<Image>,
}

impl Program {
    /// Packages a table, a stream encoded with it and one accessor per
    /// global slot.
    pub fn new(table: OpcodeTable, bytecode: Bytecode, accessors: GlobalAccessors) -> Self {
        Self::with_options(table, bytecode, accessors, &VmOptions::default())
    }

    /// Like [`Program::new`], with explicit interpreter options.
    pub fn with_options(
        table: OpcodeTable,
        bytecode: Bytecode,
        accessors: GlobalAccessors,
        options: &VmOptions,
    ) -> Self {
        Self {
            image: Arc::new(Image::new(&bytecode, &table, accessors, options)),
        }
    }

    /// Runs the program and returns its completion value.
    pub fn run(&self) -> std::result::Result<Value, RuntimeError> {
        vm::execute(Arc::clone(&self.image))
    }
}

/// The output of compilation, before it is bound to any environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    /// The table the stream is encoded with
    pub table: OpcodeTable,
    /// The instruction stream
    pub code: Bytecode,
    /// Free names by global slot
    pub globals: GlobalTable,
}

impl CompiledProgram {
    /// Serializes the program as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a program serialized with [`CompiledProgram::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// A human-readable listing of the stream.
    pub fn disassemble(&self) -> String {
        self.code.disassemble(&self.table)
    }

    /// Binds the program's globals to `env`.
    pub fn link(&self, env: &Environment) -> Program {
        self.link_with(env, &VmOptions::default())
    }

    /// Binds the program's globals to `env`, with explicit interpreter
    /// options.
    pub fn link_with(&self, env: &Environment, options: &VmOptions) -> Program {
        Program::with_options(
            self.table.clone(),
            self.code.clone(),
            env.accessors(&self.globals),
            options,
        )
    }
}
