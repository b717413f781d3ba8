// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # veil-vm
//!
//! A compiler from a JavaScript-like syntax tree to a flat bytecode
//! stream, and the stack machine that runs it.
//!
//! ## Overview
//!
//! - [`ast`] - The input tree, scope analysis and builder helpers
//! - [`compiler`] - Scope resolution and code generation
//! - [`vm`] - The interpreter and call protocol
//! - [`runtime`] - Values, objects, functions and the global environment
//! - [`program`] - Linking compiled code to an environment
//!
//! Every build can use its own [`OpcodeTable`], a permutation of the
//! instruction codes. A stream only runs correctly against the table it
//! was compiled with, so the table travels with the compiled program.
//!
//! ## Quick Start
//!
//! ```rust
//! use veil_vm::ast::build::*;
//! use veil_vm::ast::BinaryOperator;
//! use veil_vm::{Engine, Environment, Value};
//!
//! let engine = Engine::new();
//! let env = Environment::with_builtins();
//! let tree = program(vec![expr_stmt(assign(
//!     ident("answer"),
//!     binary(BinaryOperator::Multiply, num(6.0), num(7.0)),
//! ))]);
//! engine.eval(&tree, &env)?;
//! assert_eq!(env.get("answer"), Some(Value::Number(42.0)));
//! # Ok::<(), veil_vm::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod program;
pub mod runtime;
pub mod vm;

pub use compiler::{Bytecode, GlobalTable, Opcode, OpcodeTable, Word};
pub use config::{CompileOptions, EngineConfig, TableMode, VmOptions};
pub use error::{CompileError, ConfigError, Error, Result, RuntimeError};
pub use program::{CompiledProgram, Program};
pub use runtime::{Environment, FunctionRef, ObjectRef, Value};

use tracing::debug;

/// Compiles and runs programs with one configuration and opcode table.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    table: OpcodeTable,
}

impl Engine {
    /// Creates an engine with the default configuration, which draws a
    /// fresh random opcode table.
    pub fn new() -> Self {
        let config = EngineConfig::default();
        Self {
            table: config.table.table(),
            config,
        }
    }

    /// Creates an engine from a validated configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let table = config.table.table();
        debug!(mode = ?config.table, canonical = table.is_canonical(), "engine configured");
        Ok(Self { config, table })
    }

    /// The opcode table every program of this engine is encoded with.
    pub fn table(&self) -> &OpcodeTable {
        &self.table
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compiles a tree into a portable program.
    pub fn compile(&self, program: &ast::Program) -> Result<CompiledProgram> {
        let (code, globals) = compiler::compile(program, &self.table, &self.config.compile)?;
        Ok(CompiledProgram {
            table: self.table.clone(),
            code,
            globals,
        })
    }

    /// Compiles a tree, links it against `env` and runs it.
    pub fn eval(&self, program: &ast::Program, env: &Environment) -> Result<Value> {
        let compiled = self.compile(program)?;
        let value = compiled.link_with(env, &self.config.vm).run()?;
        Ok(value)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
