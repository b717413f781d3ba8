// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document is a valid
//! configuration:
//!
//! ```
//! use veil_vm::config::{EngineConfig, TableMode};
//!
//! let config = EngineConfig::from_json(r#"{ "table": { "mode": "canonical" } }"#).unwrap();
//! assert_eq!(config.table, TableMode::Canonical);
//! assert_eq!(config.vm.max_call_depth, 64);
//! ```

use serde::{Deserialize, Serialize};

use crate::compiler::OpcodeTable;
use crate::error::ConfigError;

/// How the engine chooses its opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TableMode {
    /// Codes in lexicographic mnemonic order
    Canonical,
    /// A random permutation, reproducible when seeded
    Random {
        /// Shuffle seed; a fresh one is drawn when absent
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl Default for TableMode {
    fn default() -> Self {
        TableMode::Random { seed: None }
    }
}

impl TableMode {
    /// Builds a table in this mode.
    pub fn table(&self) -> OpcodeTable {
        match *self {
            TableMode::Canonical => OpcodeTable::canonical(),
            TableMode::Random { seed: Some(seed) } => OpcodeTable::seeded(seed),
            TableMode::Random { seed: None } => OpcodeTable::random(),
        }
    }
}

/// Code generation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Compile a single expression statement so the program halts with
    /// its value
    pub value_expression_mode: bool,
}

/// Interpreter options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmOptions {
    /// Nested call limit; exceeding it throws a `RangeError`
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self { max_call_depth: 64 }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Opcode table selection
    pub table: TableMode,
    /// Compiler options
    pub compile: CompileOptions,
    /// Interpreter options
    pub vm: VmOptions,
}

impl EngineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vm.max_call_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "vm.max_call_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
