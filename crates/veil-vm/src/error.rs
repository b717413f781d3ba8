// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types.

use thiserror::Error;

use crate::runtime::{ErrorKind, Value};

/// Errors raised while generating bytecode.
///
/// Compilation either succeeds completely or fails with one of these;
/// there is no partial output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A name is not declared in any enclosing frame nor listed as a free name
    #[error("unresolved symbol '{0}'")]
    Unresolved(String),

    /// A construct with no compilation rule
    #[error("unsupported construct: {0}")]
    Unsupported(&'static str),

    /// Value-expression mode on a program that is not a single expression
    #[error("value expression mode requires a program of exactly one expression statement")]
    ValueModeRequiresSingleExpression,

    /// `break` outside a loop, switch or matching label
    #[error("illegal break statement")]
    IllegalBreak,

    /// `continue` outside a loop or naming a non-loop label
    #[error("illegal continue statement")]
    IllegalContinue,

    /// A `break`/`continue` label that is not in scope
    #[error("undefined label '{0}'")]
    UndefinedLabel(String),

    /// Assignment to something that is not a variable or member
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    /// The code generator broke one of its own invariants
    #[error("internal compiler error: {0}")]
    Internal(&'static str),
}

/// Errors surfacing from a VM run.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// A thrown value that no exception frame caught
    #[error("uncaught exception: {0}")]
    Thrown(Value),

    /// The instruction stream cannot be executed, typically because it was
    /// produced with a different opcode table
    #[error("malformed bytecode at {ip}: {reason}")]
    Malformed {
        /// Instruction pointer of the failing instruction
        ip: usize,
        /// What went wrong
        reason: String,
    },
}

impl RuntimeError {
    /// Builds a catchable `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::Thrown(Value::error(ErrorKind::TypeError, message))
    }

    /// Builds a catchable `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        RuntimeError::Thrown(Value::error(ErrorKind::RangeError, message))
    }

    /// Builds a catchable `ReferenceError`.
    pub fn reference_error(message: impl Into<String>) -> Self {
        RuntimeError::Thrown(Value::error(ErrorKind::ReferenceError, message))
    }

    pub(crate) fn malformed(ip: usize, reason: impl Into<String>) -> Self {
        RuntimeError::Malformed {
            ip,
            reason: reason.into(),
        }
    }

    /// Returns the thrown value, if this error is catchable.
    pub fn thrown(&self) -> Option<&Value> {
        match self {
            RuntimeError::Thrown(value) => Some(value),
            RuntimeError::Malformed { .. } => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value outside its valid range
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// The offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Execution failed
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A compiled program could not be (de)serialized
    #[error("invalid compiled program: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias using the crate-level [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;
