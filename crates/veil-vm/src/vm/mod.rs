// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - The fetch/decode/dispatch loop
//! - `call` - Closure invocation and construction
//! - `stack` - Stack slots, references and exception frames
//! - `comparison` - Equality and relational comparison
//! - `operators` - Arithmetic, bitwise, `in` and `instanceof`
//! - `string_methods`, `number_methods`, `array_methods` - Intrinsic
//!   methods of primitive strings, numbers and arrays

mod array_methods;
mod call;
mod interpreter;
mod number_methods;
mod string_methods;

pub mod comparison;
pub mod operators;
pub mod stack;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::compiler::{Bytecode, Opcode, OpcodeTable, Word};
use crate::config::VmOptions;
use crate::error::RuntimeError;
use crate::runtime::{FunctionRef, GlobalAccessors, Value};
use interpreter::Interpreter;

pub use stack::{Binding, Cell, Locator, Slot};

/// Everything a running program and its closures share.
pub(crate) struct Image {
    /// The program followed by the call trampoline
    pub code: Bytecode,
    pub table: OpcodeTable,
    pub globals: GlobalAccessors,
    pub options: VmOptions,
    /// Offset of the `RELCALL` word every closure call starts at
    pub trampoline: usize,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("words", &self.code.len())
            .field("globals", &self.globals.len())
            .field("trampoline", &self.trampoline)
            .finish()
    }
}

impl Image {
    pub fn new(code: &Bytecode, table: &OpcodeTable, globals: GlobalAccessors, options: &VmOptions) -> Self {
        let mut code = code.clone();
        let trampoline = code.len();
        code.0.push(Word::from(table.encode(Opcode::RelCall) as usize));
        Self {
            code,
            table: table.clone(),
            globals,
            options: options.clone(),
            trampoline,
        }
    }
}

/// Executes a compiled program and returns its completion value.
///
/// `globals` must hold one accessor per slot of the program's global
/// table, in slot order. An exception that escapes every handler comes
/// back as [`RuntimeError::Thrown`].
pub fn run(
    code: &Bytecode,
    table: &OpcodeTable,
    globals: GlobalAccessors,
    options: &VmOptions,
) -> Result<Value, RuntimeError> {
    execute(Arc::new(Image::new(code, table, globals, options)))
}

/// Runs an image from its first word.
pub(crate) fn execute(image: Arc<Image>) -> Result<Value, RuntimeError> {
    debug!(
        words = image.trampoline,
        globals = image.globals.len(),
        max_call_depth = image.options.max_call_depth,
        "running program"
    );
    Interpreter::new(image).execute()
}

/// Calls a function value from the host.
///
/// A nullish `this` is replaced by a fresh empty object for normal
/// closures; native functions receive it as given.
pub fn call(function: &Value, this: Value, args: &[Value]) -> Result<Value, RuntimeError> {
    call::call_value(function, Some(this), args.to_vec(), 0)
}

/// Constructs an instance with `new function(...args)` semantics.
pub fn construct(function: &FunctionRef, args: &[Value]) -> Result<Value, RuntimeError> {
    call::construct(function, args.to_vec(), 0)
}
