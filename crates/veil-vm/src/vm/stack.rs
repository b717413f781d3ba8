// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Stack slot representation.
//!
//! The value stack holds more than program values: register cells,
//! unresolved references, spread markers and the bookkeeping of the call
//! protocol all live on it. Only [`Slot::Value`] is ever observable by a
//! program; everything else is dereferenced or consumed by an instruction.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ast::FunctionKind;
use crate::runtime::Value;

/// A mutable register cell, shared by every closure that captured it.
pub type Cell = Arc<Mutex<Value>>;

/// Creates a cell holding undefined.
pub(crate) fn fresh_cell() -> Cell {
    Arc::new(Mutex::new(Value::Undefined))
}

/// A resolved variable reference.
#[derive(Clone)]
pub enum Binding {
    /// A register cell in some frame
    Register(Cell),
    /// A global accessor slot
    Global(usize),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Register(cell) => write!(f, "Register({:p})", Arc::as_ptr(cell)),
            Binding::Global(slot) => write!(f, "Global({})", slot),
        }
    }
}

/// A member reference that has not been read or written yet.
#[derive(Debug, Clone)]
pub struct Locator {
    /// The object (or primitive) the member belongs to
    pub base: Value,
    /// Property key
    pub key: String,
    /// Whether the base was reached through a global binding
    pub from_global: bool,
}

/// One entry of the value stack.
#[derive(Debug, Clone)]
pub enum Slot {
    /// A program value
    Value(Value),
    /// A frame register
    Register(Cell),
    /// A variable reference produced by `BIND`, `BINDg` or `BINDv`
    Binding(Binding),
    /// A member reference produced by `ACCESS`
    Locator(Locator),
    /// Elements to splice into an argument list or array literal
    Expand(Vec<Value>),
    /// Remaining keys of a for-in loop
    Keys(VecDeque<Value>),
    /// Where `HALT` resumes
    ReturnAddress(isize),
    /// Arguments of a pending closure call
    Arguments(Vec<Value>),
    /// Descriptor of a pending closure call
    Callee {
        /// Normal or arrow
        kind: FunctionKind,
        /// Entry address
        entry: usize,
        /// Receiver to bind, if any
        receiver: Option<Value>,
    },
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Value(value)
    }
}

/// An active exception frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Handler {
    /// Catch entry, or -1
    pub catch: isize,
    /// Finally entry (the rethrow landing), or -1
    pub finally: isize,
    /// Stack depth when the frame was pushed
    pub stack: usize,
    /// Frame-pointer depth when the frame was pushed
    pub frames: usize,
}

/// A call waiting for its `PARAMS` instruction.
#[derive(Debug, Clone)]
pub(crate) struct Incoming {
    pub args: Vec<Value>,
    pub receiver: Option<Value>,
    pub arguments: bool,
}

impl Incoming {
    /// A catch clause receives the thrown value as its only argument.
    pub fn catch(thrown: Value) -> Self {
        Self {
            args: vec![thrown],
            receiver: None,
            arguments: false,
        }
    }
}
