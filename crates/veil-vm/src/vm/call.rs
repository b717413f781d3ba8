// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The call protocol.
//!
//! A closure call starts a fresh interpreter on copies of the stack and
//! frame-pointer arrays the closure captured, pushes the arguments and a
//! callee descriptor, and starts executing at the `RELCALL` trampoline.
//! `RELCALL` turns the descriptor into a pending call and a return
//! address, then jumps to the body, whose `PARAMS` instruction binds the
//! pending call into the freshly opened frame.

use super::interpreter::Interpreter;
use super::stack::Slot;
use crate::ast::FunctionKind;
use crate::error::RuntimeError;
use crate::runtime::{Callable, Closure, FunctionRef, Object, ObjectRef, Value};

/// Calls `callee` if it is a function.
pub(crate) fn call_value(
    callee: &Value,
    this: Option<Value>,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, RuntimeError> {
    match callee {
        Value::Function(function) => call_function(function, this, args, depth),
        other => Err(RuntimeError::type_error(format!(
            "{} is not a function",
            other.to_js_string()
        ))),
    }
}

/// Calls a function from an interpreter running at `depth`.
///
/// A normal closure called without a usable receiver gets a fresh empty
/// object as `this`; an arrow ignores `this` entirely.
pub(crate) fn call_function(
    function: &FunctionRef,
    this: Option<Value>,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, RuntimeError> {
    match function.callable() {
        Callable::Native(native) => (native.func)(&this.unwrap_or_default(), &args),
        Callable::Closure(closure) => {
            let receiver = match closure.kind() {
                FunctionKind::Normal => Some(match this {
                    Some(this) if !this.is_nullish() => this,
                    _ => Value::object(),
                }),
                FunctionKind::Arrow => None,
            };
            enter(closure, receiver, args, depth + 1)
        }
    }
}

/// `new function(...args)`.
pub(crate) fn construct(
    function: &FunctionRef,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, RuntimeError> {
    if !function.is_constructor() {
        return Err(RuntimeError::type_error(format!(
            "{} is not a constructor",
            function_name(function)
        )));
    }
    let object = Value::Object(ObjectRef::new(Object::with_prototype(function.prototype())));
    let result = match function.callable() {
        Callable::Native(native) => (native.func)(&object, &args)?,
        Callable::Closure(closure) => enter(closure, Some(object.clone()), args, depth + 1)?,
    };
    Ok(match result {
        Value::Object(_) | Value::Function(_) => result,
        _ => object,
    })
}

fn function_name(function: &FunctionRef) -> String {
    match function.get("name") {
        Value::String(name) if !name.is_empty() => name,
        _ => "anonymous".to_string(),
    }
}

fn enter(
    closure: &Closure,
    receiver: Option<Value>,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, RuntimeError> {
    if depth > closure.image.options.max_call_depth {
        return Err(RuntimeError::range_error("Maximum call stack size exceeded"));
    }
    let mut interpreter = Interpreter::resume(closure, depth);
    interpreter.push(Slot::Arguments(args));
    interpreter.push(Slot::Callee {
        kind: closure.kind(),
        entry: closure.entry(),
        receiver,
    });
    interpreter.execute()
}
