// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Function representation.

use std::fmt;
use std::sync::Arc;

use super::object::{ErrorKind, Object, ObjectRef};
use super::value::Value;
use crate::ast::FunctionKind;
use crate::error::RuntimeError;
use crate::vm::{Image, Slot};

/// Signature of a native (Rust) function: receiver and arguments.
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// A native function.
#[derive(Clone)]
pub struct NativeFunction {
    /// The function name
    pub name: String,
    pub(crate) func: NativeFn,
    pub(crate) error_kind: Option<ErrorKind>,
}

/// A bytecode function together with the state it closed over.
///
/// The stack and frame-pointer arrays are copies taken when the closure
/// was created. Register cells inside the copy are shared with the
/// creating invocation, which is what makes capture by reference work.
#[derive(Clone)]
pub struct Closure {
    pub(crate) kind: FunctionKind,
    pub(crate) entry: usize,
    pub(crate) image: Arc<Image>,
    pub(crate) stack: Vec<Slot>,
    pub(crate) frames: Vec<usize>,
}

impl Closure {
    /// Normal or arrow.
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// Entry address of the body.
    pub fn entry(&self) -> usize {
        self.entry
    }
}

/// A callable value - either a bytecode closure or a native function.
#[derive(Clone)]
pub enum Callable {
    /// A bytecode closure
    Closure(Closure),
    /// A native Rust function
    Native(NativeFunction),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Closure(closure) => {
                write!(f, "Closure({:?} @ {})", closure.kind, closure.entry)
            }
            Callable::Native(native) => write!(f, "NativeFunction({})", native.name),
        }
    }
}

/// A function together with its own property bag.
#[derive(Debug)]
pub struct FunctionObject {
    callable: Callable,
    properties: ObjectRef,
}

/// A shared function handle.
#[derive(Clone)]
pub struct FunctionRef(Arc<FunctionObject>);

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.callable)
    }
}

impl FunctionRef {
    fn from_parts(callable: Callable, prototype: Option<ObjectRef>) -> Self {
        let properties = ObjectRef::new(Object::new());
        if let Some(prototype) = prototype {
            properties.set("prototype", Value::Object(prototype));
        }
        Self(Arc::new(FunctionObject {
            callable,
            properties,
        }))
    }

    pub(crate) fn closure(closure: Closure) -> Self {
        // Arrows are not constructors and get no prototype
        let prototype = match closure.kind {
            FunctionKind::Normal => Some(ObjectRef::new(Object::new())),
            FunctionKind::Arrow => None,
        };
        Self::from_parts(Callable::Closure(closure), prototype)
    }

    /// Wraps a Rust closure as a function value.
    pub fn native<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let native = NativeFunction {
            name: name.to_string(),
            func: Arc::new(func),
            error_kind: None,
        };
        Self::from_parts(Callable::Native(native), None)
    }

    /// Creates one of the built-in error constructors.
    pub(crate) fn error_constructor(kind: ErrorKind, prototype: ObjectRef) -> Self {
        let func: NativeFn = Arc::new(move |this: &Value, args: &[Value]| {
            let message = match args.first() {
                None | Some(Value::Undefined) => String::new(),
                Some(message) => message.to_js_string(),
            };
            match this {
                Value::Object(object) => {
                    let mut guard = object.lock();
                    guard.kind = super::object::ObjectKind::Error(kind);
                    guard.set("message", Value::String(message));
                    drop(guard);
                    Ok(this.clone())
                }
                _ => Ok(Value::error(kind, message)),
            }
        });
        let native = NativeFunction {
            name: kind.name().to_string(),
            func,
            error_kind: Some(kind),
        };
        Self::from_parts(Callable::Native(native), Some(prototype))
    }

    /// The underlying callable.
    pub fn callable(&self) -> &Callable {
        &self.0.callable
    }

    /// Returns true if both handles refer to the same function.
    pub fn ptr_eq(&self, other: &FunctionRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns true if `new` may be applied.
    pub fn is_constructor(&self) -> bool {
        match &self.0.callable {
            Callable::Closure(closure) => closure.kind == FunctionKind::Normal,
            Callable::Native(_) => true,
        }
    }

    /// The error kind this function constructs, for built-in error constructors.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.0.callable {
            Callable::Native(native) => native.error_kind,
            Callable::Closure(_) => None,
        }
    }

    /// The object installed as `prototype`, used by `new` and `instanceof`.
    pub fn prototype(&self) -> Option<ObjectRef> {
        match self.0.properties.get("prototype") {
            Value::Object(prototype) => Some(prototype),
            _ => None,
        }
    }

    /// Gets a property of the function.
    pub fn get(&self, key: &str) -> Value {
        match (key, &self.0.callable) {
            ("name", Callable::Native(native)) if !self.0.properties.has("name") => {
                Value::String(native.name.clone())
            }
            _ => self.0.properties.get(key),
        }
    }

    /// Sets a property of the function.
    pub fn set(&self, key: &str, value: Value) {
        self.0.properties.set(key, value);
    }

    /// Deletes a property of the function.
    pub fn delete(&self, key: &str) -> bool {
        self.0.properties.delete(key)
    }

    /// Checks for a property.
    pub fn has(&self, key: &str) -> bool {
        self.0.properties.has(key)
    }

    /// Enumerable keys; `prototype` is not enumerable.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .properties
            .keys()
            .into_iter()
            .filter(|k| k != "prototype")
            .collect()
    }
}
