// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The embedding environment and the global accessor vector.
//!
//! Compiled code never looks globals up by name. The compiler assigns
//! every free name a slot in a [`GlobalTable`], and the embedder supplies
//! one [`GlobalAccessor`] per slot before the program runs.

use std::fmt;

use super::function::FunctionRef;
use super::object::{ErrorKind, Object, ObjectRef};
use super::value::Value;
use crate::compiler::GlobalTable;
use crate::error::RuntimeError;

/// Read/write capability for one global slot.
pub trait GlobalAccessor: Send + Sync {
    /// Reads the binding.
    fn get(&self) -> Result<Value, RuntimeError>;

    /// Writes the binding.
    fn set(&self, value: Value) -> Result<(), RuntimeError>;
}

/// A get/set pair built from two closures.
pub struct FnAccessor<G, S> {
    getter: G,
    setter: S,
}

impl<G, S> FnAccessor<G, S>
where
    G: Fn() -> Value + Send + Sync,
    S: Fn(Value) + Send + Sync,
{
    /// Creates an accessor from a getter and a setter.
    pub fn new(getter: G, setter: S) -> Self {
        Self { getter, setter }
    }
}

impl<G, S> GlobalAccessor for FnAccessor<G, S>
where
    G: Fn() -> Value + Send + Sync,
    S: Fn(Value) + Send + Sync,
{
    fn get(&self) -> Result<Value, RuntimeError> {
        Ok((self.getter)())
    }

    fn set(&self, value: Value) -> Result<(), RuntimeError> {
        (self.setter)(value);
        Ok(())
    }
}

/// Slot 0: the global object as the implicit receiver.
struct ReceiverAccessor(ObjectRef);

impl GlobalAccessor for ReceiverAccessor {
    fn get(&self) -> Result<Value, RuntimeError> {
        Ok(Value::Object(self.0.clone()))
    }

    fn set(&self, _value: Value) -> Result<(), RuntimeError> {
        Err(RuntimeError::reference_error("invalid assignment to this"))
    }
}

/// A named property of the global object.
struct PropertyAccessor {
    global: ObjectRef,
    name: String,
}

impl GlobalAccessor for PropertyAccessor {
    fn get(&self) -> Result<Value, RuntimeError> {
        if self.global.has(&self.name) {
            Ok(self.global.get(&self.name))
        } else {
            Err(RuntimeError::reference_error(format!(
                "{} is not defined",
                self.name
            )))
        }
    }

    fn set(&self, value: Value) -> Result<(), RuntimeError> {
        self.global.set(&self.name, value);
        Ok(())
    }
}

/// The indexed accessor vector handed to the VM.
#[derive(Default)]
pub struct GlobalAccessors(Vec<Box<dyn GlobalAccessor>>);

impl fmt::Debug for GlobalAccessors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalAccessors({} slots)", self.0.len())
    }
}

impl GlobalAccessors {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the accessor for the next slot.
    pub fn push(&mut self, accessor: impl GlobalAccessor + 'static) {
        self.0.push(Box::new(accessor));
    }

    /// The accessor for `slot`.
    pub fn get(&self, slot: usize) -> Option<&dyn GlobalAccessor> {
        self.0.get(slot).map(|a| a.as_ref())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An embedder-owned global object.
#[derive(Debug, Clone)]
pub struct Environment {
    global: ObjectRef,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Creates an environment with no bindings.
    pub fn new() -> Self {
        Self {
            global: ObjectRef::new(Object::new()),
        }
    }

    /// Creates an environment with the built-in error constructors and
    /// the `undefined`, `NaN` and `Infinity` bindings.
    pub fn with_builtins() -> Self {
        let env = Self::new();
        env.define("undefined", Value::Undefined);
        env.define("NaN", Value::Number(f64::NAN));
        env.define("Infinity", Value::Number(f64::INFINITY));

        let mut base: Option<ObjectRef> = None;
        for &kind in ErrorKind::ALL {
            let prototype = ObjectRef::new(Object::with_prototype(base.clone()));
            prototype.set("name", Value::from(kind.name()));
            prototype.set("message", Value::from(""));
            let constructor = FunctionRef::error_constructor(kind, prototype.clone());
            env.define(kind.name(), Value::Function(constructor));
            if kind == ErrorKind::Error {
                base = Some(prototype);
            }
        }
        env
    }

    /// The global object.
    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    /// Defines or overwrites a global binding.
    pub fn define(&self, name: &str, value: Value) {
        self.global.set(name, value);
    }

    /// Defines a global native function.
    pub fn define_native<F>(&self, name: &str, func: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.define(name, Value::Function(FunctionRef::native(name, func)));
    }

    /// Reads a global binding.
    pub fn get(&self, name: &str) -> Option<Value> {
        let global = self.global.lock();
        if global.has_own(name) {
            global.get_own(name)
        } else {
            None
        }
    }

    /// Builds the accessor vector for a compiled program's global table.
    pub fn accessors(&self, table: &GlobalTable) -> GlobalAccessors {
        let mut accessors = GlobalAccessors::new();
        for (slot, name) in table.names().enumerate() {
            if slot == 0 {
                accessors.push(ReceiverAccessor(self.global.clone()));
            } else {
                accessors.push(PropertyAccessor {
                    global: self.global.clone(),
                    name: name.to_string(),
                });
            }
        }
        accessors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_follow_table_order() {
        let env = Environment::new();
        env.define("a", Value::Number(1.0));
        let mut table = GlobalTable::new();
        table.slot("b");
        table.slot("a");
        let accessors = env.accessors(&table);
        assert_eq!(accessors.len(), 3);

        let a = accessors.get(2).map(|acc| acc.get());
        assert!(matches!(a, Some(Ok(Value::Number(n))) if n == 1.0));

        let b = accessors.get(1).map(|acc| acc.get());
        assert!(matches!(b, Some(Err(RuntimeError::Thrown(_)))));
    }

    #[test]
    fn test_receiver_slot_is_global_object() {
        let env = Environment::new();
        let accessors = env.accessors(&GlobalTable::new());
        let this = accessors.get(0).map(|acc| acc.get());
        assert!(matches!(this, Some(Ok(Value::Object(ref o))) if o.ptr_eq(env.global())));
    }

    #[test]
    fn test_set_defines_property() {
        let env = Environment::new();
        let mut table = GlobalTable::new();
        table.slot("counter");
        let accessors = env.accessors(&table);
        let stored = accessors.get(1).map(|acc| acc.set(Value::Number(5.0)));
        assert!(matches!(stored, Some(Ok(()))));
        assert_eq!(env.get("counter"), Some(Value::Number(5.0)));
    }

    #[test]
    fn test_builtins() {
        let env = Environment::with_builtins();
        assert!(env.get("TypeError").is_some_and(|v| v.is_function()));
        assert!(env.get("NaN").and_then(|v| v.as_number()).is_some_and(f64::is_nan));
        assert_eq!(env.get("undefined"), Some(Value::Undefined));
        assert_eq!(env.get("missing"), None);
    }

    #[test]
    fn test_fn_accessor() {
        let accessor = FnAccessor::new(|| Value::Number(7.0), |_| {});
        assert!(matches!(accessor.get(), Ok(Value::Number(n)) if n == 7.0));
    }
}
