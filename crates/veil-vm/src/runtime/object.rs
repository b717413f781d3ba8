// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object representation.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use super::value::Value;
use crate::error::RuntimeError;

/// Longest array the VM stores densely; growing past it is a `RangeError`.
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// The built-in error constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Error
    Error,
    /// TypeError
    TypeError,
    /// RangeError
    RangeError,
    /// ReferenceError
    ReferenceError,
}

impl ErrorKind {
    /// Every error kind, base kind first.
    pub const ALL: &'static [ErrorKind] = &[
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
    ];

    /// The constructor name.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
        }
    }
}

/// What an object is, beyond its properties.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array with dense elements
    Array(Vec<Value>),
    /// Error instance
    Error(ErrorKind),
}

/// Insertion-ordered property storage.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: Vec<(String, Value)>,
    index: FxHashMap<String, usize>,
}

impl PropertyMap {
    /// Gets a property value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Inserts or overwrites a property, keeping the original position.
    pub fn insert(&mut self, key: &str, value: Value) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), value));
            }
        }
    }

    /// Removes a property, returning whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let Some(i) = self.index.remove(key) else {
            return false;
        };
        self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        true
    }

    /// Checks if a property exists.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An object.
#[derive(Debug, Clone)]
pub struct Object {
    /// Ordinary, array or error
    pub kind: ObjectKind,
    /// Own properties
    pub properties: PropertyMap,
    /// The prototype of this object
    pub prototype: Option<ObjectRef>,
}

/// Parses a canonical array index ("0", "17", not "01" or "-1").
pub(crate) fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().map(|i| i as usize)
}

impl Object {
    /// Creates a new empty object.
    pub fn new() -> Self {
        Self {
            kind: ObjectKind::Ordinary,
            properties: PropertyMap::default(),
            prototype: None,
        }
    }

    /// Creates an empty object inheriting from `prototype`.
    pub fn with_prototype(prototype: Option<ObjectRef>) -> Self {
        Self {
            prototype,
            ..Self::new()
        }
    }

    /// Creates an array.
    pub fn array(items: Vec<Value>) -> Self {
        Self {
            kind: ObjectKind::Array(items),
            ..Self::new()
        }
    }

    /// Creates an error instance carrying `name` and `message`.
    pub fn error(kind: ErrorKind, message: String) -> Self {
        let mut object = Self {
            kind: ObjectKind::Error(kind),
            ..Self::new()
        };
        object.properties.insert("name", Value::from(kind.name()));
        object.properties.insert("message", Value::String(message));
        object
    }

    /// Gets an own property.
    pub fn get_own(&self, key: &str) -> Option<Value> {
        if let ObjectKind::Array(items) = &self.kind {
            if key == "length" {
                return Some(Value::Number(items.len() as f64));
            }
            if let Some(i) = array_index(key) {
                return items.get(i).cloned();
            }
        }
        self.properties.get(key).cloned()
    }

    /// Sets an own property, failing with a `RangeError` for an invalid
    /// array length or an array that would outgrow [`MAX_ARRAY_LENGTH`].
    pub fn try_set(&mut self, key: &str, value: Value) -> Result<(), RuntimeError> {
        if let ObjectKind::Array(items) = &mut self.kind {
            if key == "length" {
                let len = value.to_number();
                if !(0.0..=MAX_ARRAY_LENGTH as f64).contains(&len) || len.fract() != 0.0 {
                    return Err(RuntimeError::range_error("Invalid array length"));
                }
                items.resize(len as usize, Value::Undefined);
                return Ok(());
            }
            if let Some(i) = array_index(key) {
                if i >= MAX_ARRAY_LENGTH {
                    return Err(RuntimeError::range_error("Invalid array length"));
                }
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
                return Ok(());
            }
        }
        self.properties.insert(key, value);
        Ok(())
    }

    /// Sets an own property; writes [`Object::try_set`] rejects are dropped.
    pub fn set(&mut self, key: &str, value: Value) {
        let _ = self.try_set(key, value);
    }

    /// Deletes an own property.
    pub fn delete(&mut self, key: &str) -> bool {
        if let ObjectKind::Array(items) = &mut self.kind {
            if key == "length" {
                return false;
            }
            if let Some(i) = array_index(key) {
                if let Some(item) = items.get_mut(i) {
                    *item = Value::Undefined;
                }
                return true;
            }
        }
        self.properties.remove(key);
        true
    }

    /// Checks if an own property exists.
    pub fn has_own(&self, key: &str) -> bool {
        if let ObjectKind::Array(items) = &self.kind {
            if key == "length" {
                return true;
            }
            if let Some(i) = array_index(key) {
                return i < items.len();
            }
        }
        self.properties.contains(key)
    }

    /// Enumerable own keys: array indices first, then insertion order.
    pub fn own_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let ObjectKind::Array(items) = &self.kind {
            keys.extend((0..items.len()).map(|i| i.to_string()));
        }
        keys.extend(self.properties.keys().map(str::to_string));
        keys
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared, lockable object handle.
///
/// Locks are never held across calls into other objects, so an object
/// that contains itself can be read and written without deadlocking.
#[derive(Clone)]
pub struct ObjectRef(Arc<Mutex<Object>>);

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents may be cyclic, only identity is printed
        write!(f, "ObjectRef({:p})", Arc::as_ptr(&self.0))
    }
}

impl ObjectRef {
    /// Wraps an object in a shared handle.
    pub fn new(object: Object) -> Self {
        Self(Arc::new(Mutex::new(object)))
    }

    /// Locks the object.
    pub fn lock(&self) -> MutexGuard<'_, Object> {
        self.0.lock()
    }

    /// Returns true if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The prototype, if any.
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.lock().prototype.clone()
    }

    /// Gets a property, following the prototype chain.
    pub fn get(&self, key: &str) -> Value {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            let guard = object.lock();
            if let Some(value) = guard.get_own(key) {
                return value;
            }
            current = guard.prototype.clone();
        }
        Value::Undefined
    }

    /// Sets an own property.
    pub fn set(&self, key: &str, value: Value) {
        self.lock().set(key, value);
    }

    /// Sets an own property, reporting rejected array growth.
    pub fn try_set(&self, key: &str, value: Value) -> Result<(), RuntimeError> {
        self.lock().try_set(key, value)
    }

    /// Deletes an own property.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().delete(key)
    }

    /// Checks for a property along the prototype chain.
    pub fn has(&self, key: &str) -> bool {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            let guard = object.lock();
            if guard.has_own(key) {
                return true;
            }
            current = guard.prototype.clone();
        }
        false
    }

    /// Own and inherited enumerable keys, without duplicates.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(object) = current {
            let guard = object.lock();
            for key in guard.own_keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            current = guard.prototype.clone();
        }
        keys
    }

    /// A snapshot of the elements if this is an array.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match &self.lock().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Returns true if this is an array.
    pub fn is_array(&self) -> bool {
        matches!(self.lock().kind, ObjectKind::Array(_))
    }

    /// The error kind if this is an error instance.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.lock().kind {
            ObjectKind::Error(kind) => Some(kind),
            _ => None,
        }
    }
}
