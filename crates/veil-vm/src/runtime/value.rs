// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Value representation.

use std::fmt;

use super::function::FunctionRef;
use super::object::{ErrorKind, Object, ObjectKind, ObjectRef};

/// A value observable by programs.
///
/// Objects and functions are shared references, so values are cheap to
/// clone and safe to move between threads.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Object or array
    Object(ObjectRef),
    /// Closure or native function
    Function(FunctionRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN != NaN
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl Value {
    /// Creates a new array value.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Object(ObjectRef::new(Object::array(items)))
    }

    /// Creates a new empty ordinary object.
    pub fn object() -> Self {
        Value::Object(ObjectRef::new(Object::new()))
    }

    /// Creates an error object of the given kind.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Value::Object(ObjectRef::new(Object::error(kind, message.into())))
    }

    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Returns the number if this value is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements if this value is an array.
    pub fn as_array(&self) -> Option<Vec<Value>> {
        match self {
            Value::Object(obj) => obj.elements(),
            _ => None,
        }
    }

    /// Converts the value to a boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Converts the value to a number (ToNumber).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) | Value::Function(_) => self.to_primitive().to_number(),
        }
    }

    /// Converts the value to a primitive (ToPrimitive).
    ///
    /// Objects convert through their built-in string form; user-defined
    /// `valueOf`/`toString` methods are not consulted.
    pub fn to_primitive(&self) -> Value {
        match self {
            Value::Object(_) | Value::Function(_) => Value::String(self.to_js_string()),
            other => other.clone(),
        }
    }

    /// Converts the value to a string (ToString).
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Object(obj) => object_to_string(obj),
            Value::Function(_) => "function () { [native code] }".to_string(),
        }
    }

    /// Converts the value to a signed 32-bit integer (ToInt32).
    pub fn to_int32(&self) -> i32 {
        self.to_uint32() as i32
    }

    /// Converts the value to an unsigned 32-bit integer (ToUint32).
    pub fn to_uint32(&self) -> u32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        n.trunc().rem_euclid(4294967296.0) as u32
    }

    /// Converts the value to an integer (ToIntegerOrInfinity).
    pub fn to_integer(&self) -> f64 {
        let n = self.to_number();
        if n.is_nan() { 0.0 } else { n.trunc() }
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // Historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other.to_js_string()),
        }
    }
}

fn object_to_string(obj: &ObjectRef) -> String {
    let (kind, message) = {
        let object = obj.lock();
        match &object.kind {
            ObjectKind::Array(items) => {
                let items = items.clone();
                drop(object);
                return items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.to_js_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",");
            }
            ObjectKind::Error(kind) => (*kind, object.get_own("message")),
            ObjectKind::Ordinary => return "[object Object]".to_string(),
        }
    };
    let name = match obj.get("name") {
        Value::Undefined => kind.name().to_string(),
        name => name.to_js_string(),
    };
    match message.map(|m| m.to_js_string()) {
        Some(message) if !message.is_empty() => format!("{}: {}", name, message),
        _ => name,
    }
}

/// Formats a number the way ToString does.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if n.fract() == 0.0 && abs < 1e21 {
        return format!("{:.0}", n);
    }
    if !(1e-6..1e21).contains(&abs) {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }
    format!("{}", n)
}

/// Parses a string the way ToNumber does.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let radix = |prefix: &str| trimmed.strip_prefix(prefix);
    if let Some(hex) = radix("0x").or_else(|| radix("0X")) {
        return u64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    if let Some(bin) = radix("0b").or_else(|| radix("0B")) {
        return u64::from_str_radix(bin, 2).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    if let Some(oct) = radix("0o").or_else(|| radix("0O")) {
        return u64::from_str_radix(oct, 8).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan", ToNumber does not
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_boolean() {
        assert!(!Value::Undefined.to_boolean());
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::from("").to_boolean());
        assert!(Value::from("0").to_boolean());
        assert!(Value::object().to_boolean());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("0x1f").to_number(), 31.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::from("abc").to_number().is_nan());
        assert!(Value::from("inf").to_number().is_nan());
        assert_eq!(Value::from("1e3").to_number(), 1000.0);
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_to_int32_wraps() {
        assert_eq!(Value::Number(4294967297.0).to_int32(), 1);
        assert_eq!(Value::Number(-1.0).to_uint32(), u32::MAX);
        assert_eq!(Value::Number(2147483648.0).to_int32(), i32::MIN);
        assert_eq!(Value::Number(f64::NAN).to_int32(), 0);
    }

    #[test]
    fn test_array_to_string() {
        let array = Value::array(vec![Value::Number(1.0), Value::Null, Value::from("x")]);
        assert_eq!(array.to_js_string(), "1,,x");
    }

    #[test]
    fn test_type_of() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::array(vec![]).type_of(), "object");
        assert_eq!(Value::from(1.0).type_of(), "number");
    }

    #[test]
    fn test_nan_is_not_equal_to_itself() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        let object = Value::object();
        assert_eq!(object, object.clone());
        assert_ne!(object, Value::object());
    }
}
