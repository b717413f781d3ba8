// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Equality and relational comparison.

use crate::runtime::value::string_to_number;
use crate::runtime::Value;

/// Abstract equality (`==`).
pub fn abstract_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,

        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            *n == string_to_number(s)
        }

        // Booleans compare as numbers
        (Value::Boolean(b), other) | (other, Value::Boolean(b)) => {
            abstract_equals(&Value::Number(if *b { 1.0 } else { 0.0 }), other)
        }

        // An object against a primitive compares through ToPrimitive
        (Value::Object(_) | Value::Function(_), Value::Number(_) | Value::String(_)) => {
            abstract_equals(&a.to_primitive(), b)
        }
        (Value::Number(_) | Value::String(_), Value::Object(_) | Value::Function(_)) => {
            abstract_equals(a, &b.to_primitive())
        }

        _ => strict_equals(a, b),
    }
}

/// Strict equality (`===`).
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    // NaN is unequal to itself and +0 equals -0, exactly as f64 does
    a == b
}

/// `a > b` (or `a >= b` when `or_equal`), false whenever NaN is involved.
pub fn greater(a: &Value, b: &Value, or_equal: bool) -> bool {
    let a = a.to_primitive();
    let b = b.to_primitive();
    if let (Value::String(a), Value::String(b)) = (&a, &b) {
        return if or_equal { a >= b } else { a > b };
    }
    let a = a.to_number();
    let b = b.to_number();
    if or_equal { a >= b } else { a > b }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullish_equality() {
        assert!(abstract_equals(&Value::Null, &Value::Undefined));
        assert!(!abstract_equals(&Value::Null, &Value::Number(0.0)));
        assert!(!abstract_equals(&Value::Undefined, &Value::Boolean(false)));
    }

    #[test]
    fn test_coercing_equality() {
        assert!(abstract_equals(&Value::from("1"), &Value::Number(1.0)));
        assert!(abstract_equals(&Value::Boolean(true), &Value::from("1")));
        assert!(abstract_equals(&Value::from(""), &Value::Number(0.0)));
        assert!(!abstract_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        let array = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert!(abstract_equals(&array, &Value::from("1,2")));
    }

    #[test]
    fn test_strict_equality() {
        assert!(!strict_equals(&Value::from("1"), &Value::Number(1.0)));
        assert!(strict_equals(&Value::Number(0.0), &Value::Number(-0.0)));
        let object = Value::object();
        assert!(strict_equals(&object, &object.clone()));
        assert!(!strict_equals(&object, &Value::object()));
    }

    #[test]
    fn test_relational() {
        assert!(greater(&Value::Number(2.0), &Value::Number(1.0), false));
        assert!(greater(&Value::Number(1.0), &Value::Number(1.0), true));
        assert!(greater(&Value::from("b"), &Value::from("a"), false));
        // "10" < "9" as strings
        assert!(!greater(&Value::from("10"), &Value::from("9"), false));
        assert!(greater(&Value::from("10"), &Value::Number(9.0), false));
        assert!(!greater(&Value::Number(f64::NAN), &Value::Number(1.0), true));
    }
}
