// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Arithmetic, bitwise and relational operators on values.

use crate::compiler::Opcode;
use crate::error::RuntimeError;
use crate::runtime::{ObjectRef, Value};

/// `+`: string concatenation if either primitive is a string.
pub fn add(a: &Value, b: &Value) -> Value {
    let a = a.to_primitive();
    let b = b.to_primitive();
    match (&a, &b) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Value::String(format!("{}{}", a.to_js_string(), b.to_js_string()))
        }
        _ => Value::Number(a.to_number() + b.to_number()),
    }
}

/// Numeric and bitwise binary operators other than `+`.
pub fn arithmetic(op: Opcode, a: &Value, b: &Value) -> Option<Value> {
    let number = |f: fn(f64, f64) -> f64| Value::Number(f(a.to_number(), b.to_number()));
    let int32 = |f: fn(i32, i32) -> i32| Value::Number(f64::from(f(a.to_int32(), b.to_int32())));
    let shift = b.to_uint32() & 0x1f;
    Some(match op {
        Opcode::Sub => number(|a, b| a - b),
        Opcode::Mul => number(|a, b| a * b),
        Opcode::Div => number(|a, b| a / b),
        // Truncating remainder, the sign follows the dividend
        Opcode::Mod => number(|a, b| a % b),
        Opcode::Pow => number(power),
        Opcode::And => int32(|a, b| a & b),
        Opcode::Or => int32(|a, b| a | b),
        Opcode::Xor => int32(|a, b| a ^ b),
        Opcode::Sal => Value::Number(f64::from(a.to_int32().wrapping_shl(shift))),
        Opcode::Sar => Value::Number(f64::from(a.to_int32() >> shift)),
        Opcode::Shr => Value::Number(f64::from(a.to_uint32() >> shift)),
        _ => return None,
    })
}

fn power(base: f64, exponent: f64) -> f64 {
    // 1 ** NaN is NaN, unlike powf
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// `key in object`.
pub fn has_property(key: &Value, object: &Value) -> Result<bool, RuntimeError> {
    let key = key.to_js_string();
    match object {
        Value::Object(object) => Ok(object.has(&key)),
        Value::Function(function) => Ok(function.has(&key)),
        other => Err(RuntimeError::type_error(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key,
            other.to_js_string()
        ))),
    }
}

/// `value instanceof constructor`.
pub fn instance_of(value: &Value, constructor: &Value) -> Result<bool, RuntimeError> {
    let Value::Function(constructor) = constructor else {
        return Err(RuntimeError::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ));
    };
    let object = match value {
        Value::Object(object) => object,
        _ => return Ok(false),
    };
    if let Some(prototype) = constructor.prototype() {
        if inherits(object, &prototype) {
            return Ok(true);
        }
    }
    // Errors raised by the machine itself carry no prototype
    Ok(match (object.error_kind(), constructor.error_kind()) {
        (Some(actual), Some(wanted)) if object.prototype().is_none() => {
            actual == wanted || wanted == crate::runtime::ErrorKind::Error
        }
        _ => false,
    })
}

fn inherits(object: &ObjectRef, prototype: &ObjectRef) -> bool {
    let mut current = object.prototype();
    while let Some(candidate) = current {
        if candidate.ptr_eq(prototype) {
            return true;
        }
        current = candidate.prototype();
    }
    false
}
