// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Intrinsic array methods.
//!
//! Element lists are copied out before callbacks run, so a callback may
//! freely read or mutate the array it is iterating.

use super::call::call_value;
use super::comparison::strict_equals;
use super::string_methods::relative_index;
use crate::error::RuntimeError;
use crate::runtime::{ObjectKind, ObjectRef, Value};

fn with_items<R>(array: &ObjectRef, f: impl FnOnce(&mut Vec<Value>) -> R) -> Option<R> {
    let mut object = array.lock();
    match &mut object.kind {
        ObjectKind::Array(items) => Some(f(items)),
        _ => None,
    }
}

fn join(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                item.to_js_string()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// Calls an array method, or returns `None` if there is no such method.
pub(crate) fn call_array_method(
    array: &ObjectRef,
    method: &str,
    args: &[Value],
    depth: usize,
) -> Option<Result<Value, RuntimeError>> {
    let items = array.elements()?;
    let len = items.len();
    let value = match method {
        "push" => with_items(array, |items| {
            items.extend(args.iter().cloned());
            Value::Number(items.len() as f64)
        })?,
        "pop" => with_items(array, |items| items.pop().unwrap_or_default())?,
        "shift" => with_items(array, |items| {
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        })?,
        "unshift" => with_items(array, |items| {
            items.splice(0..0, args.iter().cloned());
            Value::Number(items.len() as f64)
        })?,
        "reverse" => {
            with_items(array, |items| items.reverse())?;
            Value::Object(array.clone())
        }
        "join" => {
            let separator = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(separator) => separator.to_js_string(),
            };
            Value::String(join(&items, &separator))
        }
        "toString" => Value::String(join(&items, ",")),
        "indexOf" => {
            let target = args.first().cloned().unwrap_or_default();
            let from = relative_index(args.get(1), len, 0);
            let found = items.iter().skip(from).position(|item| strict_equals(item, &target));
            Value::Number(found.map_or(-1.0, |i| (i + from) as f64))
        }
        "includes" => {
            let target = args.first().cloned().unwrap_or_default();
            Value::Boolean(items.iter().any(|item| strict_equals(item, &target)))
        }
        "slice" => {
            let start = relative_index(args.first(), len, 0);
            let end = relative_index(args.get(1), len, len);
            Value::array(items.get(start..end.max(start)).unwrap_or_default().to_vec())
        }
        "concat" => {
            let mut out = items;
            for arg in args {
                match arg.as_array() {
                    Some(more) => out.extend(more),
                    None => out.push(arg.clone()),
                }
            }
            Value::array(out)
        }
        "forEach" | "map" | "filter" | "some" | "every" | "find" | "findIndex" => {
            return Some(iterate(array, &items, method, args, depth));
        }
        "reduce" => return Some(reduce(array, &items, args, depth)),
        _ => return None,
    };
    Some(Ok(value))
}

fn iterate(
    array: &ObjectRef,
    items: &[Value],
    method: &str,
    args: &[Value],
    depth: usize,
) -> Result<Value, RuntimeError> {
    let callback = args.first().cloned().unwrap_or_default();
    if !callback.is_function() {
        return Err(RuntimeError::type_error(format!(
            "{} is not a function",
            callback.to_js_string()
        )));
    }
    let this = args.get(1).cloned();
    let mut mapped = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let result = call_value(
            &callback,
            this.clone(),
            vec![item.clone(), Value::Number(i as f64), Value::Object(array.clone())],
            depth,
        )?;
        match method {
            "map" => mapped.push(result),
            "filter" if result.to_boolean() => mapped.push(item.clone()),
            "some" if result.to_boolean() => return Ok(Value::Boolean(true)),
            "every" if !result.to_boolean() => return Ok(Value::Boolean(false)),
            "find" if result.to_boolean() => return Ok(item.clone()),
            "findIndex" if result.to_boolean() => return Ok(Value::Number(i as f64)),
            _ => {}
        }
    }
    Ok(match method {
        "map" | "filter" => Value::array(mapped),
        "some" => Value::Boolean(false),
        "every" => Value::Boolean(true),
        "findIndex" => Value::Number(-1.0),
        _ => Value::Undefined,
    })
}

fn reduce(array: &ObjectRef, items: &[Value], args: &[Value], depth: usize) -> Result<Value, RuntimeError> {
    let callback = args.first().cloned().unwrap_or_default();
    if !callback.is_function() {
        return Err(RuntimeError::type_error(format!(
            "{} is not a function",
            callback.to_js_string()
        )));
    }
    let mut entries = items.iter().cloned().enumerate();
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match entries.next() {
            Some((_, first)) => first,
            None => {
                return Err(RuntimeError::type_error(
                    "Reduce of empty array with no initial value",
                ))
            }
        },
    };
    for (i, item) in entries {
        accumulator = call_value(
            &callback,
            None,
            vec![accumulator, item, Value::Number(i as f64), Value::Object(array.clone())],
            depth,
        )?;
    }
    Ok(accumulator)
}
