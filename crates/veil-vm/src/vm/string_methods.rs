// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Intrinsic string methods.
//!
//! Indices count characters, not bytes.

use crate::error::RuntimeError;
use crate::runtime::Value;

/// Longest string `repeat` builds, in bytes.
const MAX_STRING_LENGTH: usize = 1 << 28;

/// Resolves a relative index argument against `len` (negative counts from
/// the end).
pub(crate) fn relative_index(arg: Option<&Value>, len: usize, default: usize) -> usize {
    match arg {
        None | Some(Value::Undefined) => default,
        Some(value) => {
            let n = value.to_integer();
            if n < 0.0 {
                (len as f64 + n).max(0.0) as usize
            } else {
                n.min(len as f64) as usize
            }
        }
    }
}

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_js_string).unwrap_or_default()
}

fn char_index(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    (from..=haystack.len().saturating_sub(needle.len()))
        .find(|&i| haystack.get(i..i + needle.len()) == Some(needle))
}

fn repeat(s: &str, count: Option<&Value>) -> Result<Value, RuntimeError> {
    let count = count.map_or(0.0, Value::to_integer);
    if count < 0.0 || count.is_infinite() {
        return Err(RuntimeError::range_error(format!("Invalid count value: {}", count)));
    }
    let count = count as usize;
    match s.len().checked_mul(count) {
        Some(total) if total <= MAX_STRING_LENGTH => Ok(Value::String(s.repeat(count))),
        _ => Err(RuntimeError::range_error("Invalid string length")),
    }
}

/// Calls a string method, or returns `None` if there is no such method.
pub(crate) fn call_string_method(
    s: &str,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let value = match method {
        "charAt" => {
            let i = args.first().map_or(0.0, Value::to_integer);
            let c = if i >= 0.0 { chars.get(i as usize) } else { None };
            Value::String(c.map(char::to_string).unwrap_or_default())
        }
        "charCodeAt" => {
            let i = args.first().map_or(0.0, Value::to_integer);
            let c = if i >= 0.0 { chars.get(i as usize) } else { None };
            Value::Number(c.map_or(f64::NAN, |c| f64::from(*c as u32)))
        }
        "indexOf" => {
            let needle: Vec<char> = string_arg(args, 0).chars().collect();
            let from = relative_index(args.get(1), len, 0);
            Value::Number(char_index(&chars, &needle, from).map_or(-1.0, |i| i as f64))
        }
        "lastIndexOf" => {
            let needle: Vec<char> = string_arg(args, 0).chars().collect();
            let last = (0..=len.saturating_sub(needle.len()))
                .rev()
                .find(|&i| chars.get(i..i + needle.len()) == Some(needle.as_slice()));
            Value::Number(last.map_or(-1.0, |i| i as f64))
        }
        "includes" => {
            let needle: Vec<char> = string_arg(args, 0).chars().collect();
            Value::Boolean(char_index(&chars, &needle, 0).is_some())
        }
        "startsWith" => Value::Boolean(s.starts_with(&string_arg(args, 0))),
        "endsWith" => Value::Boolean(s.ends_with(&string_arg(args, 0))),
        "slice" => {
            let start = relative_index(args.first(), len, 0);
            let end = relative_index(args.get(1), len, len);
            Value::String(chars.get(start..end.max(start)).unwrap_or_default().iter().collect())
        }
        "substring" => {
            let clamp = |v: Option<&Value>, default: usize| match v {
                None | Some(Value::Undefined) => default,
                Some(v) => v.to_integer().clamp(0.0, len as f64) as usize,
            };
            let a = clamp(args.first(), 0);
            let b = clamp(args.get(1), len);
            let (start, end) = if a > b { (b, a) } else { (a, b) };
            Value::String(chars[start..end].iter().collect())
        }
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "concat" => {
            let mut out = s.to_string();
            for arg in args {
                out.push_str(&arg.to_js_string());
            }
            Value::String(out)
        }
        "repeat" => return Some(repeat(s, args.first())),
        "split" => {
            let parts = match args.first() {
                None | Some(Value::Undefined) => vec![Value::from(s)],
                Some(separator) => {
                    let separator = separator.to_js_string();
                    if separator.is_empty() {
                        chars.iter().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(separator.as_str()).map(Value::from).collect()
                    }
                }
            };
            Value::array(parts)
        }
        "toString" | "valueOf" => Value::from(s),
        _ => return None,
    };
    Some(Ok(value))
}
