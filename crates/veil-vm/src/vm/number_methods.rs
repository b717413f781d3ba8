// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Intrinsic number methods.

use crate::error::RuntimeError;
use crate::runtime::value::number_to_string;
use crate::runtime::Value;

/// Calls a number method, or returns `None` if there is no such method.
pub(crate) fn call_number_method(
    n: f64,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let result = match method {
        "toString" => match args.first() {
            None | Some(Value::Undefined) => Ok(Value::String(number_to_string(n))),
            Some(radix) => {
                let radix = radix.to_integer();
                if !(2.0..=36.0).contains(&radix) {
                    Err(RuntimeError::range_error(
                        "toString() radix must be between 2 and 36",
                    ))
                } else if radix == 10.0 || !n.is_finite() || n.fract() != 0.0 {
                    Ok(Value::String(number_to_string(n)))
                } else {
                    Ok(Value::String(format_radix(n as i64, radix as u32)))
                }
            }
        },
        "toFixed" => {
            let digits = args.first().map_or(0.0, Value::to_integer);
            if !(0.0..=100.0).contains(&digits) {
                Err(RuntimeError::range_error(
                    "toFixed() digits argument must be between 0 and 100",
                ))
            } else if !n.is_finite() {
                Ok(Value::String(number_to_string(n)))
            } else {
                Ok(Value::String(format!("{:.*}", digits as usize, n)))
            }
        }
        "valueOf" => Ok(Value::Number(n)),
        _ => return None,
    };
    Some(result)
}

/// Formats an integer in the given radix.
fn format_radix(n: i64, radix: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut magnitude = n.unsigned_abs();
    let mut out = Vec::new();
    while magnitude > 0 {
        out.push(DIGITS[(magnitude % u64::from(radix)) as usize]);
        magnitude /= u64::from(radix);
    }
    if n < 0 {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
