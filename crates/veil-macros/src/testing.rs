// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Testing helper macros.

/// Assert that a `Result` is `Ok` and yield the contained value.
///
/// An optional format string adds context to the panic message.
///
/// # Example
///
/// ```
/// use veil_macros::assert_ok;
///
/// let value: Result<u8, String> = Ok(3);
/// assert_eq!(assert_ok!(value, "while compiling {}", "x"), 3);
/// ```
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(error) => panic!(
                "expected Ok from `{}`, got Err: {}",
                stringify!($expr),
                error
            ),
        }
    };
    ($expr:expr, $($context:tt)+) => {
        match $expr {
            Ok(value) => value,
            Err(error) => panic!(
                "expected Ok from `{}` ({}), got Err: {}",
                stringify!($expr),
                format!($($context)+),
                error
            ),
        }
    };
}

/// Assert that a `Result` is `Err` and yield the error.
///
/// # Example
///
/// ```
/// use veil_macros::assert_err;
///
/// let value: Result<u8, String> = Err("boom".into());
/// assert_eq!(assert_err!(value), "boom");
/// ```
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => panic!(
                "expected Err from `{}`, got Ok: {:?}",
                stringify!($expr),
                value
            ),
            Err(error) => error,
        }
    };
}

/// Assert that an expression matches a pattern, with an optional guard.
///
/// # Example
///
/// ```
/// use veil_macros::assert_matches;
///
/// let slot: Option<usize> = Some(2);
/// assert_matches!(slot, Some(n) if n > 1);
/// ```
#[macro_export]
macro_rules! assert_matches {
    ($expr:expr, $pat:pat $(if $guard:expr)? $(,)?) => {
        match $expr {
            $pat $(if $guard)? => {}
            ref other => panic!(
                "`{}` does not match `{}`: {:?}",
                stringify!($expr),
                stringify!($pat $(if $guard)?),
                other
            ),
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_ok_yields_value() {
        let parsed: Result<i32, std::num::ParseIntError> = "7".parse();
        assert_eq!(assert_ok!(parsed), 7);
    }

    #[test]
    #[should_panic(expected = "expected Ok")]
    fn test_assert_ok_panics_on_err() {
        let parsed: Result<i32, std::num::ParseIntError> = "x".parse();
        assert_ok!(parsed);
    }

    #[test]
    fn test_assert_err_yields_error() {
        let result: Result<(), &str> = Err("unresolved");
        assert_eq!(assert_err!(result), "unresolved");
    }

    #[test]
    fn test_assert_matches_with_guard() {
        let level = Some(3usize);
        assert_matches!(level, Some(n) if n == 3);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_assert_matches_failure() {
        let level: Option<usize> = None;
        assert_matches!(level, Some(_));
    }
}
