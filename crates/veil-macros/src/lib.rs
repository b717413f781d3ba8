// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Declarative macros shared by the veil workspace.
//!
//! # Macros Overview
//!
//! ## Instruction sets
//! - [`instruction_set!`] - Declare an instruction enum with mnemonics and operand arity
//!
//! ## Testing
//! - [`assert_ok!`] - Unwrap an `Ok`, panicking with the error otherwise
//! - [`assert_err!`] - Unwrap an `Err`, panicking with the value otherwise
//! - [`assert_matches!`] - Assert a value matches a pattern
//!
//! # Examples
//!
//! ```
//! use veil_macros::*;
//!
//! instruction_set! {
//!     pub enum Op {
//!         Halt = "HALT" / 0,
//!         Push = "PUSH" / 1,
//!     }
//! }
//!
//! assert_eq!(Op::Push.arity(), 1);
//! assert_eq!(Op::from_mnemonic("HALT"), Some(Op::Halt));
//!
//! let parsed: Result<i32, String> = "42".parse::<i32>().map_err(|e| e.to_string());
//! assert_eq!(assert_ok!(parsed), 42);
//! ```

#![warn(missing_docs)]

mod instruction;
mod testing;
