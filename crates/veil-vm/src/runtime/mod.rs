// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime value model: values, objects, functions and the embedding
//! environment.

pub mod function;
pub mod globals;
pub mod object;
pub mod value;

pub use function::{Callable, Closure, FunctionRef, NativeFn};
pub use globals::{Environment, FnAccessor, GlobalAccessor, GlobalAccessors};
pub use object::{ErrorKind, Object, ObjectKind, ObjectRef};
pub use value::Value;
