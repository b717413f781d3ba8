// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Instruction set declaration.

/// Declare an instruction enum together with its mnemonic and operand arity.
///
/// Each variant is written as `Variant = "MNEMONIC" / arity`. The macro
/// derives the usual traits and generates:
///
/// - `ALL`: every instruction in declaration order
/// - `mnemonic()`: the symbolic name
/// - `arity()`: number of operand slots that follow the opcode in a stream
/// - `from_mnemonic()`: reverse lookup by symbolic name
///
/// # Example
///
/// ```
/// use veil_macros::instruction_set;
///
/// instruction_set! {
///     /// A tiny instruction set.
///     pub enum Tiny {
///         /// Stop
///         Halt = "HALT" / 0,
///         /// Jump to an address
///         Jmp = "JMP" / 1,
///     }
/// }
///
/// assert_eq!(Tiny::ALL.len(), 2);
/// assert_eq!(Tiny::Jmp.mnemonic(), "JMP");
/// assert_eq!(Tiny::Jmp.arity(), 1);
/// assert_eq!(Tiny::from_mnemonic("JMP"), Some(Tiny::Jmp));
/// assert_eq!(Tiny::from_mnemonic("jmp"), None);
/// ```
#[macro_export]
macro_rules! instruction_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $mnemonic:literal / $arity:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant
            ),+
        }

        impl $name {
            /// Every instruction, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The symbolic name of this instruction.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $($name::$variant => $mnemonic,)+
                }
            }

            /// The number of operand slots following the opcode.
            pub const fn arity(self) -> usize {
                match self {
                    $($name::$variant => $arity,)+
                }
            }

            /// Looks an instruction up by its symbolic name.
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                match mnemonic {
                    $($mnemonic => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.mnemonic())
            }
        }
    };
}
