// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end programs with known results.

mod common;

use common::{eval, number};
use veil_vm::ast::BinaryOperator::*;
use veil_vm::ast::build::*;

#[test]
fn test_compound_assignment() {
    // let x = 1; x += 2; return x;
    let result = eval(vec![
        let_decl("x", Some(num(1.0))),
        expr_stmt(compound_assign(Add, ident("x"), num(2.0))),
        return_stmt(Some(ident("x"))),
    ]);
    assert_eq!(result, number(3.0));
}

#[test]
fn test_function_call() {
    // function f(a, b) { return a + b } return f(1, 2);
    let result = eval(vec![
        function("f", &["a", "b"], vec![return_stmt(Some(binary(Add, ident("a"), ident("b"))))]),
        return_stmt(Some(call(ident("f"), vec![num(1.0), num(2.0)]))),
    ]);
    assert_eq!(result, number(3.0));
}

#[test]
fn test_counter_closure() {
    // function counter() { let n = 0; return () => { n += 1; return n }; }
    // let c = counter(); c(); return c();
    let result = eval(vec![
        function(
            "counter",
            &[],
            vec![
                let_decl("n", Some(num(0.0))),
                return_stmt(Some(arrow(
                    &[],
                    vec![
                        expr_stmt(compound_assign(Add, ident("n"), num(1.0))),
                        return_stmt(Some(ident("n"))),
                    ],
                ))),
            ],
        ),
        let_decl("c", Some(call(ident("counter"), vec![]))),
        expr_stmt(call(ident("c"), vec![])),
        return_stmt(Some(call(ident("c"), vec![]))),
    ]);
    assert_eq!(result, number(2.0));
}

#[test]
fn test_return_from_catch_with_finally() {
    // try { throw 5 } catch (e) { return e + 1 } finally {}
    let result = eval(vec![try_catch(
        vec![throw(num(5.0))],
        Some(("e", vec![return_stmt(Some(binary(Add, ident("e"), num(1.0))))])),
        Some(vec![]),
    )]);
    assert_eq!(result, number(6.0));
}

#[test]
fn test_for_loop_with_continue() {
    // let s = 0; for (let i = 0; i < 5; i++) { if (i == 3) continue; s += i; } return s;
    let result = eval(vec![
        let_decl("s", Some(num(0.0))),
        for_loop(
            Some(let_init("i", num(0.0))),
            Some(binary(LessThan, ident("i"), num(5.0))),
            Some(postfix_inc(ident("i"))),
            block(vec![
                if_stmt(binary(Equal, ident("i"), num(3.0)), continue_stmt(None), None),
                expr_stmt(compound_assign(Add, ident("s"), ident("i"))),
            ]),
        ),
        return_stmt(Some(ident("s"))),
    ]);
    assert_eq!(result, number(7.0));
}

#[test]
fn test_rest_parameters() {
    // function sum(...xs) { let t = 0; for (let i = 0; i < xs.length; i++) { t += xs[i]; } return t; }
    // return sum(1, 2, 3);
    let result = eval(vec![
        function_with(
            "sum",
            vec![],
            Some("xs"),
            vec![
                let_decl("t", Some(num(0.0))),
                for_loop(
                    Some(let_init("i", num(0.0))),
                    Some(binary(LessThan, ident("i"), member(ident("xs"), "length"))),
                    Some(postfix_inc(ident("i"))),
                    block(vec![expr_stmt(compound_assign(
                        Add,
                        ident("t"),
                        index(ident("xs"), ident("i")),
                    ))]),
                ),
                return_stmt(Some(ident("t"))),
            ],
        ),
        return_stmt(Some(call(ident("sum"), vec![num(1.0), num(2.0), num(3.0)]))),
    ]);
    assert_eq!(result, number(6.0));
}

#[test]
fn test_program_without_return_completes_undefined() {
    let result = eval(vec![let_decl("x", Some(num(1.0)))]);
    assert!(result.is_undefined());
}
