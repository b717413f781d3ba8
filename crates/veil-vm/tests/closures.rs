// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Functions, closures and the call protocol.

mod common;

use common::{engine, engine_with, error_name, eval, number, run_in, text};
use veil_macros::assert_ok;
use veil_vm::ast::BinaryOperator::*;
use veil_vm::ast::UnaryOperator;
use veil_vm::ast::build::*;
use veil_vm::{Environment, TableMode, Value, VmOptions, vm};

#[test]
fn test_capture_is_by_reference() {
    // let x = 1; let f = () => x; x = 5; return f();
    let result = eval(vec![
        let_decl("x", Some(num(1.0))),
        let_decl("f", Some(arrow_expr(&[], ident("x")))),
        expr_stmt(assign(ident("x"), num(5.0))),
        return_stmt(Some(call(ident("f"), vec![]))),
    ]);
    assert_eq!(result, number(5.0));
}

#[test]
fn test_closures_share_cells() {
    // let n = 0; let inc = () => { n += 1 }; let get = () => n; inc(); inc(); return get();
    let result = eval(vec![
        let_decl("n", Some(num(0.0))),
        let_decl(
            "inc",
            Some(arrow(&[], vec![expr_stmt(compound_assign(Add, ident("n"), num(1.0)))])),
        ),
        let_decl("get", Some(arrow_expr(&[], ident("n")))),
        expr_stmt(call(ident("inc"), vec![])),
        expr_stmt(call(ident("inc"), vec![])),
        return_stmt(Some(call(ident("get"), vec![]))),
    ]);
    assert_eq!(result, number(2.0));
}

#[test]
fn test_runs_are_isolated() {
    // let v = 1;
    // if (typeof get == "undefined") { get = () => v; } else { v = 99; }
    let tree = program(vec![
        let_decl("v", Some(num(1.0))),
        if_stmt(
            binary(Equal, unary(UnaryOperator::Typeof, ident("get")), string("undefined")),
            block(vec![expr_stmt(assign(ident("get"), arrow_expr(&[], ident("v"))))]),
            Some(block(vec![expr_stmt(assign(ident("v"), num(99.0)))])),
        ),
    ]);
    let env = Environment::with_builtins();
    let compiled = assert_ok!(engine().compile(&tree));
    let linked = compiled.link(&env);
    assert_ok!(linked.run());
    assert_ok!(linked.run());

    let get = env.get("get").unwrap_or_default();
    let value = assert_ok!(vm::call(&get, Value::Undefined, &[]));
    assert_eq!(value, number(1.0));
}

#[test]
fn test_recursion() {
    // function fact(n) { if (n <= 1) return 1; return n * fact(n - 1); } return fact(10);
    let result = eval(vec![
        function(
            "fact",
            &["n"],
            vec![
                if_stmt(
                    binary(LessThanEqual, ident("n"), num(1.0)),
                    return_stmt(Some(num(1.0))),
                    None,
                ),
                return_stmt(Some(binary(
                    Multiply,
                    ident("n"),
                    call(ident("fact"), vec![binary(Subtract, ident("n"), num(1.0))]),
                ))),
            ],
        ),
        return_stmt(Some(call(ident("fact"), vec![num(10.0)]))),
    ]);
    assert_eq!(result, number(3628800.0));
}

#[test]
fn test_call_depth_limit_is_catchable() {
    // function down(n) { return down(n + 1); }
    // try { down(0); } catch (e) { return e.name; }
    let engine = engine_with(TableMode::Canonical, VmOptions { max_call_depth: 16 });
    let tree = program(vec![
        function(
            "down",
            &["n"],
            vec![return_stmt(Some(call(
                ident("down"),
                vec![binary(Add, ident("n"), num(1.0))],
            )))],
        ),
        try_catch(
            vec![expr_stmt(call(ident("down"), vec![num(0.0)]))],
            Some(("e", vec![return_stmt(Some(member(ident("e"), "name")))])),
            None,
        ),
    ]);
    let result = assert_ok!(engine.eval(&tree, &Environment::with_builtins()));
    assert_eq!(result, text("RangeError"));
}

#[test]
fn test_runaway_recursion_with_default_limit() {
    // function down(n) { return 1 + down(n + 1); }
    // try { down(0); } catch (e) { return e.name; }
    let tree = program(vec![
        function(
            "down",
            &["n"],
            vec![return_stmt(Some(binary(
                Add,
                num(1.0),
                call(ident("down"), vec![binary(Add, ident("n"), num(1.0))]),
            )))],
        ),
        try_catch(
            vec![expr_stmt(call(ident("down"), vec![num(0.0)]))],
            Some(("e", vec![return_stmt(Some(member(ident("e"), "name")))])),
            None,
        ),
    ]);
    // A default test thread stack; the limit must trip before it runs out
    let worker = std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(move || {
            engine()
                .eval(&tree, &Environment::with_builtins())
                .map(|value| value.to_js_string())
                .map_err(|err| err.to_string())
        });
    let handle = assert_ok!(worker);
    let result = match handle.join() {
        Ok(result) => assert_ok!(result),
        Err(_) => panic!("evaluation thread panicked"),
    };
    assert_eq!(result, "RangeError");
}

#[test]
fn test_default_parameters() {
    // function f(a, b = 10) { return a + b; } return f(1) + f(1, 2);
    let result = eval(vec![
        function_with(
            "f",
            vec![param("a"), param_default("b", num(10.0))],
            None,
            vec![return_stmt(Some(binary(Add, ident("a"), ident("b"))))],
        ),
        return_stmt(Some(binary(
            Add,
            call(ident("f"), vec![num(1.0)]),
            call(ident("f"), vec![num(1.0), num(2.0)]),
        ))),
    ]);
    assert_eq!(result, number(14.0));
}

#[test]
fn test_arguments_object() {
    // function count() { return arguments.length; } return count(1, 2, 3);
    let result = eval(vec![
        function("count", &[], vec![return_stmt(Some(member(ident("arguments"), "length")))]),
        return_stmt(Some(call(ident("count"), vec![num(1.0), num(2.0), num(3.0)]))),
    ]);
    assert_eq!(result, number(3.0));
}

#[test]
fn test_spread_arguments() {
    // function add3(a, b, c) { return a + b + c; } let xs = [2, 3]; return add3(1, ...xs);
    let result = eval(vec![
        function(
            "add3",
            &["a", "b", "c"],
            vec![return_stmt(Some(binary(
                Add,
                binary(Add, ident("a"), ident("b")),
                ident("c"),
            )))],
        ),
        let_decl("xs", Some(array(vec![num(2.0), num(3.0)]))),
        return_stmt(Some(call(ident("add3"), vec![num(1.0), spread(ident("xs"))]))),
    ]);
    assert_eq!(result, number(6.0));
}

#[test]
fn test_method_receiver() {
    // let o = { v: 4, get: function () { return this.v; } }; return o.get();
    let result = eval(vec![
        let_decl(
            "o",
            Some(object(vec![
                ("v", num(4.0)),
                ("get", function_expr(&[], vec![return_stmt(Some(member(this(), "v")))])),
            ])),
        ),
        return_stmt(Some(method_call(ident("o"), "get", vec![]))),
    ]);
    assert_eq!(result, number(4.0));
}

#[test]
fn test_arrow_receiver_is_lexical() {
    // let o = { v: 7, m: function () { let g = () => this.v; return g(); } }; return o.m();
    let result = eval(vec![
        let_decl(
            "o",
            Some(object(vec![
                ("v", num(7.0)),
                (
                    "m",
                    function_expr(
                        &[],
                        vec![
                            let_decl("g", Some(arrow_expr(&[], member(this(), "v")))),
                            return_stmt(Some(call(ident("g"), vec![]))),
                        ],
                    ),
                ),
            ])),
        ),
        return_stmt(Some(method_call(ident("o"), "m", vec![]))),
    ]);
    assert_eq!(result, number(7.0));
}

#[test]
fn test_plain_call_receiver_is_fresh_object() {
    // function f() { return typeof this; } return f();
    let result = eval(vec![
        function("f", &[], vec![return_stmt(Some(unary(UnaryOperator::Typeof, this())))]),
        return_stmt(Some(call(ident("f"), vec![]))),
    ]);
    assert_eq!(result, text("object"));
}

#[test]
fn test_constructor() {
    // function Point(x) { this.x = x; } let p = new Point(3); return p.x + (p instanceof Point ? 1 : 0);
    let result = eval(vec![
        function(
            "Point",
            &["x"],
            vec![expr_stmt(assign(member(this(), "x"), ident("x")))],
        ),
        let_decl("p", Some(new(ident("Point"), vec![num(3.0)]))),
        return_stmt(Some(binary(
            Add,
            member(ident("p"), "x"),
            conditional(
                binary(InstanceOf, ident("p"), ident("Point")),
                num(1.0),
                num(0.0),
            ),
        ))),
    ]);
    assert_eq!(result, number(4.0));
}

#[test]
fn test_arrow_is_not_a_constructor() {
    // let f = () => 1; new f();
    let env = Environment::with_builtins();
    let result = run_in(
        &env,
        vec![
            let_decl("f", Some(arrow_expr(&[], num(1.0)))),
            expr_stmt(new(ident("f"), vec![])),
        ],
    );
    assert_eq!(error_name(&common::thrown(result)), "TypeError");
}

#[test]
fn test_native_functions() {
    let env = Environment::with_builtins();
    env.define_native("twice", |_, args| {
        Ok(Value::Number(args.first().map_or(f64::NAN, Value::to_number) * 2.0))
    });
    let result = assert_ok!(run_in(
        &env,
        vec![return_stmt(Some(call(ident("twice"), vec![num(21.0)])))],
    ));
    assert_eq!(result, number(42.0));
}

#[test]
fn test_host_calls_escaped_closure() {
    // square = function (x) { return x * x; };
    let env = Environment::with_builtins();
    assert_ok!(run_in(
        &env,
        vec![expr_stmt(assign(
            ident("square"),
            function_expr(&["x"], vec![return_stmt(Some(binary(Multiply, ident("x"), ident("x"))))]),
        ))],
    ));
    let square = env.get("square").unwrap_or_default();
    assert!(square.is_function());
    let value = assert_ok!(vm::call(&square, Value::Undefined, &[number(9.0)]));
    assert_eq!(value, number(81.0));
}

#[test]
fn test_calling_a_non_function() {
    // let x = 1; x();
    let result = run_in(
        &Environment::with_builtins(),
        vec![let_decl("x", Some(num(1.0))), expr_stmt(call(ident("x"), vec![]))],
    );
    assert_eq!(error_name(&common::thrown(result)), "TypeError");
}
