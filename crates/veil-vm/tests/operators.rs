// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Operators checked against a direct evaluation of the same semantics.

mod common;

use common::{eval, number, text};
use veil_macros::assert_ok;
use veil_vm::ast::build::*;
use veil_vm::ast::{BinaryOperator, Expression, UnaryOperator};
use veil_vm::{CompileOptions, Engine, EngineConfig, Environment, TableMode, Value};

fn value_engine() -> Engine {
    common::init_tracing();
    let config = EngineConfig {
        table: TableMode::Random { seed: Some(42) },
        compile: CompileOptions {
            value_expression_mode: true,
        },
        ..EngineConfig::default()
    };
    assert_ok!(Engine::with_config(config))
}

/// Evaluates a single expression.
fn value_of(expr: Expression) -> Value {
    let tree = program(vec![expr_stmt(expr)]);
    assert_ok!(value_engine().eval(&tree, &Environment::with_builtins()))
}

fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    (n.trunc() as i64) as i32
}

/// What each numeric operator computes on two numbers.
fn reference(op: BinaryOperator, a: f64, b: f64) -> Value {
    use BinaryOperator::*;
    let shift = (to_int32(b) as u32) & 31;
    match op {
        Add => number(a + b),
        Subtract => number(a - b),
        Multiply => number(a * b),
        Divide => number(a / b),
        Modulo => number(a % b),
        Exponent => number(a.powf(b)),
        BitwiseAnd => number(f64::from(to_int32(a) & to_int32(b))),
        BitwiseOr => number(f64::from(to_int32(a) | to_int32(b))),
        BitwiseXor => number(f64::from(to_int32(a) ^ to_int32(b))),
        LeftShift => number(f64::from(to_int32(a).wrapping_shl(shift))),
        RightShift => number(f64::from(to_int32(a) >> shift)),
        UnsignedRightShift => number(f64::from((to_int32(a) as u32) >> shift)),
        LessThan => Value::Boolean(a < b),
        LessThanEqual => Value::Boolean(a <= b),
        GreaterThan => Value::Boolean(a > b),
        GreaterThanEqual => Value::Boolean(a >= b),
        Equal | StrictEqual => Value::Boolean(a == b),
        NotEqual | StrictNotEqual => Value::Boolean(a != b),
        In | InstanceOf => unreachable!("not a numeric operator"),
    }
}

fn same(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(x), Value::Number(y)) => (x.is_nan() && y.is_nan()) || x == y,
        _ => actual == expected,
    }
}

#[test]
fn test_numeric_operator_matrix() {
    use BinaryOperator::*;
    let operands = [7.0, -3.0, 0.5, 0.0, 12.0];
    let operators = [
        Add,
        Subtract,
        Multiply,
        Divide,
        Modulo,
        Exponent,
        BitwiseAnd,
        BitwiseOr,
        BitwiseXor,
        LeftShift,
        RightShift,
        UnsignedRightShift,
        LessThan,
        LessThanEqual,
        GreaterThan,
        GreaterThanEqual,
        Equal,
        NotEqual,
        StrictEqual,
        StrictNotEqual,
    ];
    for op in operators {
        for a in operands {
            for b in operands {
                let actual = value_of(binary(op, num(a), num(b)));
                let expected = reference(op, a, b);
                assert!(
                    same(&actual, &expected),
                    "{:?} {} {}: got {}, expected {}",
                    op,
                    a,
                    b,
                    actual,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_addition_concatenates_strings() {
    use BinaryOperator::Add;
    assert_eq!(value_of(binary(Add, string("1"), num(2.0))), text("12"));
    assert_eq!(value_of(binary(Add, num(1.0), string("2"))), text("12"));
    assert_eq!(value_of(binary(Add, string("a"), null())), text("anull"));
    assert_eq!(value_of(binary(Add, boolean(true), num(1.0))), number(2.0));
}

#[test]
fn test_arithmetic_coerces_strings() {
    use BinaryOperator::*;
    assert_eq!(value_of(binary(Multiply, string("3"), string("4"))), number(12.0));
    assert_eq!(value_of(binary(Subtract, string("10"), num(4.0))), number(6.0));
    let nan = value_of(binary(Multiply, string("x"), num(1.0)));
    assert!(nan.to_number().is_nan());
}

#[test]
fn test_loose_and_strict_equality() {
    use BinaryOperator::*;
    assert_eq!(value_of(binary(Equal, null(), undefined())), Value::Boolean(true));
    assert_eq!(value_of(binary(StrictEqual, null(), undefined())), Value::Boolean(false));
    assert_eq!(value_of(binary(Equal, string("5"), num(5.0))), Value::Boolean(true));
    assert_eq!(value_of(binary(StrictEqual, string("5"), num(5.0))), Value::Boolean(false));
    assert_eq!(value_of(binary(Equal, boolean(true), num(1.0))), Value::Boolean(true));
    assert_eq!(value_of(binary(StrictNotEqual, num(f64::NAN), num(f64::NAN))), Value::Boolean(true));
}

#[test]
fn test_string_comparison() {
    use BinaryOperator::*;
    assert_eq!(value_of(binary(LessThan, string("apple"), string("banana"))), Value::Boolean(true));
    assert_eq!(value_of(binary(GreaterThanEqual, string("b"), string("b"))), Value::Boolean(true));
    // Mixed operands compare numerically
    assert_eq!(value_of(binary(LessThan, string("10"), num(9.0))), Value::Boolean(false));
}

#[test]
fn test_unary_operators() {
    use UnaryOperator::*;
    assert_eq!(value_of(unary(Minus, string("3"))), number(-3.0));
    assert_eq!(value_of(unary(Plus, string("  42 "))), number(42.0));
    assert_eq!(value_of(unary(LogicalNot, string(""))), Value::Boolean(true));
    assert_eq!(value_of(unary(BitwiseNot, num(5.0))), number(-6.0));
    assert_eq!(value_of(unary(Void, num(1.0))), Value::Undefined);
}

#[test]
fn test_typeof() {
    use UnaryOperator::Typeof;
    assert_eq!(value_of(unary(Typeof, num(1.0))), text("number"));
    assert_eq!(value_of(unary(Typeof, string("s"))), text("string"));
    assert_eq!(value_of(unary(Typeof, null())), text("object"));
    assert_eq!(value_of(unary(Typeof, undefined())), text("undefined"));
    assert_eq!(value_of(unary(Typeof, arrow_expr(&[], num(1.0)))), text("function"));
    assert_eq!(value_of(unary(Typeof, array(vec![]))), text("object"));
}

#[test]
fn test_in_and_delete() {
    // let o = { a: 1 }; let before = "a" in o; let gone = delete o.a; return before + "," + gone + "," + ("a" in o);
    use BinaryOperator::{Add, In};
    let result = eval(vec![
        let_decl("o", Some(object(vec![("a", num(1.0))]))),
        let_decl("before", Some(binary(In, string("a"), ident("o")))),
        let_decl("gone", Some(unary(UnaryOperator::Delete, member(ident("o"), "a")))),
        return_stmt(Some(binary(
            Add,
            binary(
                Add,
                binary(Add, binary(Add, ident("before"), string(",")), ident("gone")),
                string(","),
            ),
            binary(In, string("a"), ident("o")),
        ))),
    ]);
    assert_eq!(result, text("true,true,false"));
}

#[test]
fn test_update_expressions() {
    // let i = 5; let a = i++; let b = ++i; let c = i--; return a + "," + b + "," + c + "," + i;
    use BinaryOperator::Add;
    let join = |parts: Vec<Expression>| {
        parts
            .into_iter()
            .reduce(|acc, part| binary(Add, binary(Add, acc, string(",")), part))
            .unwrap_or_else(|| string(""))
    };
    let result = eval(vec![
        let_decl("i", Some(num(5.0))),
        let_decl("a", Some(postfix_inc(ident("i")))),
        let_decl("b", Some(prefix_inc(ident("i")))),
        let_decl("c", Some(postfix_dec(ident("i")))),
        return_stmt(Some(join(vec![ident("a"), ident("b"), ident("c"), ident("i")]))),
    ]);
    assert_eq!(result, text("5,7,7,6"));
}

#[test]
fn test_member_compound_assignment_evaluates_base_once() {
    // let n = 0; let o = { v: 1 }; function get() { n++; return o; } get().v += 10; return o.v * 10 + n;
    use BinaryOperator::{Add, Multiply};
    let result = eval(vec![
        let_decl("n", Some(num(0.0))),
        let_decl("o", Some(object(vec![("v", num(1.0))]))),
        function(
            "get",
            &[],
            vec![expr_stmt(postfix_inc(ident("n"))), return_stmt(Some(ident("o")))],
        ),
        expr_stmt(compound_assign(
            Add,
            member(call(ident("get"), vec![]), "v"),
            num(10.0),
        )),
        return_stmt(Some(binary(
            Add,
            binary(Multiply, member(ident("o"), "v"), num(10.0)),
            ident("n"),
        ))),
    ]);
    assert_eq!(result, number(111.0));
}

#[test]
fn test_logical_assignment() {
    // let a = null; a ??= 3; let b = 0; b ||= 4; let c = 1; c &&= 5; return a + b + c;
    use veil_vm::ast::{AssignmentOperator, BinaryOperator::Add, LogicalOperator};
    let result = eval(vec![
        let_decl("a", Some(null())),
        expr_stmt(assign_op(AssignmentOperator::Logical(LogicalOperator::Nullish), ident("a"), num(3.0))),
        let_decl("b", Some(num(0.0))),
        expr_stmt(assign_op(AssignmentOperator::Logical(LogicalOperator::Or), ident("b"), num(4.0))),
        let_decl("c", Some(num(1.0))),
        expr_stmt(assign_op(AssignmentOperator::Logical(LogicalOperator::And), ident("c"), num(5.0))),
        return_stmt(Some(binary(Add, binary(Add, ident("a"), ident("b")), ident("c")))),
    ]);
    assert_eq!(result, number(12.0));
}

#[test]
fn test_intrinsic_methods() {
    // return "a-b-c".split("-").map((s) => s.toUpperCase()).join("") + [1, 2, 3].indexOf(3) + "xyz".length;
    use BinaryOperator::Add;
    let shout = method_call(
        method_call(string("a-b-c"), "split", vec![string("-")]),
        "map",
        vec![arrow_expr(&["s"], method_call(ident("s"), "toUpperCase", vec![]))],
    );
    let result = eval(vec![return_stmt(Some(binary(
        Add,
        binary(
            Add,
            method_call(shout, "join", vec![string("")]),
            method_call(array(vec![num(1.0), num(2.0), num(3.0)]), "indexOf", vec![num(3.0)]),
        ),
        member(string("xyz"), "length"),
    )))]);
    assert_eq!(result, text("ABC23"));
}

#[test]
fn test_number_methods() {
    // return (255).toString(16) + (3.14159).toFixed(2);
    use BinaryOperator::Add;
    let result = eval(vec![return_stmt(Some(binary(
        Add,
        method_call(num(255.0), "toString", vec![num(16.0)]),
        method_call(num(3.14159), "toFixed", vec![num(2.0)]),
    )))]);
    assert_eq!(result, text("ff3.14"));
}
