// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

use veil_macros::{assert_err, assert_ok};

use super::*;
use crate::ast::build::*;
use crate::compiler::bytecode::Instruction;

fn compile_with(program: &Program, value_mode: bool) -> Result<(Bytecode, GlobalTable), CompileError> {
    let options = CompileOptions {
        value_expression_mode: value_mode,
    };
    compile(program, &OpcodeTable::canonical(), &options)
}

fn opcodes(code: &Bytecode) -> Vec<Opcode> {
    let table = OpcodeTable::canonical();
    code.instructions(&table)
        .map(|i| i.map(|i: Instruction<'_>| i.opcode))
        .collect::<Result<_, _>>()
        .unwrap_or_default()
}

fn contains(haystack: &[Opcode], needle: &[Opcode]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn test_program_layout() {
    let program = program(vec![let_decl("x", Some(num(1.0)))]);
    let (code, globals) = assert_ok!(compile_with(&program, false));
    assert_eq!(
        opcodes(&code),
        vec![
            Opcode::Top,
            Opcode::Undefined,
            Opcode::Push,
            Opcode::BindLocal,
            Opcode::Push,
            Opcode::Store,
            Opcode::Pop,
            Opcode::Halt,
        ]
    );
    // x lives in register 1, so TOP is patched to 1
    assert_eq!(code.words()[1], Word::Number(1.0));
    assert_eq!(globals.len(), 1);
}

#[test]
fn test_value_mode() {
    let program = program(vec![expr_stmt(binary(BinaryOperator::Add, num(1.0), num(2.0)))]);
    let (code, _) = assert_ok!(compile_with(&program, true));
    assert_eq!(
        opcodes(&code),
        vec![Opcode::Top, Opcode::Push, Opcode::Push, Opcode::Add, Opcode::Halt]
    );
}

#[test]
fn test_value_mode_rejects_statements() {
    let program = program(vec![let_decl("x", None), expr_stmt(ident("x"))]);
    let err = assert_err!(compile_with(&program, true));
    assert_eq!(err, CompileError::ValueModeRequiresSingleExpression);
}

#[test]
fn test_strings_are_masked() {
    let program = program(vec![expr_stmt(string("AB"))]);
    let (code, _) = assert_ok!(compile_with(&program, true));
    let words = code.words();
    assert_eq!(words[3], Word::Number(f64::from('A' as u32 ^ 0x39)));
    assert_eq!(words[5], Word::Number(f64::from('B' as u32 ^ 0x39)));
    assert!(!words.iter().any(|w| matches!(w, Word::String(_))));
}

#[test]
fn test_free_names_get_global_slots() {
    let program = program(vec![
        expr_stmt(call(ident("print"), vec![ident("answer")])),
        expr_stmt(call(ident("print"), vec![])),
    ]);
    let (code, globals) = assert_ok!(compile_with(&program, false));
    assert_eq!(globals.names().collect::<Vec<_>>(), vec!["this", "print", "answer"]);
    assert!(contains(&opcodes(&code), &[Opcode::BindGlobal, Opcode::Load]));
}

#[test]
fn test_unresolved_name() {
    // A tree whose free names were never computed
    let program = Program {
        body: vec![expr_stmt(ident("ghost"))],
        ..Program::default()
    };
    let err = assert_err!(compile_with(&program, false));
    assert_eq!(err, CompileError::Unresolved("ghost".to_string()));
}

#[test]
fn test_less_than_swaps_operands() {
    let program = program(vec![expr_stmt(binary(BinaryOperator::LessThan, num(1.0), num(2.0)))]);
    let (code, _) = assert_ok!(compile_with(&program, true));
    assert!(contains(&opcodes(&code), &[Opcode::Swap, Opcode::Gt]));
}

#[test]
fn test_outer_variable_uses_bind() {
    let program = program(vec![
        let_decl("x", Some(num(1.0))),
        function("f", &[], vec![return_stmt(Some(ident("x")))]),
    ]);
    let (code, _) = assert_ok!(compile_with(&program, false));
    let ops = opcodes(&code);
    assert!(contains(&ops, &[Opcode::Push, Opcode::Push, Opcode::Bind, Opcode::Load]));
    assert!(ops.contains(&Opcode::Params));
    assert!(ops.contains(&Opcode::Function));
}

#[test]
fn test_function_declarations_are_hoisted() {
    let program = program(vec![
        expr_stmt(call(ident("f"), vec![])),
        function("f", &[], vec![]),
    ]);
    let (code, _) = assert_ok!(compile_with(&program, false));
    let ops = opcodes(&code);
    let closure = ops.iter().position(|op| *op == Opcode::Function);
    let call = ops.iter().position(|op| *op == Opcode::Call);
    assert!(closure < call);
}

#[test]
fn test_switch_case_functions_precede_case_tests() {
    let program = program(vec![switch(
        num(1.0),
        vec![(Some(num(1.0)), vec![function("f", &[], vec![])])],
    )]);
    let (code, _) = assert_ok!(compile_with(&program, false));
    let ops = opcodes(&code);
    let closures: Vec<_> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| **op == Opcode::Function)
        .map(|(i, _)| i)
        .collect();
    let test = ops.iter().position(|op| *op == Opcode::JmpTrue);
    assert_eq!(closures.len(), 1);
    assert!(Some(closures[0]) < test);
}

#[test]
fn test_arrow_closure() {
    let program = program(vec![expr_stmt(arrow_expr(&["a"], ident("a")))]);
    let (code, _) = assert_ok!(compile_with(&program, true));
    assert!(opcodes(&code).contains(&Opcode::ArrowFunction));
}

#[test]
fn test_illegal_break() {
    let bare = program(vec![break_stmt(None)]);
    assert_eq!(assert_err!(compile_with(&bare, false)), CompileError::IllegalBreak);

    let labeled = program(vec![while_loop(boolean(true), break_stmt(Some("outer")))]);
    assert_eq!(
        assert_err!(compile_with(&labeled, false)),
        CompileError::UndefinedLabel("outer".to_string())
    );
}

#[test]
fn test_continue_outside_loop() {
    let labeled_block = program(vec![labeled("l", block(vec![continue_stmt(Some("l"))]))]);
    assert_eq!(
        assert_err!(compile_with(&labeled_block, false)),
        CompileError::IllegalContinue
    );

    let in_switch = program(vec![switch(num(1.0), vec![(None, vec![continue_stmt(None)])])]);
    assert_eq!(
        assert_err!(compile_with(&in_switch, false)),
        CompileError::IllegalContinue
    );
}

#[test]
fn test_unsupported_constructs() {
    let with = Statement::With(WithStatement {
        object: num(1.0),
        body: Box::new(empty()),
    });
    assert_eq!(
        assert_err!(compile_with(&program(vec![with]), false)),
        CompileError::Unsupported("with statement")
    );

    let stray = program(vec![expr_stmt(spread(array(vec![])))]);
    assert!(matches!(
        assert_err!(compile_with(&stray, false)),
        CompileError::Unsupported(_)
    ));
}

#[test]
fn test_invalid_assignment_target() {
    let program = program(vec![expr_stmt(assign(num(1.0), num(2.0)))]);
    assert_eq!(
        assert_err!(compile_with(&program, false)),
        CompileError::InvalidAssignmentTarget
    );
}

#[test]
fn test_break_leaves_block_frames() {
    let program = program(vec![while_loop(
        boolean(true),
        block(vec![let_decl("y", None), break_stmt(None)]),
    )]);
    let (code, _) = assert_ok!(compile_with(&program, false));
    assert!(contains(&opcodes(&code), &[Opcode::LeaveScope, Opcode::Jmp]));
}

#[test]
fn test_return_through_finally_runs_it_inline() {
    let program = program(vec![function(
        "f",
        &[],
        vec![try_catch(
            vec![return_stmt(Some(num(1.0)))],
            None,
            Some(vec![expr_stmt(call(ident("log"), vec![]))]),
        )],
    )]);
    let (code, _) = assert_ok!(compile_with(&program, false));
    let ops = opcodes(&code);
    // One copy for the return, one for normal completion, one for rethrow
    assert_eq!(ops.iter().filter(|op| **op == Opcode::Call).count(), 3);
    assert!(contains(&ops, &[Opcode::Store, Opcode::Pop, Opcode::PopExcept]));
}

#[test]
fn test_try_catch_layout() {
    let program = program(vec![try_catch(
        vec![throw(num(1.0))],
        Some(("e", vec![expr_stmt(ident("e"))])),
        None,
    )]);
    let (code, _) = assert_ok!(compile_with(&program, false));
    let ops = opcodes(&code);
    assert!(contains(&ops, &[Opcode::PushExcept, Opcode::Push, Opcode::Throw, Opcode::PopExcept, Opcode::Jmp]));
    assert!(contains(&ops, &[Opcode::Top, Opcode::Params]));
}

#[test]
fn test_table_changes_encoding_only() {
    let program = program(vec![expr_stmt(binary(BinaryOperator::Multiply, num(6.0), num(7.0)))]);
    let options = CompileOptions::default();
    let canonical = OpcodeTable::canonical();
    let shuffled = OpcodeTable::seeded(11);
    let (a, _) = assert_ok!(compile(&program, &canonical, &options));
    let (b, _) = assert_ok!(compile(&program, &shuffled, &options));
    assert_eq!(a.len(), b.len());
    let decode = |code: &Bytecode, table: &OpcodeTable| {
        code.instructions(table)
            .map(|i| i.map(|i| i.opcode))
            .collect::<Result<Vec<_>, _>>()
            .unwrap_or_default()
    };
    assert_eq!(decode(&a, &canonical), decode(&b, &shuffled));
}
