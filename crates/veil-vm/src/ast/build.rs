// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Constructor helpers for assembling trees without a parser.
//!
//! ```
//! use veil_vm::ast::build::*;
//! use veil_vm::ast::BinaryOperator;
//!
//! // let x = 1; return x + 2;
//! let program = program(vec![
//!     let_decl("x", Some(num(1.0))),
//!     return_stmt(Some(binary(BinaryOperator::Add, ident("x"), num(2.0)))),
//! ]);
//! assert_eq!(program.scope.variables, vec!["x".to_string()]);
//! ```

use super::*;

/// Builds a program and runs declaration analysis over it.
pub fn program(body: Vec<Statement>) -> Program {
    let mut program = Program {
        body,
        ..Program::default()
    };
    program.analyze();
    program
}

/// Numeric literal.
pub fn num(value: f64) -> Expression {
    Expression::Literal(Literal::Number(value))
}

/// String literal.
pub fn string(value: &str) -> Expression {
    Expression::Literal(Literal::String(value.to_string()))
}

/// Boolean literal.
pub fn boolean(value: bool) -> Expression {
    Expression::Literal(Literal::Boolean(value))
}

/// `null`.
pub fn null() -> Expression {
    Expression::Literal(Literal::Null)
}

/// `undefined` as a literal, not the global binding.
pub fn undefined() -> Expression {
    Expression::Literal(Literal::Undefined)
}

/// Regular expression literal.
pub fn regex(pattern: &str, flags: &str) -> Expression {
    Expression::Literal(Literal::RegExp {
        pattern: pattern.to_string(),
        flags: flags.to_string(),
    })
}

/// Identifier reference.
pub fn ident(name: &str) -> Expression {
    Expression::Identifier(Identifier::new(name))
}

/// `this`.
pub fn this() -> Expression {
    Expression::This
}

/// Binary expression.
pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// Short-circuit expression.
pub fn logical(operator: LogicalOperator, left: Expression, right: Expression) -> Expression {
    Expression::Logical(LogicalExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// Unary expression.
pub fn unary(operator: UnaryOperator, argument: Expression) -> Expression {
    Expression::Unary(UnaryExpression {
        operator,
        argument: Box::new(argument),
    })
}

/// `left = right`.
pub fn assign(left: Expression, right: Expression) -> Expression {
    assign_op(AssignmentOperator::Assign, left, right)
}

/// `left op= right`.
pub fn compound_assign(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    assign_op(AssignmentOperator::Compound(operator), left, right)
}

/// Assignment with an explicit operator.
pub fn assign_op(operator: AssignmentOperator, left: Expression, right: Expression) -> Expression {
    Expression::Assignment(AssignmentExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn update(operator: UpdateOperator, argument: Expression, prefix: bool) -> Expression {
    Expression::Update(UpdateExpression {
        operator,
        argument: Box::new(argument),
        prefix,
    })
}

/// `++x`.
pub fn prefix_inc(argument: Expression) -> Expression {
    update(UpdateOperator::Increment, argument, true)
}

/// `--x`.
pub fn prefix_dec(argument: Expression) -> Expression {
    update(UpdateOperator::Decrement, argument, true)
}

/// `x++`.
pub fn postfix_inc(argument: Expression) -> Expression {
    update(UpdateOperator::Increment, argument, false)
}

/// `x--`.
pub fn postfix_dec(argument: Expression) -> Expression {
    update(UpdateOperator::Decrement, argument, false)
}

/// `test ? consequent : alternate`.
pub fn conditional(test: Expression, consequent: Expression, alternate: Expression) -> Expression {
    Expression::Conditional(ConditionalExpression {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
    })
}

/// Comma sequence.
pub fn sequence(exprs: Vec<Expression>) -> Expression {
    Expression::Sequence(exprs)
}

/// Function call.
pub fn call(callee: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::Call(CallExpression {
        callee: Box::new(callee),
        arguments,
    })
}

/// `new callee(arguments)`.
pub fn new(callee: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::New(CallExpression {
        callee: Box::new(callee),
        arguments,
    })
}

/// `object.property`.
pub fn member(object: Expression, property: &str) -> Expression {
    Expression::Member(MemberExpression {
        object: Box::new(object),
        property: MemberProperty::Identifier(property.to_string()),
    })
}

/// `object[property]`.
pub fn index(object: Expression, property: Expression) -> Expression {
    Expression::Member(MemberExpression {
        object: Box::new(object),
        property: MemberProperty::Expression(Box::new(property)),
    })
}

/// `object.method(arguments)`.
pub fn method_call(object: Expression, method: &str, arguments: Vec<Expression>) -> Expression {
    call(member(object, method), arguments)
}

/// `...argument`.
pub fn spread(argument: Expression) -> Expression {
    Expression::Spread(Box::new(argument))
}

/// Array literal without holes.
pub fn array(elements: Vec<Expression>) -> Expression {
    Expression::Array(elements.into_iter().map(Some).collect())
}

/// Object literal with named keys.
pub fn object(properties: Vec<(&str, Expression)>) -> Expression {
    Expression::Object(
        properties
            .into_iter()
            .map(|(key, value)| Property::Init {
                key: PropertyKey::Named(key.to_string()),
                value,
            })
            .collect(),
    )
}

/// Formal parameter without a default.
pub fn param(name: &str) -> Param {
    Param {
        name: Identifier::new(name),
        default: None,
    }
}

/// Formal parameter with a default value.
pub fn param_default(name: &str, default: Expression) -> Param {
    Param {
        name: Identifier::new(name),
        default: Some(default),
    }
}

fn make_function(
    kind: FunctionKind,
    name: Option<&str>,
    params: Vec<Param>,
    rest: Option<&str>,
    body: FunctionBody,
) -> Function {
    let mut function = Function {
        kind,
        id: name.map(Identifier::new),
        params,
        rest: rest.map(Identifier::new),
        body,
        scope: Scope::default(),
    };
    function.analyze();
    function
}

/// `function name(params) { body }` as a declaration.
pub fn function(name: &str, params: &[&str], body: Vec<Statement>) -> Statement {
    function_with(name, params.iter().map(|p| param(p)).collect(), None, body)
}

/// Function declaration with defaults and an optional rest parameter.
pub fn function_with(name: &str, params: Vec<Param>, rest: Option<&str>, body: Vec<Statement>) -> Statement {
    Statement::FunctionDeclaration(make_function(
        FunctionKind::Normal,
        Some(name),
        params,
        rest,
        FunctionBody::Block(body),
    ))
}

/// Anonymous `function (params) { body }` expression.
pub fn function_expr(params: &[&str], body: Vec<Statement>) -> Expression {
    Expression::Function(Box::new(make_function(
        FunctionKind::Normal,
        None,
        params.iter().map(|p| param(p)).collect(),
        None,
        FunctionBody::Block(body),
    )))
}

/// `(params) => { body }`.
pub fn arrow(params: &[&str], body: Vec<Statement>) -> Expression {
    Expression::Function(Box::new(make_function(
        FunctionKind::Arrow,
        None,
        params.iter().map(|p| param(p)).collect(),
        None,
        FunctionBody::Block(body),
    )))
}

/// `(params) => expr`.
pub fn arrow_expr(params: &[&str], body: Expression) -> Expression {
    Expression::Function(Box::new(make_function(
        FunctionKind::Arrow,
        None,
        params.iter().map(|p| param(p)).collect(),
        None,
        FunctionBody::Expression(Box::new(body)),
    )))
}

fn declaration(kind: VariableKind, name: &str, init: Option<Expression>) -> VariableDeclaration {
    VariableDeclaration {
        kind,
        declarations: vec![VariableDeclarator {
            id: Identifier::new(name),
            init,
        }],
    }
}

/// `let name = init;`
pub fn let_decl(name: &str, init: Option<Expression>) -> Statement {
    Statement::VariableDeclaration(declaration(VariableKind::Let, name, init))
}

/// `const name = init;`
pub fn const_decl(name: &str, init: Expression) -> Statement {
    Statement::VariableDeclaration(declaration(VariableKind::Const, name, Some(init)))
}

/// `var name = init;`
pub fn var_decl(name: &str, init: Option<Expression>) -> Statement {
    Statement::VariableDeclaration(declaration(VariableKind::Var, name, init))
}

/// `let name = init` as a for-loop initializer.
pub fn let_init(name: &str, init: Expression) -> ForInit {
    ForInit::Declaration(declaration(VariableKind::Let, name, Some(init)))
}

/// `var name = init` as a for-loop initializer.
pub fn var_init(name: &str, init: Expression) -> ForInit {
    ForInit::Declaration(declaration(VariableKind::Var, name, Some(init)))
}

/// Expression statement.
pub fn expr_stmt(expr: Expression) -> Statement {
    Statement::Expression(expr)
}

/// `return expr;`
pub fn return_stmt(expr: Option<Expression>) -> Statement {
    Statement::Return(expr)
}

/// `throw expr;`
pub fn throw(expr: Expression) -> Statement {
    Statement::Throw(expr)
}

/// `break;` or `break label;`
pub fn break_stmt(label: Option<&str>) -> Statement {
    Statement::Break(label.map(str::to_string))
}

/// `continue;` or `continue label;`
pub fn continue_stmt(label: Option<&str>) -> Statement {
    Statement::Continue(label.map(str::to_string))
}

/// `;`
pub fn empty() -> Statement {
    Statement::Empty
}

/// `{ body }`
pub fn block(body: Vec<Statement>) -> Statement {
    Statement::Block(block_statement(body))
}

fn block_statement(body: Vec<Statement>) -> BlockStatement {
    BlockStatement {
        body,
        scope: Scope::default(),
    }
}

/// `if (test) consequent else alternate`
pub fn if_stmt(test: Expression, consequent: Statement, alternate: Option<Statement>) -> Statement {
    Statement::If(IfStatement {
        test,
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    })
}

/// `while (test) body`
pub fn while_loop(test: Expression, body: Statement) -> Statement {
    Statement::While(WhileStatement {
        test,
        body: Box::new(body),
    })
}

/// `do body while (test)`
pub fn do_while(body: Statement, test: Expression) -> Statement {
    Statement::DoWhile(DoWhileStatement {
        body: Box::new(body),
        test,
    })
}

/// `for (init; test; update) body`
pub fn for_loop(
    init: Option<ForInit>,
    test: Option<Expression>,
    update: Option<Expression>,
    body: Statement,
) -> Statement {
    Statement::For(ForStatement {
        init,
        test,
        update,
        body: Box::new(body),
        scope: Scope::default(),
    })
}

/// `for (let name in right) body`
pub fn for_in(name: &str, right: Expression, body: Statement) -> Statement {
    Statement::ForIn(ForInStatement {
        left: ForInLeft::Declaration(VariableKind::Let, Identifier::new(name)),
        right,
        body: Box::new(body),
        scope: Scope::default(),
    })
}

/// `switch (discriminant) { cases }`, a `None` test marks `default`.
pub fn switch(discriminant: Expression, cases: Vec<(Option<Expression>, Vec<Statement>)>) -> Statement {
    Statement::Switch(SwitchStatement {
        discriminant,
        cases: cases
            .into_iter()
            .map(|(test, consequent)| SwitchCase { test, consequent })
            .collect(),
        scope: Scope::default(),
    })
}

/// `try { block } catch (param) { body } finally { finalizer }`
pub fn try_catch(
    block: Vec<Statement>,
    handler: Option<(&str, Vec<Statement>)>,
    finalizer: Option<Vec<Statement>>,
) -> Statement {
    Statement::Try(TryStatement {
        block: block_statement(block),
        handler: handler.map(|(param, body)| CatchClause {
            param: Some(Identifier::new(param)),
            body,
            scope: Scope::default(),
        }),
        finalizer: finalizer.map(block_statement),
    })
}

/// `label: body`
pub fn labeled(label: &str, body: Statement) -> Statement {
    Statement::Labeled(LabeledStatement {
        label: label.to_string(),
        body: Box::new(body),
    })
}
