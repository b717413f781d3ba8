// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Declaration analysis.
//!
//! Fills the [`Scope`] of every scope-introducing node and recomputes the
//! free names of a [`Program`]. The frames seen here mirror the frames the
//! code generator opens, so a name that is local for the analysis is also
//! local for the compiler.

use super::*;

impl Program {
    /// Computes every scope in the tree and the program's free names.
    ///
    /// Existing scope contents are discarded first, so the call is
    /// idempotent.
    pub fn analyze(&mut self) {
        let mut vars = Vec::new();
        let mut lexical = Scope::default();
        hoist_statements(&mut self.body, &mut vars, &mut lexical);
        self.scope = merge(vars, lexical);

        let mut free = FreeNames::default();
        free.push(self.scope.names().map(str::to_string).collect());
        free.statements(&self.body);
        self.globals = free.globals;
    }
}

impl Function {
    /// Computes the scopes of this function and everything nested in it.
    pub fn analyze(&mut self) {
        let mut vars = Vec::new();
        let mut lexical = Scope::default();
        match &mut self.body {
            FunctionBody::Block(body) => hoist_statements(body, &mut vars, &mut lexical),
            FunctionBody::Expression(expr) => hoist_expression(expr),
        }
        for param in &mut self.params {
            if let Some(default) = &mut param.default {
                hoist_expression(default);
            }
        }
        self.scope = merge(vars, lexical);
    }
}

fn merge(vars: Vec<String>, lexical: Scope) -> Scope {
    let mut scope = Scope::default();
    for name in vars.iter().chain(lexical.variables.iter()) {
        scope.declare_variable(name);
    }
    for name in &lexical.functions {
        scope.declare_function(name);
    }
    scope
}

fn push_var(vars: &mut Vec<String>, name: &str) {
    if !vars.iter().any(|n| n == name) {
        vars.push(name.to_string());
    }
}

fn declare(decl: &VariableDeclaration, vars: &mut Vec<String>, lexical: &mut Scope) {
    for declarator in &decl.declarations {
        match decl.kind {
            VariableKind::Var => push_var(vars, &declarator.id.name),
            VariableKind::Let | VariableKind::Const => lexical.declare_variable(&declarator.id.name),
        }
    }
}

fn hoist_statements(body: &mut [Statement], vars: &mut Vec<String>, lexical: &mut Scope) {
    for stmt in body {
        hoist_statement(stmt, vars, lexical);
    }
}

/// Nested block with its own lexical scope, sharing the enclosing var list.
fn hoist_block(block: &mut BlockStatement, vars: &mut Vec<String>) {
    let mut lexical = Scope::default();
    hoist_statements(&mut block.body, vars, &mut lexical);
    block.scope = lexical;
}

fn hoist_statement(stmt: &mut Statement, vars: &mut Vec<String>, lexical: &mut Scope) {
    match stmt {
        Statement::VariableDeclaration(decl) => {
            declare(decl, vars, lexical);
            for declarator in &mut decl.declarations {
                if let Some(init) = &mut declarator.init {
                    hoist_expression(init);
                }
            }
        }
        Statement::FunctionDeclaration(function) => {
            if let Some(id) = &function.id {
                lexical.declare_function(&id.name);
            }
            function.analyze();
        }
        Statement::Expression(expr) | Statement::Throw(expr) => hoist_expression(expr),
        Statement::Return(expr) => {
            if let Some(expr) = expr {
                hoist_expression(expr);
            }
        }
        Statement::Block(block) => hoist_block(block, vars),
        Statement::If(stmt) => {
            hoist_expression(&mut stmt.test);
            hoist_statement(&mut stmt.consequent, vars, lexical);
            if let Some(alternate) = &mut stmt.alternate {
                hoist_statement(alternate, vars, lexical);
            }
        }
        Statement::Switch(stmt) => {
            hoist_expression(&mut stmt.discriminant);
            let mut scope = Scope::default();
            for case in &mut stmt.cases {
                if let Some(test) = &mut case.test {
                    hoist_expression(test);
                }
                hoist_statements(&mut case.consequent, vars, &mut scope);
            }
            stmt.scope = scope;
        }
        Statement::While(stmt) => {
            hoist_expression(&mut stmt.test);
            hoist_statement(&mut stmt.body, vars, lexical);
        }
        Statement::DoWhile(stmt) => {
            hoist_statement(&mut stmt.body, vars, lexical);
            hoist_expression(&mut stmt.test);
        }
        Statement::For(stmt) => {
            let mut scope = Scope::default();
            match &mut stmt.init {
                Some(ForInit::Declaration(decl)) => {
                    declare(decl, vars, &mut scope);
                    for declarator in &mut decl.declarations {
                        if let Some(init) = &mut declarator.init {
                            hoist_expression(init);
                        }
                    }
                }
                Some(ForInit::Expression(expr)) => hoist_expression(expr),
                None => {}
            }
            for expr in [&mut stmt.test, &mut stmt.update].into_iter().flatten() {
                hoist_expression(expr);
            }
            hoist_statement(&mut stmt.body, vars, &mut scope);
            stmt.scope = scope;
        }
        Statement::ForIn(stmt) | Statement::ForOf(stmt) => {
            let mut scope = Scope::default();
            match &mut stmt.left {
                ForInLeft::Declaration(VariableKind::Var, id) => push_var(vars, &id.name),
                ForInLeft::Declaration(_, id) => scope.declare_variable(&id.name),
                ForInLeft::Expression(expr) => hoist_expression(expr),
            }
            hoist_expression(&mut stmt.right);
            hoist_statement(&mut stmt.body, vars, &mut scope);
            stmt.scope = scope;
        }
        Statement::Try(stmt) => {
            hoist_block(&mut stmt.block, vars);
            if let Some(handler) = &mut stmt.handler {
                let mut scope = Scope::default();
                hoist_statements(&mut handler.body, vars, &mut scope);
                handler.scope = scope;
            }
            if let Some(finalizer) = &mut stmt.finalizer {
                hoist_block(finalizer, vars);
            }
        }
        Statement::With(stmt) => {
            hoist_expression(&mut stmt.object);
            hoist_statement(&mut stmt.body, vars, lexical);
        }
        Statement::Labeled(stmt) => hoist_statement(&mut stmt.body, vars, lexical),
        Statement::Break(_) | Statement::Continue(_) | Statement::Debugger | Statement::Empty => {}
    }
}

/// Expressions declare nothing themselves but may contain functions.
fn hoist_expression(expr: &mut Expression) {
    match expr {
        Expression::Function(function) => function.analyze(),
        Expression::Array(elements) => {
            for element in elements.iter_mut().flatten() {
                hoist_expression(element);
            }
        }
        Expression::Object(properties) => {
            for property in properties {
                match property {
                    Property::Init { key, value } => {
                        if let PropertyKey::Computed(key) = key {
                            hoist_expression(key);
                        }
                        hoist_expression(value);
                    }
                    Property::Accessor { function, .. } => function.analyze(),
                    Property::Spread(expr) => hoist_expression(expr),
                }
            }
        }
        Expression::Unary(unary) => hoist_expression(&mut unary.argument),
        Expression::Update(update) => hoist_expression(&mut update.argument),
        Expression::Spread(inner) => hoist_expression(inner),
        Expression::Binary(binary) => {
            hoist_expression(&mut binary.left);
            hoist_expression(&mut binary.right);
        }
        Expression::Logical(logical) => {
            hoist_expression(&mut logical.left);
            hoist_expression(&mut logical.right);
        }
        Expression::Assignment(assign) => {
            hoist_expression(&mut assign.left);
            hoist_expression(&mut assign.right);
        }
        Expression::Conditional(cond) => {
            hoist_expression(&mut cond.test);
            hoist_expression(&mut cond.consequent);
            hoist_expression(&mut cond.alternate);
        }
        Expression::Call(call) | Expression::New(call) => {
            hoist_expression(&mut call.callee);
            for arg in &mut call.arguments {
                hoist_expression(arg);
            }
        }
        Expression::Member(member) => {
            hoist_expression(&mut member.object);
            if let MemberProperty::Expression(property) = &mut member.property {
                hoist_expression(property);
            }
        }
        Expression::Sequence(exprs) => {
            for expr in exprs {
                hoist_expression(expr);
            }
        }
        Expression::Literal(_) | Expression::Identifier(_) | Expression::This => {}
    }
}

/// Collects references that no enclosing frame declares.
#[derive(Default)]
struct FreeNames {
    frames: Vec<Vec<String>>,
    globals: Vec<String>,
}

impl FreeNames {
    fn push(&mut self, names: Vec<String>) {
        self.frames.push(names);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn with_scope(&mut self, scope: &Scope, f: impl FnOnce(&mut Self)) {
        if scope.is_empty() {
            f(self);
        } else {
            self.push(scope.names().map(str::to_string).collect());
            f(self);
            self.pop();
        }
    }

    fn reference(&mut self, name: &str) {
        let declared = self
            .frames
            .iter()
            .rev()
            .any(|frame| frame.iter().any(|n| n == name));
        if !declared && !self.globals.iter().any(|n| n == name) {
            self.globals.push(name.to_string());
        }
    }

    fn statements(&mut self, body: &[Statement]) {
        for stmt in body {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::VariableDeclaration(decl) => self.declaration(decl),
            Statement::FunctionDeclaration(function) => self.function(function),
            Statement::Expression(expr) | Statement::Throw(expr) => self.expression(expr),
            Statement::Return(expr) => {
                if let Some(expr) = expr {
                    self.expression(expr);
                }
            }
            Statement::Block(block) => {
                self.with_scope(&block.scope, |this| this.statements(&block.body))
            }
            Statement::If(stmt) => {
                self.expression(&stmt.test);
                self.statement(&stmt.consequent);
                if let Some(alternate) = &stmt.alternate {
                    self.statement(alternate);
                }
            }
            Statement::Switch(stmt) => self.with_scope(&stmt.scope, |this| {
                this.expression(&stmt.discriminant);
                for case in &stmt.cases {
                    if let Some(test) = &case.test {
                        this.expression(test);
                    }
                    this.statements(&case.consequent);
                }
            }),
            Statement::While(stmt) => {
                self.expression(&stmt.test);
                self.statement(&stmt.body);
            }
            Statement::DoWhile(stmt) => {
                self.statement(&stmt.body);
                self.expression(&stmt.test);
            }
            Statement::For(stmt) => self.with_scope(&stmt.scope, |this| {
                match &stmt.init {
                    Some(ForInit::Declaration(decl)) => this.declaration(decl),
                    Some(ForInit::Expression(expr)) => this.expression(expr),
                    None => {}
                }
                if let Some(test) = &stmt.test {
                    this.expression(test);
                }
                if let Some(update) = &stmt.update {
                    this.expression(update);
                }
                this.statement(&stmt.body);
            }),
            Statement::ForIn(stmt) | Statement::ForOf(stmt) => self.with_scope(&stmt.scope, |this| {
                this.expression(&stmt.right);
                match &stmt.left {
                    ForInLeft::Declaration(_, id) => this.reference(&id.name),
                    ForInLeft::Expression(expr) => this.expression(expr),
                }
                this.statement(&stmt.body);
            }),
            Statement::Try(stmt) => {
                self.with_scope(&stmt.block.scope, |this| this.statements(&stmt.block.body));
                if let Some(handler) = &stmt.handler {
                    let mut names: Vec<String> = handler.param.iter().map(|p| p.name.clone()).collect();
                    names.extend(handler.scope.names().map(str::to_string));
                    self.push(names);
                    self.statements(&handler.body);
                    self.pop();
                }
                if let Some(finalizer) = &stmt.finalizer {
                    self.with_scope(&finalizer.scope, |this| this.statements(&finalizer.body));
                }
            }
            Statement::With(stmt) => {
                self.expression(&stmt.object);
                self.statement(&stmt.body);
            }
            Statement::Labeled(stmt) => self.statement(&stmt.body),
            Statement::Break(_) | Statement::Continue(_) | Statement::Debugger | Statement::Empty => {}
        }
    }

    fn declaration(&mut self, decl: &VariableDeclaration) {
        for declarator in &decl.declarations {
            self.reference(&declarator.id.name);
            if let Some(init) = &declarator.init {
                self.expression(init);
            }
        }
    }

    fn function(&mut self, function: &Function) {
        let mut names = Vec::new();
        if function.kind == FunctionKind::Normal {
            names.push("arguments".to_string());
        }
        names.extend(function.params.iter().map(|p| p.name.name.clone()));
        names.extend(function.rest.iter().map(|r| r.name.clone()));
        names.extend(function.scope.names().map(str::to_string));
        self.push(names);
        for param in &function.params {
            if let Some(default) = &param.default {
                self.expression(default);
            }
        }
        match &function.body {
            FunctionBody::Block(body) => self.statements(body),
            FunctionBody::Expression(expr) => self.expression(expr),
        }
        self.pop();
    }

    fn expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Identifier(id) => self.reference(&id.name),
            Expression::Literal(Literal::RegExp { .. }) => self.reference("RegExp"),
            Expression::Literal(_) | Expression::This => {}
            Expression::Function(function) => self.function(function),
            Expression::Array(elements) => {
                for element in elements.iter().flatten() {
                    self.expression(element);
                }
            }
            Expression::Object(properties) => {
                for property in properties {
                    match property {
                        Property::Init { key, value } => {
                            if let PropertyKey::Computed(key) = key {
                                self.expression(key);
                            }
                            self.expression(value);
                        }
                        Property::Accessor { function, .. } => self.function(function),
                        Property::Spread(expr) => self.expression(expr),
                    }
                }
            }
            Expression::Unary(unary) => self.expression(&unary.argument),
            Expression::Update(update) => self.expression(&update.argument),
            Expression::Spread(inner) => self.expression(inner),
            Expression::Binary(binary) => {
                self.expression(&binary.left);
                self.expression(&binary.right);
            }
            Expression::Logical(logical) => {
                self.expression(&logical.left);
                self.expression(&logical.right);
            }
            Expression::Assignment(assign) => {
                self.expression(&assign.left);
                self.expression(&assign.right);
            }
            Expression::Conditional(cond) => {
                self.expression(&cond.test);
                self.expression(&cond.consequent);
                self.expression(&cond.alternate);
            }
            Expression::Call(call) | Expression::New(call) => {
                self.expression(&call.callee);
                for arg in &call.arguments {
                    self.expression(arg);
                }
            }
            Expression::Member(member) => {
                self.expression(&member.object);
                if let MemberProperty::Expression(property) = &member.property {
                    self.expression(property);
                }
            }
            Expression::Sequence(exprs) => {
                for expr in exprs {
                    self.expression(expr);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::build::*;
    use super::*;

    #[test]
    fn test_var_hoists_to_function() {
        let f = function(
            "f",
            &[],
            vec![block(vec![var_decl("x", Some(num(1.0))), let_decl("y", None)])],
        );
        let Statement::FunctionDeclaration(f) = f else {
            panic!("expected a function declaration");
        };
        assert_eq!(f.scope.variables, vec!["x".to_string()]);
        let FunctionBody::Block(body) = &f.body else {
            panic!("expected a block body");
        };
        let Statement::Block(inner) = &body[0] else {
            panic!("expected a block");
        };
        assert_eq!(inner.scope.variables, vec!["y".to_string()]);
    }

    #[test]
    fn test_globals_in_first_reference_order() {
        let p = program(vec![
            expr_stmt(call(ident("print"), vec![ident("b")])),
            expr_stmt(ident("a")),
            expr_stmt(ident("print")),
        ]);
        assert_eq!(p.globals, vec!["print", "b", "a"]);
    }

    #[test]
    fn test_declared_names_are_not_free() {
        let p = program(vec![
            let_decl("x", Some(num(1.0))),
            expr_stmt(ident("x")),
            expr_stmt(this()),
        ]);
        assert!(p.globals.is_empty());
        assert_eq!(p.scope.variables, vec!["x".to_string()]);
    }

    #[test]
    fn test_arguments_is_free_only_at_top_level() {
        let p = program(vec![
            function("f", &[], vec![return_stmt(Some(ident("arguments")))]),
            expr_stmt(ident("arguments")),
        ]);
        assert_eq!(p.globals, vec!["arguments"]);
        assert_eq!(p.scope.functions, vec!["f".to_string()]);
    }

    #[test]
    fn test_regexp_literal_references_constructor() {
        let p = program(vec![expr_stmt(regex("a+", "g"))]);
        assert_eq!(p.globals, vec!["RegExp"]);
    }

    #[test]
    fn test_for_let_binds_in_loop_scope() {
        let p = program(vec![for_loop(
            Some(let_init("i", num(0.0))),
            Some(binary(BinaryOperator::LessThan, ident("i"), num(3.0))),
            Some(postfix_inc(ident("i"))),
            empty(),
        )]);
        let Statement::For(stmt) = &p.body[0] else {
            panic!("expected a for statement");
        };
        assert_eq!(stmt.scope.variables, vec!["i".to_string()]);
        assert!(p.scope.is_empty());
        assert!(p.globals.is_empty());
    }

    #[test]
    fn test_catch_param_is_local() {
        let p = program(vec![try_catch(
            vec![throw(num(1.0))],
            Some(("e", vec![expr_stmt(ident("e"))])),
            None,
        )]);
        assert!(p.globals.is_empty());
    }
}
