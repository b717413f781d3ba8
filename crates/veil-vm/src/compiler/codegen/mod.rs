// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode generation.
//!
//! The generator walks the tree once. Every rule commits to one of two
//! stack contracts: statements leave the stack exactly as they found it,
//! expressions leave exactly one value on top. Names are resolved against
//! the compile-time frame stack, so the emitted code never looks anything
//! up by name.

mod control;
mod expressions;
pub mod scope;

#[cfg(test)]
mod tests;

use rustc_hash::FxHashSet;
use tracing::debug;

use self::control::Control;
use self::scope::{Frame, FrameKind, GlobalTable, Reference};
use super::assembler::Assembler;
use super::bytecode::{Bytecode, Word};
use super::opcode::{Opcode, OpcodeTable};
use crate::ast::*;
use crate::config::CompileOptions;
use crate::error::CompileError;

/// Compiles a program to bytecode and its global table.
///
/// Fails if a name cannot be resolved, a construct has no compilation
/// rule, or value-expression mode is requested for a program that is not
/// a single expression statement.
pub fn compile(
    program: &Program,
    table: &OpcodeTable,
    options: &CompileOptions,
) -> Result<(Bytecode, GlobalTable), CompileError> {
    let mut compiler = Compiler::new(table, program);
    if options.value_expression_mode {
        compiler.value_program(program)?;
    } else {
        compiler.program(program)?;
    }
    let Compiler { asm, globals, .. } = compiler;
    let code = asm.finish()?;
    debug!(
        words = code.len(),
        globals = globals.len(),
        value_mode = options.value_expression_mode,
        "compiled program"
    );
    Ok((code, globals))
}

/// The bytecode compiler.
pub struct Compiler<'a> {
    asm: Assembler<'a>,
    /// Lexical frames, outermost first
    scopes: Vec<Frame>,
    /// Control entries of the function being compiled
    control: Vec<Control<'a>>,
    /// Index into `scopes` of each enclosing function or program frame
    functions: Vec<usize>,
    /// Labels waiting for the statement they name
    pending_labels: Vec<String>,
    globals: GlobalTable,
    free_names: FxHashSet<&'a str>,
}

impl<'a> Compiler<'a> {
    fn new(table: &'a OpcodeTable, program: &'a Program) -> Self {
        Self {
            asm: Assembler::new(table),
            scopes: Vec::new(),
            control: Vec::new(),
            functions: Vec::new(),
            pending_labels: Vec::new(),
            globals: GlobalTable::new(),
            free_names: program.globals.iter().map(String::as_str).collect(),
        }
    }

    fn program(&mut self, program: &'a Program) -> Result<(), CompileError> {
        self.open_frame(FrameKind::Program, 1);
        self.declare_scope(&program.scope);
        self.functions.push(self.scopes.len() - 1);
        // Completion value when the program falls off its end
        self.asm.op(Opcode::Undefined);
        self.statement_list(&program.body)?;
        self.asm.op(Opcode::Halt);
        self.functions.pop();
        self.close_frame(false)
    }

    fn value_program(&mut self, program: &'a Program) -> Result<(), CompileError> {
        let [Statement::Expression(expr)] = program.body.as_slice() else {
            return Err(CompileError::ValueModeRequiresSingleExpression);
        };
        self.open_frame(FrameKind::Program, 1);
        self.declare_scope(&program.scope);
        self.functions.push(self.scopes.len() - 1);
        self.expression(expr)?;
        self.asm.op(Opcode::Halt);
        self.functions.pop();
        self.close_frame(false)
    }

    // ---- frames and names ----

    fn open_frame(&mut self, kind: FrameKind, first: usize) {
        let top_site = self.asm.op1(Opcode::Top, 0usize);
        self.scopes.push(Frame::new(kind, first, top_site));
    }

    fn close_frame(&mut self, leave: bool) -> Result<(), CompileError> {
        let frame = self
            .scopes
            .pop()
            .ok_or(CompileError::Internal("frame stack underflow"))?;
        self.asm.patch(frame.top_site, frame.top_operand());
        if leave {
            self.asm.op(Opcode::LeaveScope);
        }
        Ok(())
    }

    fn frame(&mut self) -> Result<&mut Frame, CompileError> {
        self.scopes
            .last_mut()
            .ok_or(CompileError::Internal("no open frame"))
    }

    fn declare_scope(&mut self, scope: &Scope) {
        if let Some(frame) = self.scopes.last_mut() {
            for name in scope.names() {
                frame.declare(name);
            }
        }
    }

    /// Opens a block frame if `scope` declares anything.
    fn open_block_scope(&mut self, scope: &Scope) -> bool {
        if scope.is_empty() {
            return false;
        }
        self.open_frame(FrameKind::Block, 1);
        self.declare_scope(scope);
        self.control.push(Control::Frame);
        true
    }

    fn close_block_scope(&mut self, opened: bool) -> Result<(), CompileError> {
        if opened {
            self.control.pop();
            self.close_frame(true)?;
        }
        Ok(())
    }

    fn resolve(&mut self, name: &str) -> Result<Reference, CompileError> {
        for (level, frame) in self.scopes.iter().rev().enumerate() {
            if let Some(slot) = frame.lookup(name) {
                return Ok(Reference::Local { level, slot });
            }
            if name == "arguments" && frame.kind == FrameKind::Function(FunctionKind::Normal) {
                return Ok(Reference::Local { level, slot: 1 });
            }
        }
        if self.free_names.contains(name) {
            return Ok(Reference::Global(self.globals.slot(name)));
        }
        Err(CompileError::Unresolved(name.to_string()))
    }

    fn emit_reference(&mut self, reference: Reference) {
        match reference {
            Reference::This => {
                self.asm.op1(Opcode::Push, 0usize);
                self.asm.op(Opcode::BindLocal);
            }
            Reference::Local { level: 0, slot } => {
                self.asm.op1(Opcode::Push, slot);
                self.asm.op(Opcode::BindLocal);
            }
            Reference::Local { level, slot } => {
                self.asm.op1(Opcode::Push, level);
                self.asm.op1(Opcode::Push, slot);
                self.asm.op(Opcode::Bind);
            }
            Reference::Global(slot) => {
                self.asm.op1(Opcode::Push, slot);
                self.asm.op(Opcode::BindGlobal);
            }
        }
    }

    fn emit_binding(&mut self, name: &str) -> Result<(), CompileError> {
        let reference = self.resolve(name)?;
        self.emit_reference(reference);
        Ok(())
    }

    /// Strings are emitted one masked code point per `CHAR`.
    fn emit_string(&mut self, value: &str) {
        self.asm.op(Opcode::String);
        for c in value.chars() {
            self.asm.op1(Opcode::Char, (c as u32 ^ 0x39) as usize);
        }
    }

    // ---- statements ----

    /// Compiles a statement list, function declarations first.
    fn statement_list(&mut self, body: &'a [Statement]) -> Result<(), CompileError> {
        self.hoist_functions(body)?;
        self.hoisted_statements(body)
    }

    /// Compiles a statement list whose function declarations were
    /// already hoisted.
    fn hoisted_statements(&mut self, body: &'a [Statement]) -> Result<(), CompileError> {
        for stmt in body {
            if !matches!(stmt, Statement::FunctionDeclaration(_)) {
                self.statement(stmt)?;
            }
        }
        Ok(())
    }

    fn hoist_functions(&mut self, body: &'a [Statement]) -> Result<(), CompileError> {
        for stmt in body {
            if let Statement::FunctionDeclaration(function) = stmt {
                let name = function
                    .id
                    .as_ref()
                    .ok_or(CompileError::Unsupported("anonymous function declaration"))?;
                self.emit_binding(&name.name)?;
                self.function(function)?;
                self.asm.op(Opcode::Store);
                self.asm.op(Opcode::Pop);
            }
        }
        Ok(())
    }

    fn statement(&mut self, stmt: &'a Statement) -> Result<(), CompileError> {
        if !matches!(
            stmt,
            Statement::Labeled(_)
                | Statement::For(_)
                | Statement::ForIn(_)
                | Statement::While(_)
                | Statement::DoWhile(_)
                | Statement::Switch(_)
        ) && !self.pending_labels.is_empty()
        {
            return self.labeled_block(stmt);
        }

        match stmt {
            Statement::VariableDeclaration(decl) => self.variable_declaration(decl),
            // Only reached as the unbraced body of `if`, a loop or a label
            Statement::FunctionDeclaration(_) => self.hoist_functions(std::slice::from_ref(stmt)),
            Statement::Expression(expr) => self.discard(expr),
            Statement::Block(block) => self.block(block),
            Statement::If(stmt) => self.if_statement(stmt),
            Statement::Switch(stmt) => self.switch_statement(stmt),
            Statement::While(stmt) => self.while_statement(stmt),
            Statement::DoWhile(stmt) => self.do_while_statement(stmt),
            Statement::For(stmt) => self.for_statement(stmt),
            Statement::ForIn(stmt) => self.for_in_statement(stmt),
            Statement::ForOf(_) => Err(CompileError::Unsupported("for-of statement")),
            Statement::Return(expr) => self.return_statement(expr.as_ref()),
            Statement::Break(label) => self.break_statement(label.as_deref()),
            Statement::Continue(label) => self.continue_statement(label.as_deref()),
            Statement::Throw(expr) => {
                self.expression(expr)?;
                self.asm.op(Opcode::Throw);
                Ok(())
            }
            Statement::Try(stmt) => self.try_statement(stmt),
            Statement::With(_) => Err(CompileError::Unsupported("with statement")),
            Statement::Labeled(stmt) => {
                self.pending_labels.push(stmt.label.clone());
                self.statement(&stmt.body)
            }
            Statement::Debugger | Statement::Empty => Ok(()),
        }
    }

    /// A labeled statement that is not a loop: only `break label` reaches it.
    fn labeled_block(&mut self, stmt: &'a Statement) -> Result<(), CompileError> {
        let labels = std::mem::take(&mut self.pending_labels);
        let end = self.asm.label();
        self.control.push(Control::Breakable {
            labels,
            break_label: end,
            continue_label: None,
            unlabeled: false,
        });
        let result = self.statement(stmt);
        self.control.pop();
        self.asm.bind(end);
        result
    }

    fn variable_declaration(&mut self, decl: &'a VariableDeclaration) -> Result<(), CompileError> {
        for declarator in &decl.declarations {
            let init = match (&declarator.init, decl.kind) {
                (Some(init), _) => Some(init),
                // `var x;` keeps the current value; `let x;` resets it
                (None, VariableKind::Var) => continue,
                (None, _) => None,
            };
            self.emit_binding(&declarator.id.name)?;
            match init {
                Some(init) => self.expression(init)?,
                None => self.asm.op(Opcode::Undefined),
            }
            self.asm.op(Opcode::Store);
            self.asm.op(Opcode::Pop);
        }
        Ok(())
    }

    fn block(&mut self, block: &'a BlockStatement) -> Result<(), CompileError> {
        let opened = self.open_block_scope(&block.scope);
        self.statement_list(&block.body)?;
        self.close_block_scope(opened)
    }

    fn if_statement(&mut self, stmt: &'a IfStatement) -> Result<(), CompileError> {
        let otherwise = self.asm.label();
        self.expression(&stmt.test)?;
        self.asm.op(Opcode::Not);
        self.asm.jump(Opcode::JmpTrue, otherwise);
        self.statement(&stmt.consequent)?;
        match &stmt.alternate {
            Some(alternate) => {
                let end = self.asm.label();
                self.asm.jump(Opcode::Jmp, end);
                self.asm.bind(otherwise);
                self.statement(alternate)?;
                self.asm.bind(end);
            }
            None => self.asm.bind(otherwise),
        }
        Ok(())
    }

    fn while_statement(&mut self, stmt: &'a WhileStatement) -> Result<(), CompileError> {
        let top = self.asm.here();
        let exit = self.asm.label();
        self.expression(&stmt.test)?;
        self.asm.op(Opcode::Not);
        self.asm.jump(Opcode::JmpTrue, exit);
        self.with_breakable(exit, Some(top), |c| c.statement(&stmt.body))?;
        self.asm.jump(Opcode::Jmp, top);
        self.asm.bind(exit);
        Ok(())
    }

    fn do_while_statement(&mut self, stmt: &'a DoWhileStatement) -> Result<(), CompileError> {
        let top = self.asm.here();
        let next = self.asm.label();
        let exit = self.asm.label();
        self.with_breakable(exit, Some(next), |c| c.statement(&stmt.body))?;
        self.asm.bind(next);
        self.expression(&stmt.test)?;
        self.asm.jump(Opcode::JmpTrue, top);
        self.asm.bind(exit);
        Ok(())
    }

    fn for_statement(&mut self, stmt: &'a ForStatement) -> Result<(), CompileError> {
        let labels = std::mem::take(&mut self.pending_labels);
        let opened = self.open_block_scope(&stmt.scope);
        match &stmt.init {
            Some(ForInit::Declaration(decl)) => self.variable_declaration(decl)?,
            Some(ForInit::Expression(expr)) => self.discard(expr)?,
            None => {}
        }
        let top = self.asm.here();
        let next = self.asm.label();
        let exit = self.asm.label();
        if let Some(test) = &stmt.test {
            self.expression(test)?;
            self.asm.op(Opcode::Not);
            self.asm.jump(Opcode::JmpTrue, exit);
        }
        self.pending_labels = labels;
        self.with_breakable(exit, Some(next), |c| c.statement(&stmt.body))?;
        self.asm.bind(next);
        if let Some(update) = &stmt.update {
            self.discard(update)?;
        }
        self.asm.jump(Opcode::Jmp, top);
        self.asm.bind(exit);
        self.close_block_scope(opened)
    }

    fn for_in_statement(&mut self, stmt: &'a ForInStatement) -> Result<(), CompileError> {
        let labels = std::mem::take(&mut self.pending_labels);
        let opened = self.open_block_scope(&stmt.scope);
        self.expression(&stmt.right)?;
        self.asm.op(Opcode::Properties);
        self.control.push(Control::Temporary);

        let next = self.asm.here();
        let body = self.asm.label();
        let exit = self.asm.label();
        self.asm.op(Opcode::Extract);
        self.asm.jump(Opcode::JmpTrue, body);
        self.asm.op(Opcode::Pop);
        self.asm.jump(Opcode::Jmp, exit);

        self.asm.bind(body);
        match &stmt.left {
            ForInLeft::Declaration(_, id) => self.emit_binding(&id.name)?,
            ForInLeft::Expression(expr) => self.reference(expr)?,
        }
        self.asm.op1(Opcode::Swap, -1i64);
        self.asm.op(Opcode::Store);
        self.asm.op(Opcode::Pop);
        self.pending_labels = labels;
        self.with_breakable(exit, Some(next), |c| c.statement(&stmt.body))?;
        self.asm.jump(Opcode::Jmp, next);

        self.asm.bind(exit);
        self.control.pop();
        self.asm.op(Opcode::Pop);
        self.close_block_scope(opened)
    }

    /// Cases are tested in source order with strict equality; bodies are
    /// laid out in source order so a case without `break` falls through.
    /// `default` is taken only after every case test failed, wherever it
    /// appears.
    fn switch_statement(&mut self, stmt: &'a SwitchStatement) -> Result<(), CompileError> {
        let labels = std::mem::take(&mut self.pending_labels);
        let opened = self.open_block_scope(&stmt.scope);
        for case in &stmt.cases {
            self.hoist_functions(&case.consequent)?;
        }
        self.expression(&stmt.discriminant)?;
        self.control.push(Control::Temporary);

        let exit = self.asm.label();
        let bodies: Vec<_> = stmt.cases.iter().map(|_| self.asm.label()).collect();
        for (case, &body) in stmt.cases.iter().zip(&bodies) {
            if let Some(test) = &case.test {
                self.asm.op(Opcode::Dup);
                self.expression(test)?;
                self.asm.op(Opcode::Identity);
                self.asm.jump(Opcode::JmpTrue, body);
            }
        }
        let fallback = stmt
            .cases
            .iter()
            .position(|case| case.test.is_none())
            .map_or(exit, |i| bodies[i]);
        self.asm.jump(Opcode::Jmp, fallback);

        self.pending_labels = labels;
        self.with_breakable(exit, None, |c| {
            for (case, &body) in stmt.cases.iter().zip(&bodies) {
                c.asm.bind(body);
                c.hoisted_statements(&case.consequent)?;
            }
            Ok(())
        })?;

        self.asm.bind(exit);
        self.control.pop();
        self.asm.op(Opcode::Pop);
        self.close_block_scope(opened)
    }

    fn return_statement(&mut self, value: Option<&'a Expression>) -> Result<(), CompileError> {
        let crosses_finally = self.control.iter().any(|entry| {
            matches!(
                entry,
                Control::Handler {
                    finalizer: Some(_),
                    ..
                }
            )
        });

        if !crosses_finally {
            match value {
                Some(value) => self.expression(value)?,
                None => self.asm.op(Opcode::Undefined),
            }
            // HALT drops frames and temporaries, exception frames need popping
            for entry in &self.control {
                if matches!(entry, Control::Handler { .. }) {
                    self.asm.op(Opcode::PopExcept);
                }
            }
            self.asm.op(Opcode::Halt);
            return Ok(());
        }

        // Park the value, run every crossed finally body, then halt with it
        let function = *self
            .functions
            .last()
            .ok_or(CompileError::Internal("return outside a function frame"))?;
        let slot = self.scopes[function].result_register();
        let level = self.scopes.len() - 1 - function;
        self.emit_reference(Reference::Local { level, slot });
        match value {
            Some(value) => self.expression(value)?,
            None => self.asm.op(Opcode::Undefined),
        }
        self.asm.op(Opcode::Store);
        self.asm.op(Opcode::Pop);
        self.unwind_to(0)?;
        // Every block frame is closed now, the function frame is innermost
        self.emit_reference(Reference::Local { level: 0, slot });
        self.asm.op(Opcode::Load);
        self.asm.op(Opcode::Halt);
        Ok(())
    }

    /// Layout:
    ///
    /// ```text
    ///     PUSHe catch, rethrow
    ///     <block>
    ///     POPe
    ///     JMP normal
    /// catch:
    ///     [PUSHe -1, rethrow]
    ///     TOP n; PARAMS 2, 1, 0
    ///     <handler body>
    ///     LEAVESCOPE
    ///     [POPe]
    /// normal:
    ///     <finally>
    ///     JMP end
    /// rethrow:
    ///     <finally>
    ///     THROW
    /// end:
    /// ```
    fn try_statement(&mut self, stmt: &'a TryStatement) -> Result<(), CompileError> {
        let finalizer = stmt.finalizer.as_ref();
        if stmt.handler.is_none() && finalizer.is_none() {
            return Err(CompileError::Unsupported("try without catch or finally"));
        }
        let catch = stmt.handler.as_ref().map(|_| self.asm.label());
        let rethrow = finalizer.map(|_| self.asm.label());
        let normal = self.asm.label();
        let scope_depth = self.scopes.len();

        self.asm.emit_targets(Opcode::PushExcept, &[catch, rethrow]);
        self.control.push(Control::Handler {
            finalizer,
            scope_depth,
        });
        self.block(&stmt.block)?;
        self.control.pop();
        self.asm.op(Opcode::PopExcept);
        self.asm.jump(Opcode::Jmp, normal);

        if let (Some(handler), Some(catch)) = (&stmt.handler, catch) {
            self.asm.bind(catch);
            if finalizer.is_some() {
                self.asm.emit_targets(Opcode::PushExcept, &[None, rethrow]);
                self.control.push(Control::Handler {
                    finalizer,
                    scope_depth,
                });
            }
            self.open_frame(FrameKind::Catch, 2);
            match &handler.param {
                Some(param) => self.frame()?.declare_fresh(&param.name),
                None => self.frame()?.allocate(),
            };
            self.declare_scope(&handler.scope);
            self.asm.emit(Opcode::Params, &[Word::from(2usize), Word::from(1usize), Word::from(0usize)]);
            self.control.push(Control::Frame);
            self.statement_list(&handler.body)?;
            self.control.pop();
            self.close_frame(true)?;
            if finalizer.is_some() {
                self.control.pop();
                self.asm.op(Opcode::PopExcept);
            }
        }

        self.asm.bind(normal);
        if let (Some(finalizer), Some(rethrow)) = (finalizer, rethrow) {
            let end = self.asm.label();
            self.block(finalizer)?;
            self.asm.jump(Opcode::Jmp, end);
            self.asm.bind(rethrow);
            // The pending exception sits on the stack while this copy runs
            self.control.push(Control::Temporary);
            self.block(finalizer)?;
            self.control.pop();
            self.asm.op(Opcode::Throw);
            self.asm.bind(end);
        }
        Ok(())
    }

    // ---- functions ----

    /// Emits the body out of line and leaves a closure on the stack.
    fn function(&mut self, function: &'a Function) -> Result<(), CompileError> {
        let over = self.asm.label();
        self.asm.jump(Opcode::Jmp, over);
        let entry = self.asm.here();

        let control = std::mem::take(&mut self.control);
        let labels = std::mem::take(&mut self.pending_labels);
        let first = match function.kind {
            FunctionKind::Normal => 2,
            FunctionKind::Arrow => 1,
        };
        self.open_frame(FrameKind::Function(function.kind), first);
        {
            let frame = self.frame()?;
            for param in &function.params {
                frame.declare_fresh(&param.name.name);
            }
            if let Some(rest) = &function.rest {
                frame.declare_fresh(&rest.name);
            }
        }
        self.declare_scope(&function.scope);
        self.functions.push(self.scopes.len() - 1);

        self.asm.emit(
            Opcode::Params,
            &[
                Word::from(first),
                Word::from(function.params.len()),
                Word::from(usize::from(function.rest.is_some())),
            ],
        );
        for (i, param) in function.params.iter().enumerate() {
            if let Some(default) = &param.default {
                self.default_parameter(first + i, default)?;
            }
        }
        match &function.body {
            FunctionBody::Block(body) => {
                self.statement_list(body)?;
                self.asm.op(Opcode::Undefined);
            }
            FunctionBody::Expression(expr) => self.expression(expr)?,
        }
        self.asm.op(Opcode::Halt);

        self.functions.pop();
        self.close_frame(false)?;
        self.control = control;
        self.pending_labels = labels;

        self.asm.bind(over);
        let op = match function.kind {
            FunctionKind::Normal => Opcode::Function,
            FunctionKind::Arrow => Opcode::ArrowFunction,
        };
        self.asm.jump(op, entry);
        Ok(())
    }

    /// `if (param === undefined) param = default`
    fn default_parameter(&mut self, slot: usize, default: &'a Expression) -> Result<(), CompileError> {
        let skip = self.asm.label();
        let param = Reference::Local { level: 0, slot };
        self.emit_reference(param);
        self.asm.op(Opcode::Load);
        self.asm.op(Opcode::Undefined);
        self.asm.op(Opcode::Identity);
        self.asm.op(Opcode::Not);
        self.asm.jump(Opcode::JmpTrue, skip);
        self.emit_reference(param);
        self.expression(default)?;
        self.asm.op(Opcode::Store);
        self.asm.op(Opcode::Pop);
        self.asm.bind(skip);
        Ok(())
    }
}
