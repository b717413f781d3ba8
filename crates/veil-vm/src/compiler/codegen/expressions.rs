// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation.

use super::scope::Reference;
use super::Compiler;
use crate::ast::*;
use crate::compiler::opcode::Opcode;
use crate::error::CompileError;

impl<'a> Compiler<'a> {
    /// Compiles `expr`, leaving its value on the stack.
    pub(super) fn expression(&mut self, expr: &'a Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Literal(literal) => self.literal(literal),
            Expression::Identifier(id) => {
                self.emit_binding(&id.name)?;
                self.asm.op(Opcode::Load);
                Ok(())
            }
            Expression::This => {
                self.emit_reference(Reference::This);
                self.asm.op(Opcode::Load);
                Ok(())
            }
            Expression::Array(elements) => {
                for element in elements {
                    match element {
                        None => self.asm.op(Opcode::Undefined),
                        Some(element) => self.argument(element)?,
                    }
                }
                self.asm.op1(Opcode::Array, elements.len());
                Ok(())
            }
            Expression::Object(properties) => self.object(properties),
            Expression::Function(function) => self.function(function),
            Expression::Unary(unary) => self.unary(unary),
            Expression::Update(update) => self.update(update, true),
            Expression::Binary(binary) => {
                self.expression(&binary.left)?;
                self.expression(&binary.right)?;
                self.binary_operator(binary.operator);
                Ok(())
            }
            Expression::Logical(logical) => {
                self.expression(&logical.left)?;
                self.short_circuit(logical.operator, &logical.right)
            }
            Expression::Assignment(assignment) => self.assignment(assignment),
            Expression::Conditional(conditional) => {
                let consequent = self.asm.label();
                let end = self.asm.label();
                self.expression(&conditional.test)?;
                self.asm.jump(Opcode::JmpTrue, consequent);
                self.expression(&conditional.alternate)?;
                self.asm.jump(Opcode::Jmp, end);
                self.asm.bind(consequent);
                self.expression(&conditional.consequent)?;
                self.asm.bind(end);
                Ok(())
            }
            Expression::Call(call) => {
                // A member callee stays a locator so the call sees its receiver
                match call.callee.as_ref() {
                    callee @ Expression::Member(_) => self.reference(callee)?,
                    callee => self.expression(callee)?,
                }
                let argc = self.arguments(&call.arguments)?;
                self.asm.op1(Opcode::Call, argc);
                Ok(())
            }
            Expression::New(call) => {
                self.expression(&call.callee)?;
                let argc = self.arguments(&call.arguments)?;
                self.asm.op1(Opcode::New, argc);
                Ok(())
            }
            Expression::Member(member) => {
                self.member(member)?;
                self.asm.op(Opcode::Load);
                Ok(())
            }
            Expression::Sequence(expressions) => match expressions.split_last() {
                Some((last, rest)) => {
                    for expr in rest {
                        self.discard(expr)?;
                    }
                    self.expression(last)
                }
                None => {
                    self.asm.op(Opcode::Undefined);
                    Ok(())
                }
            },
            Expression::Spread(_) => Err(CompileError::Unsupported("spread outside a call or array")),
        }
    }

    /// Compiles `expr` for its side effects only.
    pub(super) fn discard(&mut self, expr: &'a Expression) -> Result<(), CompileError> {
        match expr {
            // The old value is not needed, the prefix form is shorter
            Expression::Update(update) => self.update(update, false)?,
            _ => self.expression(expr)?,
        }
        self.asm.op(Opcode::Pop);
        Ok(())
    }

    /// Compiles an assignment target, leaving a binding or locator.
    pub(super) fn reference(&mut self, expr: &'a Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Identifier(id) => self.emit_binding(&id.name),
            Expression::Member(member) => self.member(member),
            _ => Err(CompileError::InvalidAssignmentTarget),
        }
    }

    fn member(&mut self, member: &'a MemberExpression) -> Result<(), CompileError> {
        // ACCESS dereferences the base itself and remembers whether it
        // came from a global binding
        match member.object.as_ref() {
            object @ (Expression::Identifier(_) | Expression::Member(_)) => self.reference(object)?,
            object => self.expression(object)?,
        }
        match &member.property {
            MemberProperty::Identifier(name) => self.emit_string(name),
            MemberProperty::Expression(key) => self.expression(key)?,
        }
        self.asm.op(Opcode::Access);
        Ok(())
    }

    fn literal(&mut self, literal: &'a Literal) -> Result<(), CompileError> {
        match literal {
            Literal::Number(n) => {
                self.asm.op1(Opcode::Push, *n);
            }
            Literal::String(s) => self.emit_string(s),
            Literal::Boolean(true) => self.asm.op(Opcode::True),
            Literal::Boolean(false) => self.asm.op(Opcode::False),
            Literal::Null => self.asm.op(Opcode::Null),
            Literal::Undefined => self.asm.op(Opcode::Undefined),
            Literal::RegExp { pattern, flags } => {
                self.emit_binding("RegExp")?;
                self.asm.op(Opcode::Load);
                self.emit_string(pattern);
                self.emit_string(flags);
                self.asm.op1(Opcode::New, 2usize);
            }
        }
        Ok(())
    }

    fn object(&mut self, properties: &'a [Property]) -> Result<(), CompileError> {
        self.asm.op(Opcode::Object);
        for property in properties {
            let (key, value) = match property {
                Property::Init { key, value } => (key, value),
                Property::Accessor { .. } => {
                    return Err(CompileError::Unsupported("accessor property"))
                }
                Property::Spread(_) => return Err(CompileError::Unsupported("object spread")),
            };
            self.asm.op(Opcode::Dup);
            match key {
                PropertyKey::Named(name) => self.emit_string(name),
                PropertyKey::Number(n) => {
                    self.asm.op1(Opcode::Push, *n);
                }
                PropertyKey::Computed(expr) => self.expression(expr)?,
            }
            self.asm.op(Opcode::Access);
            self.expression(value)?;
            self.asm.op(Opcode::Store);
            self.asm.op(Opcode::Pop);
        }
        Ok(())
    }

    /// A call or array argument; spread arguments expand in place.
    fn argument(&mut self, expr: &'a Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Spread(inner) => {
                self.expression(inner)?;
                self.asm.op(Opcode::Expansion);
                Ok(())
            }
            _ => self.expression(expr),
        }
    }

    fn arguments(&mut self, arguments: &'a [Expression]) -> Result<usize, CompileError> {
        for argument in arguments {
            self.argument(argument)?;
        }
        Ok(arguments.len())
    }

    fn unary(&mut self, unary: &'a UnaryExpression) -> Result<(), CompileError> {
        match unary.operator {
            UnaryOperator::Typeof => {
                // An undeclared global must not throw under typeof
                match unary.argument.as_ref() {
                    arg @ Expression::Identifier(_) => self.reference(arg)?,
                    arg => self.expression(arg)?,
                }
                self.asm.op(Opcode::TypeOf);
            }
            UnaryOperator::Delete => match unary.argument.as_ref() {
                arg @ Expression::Member(_) => {
                    self.reference(arg)?;
                    self.asm.op(Opcode::Delete);
                }
                arg => {
                    self.expression(arg)?;
                    self.asm.op(Opcode::Pop);
                    self.asm.op(Opcode::True);
                }
            },
            UnaryOperator::Void => {
                self.expression(&unary.argument)?;
                self.asm.op(Opcode::Pop);
                self.asm.op(Opcode::Undefined);
            }
            operator => {
                self.expression(&unary.argument)?;
                self.asm.op(match operator {
                    UnaryOperator::Minus => Opcode::Minus,
                    UnaryOperator::Plus => Opcode::Plus,
                    UnaryOperator::LogicalNot => Opcode::Not,
                    _ => Opcode::BitNot,
                });
            }
        }
        Ok(())
    }

    pub(super) fn binary_operator(&mut self, operator: BinaryOperator) {
        use BinaryOperator::*;
        let op = match operator {
            Add => Opcode::Add,
            Subtract => Opcode::Sub,
            Multiply => Opcode::Mul,
            Divide => Opcode::Div,
            Modulo => Opcode::Mod,
            Exponent => Opcode::Pow,
            Equal | NotEqual => Opcode::Eq,
            StrictEqual | StrictNotEqual => Opcode::Identity,
            GreaterThan => Opcode::Gt,
            GreaterThanEqual => Opcode::Ge,
            LessThan | LessThanEqual => {
                // a < b is b > a
                self.asm.op1(Opcode::Swap, -1i64);
                if operator == LessThan {
                    Opcode::Gt
                } else {
                    Opcode::Ge
                }
            }
            BitwiseAnd => Opcode::And,
            BitwiseOr => Opcode::Or,
            BitwiseXor => Opcode::Xor,
            LeftShift => Opcode::Sal,
            RightShift => Opcode::Sar,
            UnsignedRightShift => Opcode::Shr,
            In => Opcode::In,
            InstanceOf => Opcode::InstanceOf,
        };
        self.asm.op(op);
        if matches!(operator, NotEqual | StrictNotEqual) {
            self.asm.op(Opcode::Not);
        }
    }

    /// With the left operand on the stack, compiles the right operand so
    /// that exactly one of them remains.
    fn short_circuit(&mut self, operator: LogicalOperator, right: &'a Expression) -> Result<(), CompileError> {
        let end = self.asm.label();
        match operator {
            LogicalOperator::Or => {
                self.asm.jump(Opcode::JmpPeekTrue, end);
            }
            LogicalOperator::And => {
                let rhs = self.asm.label();
                self.asm.jump(Opcode::JmpPeekTrue, rhs);
                self.asm.jump(Opcode::Jmp, end);
                self.asm.bind(rhs);
            }
            LogicalOperator::Nullish => {
                let rhs = self.asm.label();
                self.asm.op(Opcode::Dup);
                self.asm.op(Opcode::Null);
                self.asm.op(Opcode::Eq);
                self.asm.jump(Opcode::JmpTrue, rhs);
                self.asm.jump(Opcode::Jmp, end);
                self.asm.bind(rhs);
            }
        }
        self.asm.op(Opcode::Pop);
        self.expression(right)?;
        self.asm.bind(end);
        Ok(())
    }

    fn assignment(&mut self, assignment: &'a AssignmentExpression) -> Result<(), CompileError> {
        self.reference(&assignment.left)?;
        match assignment.operator {
            AssignmentOperator::Assign => {
                self.expression(&assignment.right)?;
                self.asm.op(Opcode::Store);
            }
            AssignmentOperator::Compound(operator) => {
                self.asm.op(Opcode::Dup);
                self.asm.op(Opcode::Load);
                self.expression(&assignment.right)?;
                self.binary_operator(operator);
                self.asm.op(Opcode::Store);
            }
            AssignmentOperator::Logical(operator) => {
                // [target, current]; either keep current or store right
                let assign = self.asm.label();
                let keep = self.asm.label();
                let end = self.asm.label();
                self.asm.op(Opcode::Dup);
                self.asm.op(Opcode::Load);
                match operator {
                    LogicalOperator::And => {
                        self.asm.jump(Opcode::JmpPeekTrue, assign);
                        self.asm.jump(Opcode::Jmp, keep);
                    }
                    LogicalOperator::Or => {
                        self.asm.jump(Opcode::JmpPeekTrue, keep);
                    }
                    LogicalOperator::Nullish => {
                        self.asm.op(Opcode::Dup);
                        self.asm.op(Opcode::Null);
                        self.asm.op(Opcode::Eq);
                        self.asm.jump(Opcode::JmpTrue, assign);
                        self.asm.jump(Opcode::Jmp, keep);
                    }
                }
                self.asm.bind(assign);
                self.asm.op(Opcode::Pop);
                self.expression(&assignment.right)?;
                self.asm.op(Opcode::Store);
                self.asm.jump(Opcode::Jmp, end);
                self.asm.bind(keep);
                self.asm.op1(Opcode::Swap, -1i64);
                self.asm.op(Opcode::Pop);
                self.asm.bind(end);
            }
        }
        Ok(())
    }

    /// `keep_old` selects postfix semantics: the value before the update.
    fn update(&mut self, update: &'a UpdateExpression, keep_old: bool) -> Result<(), CompileError> {
        let postfix = keep_old && !update.prefix;
        self.reference(&update.argument)?;
        self.asm.op(Opcode::Dup);
        self.asm.op(Opcode::Load);
        self.asm.op(Opcode::Plus);
        if postfix {
            // [target, old] -> [old, target, old]
            self.asm.op(Opcode::Dup);
            self.asm.op1(Opcode::Swap, -2i64);
            self.asm.op1(Opcode::Swap, -1i64);
        }
        self.asm.op1(Opcode::Push, 1usize);
        self.asm.op(match update.operator {
            UpdateOperator::Increment => Opcode::Add,
            UpdateOperator::Decrement => Opcode::Sub,
        });
        self.asm.op(Opcode::Store);
        if postfix {
            self.asm.op(Opcode::Pop);
        }
        Ok(())
    }
}
