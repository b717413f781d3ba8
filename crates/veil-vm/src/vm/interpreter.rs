// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace};

use super::Image;
use super::array_methods::call_array_method;
use super::call::{call_function, call_value, construct};
use super::comparison::{abstract_equals, greater, strict_equals};
use super::number_methods::call_number_method;
use super::operators::{add, arithmetic, has_property, instance_of};
use super::stack::{fresh_cell, Binding, Cell, Handler, Incoming, Locator, Slot};
use super::string_methods::call_string_method;
use crate::ast::FunctionKind;
use crate::compiler::{Instruction, Opcode, Word};
use crate::error::RuntimeError;
use crate::runtime::object::array_index;
use crate::runtime::{Closure, FunctionRef, Value};

/// What the main loop does after an instruction.
enum Flow {
    Continue,
    Halt,
}

/// One invocation: the top-level program or a single closure call.
pub(crate) struct Interpreter {
    image: Arc<Image>,
    stack: Vec<Slot>,
    /// Stack offsets where each open frame's registers begin
    frames: Vec<usize>,
    handlers: Vec<Handler>,
    ip: isize,
    /// Offset of the instruction being executed
    at: usize,
    /// Frame count on entry; the invocation's own frame is the next one
    base_depth: usize,
    pending: Option<Incoming>,
    depth: usize,
}

impl Interpreter {
    /// An interpreter for the top-level program.
    pub fn new(image: Arc<Image>) -> Self {
        Self {
            image,
            // Top-level HALT returns to -1, which ends the loop
            stack: vec![Slot::ReturnAddress(-1)],
            frames: Vec::new(),
            handlers: Vec::new(),
            ip: 0,
            at: 0,
            base_depth: 0,
            pending: None,
            depth: 0,
        }
    }

    /// An interpreter resuming a closure's captured state at the call
    /// trampoline.
    pub fn resume(closure: &Closure, depth: usize) -> Self {
        Self {
            image: Arc::clone(&closure.image),
            stack: closure.stack.clone(),
            frames: closure.frames.clone(),
            handlers: Vec::new(),
            ip: closure.image.trampoline as isize,
            at: closure.image.trampoline,
            base_depth: closure.frames.len(),
            pending: None,
            depth,
        }
    }

    pub fn push(&mut self, slot: Slot) {
        self.stack.push(slot);
    }

    /// Runs until `HALT` returns from this invocation or the instruction
    /// pointer leaves the stream, then yields the value on top.
    pub fn execute(&mut self) -> Result<Value, RuntimeError> {
        let image = Arc::clone(&self.image);
        let end = image.code.len() as isize;
        while (0..end).contains(&self.ip) {
            self.at = self.ip as usize;
            let instruction = image.code.decode_at(&image.table, self.at)?;
            self.ip = (self.at + 1 + instruction.operands.len()) as isize;
            trace!(ip = self.at, op = %instruction.opcode, depth = self.depth, "execute");

            match self.dispatch(&instruction) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => break,
                Err(RuntimeError::Thrown(value)) => self.land(value)?,
                Err(err) => return Err(err),
            }
        }
        self.pop_value()
    }

    /// Transfers control to the innermost exception frame, or propagates.
    fn land(&mut self, thrown: Value) -> Result<(), RuntimeError> {
        let Some(handler) = self.handlers.pop() else {
            return Err(RuntimeError::Thrown(thrown));
        };
        debug!(
            ip = self.at,
            catch = handler.catch,
            finally = handler.finally,
            "exception caught"
        );
        self.stack.truncate(handler.stack);
        self.frames.truncate(handler.frames);
        if handler.catch >= 0 {
            self.pending = Some(Incoming::catch(thrown));
            self.ip = handler.catch;
        } else {
            // The rethrow landing runs the finally body, then throws this
            self.stack.push(Slot::Value(thrown));
            self.ip = handler.finally;
        }
        Ok(())
    }

    fn dispatch(&mut self, instruction: &Instruction<'_>) -> Result<Flow, RuntimeError> {
        match instruction.opcode {
            Opcode::Halt => return self.halt(),
            Opcode::LeaveScope => {
                let base = self
                    .frames
                    .pop()
                    .ok_or_else(|| self.malformed("frame stack underflow"))?;
                self.stack.truncate(base);
            }
            Opcode::Nop => {}
            Opcode::Top => {
                let top = self.count(instruction, 0)?;
                self.frames.push(self.stack.len());
                for _ in 0..=top {
                    self.stack.push(Slot::Register(fresh_cell()));
                }
            }

            Opcode::Undefined => self.push_value(Value::Undefined),
            Opcode::Null => self.push_value(Value::Null),
            Opcode::True => self.push_value(Value::Boolean(true)),
            Opcode::False => self.push_value(Value::Boolean(false)),
            Opcode::Push => {
                let value = match &instruction.operands[0] {
                    Word::Number(n) => Value::Number(*n),
                    Word::String(s) => Value::String(s.clone()),
                };
                self.push_value(value);
            }
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Dup => {
                let top = self
                    .stack
                    .last()
                    .cloned()
                    .ok_or_else(|| self.malformed("stack underflow"))?;
                self.stack.push(top);
            }
            Opcode::Swap => {
                let offset = self.number(instruction, 0)? as isize;
                let top = self.stack.len().checked_sub(1);
                let other = top.map(|top| top as isize + offset);
                match (top, other) {
                    (Some(top), Some(other)) if other >= 0 => self.stack.swap(top, other as usize),
                    _ => return Err(self.malformed("swap below the stack")),
                }
            }
            Opcode::String => self.push_value(Value::String(String::new())),
            Opcode::Char => {
                let code = self.count(instruction, 0)? as u32 ^ 0x39;
                let c = char::from_u32(code).ok_or_else(|| self.malformed("invalid character"))?;
                match self.stack.last_mut() {
                    Some(Slot::Value(Value::String(s))) => s.push(c),
                    _ => return Err(RuntimeError::malformed(self.at, "CHAR without a string")),
                }
            }

            Opcode::Bind => {
                let slot = self.pop_index()?;
                let level = self.pop_index()?;
                let frame = self
                    .frames
                    .len()
                    .checked_sub(level + 1)
                    .ok_or_else(|| self.malformed("frame level out of range"))?;
                let cell = self.register(frame, slot)?;
                self.stack.push(Slot::Binding(Binding::Register(cell)));
            }
            Opcode::BindGlobal => {
                let slot = self.pop_index()?;
                self.stack.push(Slot::Binding(Binding::Global(slot)));
            }
            Opcode::BindLocal => {
                let slot = self.pop_index()?;
                let binding = self.local(slot)?;
                self.stack.push(Slot::Binding(binding));
            }
            Opcode::Load => {
                let slot = self.pop()?;
                let value = self.value_of(slot)?;
                self.push_value(value);
            }
            Opcode::Store => {
                let value = self.pop_value()?;
                let target = self.pop()?;
                self.store(target, value.clone())?;
                self.push_value(value);
            }
            Opcode::Access => {
                let key = self.pop_value()?.to_js_string();
                let base = self.pop()?;
                let from_global = match &base {
                    Slot::Binding(Binding::Global(_)) => true,
                    Slot::Locator(locator) => locator.from_global,
                    _ => false,
                };
                let base = self.value_of(base)?;
                trace!(%key, from_global, "member");
                self.stack.push(Slot::Locator(Locator {
                    base,
                    key,
                    from_global,
                }));
            }
            Opcode::Delete => {
                let deleted = match self.pop()? {
                    Slot::Locator(locator) => match &locator.base {
                        Value::Object(object) => object.delete(&locator.key),
                        Value::Function(function) => function.delete(&locator.key),
                        Value::Undefined | Value::Null => {
                            return Err(RuntimeError::type_error(format!(
                                "Cannot convert {} to object",
                                locator.base.to_js_string()
                            )));
                        }
                        _ => true,
                    },
                    _ => true,
                };
                self.push_value(Value::Boolean(deleted));
            }

            Opcode::Object => self.push_value(Value::object()),
            Opcode::Array => {
                let count = self.count(instruction, 0)?;
                let items = self.pop_spread(count)?;
                self.push_value(Value::array(items));
            }
            Opcode::Expansion => {
                let value = self.pop_value()?;
                let items = match &value {
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    _ => value.as_array().ok_or_else(|| {
                        RuntimeError::type_error(format!("{} is not iterable", value.to_js_string()))
                    })?,
                };
                self.stack.push(Slot::Expand(items));
            }
            Opcode::Properties => {
                let value = self.pop_value()?;
                let keys: VecDeque<Value> = match &value {
                    Value::Object(object) => object.keys().into_iter().map(Value::String).collect(),
                    Value::Function(function) => function.keys().into_iter().map(Value::String).collect(),
                    Value::String(s) => (0..s.chars().count()).map(|i| Value::String(i.to_string())).collect(),
                    _ => VecDeque::new(),
                };
                self.stack.push(Slot::Keys(keys));
            }
            Opcode::Extract => {
                let next = match self.stack.last_mut() {
                    Some(Slot::Keys(keys)) => keys.pop_front(),
                    _ => return Err(RuntimeError::malformed(self.at, "EXTRACT without a key snapshot")),
                };
                let more = next.is_some();
                self.push_value(next.unwrap_or_default());
                self.push_value(Value::Boolean(more));
            }

            Opcode::Throw => {
                let value = self.pop_value()?;
                return Err(RuntimeError::Thrown(value));
            }
            Opcode::Jmp => self.ip = self.address(instruction, 0)?,
            Opcode::JmpTrue => {
                let target = self.address(instruction, 0)?;
                if self.pop_value()?.to_boolean() {
                    self.ip = target;
                }
            }
            Opcode::JmpPeekTrue => {
                let target = self.address(instruction, 0)?;
                let truthy = match self.stack.last() {
                    Some(Slot::Value(value)) => value.to_boolean(),
                    _ => return Err(self.malformed("JMPFt without a value")),
                };
                if truthy {
                    self.ip = target;
                }
            }

            Opcode::Call => {
                let argc = self.count(instruction, 0)?;
                self.call(argc)?;
            }
            Opcode::New => {
                let argc = self.count(instruction, 0)?;
                let args = self.pop_spread(argc)?;
                let value = match self.pop_value()? {
                    Value::Function(function) => construct(&function, args, self.depth)?,
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "{} is not a constructor",
                            other.to_js_string()
                        )));
                    }
                };
                self.push_value(value);
            }
            Opcode::RelCall => {
                let Some(Slot::Callee {
                    kind,
                    entry,
                    receiver,
                }) = self.stack.pop()
                else {
                    return Err(self.malformed("RELCALL without a callee"));
                };
                let Some(Slot::Arguments(args)) = self.stack.pop() else {
                    return Err(self.malformed("RELCALL without arguments"));
                };
                self.stack.push(Slot::ReturnAddress(self.ip));
                self.pending = Some(Incoming {
                    args,
                    receiver,
                    arguments: kind == FunctionKind::Normal,
                });
                self.ip = entry as isize;
            }
            Opcode::Params => {
                let first = self.count(instruction, 0)?;
                let count = self.count(instruction, 1)?;
                let rest = self.count(instruction, 2)? != 0;
                self.bind_params(first, count, rest)?;
            }
            Opcode::Function | Opcode::ArrowFunction => {
                let kind = if instruction.opcode == Opcode::Function {
                    FunctionKind::Normal
                } else {
                    FunctionKind::Arrow
                };
                let entry = self.count(instruction, 0)?;
                let closure = Closure {
                    kind,
                    entry,
                    image: Arc::clone(&self.image),
                    stack: self.stack.clone(),
                    frames: self.frames.clone(),
                };
                self.push_value(Value::Function(FunctionRef::closure(closure)));
            }

            Opcode::Not => {
                let value = self.pop_value()?;
                self.push_value(Value::Boolean(!value.to_boolean()));
            }
            Opcode::BitNot => {
                let value = self.pop_value()?;
                self.push_value(Value::Number(f64::from(!value.to_int32())));
            }
            Opcode::Plus => {
                let value = self.pop_value()?;
                self.push_value(Value::Number(value.to_number()));
            }
            Opcode::Minus => {
                let value = self.pop_value()?;
                self.push_value(Value::Number(-value.to_number()));
            }
            Opcode::TypeOf => {
                let type_name = match self.pop()? {
                    // An unbound global is "undefined", not an error
                    Slot::Binding(Binding::Global(slot)) => match self.read_global(slot) {
                        Ok(value) => value.type_of(),
                        Err(RuntimeError::Thrown(_)) => "undefined",
                        Err(err) => return Err(err),
                    },
                    slot => self.value_of(slot)?.type_of(),
                };
                self.push_value(Value::from(type_name));
            }

            Opcode::PushExcept => {
                let catch = self.address(instruction, 0)?;
                let finally = self.address(instruction, 1)?;
                self.handlers.push(Handler {
                    catch,
                    finally,
                    stack: self.stack.len(),
                    frames: self.frames.len(),
                });
            }
            Opcode::PopExcept => {
                self.handlers
                    .pop()
                    .ok_or_else(|| self.malformed("exception frame underflow"))?;
            }

            op => {
                let b = self.pop_value()?;
                let a = self.pop_value()?;
                let value = match op {
                    Opcode::Eq => Value::Boolean(abstract_equals(&a, &b)),
                    Opcode::Identity => Value::Boolean(strict_equals(&a, &b)),
                    Opcode::Gt => Value::Boolean(greater(&a, &b, false)),
                    Opcode::Ge => Value::Boolean(greater(&a, &b, true)),
                    Opcode::Add => add(&a, &b),
                    Opcode::In => Value::Boolean(has_property(&a, &b)?),
                    Opcode::InstanceOf => Value::Boolean(instance_of(&a, &b)?),
                    op => arithmetic(op, &a, &b)
                        .ok_or_else(|| self.malformed(format!("unexpected {}", op)))?,
                };
                self.push_value(value);
            }

        }
        Ok(Flow::Continue)
    }

    /// Returns from this invocation: drops its frame and resumes at the
    /// return address below it.
    fn halt(&mut self) -> Result<Flow, RuntimeError> {
        let result = self.pop_value()?;
        let base = *self
            .frames
            .get(self.base_depth)
            .ok_or_else(|| self.malformed("HALT without a frame"))?;
        self.frames.truncate(self.base_depth);
        self.stack.truncate(base);
        match self.stack.pop() {
            Some(Slot::ReturnAddress(ip)) => self.ip = ip,
            _ => return Err(self.malformed("HALT without a return address")),
        }
        self.push_value(result);
        Ok(Flow::Halt)
    }

    fn call(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let args = self.pop_spread(argc)?;
        let result = match self.pop()? {
            Slot::Locator(locator) => self.call_method(locator, args)?,
            callee => {
                let callee = self.value_of(callee)?;
                call_value(&callee, None, args, self.depth)?
            }
        };
        self.push_value(result);
        Ok(())
    }

    /// Calls through a member reference: the base becomes `this`, and
    /// primitives and arrays fall back to their intrinsic methods.
    fn call_method(&self, locator: Locator, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let method = get_member(&locator.base, &locator.key)?;
        if let Value::Function(function) = &method {
            return call_function(function, Some(locator.base), args, self.depth);
        }
        let intrinsic = match &locator.base {
            Value::String(s) => call_string_method(s, &locator.key, &args),
            Value::Number(n) => call_number_method(*n, &locator.key, &args),
            Value::Object(object) => call_array_method(object, &locator.key, &args, self.depth),
            _ => None,
        };
        intrinsic.unwrap_or_else(|| {
            Err(RuntimeError::type_error(format!(
                "{}.{} is not a function",
                locator.base.type_of(),
                locator.key
            )))
        })
    }

    fn bind_params(&mut self, first: usize, count: usize, rest: bool) -> Result<(), RuntimeError> {
        let incoming = self
            .pending
            .take()
            .ok_or_else(|| self.malformed("PARAMS without a pending call"))?;
        let frame = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or_else(|| self.malformed("PARAMS without a frame"))?;
        if let Some(receiver) = incoming.receiver {
            *self.register(frame, 0)?.lock() = receiver;
        }
        if incoming.arguments {
            *self.register(frame, 1)?.lock() = Value::array(incoming.args.clone());
        }
        // Missing actuals leave their cells undefined
        for (i, arg) in incoming.args.iter().take(count).enumerate() {
            *self.register(frame, first + i)?.lock() = arg.clone();
        }
        if rest {
            let remaining = incoming.args.get(count..).unwrap_or_default().to_vec();
            *self.register(frame, first + count)?.lock() = Value::array(remaining);
        }
        Ok(())
    }

    // ---- references ----

    fn register(&self, frame: usize, slot: usize) -> Result<Cell, RuntimeError> {
        let base = *self
            .frames
            .get(frame)
            .ok_or_else(|| self.malformed("frame out of range"))?;
        match self.stack.get(base + slot) {
            Some(Slot::Register(cell)) => Ok(Arc::clone(cell)),
            _ => Err(self.malformed(format!("no register {} in frame {}", slot, frame))),
        }
    }

    /// A register of the innermost frame. An unset receiver cell resolves
    /// to the nearest enclosing frame that has one, then to the global
    /// receiver.
    fn local(&self, slot: usize) -> Result<Binding, RuntimeError> {
        let top = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or_else(|| self.malformed("no open frame"))?;
        let cell = self.register(top, slot)?;
        if slot != 0 || !cell.lock().is_undefined() {
            return Ok(Binding::Register(cell));
        }
        for frame in (0..top).rev() {
            let outer = self.register(frame, 0)?;
            if !outer.lock().is_undefined() {
                return Ok(Binding::Register(outer));
            }
        }
        Ok(Binding::Global(0))
    }

    fn read_global(&self, slot: usize) -> Result<Value, RuntimeError> {
        self.image
            .globals
            .get(slot)
            .ok_or_else(|| self.malformed(format!("no accessor for global slot {}", slot)))?
            .get()
    }

    fn value_of(&self, slot: Slot) -> Result<Value, RuntimeError> {
        match slot {
            Slot::Value(value) => Ok(value),
            Slot::Register(cell) | Slot::Binding(Binding::Register(cell)) => Ok(cell.lock().clone()),
            Slot::Binding(Binding::Global(slot)) => self.read_global(slot),
            Slot::Locator(locator) => get_member(&locator.base, &locator.key),
            Slot::Expand(items) => Ok(Value::array(items)),
            other => Err(self.malformed(format!("{:?} is not a value", other))),
        }
    }

    fn store(&self, target: Slot, value: Value) -> Result<(), RuntimeError> {
        match target {
            Slot::Register(cell) | Slot::Binding(Binding::Register(cell)) => {
                *cell.lock() = value;
                Ok(())
            }
            Slot::Binding(Binding::Global(slot)) => self
                .image
                .globals
                .get(slot)
                .ok_or_else(|| self.malformed(format!("no accessor for global slot {}", slot)))?
                .set(value),
            Slot::Locator(locator) => set_member(&locator, value),
            other => Err(self.malformed(format!("cannot store into {:?}", other))),
        }
    }

    // ---- stack ----

    fn push_value(&mut self, value: Value) {
        self.stack.push(Slot::Value(value));
    }

    fn pop(&mut self) -> Result<Slot, RuntimeError> {
        self.stack.pop().ok_or_else(|| self.malformed("stack underflow"))
    }

    fn pop_value(&mut self) -> Result<Value, RuntimeError> {
        let slot = self.pop()?;
        self.value_of(slot)
    }

    fn pop_index(&mut self) -> Result<usize, RuntimeError> {
        match self.pop_value()? {
            Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
            other => Err(self.malformed(format!("{} is not a slot index", other))),
        }
    }

    /// Pops `count` entries, splicing expanded sequences in place.
    fn pop_spread(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or_else(|| self.malformed("stack underflow"))?;
        let slots: Vec<Slot> = self.stack.drain(start..).collect();
        let mut values = Vec::with_capacity(count);
        for slot in slots {
            match slot {
                Slot::Expand(items) => values.extend(items),
                slot => values.push(self.value_of(slot)?),
            }
        }
        Ok(values)
    }

    // ---- operands ----

    fn number(&self, instruction: &Instruction<'_>, index: usize) -> Result<f64, RuntimeError> {
        instruction
            .operands
            .get(index)
            .and_then(Word::as_number)
            .ok_or_else(|| self.malformed(format!("{} expects a numeric operand", instruction.opcode)))
    }

    fn count(&self, instruction: &Instruction<'_>, index: usize) -> Result<usize, RuntimeError> {
        let n = self.number(instruction, index)?;
        if n >= 0.0 && n.fract() == 0.0 {
            Ok(n as usize)
        } else {
            Err(self.malformed(format!("{} operand {} out of range", instruction.opcode, n)))
        }
    }

    /// A jump target; -1 means "none".
    fn address(&self, instruction: &Instruction<'_>, index: usize) -> Result<isize, RuntimeError> {
        Ok(self.number(instruction, index)? as isize)
    }

    fn malformed(&self, reason: impl Into<String>) -> RuntimeError {
        RuntimeError::malformed(self.at, reason)
    }
}

/// Reads `base[key]`.
pub(crate) fn get_member(base: &Value, key: &str) -> Result<Value, RuntimeError> {
    match base {
        Value::Object(object) => Ok(object.get(key)),
        Value::Function(function) => Ok(function.get(key)),
        Value::String(s) => Ok(match key {
            "length" => Value::Number(s.chars().count() as f64),
            _ => array_index(key)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or_default(),
        }),
        Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            base.to_js_string(),
            key
        ))),
        Value::Boolean(_) | Value::Number(_) => Ok(Value::Undefined),
    }
}

/// Writes `base[key] = value`; writes to other primitives are ignored.
fn set_member(locator: &Locator, value: Value) -> Result<(), RuntimeError> {
    match &locator.base {
        Value::Object(object) => object.try_set(&locator.key, value)?,
        Value::Function(function) => function.set(&locator.key, value),
        Value::Undefined | Value::Null => {
            return Err(RuntimeError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                locator.base.to_js_string(),
                locator.key
            )));
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use veil_macros::{assert_err, assert_matches, assert_ok};

    use super::*;
    use crate::ast::build::*;
    use crate::ast::{BinaryOperator, Statement, UnaryOperator};
    use crate::compiler::{compile, Bytecode, OpcodeTable};
    use crate::config::{CompileOptions, VmOptions};
    use crate::runtime::{Environment, GlobalAccessors};
    use crate::vm::run;

    fn exec(body: Vec<Statement>) -> (Result<Value, RuntimeError>, Environment) {
        let env = Environment::with_builtins();
        let table = OpcodeTable::canonical();
        let (code, globals) = assert_ok!(compile(&program(body), &table, &CompileOptions::default()));
        let result = run(&code, &table, env.accessors(&globals), &VmOptions::default());
        (result, env)
    }

    fn assemble(table: &OpcodeTable, items: &[(Opcode, &[f64])]) -> Bytecode {
        let mut words = Vec::new();
        for (op, operands) in items {
            words.push(Word::from(table.encode(*op) as usize));
            words.extend(operands.iter().map(|n| Word::Number(*n)));
        }
        Bytecode(words)
    }

    #[test]
    fn test_hand_assembled_arithmetic() {
        let table = OpcodeTable::seeded(7);
        let code = assemble(
            &table,
            &[
                (Opcode::Top, &[0.0]),
                (Opcode::Push, &[6.0]),
                (Opcode::Push, &[7.0]),
                (Opcode::Mul, &[]),
                (Opcode::Halt, &[]),
            ],
        );
        let value = assert_ok!(run(&code, &table, GlobalAccessors::new(), &VmOptions::default()));
        assert_eq!(value, Value::Number(42.0));
    }

    #[test]
    fn test_char_unmasks_string() {
        let table = OpcodeTable::canonical();
        let mask = |c: char| f64::from(c as u32 ^ 0x39);
        let code = assemble(
            &table,
            &[
                (Opcode::Top, &[0.0]),
                (Opcode::String, &[]),
                (Opcode::Char, &[mask('o')]),
                (Opcode::Char, &[mask('k')]),
                (Opcode::Halt, &[]),
            ],
        );
        let value = assert_ok!(run(&code, &table, GlobalAccessors::new(), &VmOptions::default()));
        assert_eq!(value, Value::from("ok"));
    }

    #[test]
    fn test_unknown_opcode_is_malformed() {
        let table = OpcodeTable::canonical();
        let code = Bytecode(vec![Word::Number(9999.0)]);
        let err = assert_err!(run(&code, &table, GlobalAccessors::new(), &VmOptions::default()));
        assert_matches!(err, RuntimeError::Malformed { ip: 0, .. });
    }

    #[test]
    fn test_malformed_is_never_caught() {
        let table = OpcodeTable::canonical();
        // An exception frame is active, but a stack underflow is not a throw
        let code = assemble(
            &table,
            &[
                (Opcode::Top, &[0.0]),
                (Opcode::PushExcept, &[5.0, -1.0]),
                (Opcode::Pop, &[]),
                (Opcode::Pop, &[]),
                (Opcode::Pop, &[]),
                (Opcode::Pop, &[]),
            ],
        );
        let err = assert_err!(run(&code, &table, GlobalAccessors::new(), &VmOptions::default()));
        assert_matches!(err, RuntimeError::Malformed { .. });
    }

    #[test]
    fn test_catch_receives_thrown_value() {
        let (result, env) = exec(vec![try_catch(
            vec![throw(string("boom"))],
            Some((
                "e",
                vec![expr_stmt(assign(
                    ident("caught"),
                    binary(BinaryOperator::Add, ident("e"), string("!")),
                ))],
            )),
            None,
        )]);
        assert_ok!(result);
        assert_eq!(env.get("caught"), Some(Value::from("boom!")));
    }

    #[test]
    fn test_uncaught_throw_propagates() {
        let (result, _) = exec(vec![throw(num(3.0))]);
        let err = assert_err!(result);
        assert_eq!(err.thrown(), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_closure_call_binds_params() {
        let (result, env) = exec(vec![
            function(
                "add",
                &["a", "b"],
                vec![return_stmt(Some(binary(BinaryOperator::Add, ident("a"), ident("b"))))],
            ),
            expr_stmt(assign(ident("out"), call(ident("add"), vec![num(2.0), num(5.0)]))),
        ]);
        assert_ok!(result);
        assert_eq!(env.get("out"), Some(Value::Number(7.0)));
    }

    #[test]
    fn test_missing_arguments_are_undefined() {
        let (result, env) = exec(vec![
            function("second", &["a", "b"], vec![return_stmt(Some(ident("b")))]),
            expr_stmt(assign(ident("out"), call(ident("second"), vec![num(1.0)]))),
        ]);
        assert_ok!(result);
        assert_eq!(env.get("out"), Some(Value::Undefined));
    }

    #[test]
    fn test_read_of_undefined_member_throws_type_error() {
        let (result, _) = exec(vec![expr_stmt(member(undefined(), "x"))]);
        let err = assert_err!(result);
        let thrown = err.thrown().cloned().unwrap_or_default();
        let Value::Object(error) = thrown else {
            panic!("expected an error object");
        };
        assert_eq!(error.get("name"), Value::from("TypeError"));
    }

    #[test]
    fn test_typeof_unbound_global() {
        let (result, env) = exec(vec![expr_stmt(assign(
            ident("kind"),
            unary(UnaryOperator::Typeof, ident("nowhere")),
        ))]);
        assert_ok!(result);
        assert_eq!(env.get("kind"), Some(Value::from("undefined")));
    }

    #[test]
    fn test_string_members() {
        assert_eq!(assert_ok!(get_member(&Value::from("héllo"), "length")), Value::Number(5.0));
        assert_eq!(assert_ok!(get_member(&Value::from("abc"), "1")), Value::from("b"));
        assert_eq!(assert_ok!(get_member(&Value::from("abc"), "9")), Value::Undefined);
        assert_eq!(assert_ok!(get_member(&Value::Number(1.0), "x")), Value::Undefined);
    }
}
