// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use super::value::{ClassHierarchy, Object, Value};
use crate::compiler::{Bytecode, Label, OpCode, Operand};
use crate::config::CompilerConfig;
use crate::{Error, Result};

/// A host function callable through `Invoke`.
///
/// Returning `Err(class)` throws a fresh instance of `class`.
pub type Native = Box<dyn FnMut(&[Value]) -> std::result::Result<Value, String>>;

/// One executed call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    /// Method name
    pub name: String,
    /// Argument values
    pub args: Vec<Value>,
}

/// What an instruction asks the dispatch loop to do next.
enum Flow {
    Next,
    Jump(usize),
    Throw(Value),
    Halt,
}

/// The virtual machine.
pub struct VM {
    stack: Vec<Value>,
    locals: Vec<Value>,
    heap: Vec<Object>,
    classes: ClassHierarchy,
    natives: FxHashMap<String, Native>,
    calls: Vec<CallRecord>,
    step_limit: u64,
}

impl VM {
    /// Creates a VM with the step limit from `config`.
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            stack: Vec::new(),
            locals: Vec::new(),
            heap: Vec::new(),
            classes: ClassHierarchy::default(),
            natives: FxHashMap::default(),
            calls: Vec::new(),
            step_limit: config.vm_step_limit,
        }
    }

    /// Registers a host function.
    pub fn register_native<F>(&mut self, name: &str, f: F)
    where
        F: FnMut(&[Value]) -> std::result::Result<Value, String> + 'static,
    {
        self.natives.insert(name.to_string(), Box::new(f));
    }

    /// Declares a class and its superclass.
    pub fn register_class(&mut self, class: &str, parent: &str) {
        self.classes.register(class, parent);
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Names of the calls made so far, in order.
    pub fn call_names(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.name.as_str()).collect()
    }

    /// Value of a local after execution.
    pub fn local(&self, slot: u16) -> Option<Value> {
        self.locals.get(slot as usize).copied()
    }

    /// Class of the object `value` refers to.
    pub fn class_of(&self, value: Value) -> Option<&str> {
        match value {
            Value::Ref(r) => self.heap.get(r).map(|o| o.class.as_str()),
            _ => None,
        }
    }

    /// Field of the object `value` refers to.
    pub fn field(&self, value: Value, name: &str) -> Option<Value> {
        match value {
            Value::Ref(r) => self.heap.get(r)?.fields.get(name).copied(),
            _ => None,
        }
    }

    /// Runs a method body to `Halt`.
    ///
    /// An exception that no handler catches ends the run with [`Error::Uncaught`].
    pub fn execute(&mut self, code: &Bytecode) -> Result<()> {
        self.stack.clear();
        self.locals = vec![Value::Null; code.max_locals as usize];

        let mut ip = 0;
        let mut steps = 0u64;
        loop {
            steps += 1;
            if steps > self.step_limit {
                return Err(Error::Runtime(format!(
                    "step limit of {} exceeded",
                    self.step_limit
                )));
            }
            let Some(instruction) = code.instructions.get(ip) else {
                return Err(Error::Runtime(format!("ran off the end at {}", ip)));
            };

            match self.step(code, instruction.opcode, instruction.operand.as_ref())? {
                Flow::Next => ip += 1,
                Flow::Jump(target) => ip = target,
                Flow::Halt => return Ok(()),
                Flow::Throw(exception) => ip = self.unwind(code, ip, exception)?,
            }
        }
    }

    /// Finds the first handler covering `pc` that accepts `exception`.
    fn unwind(&mut self, code: &Bytecode, pc: usize, exception: Value) -> Result<usize> {
        let class = self
            .class_of(exception)
            .ok_or_else(|| Error::Runtime(format!("cannot throw {}", exception)))?
            .to_string();

        let handler = code.handlers.iter().find(|h| {
            h.covers(pc)
                && h
                    .catch_type
                    .as_deref()
                    .is_none_or(|t| self.classes.is_subclass(&class, t))
        });

        match handler {
            Some(h) => {
                tracing::trace!(pc, %class, handler = h.handler, "exception caught");
                self.stack.clear();
                self.stack.push(exception);
                Ok(h.handler)
            }
            None => Err(Error::Uncaught { class }),
        }
    }

    fn step(&mut self, code: &Bytecode, opcode: OpCode, operand: Option<&Operand>) -> Result<Flow> {
        match opcode {
            OpCode::Halt => return Ok(Flow::Halt),
            OpCode::Nop => {}

            OpCode::Push => {
                let value = match operand {
                    Some(Operand::Int(v)) => Value::Int(*v),
                    Some(Operand::Long(v)) => Value::Long(*v),
                    Some(Operand::Double(v)) => Value::Double(*v),
                    other => return Err(bad_operand(opcode, other)),
                };
                self.stack.push(value);
            }
            OpCode::PushNull => self.stack.push(Value::Null),
            OpCode::LConst0 => self.stack.push(Value::Long(0)),
            OpCode::LConst1 => self.stack.push(Value::Long(1)),
            OpCode::DConst0 => self.stack.push(Value::Double(0.0)),
            OpCode::DConst1 => self.stack.push(Value::Double(1.0)),

            OpCode::Load => {
                let slot = local_operand(opcode, operand)?;
                let value = self.locals[slot];
                self.stack.push(value);
            }
            OpCode::Store => {
                let slot = local_operand(opcode, operand)?;
                self.locals[slot] = self.pop()?;
            }
            OpCode::Inc => {
                let Some(Operand::Increment { local, delta }) = operand else {
                    return Err(bad_operand(opcode, operand));
                };
                let slot = *local as usize;
                self.locals[slot] = match self.locals[slot] {
                    Value::Int(v) => Value::Int(v.wrapping_add(*delta)),
                    Value::Long(v) => Value::Long(v.wrapping_add(i64::from(*delta))),
                    Value::Double(v) => Value::Double(v + f64::from(*delta)),
                    other => return Err(Error::Runtime(format!("cannot increment {}", other))),
                };
            }

            OpCode::Pop => {
                self.pop()?;
            }
            OpCode::Dup => {
                let top = self.peek()?;
                self.stack.push(top);
            }
            OpCode::DupX1 => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.extend([b, a, b]);
            }

            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Rem | OpCode::Xor => {
                let b = self.pop()?;
                let a = self.pop()?;
                match arithmetic(opcode, a, b)? {
                    Some(result) => self.stack.push(result),
                    None => return self.throw_new("ArithmeticException"),
                }
            }
            OpCode::Neg => {
                let value = match self.pop()? {
                    Value::Int(v) => Value::Int(v.wrapping_neg()),
                    Value::Long(v) => Value::Long(v.wrapping_neg()),
                    Value::Double(v) => Value::Double(-v),
                    other => return Err(Error::Runtime(format!("cannot negate {}", other))),
                };
                self.stack.push(value);
            }
            OpCode::I2L | OpCode::I2D | OpCode::L2D => {
                let value = match (opcode, self.pop()?) {
                    (OpCode::I2L, Value::Int(v)) => Value::Long(i64::from(v)),
                    (OpCode::I2D, Value::Int(v)) => Value::Double(f64::from(v)),
                    (OpCode::L2D, Value::Long(v)) => Value::Double(v as f64),
                    (_, other) => {
                        return Err(Error::Runtime(format!("cannot convert {} with {:?}", other, opcode)));
                    }
                };
                self.stack.push(value);
            }

            OpCode::Goto => return Ok(Flow::Jump(self.target(code, operand, opcode)?)),
            OpCode::IfEq | OpCode::IfNe => {
                let zero = self.pop()?.is_zero();
                if zero == (opcode == OpCode::IfEq) {
                    return Ok(Flow::Jump(self.target(code, operand, opcode)?));
                }
            }
            OpCode::IfCmpEq
            | OpCode::IfCmpNe
            | OpCode::IfCmpLt
            | OpCode::IfCmpGe
            | OpCode::IfCmpGt
            | OpCode::IfCmpLe => {
                let b = self.pop()?;
                let a = self.pop()?;
                if compare(opcode, a, b)? {
                    return Ok(Flow::Jump(self.target(code, operand, opcode)?));
                }
            }
            OpCode::TableSwitch => {
                let Some(Operand::TableSwitch(table)) = operand else {
                    return Err(bad_operand(opcode, operand));
                };
                let key = self.pop_int()?;
                let label = if table.low <= key && key <= table.high {
                    table.targets[(i64::from(key) - i64::from(table.low)) as usize]
                } else {
                    table.default
                };
                return Ok(Flow::Jump(resolve(code, label)?));
            }
            OpCode::LookupSwitch => {
                let Some(Operand::LookupSwitch(lookup)) = operand else {
                    return Err(bad_operand(opcode, operand));
                };
                let key = self.pop_int()?;
                let label = match lookup.pairs.binary_search_by_key(&key, |(v, _)| *v) {
                    Ok(i) => lookup.pairs[i].1,
                    Err(_) => lookup.default,
                };
                return Ok(Flow::Jump(resolve(code, label)?));
            }

            OpCode::New => {
                let Some(Operand::Name(class)) = operand else {
                    return Err(bad_operand(opcode, operand));
                };
                let object = self.allocate(class);
                self.stack.push(object);
            }
            OpCode::GetField => {
                let Some(Operand::Name(name)) = operand else {
                    return Err(bad_operand(opcode, operand));
                };
                let Value::Ref(r) = self.pop()? else {
                    return self.throw_new("NullPointerException");
                };
                let value = self.heap[r]
                    .fields
                    .get(name)
                    .copied()
                    .ok_or_else(|| Error::Runtime(format!("field {} read before assignment", name)))?;
                self.stack.push(value);
            }
            OpCode::PutField => {
                let Some(Operand::Name(name)) = operand else {
                    return Err(bad_operand(opcode, operand));
                };
                let value = self.pop()?;
                let Value::Ref(r) = self.pop()? else {
                    return self.throw_new("NullPointerException");
                };
                self.heap[r].fields.insert(name.clone(), value);
            }

            OpCode::Invoke => {
                let Some(Operand::Call {
                    name,
                    argc,
                    returns,
                }) = operand
                else {
                    return Err(bad_operand(opcode, operand));
                };
                if self.stack.len() < *argc {
                    return Err(Error::Runtime("stack underflow".to_string()));
                }
                let args = self.stack.split_off(self.stack.len() - argc);
                return self.invoke(name, args, *returns);
            }
            OpCode::Throw => {
                let exception = self.pop()?;
                if exception == Value::Null {
                    return self.throw_new("NullPointerException");
                }
                return Ok(Flow::Throw(exception));
            }
        }
        Ok(Flow::Next)
    }

    fn invoke(&mut self, name: &str, args: Vec<Value>, returns: bool) -> Result<Flow> {
        tracing::trace!(name, argc = args.len(), "invoke");
        self.calls.push(CallRecord {
            name: name.to_string(),
            args: args.clone(),
        });

        let outcome = match self.natives.get_mut(name) {
            Some(native) => native(&args),
            None if !returns => Ok(Value::Null),
            None => return Err(Error::Runtime(format!("no native registered for {}", name))),
        };
        match outcome {
            Ok(value) => {
                if returns {
                    self.stack.push(value);
                }
                Ok(Flow::Next)
            }
            Err(class) => self.throw_new(&class),
        }
    }

    fn allocate(&mut self, class: &str) -> Value {
        self.heap.push(Object {
            class: class.to_string(),
            fields: FxHashMap::default(),
        });
        Value::Ref(self.heap.len() - 1)
    }

    fn throw_new(&mut self, class: &str) -> Result<Flow> {
        Ok(Flow::Throw(self.allocate(class)))
    }

    fn target(&self, code: &Bytecode, operand: Option<&Operand>, opcode: OpCode) -> Result<usize> {
        match operand {
            Some(Operand::Label(label)) => resolve(code, *label),
            other => Err(bad_operand(opcode, other)),
        }
    }

    fn pop(&mut self) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| Error::Runtime("stack underflow".to_string()))
    }

    fn peek(&self) -> Result<Value> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| Error::Runtime("stack underflow".to_string()))
    }

    fn pop_int(&mut self) -> Result<i32> {
        let value = self.pop()?;
        value
            .as_int()
            .ok_or_else(|| Error::Runtime(format!("expected int, found {}", value)))
    }
}

fn resolve(code: &Bytecode, label: Label) -> Result<usize> {
    code.position(label).ok_or(Error::UnplacedLabel(label.0))
}

fn local_operand(opcode: OpCode, operand: Option<&Operand>) -> Result<usize> {
    match operand {
        Some(Operand::Local(slot)) => Ok(*slot as usize),
        other => Err(bad_operand(opcode, other)),
    }
}

fn bad_operand(opcode: OpCode, operand: Option<&Operand>) -> Error {
    Error::Runtime(format!("bad operand for {:?}: {:?}", opcode, operand))
}

/// Applies an arithmetic opcode. `None` signals integer division by zero.
fn arithmetic(opcode: OpCode, a: Value, b: Value) -> Result<Option<Value>> {
    let result = match (a, b) {
        (Value::Int(x), Value::Int(y)) => match opcode {
            OpCode::Add => Value::Int(x.wrapping_add(y)),
            OpCode::Sub => Value::Int(x.wrapping_sub(y)),
            OpCode::Mul => Value::Int(x.wrapping_mul(y)),
            OpCode::Div | OpCode::Rem if y == 0 => return Ok(None),
            OpCode::Div => Value::Int(x.wrapping_div(y)),
            OpCode::Rem => Value::Int(x.wrapping_rem(y)),
            _ => Value::Int(x ^ y),
        },
        (Value::Long(x), Value::Long(y)) => match opcode {
            OpCode::Add => Value::Long(x.wrapping_add(y)),
            OpCode::Sub => Value::Long(x.wrapping_sub(y)),
            OpCode::Mul => Value::Long(x.wrapping_mul(y)),
            OpCode::Div | OpCode::Rem if y == 0 => return Ok(None),
            OpCode::Div => Value::Long(x.wrapping_div(y)),
            OpCode::Rem => Value::Long(x.wrapping_rem(y)),
            _ => Value::Long(x ^ y),
        },
        (Value::Double(x), Value::Double(y)) => match opcode {
            OpCode::Add => Value::Double(x + y),
            OpCode::Sub => Value::Double(x - y),
            OpCode::Mul => Value::Double(x * y),
            OpCode::Div => Value::Double(x / y),
            OpCode::Rem => Value::Double(x % y),
            _ => return Err(Error::Runtime("xor on double".to_string())),
        },
        (a, b) => {
            return Err(Error::Runtime(format!(
                "{:?} on mismatched operands {} and {}",
                opcode, a, b
            )));
        }
    };
    Ok(Some(result))
}

/// Evaluates a compare-and-branch condition.
fn compare(opcode: OpCode, a: Value, b: Value) -> Result<bool> {
    let ordering = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(&y)),
        (Value::Long(x), Value::Long(y)) => Some(x.cmp(&y)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(&y),
        (Value::Null | Value::Ref(_), Value::Null | Value::Ref(_)) => {
            let same = a == b;
            return match opcode {
                OpCode::IfCmpEq => Ok(same),
                OpCode::IfCmpNe => Ok(!same),
                _ => Err(Error::Runtime("ordering comparison on references".to_string())),
            };
        }
        _ => {
            return Err(Error::Runtime(format!(
                "cannot compare {} and {}",
                a, b
            )));
        }
    };
    // Unordered (NaN) comparisons are false except `!=`.
    Ok(match ordering {
        None => opcode == OpCode::IfCmpNe,
        Some(o) => match opcode {
            OpCode::IfCmpEq => o == Ordering::Equal,
            OpCode::IfCmpNe => o != Ordering::Equal,
            OpCode::IfCmpLt => o == Ordering::Less,
            OpCode::IfCmpGe => o != Ordering::Less,
            OpCode::IfCmpGt => o == Ordering::Greater,
            _ => o != Ordering::Greater,
        },
    })
}
